//! Driver services available to a production while it is resumed

use super::expansion::{BoundaryToken, Chaos, Expansion, Head};
use crate::core::dtd::DtdDeclarations;
use crate::dom::TreeBuilder;
use crate::error::Result;
use crate::options::ParseOptions;

pub struct Context<'a> {
    pub(crate) builder: &'a mut TreeBuilder,
    pub(crate) chaos: &'a mut Chaos,
    pub(crate) expansion: &'a Expansion,
    pub(crate) options: &'a ParseOptions,
}

impl Context<'_> {
    pub fn builder(&mut self) -> &mut TreeBuilder {
        self.builder
    }

    pub fn dtd(&self) -> &DtdDeclarations {
        self.builder.dtd()
    }

    pub fn dtd_mut(&mut self) -> &mut DtdDeclarations {
        self.builder.dtd_mut()
    }

    pub fn options(&self) -> &ParseOptions {
        self.options
    }

    /// Whether the input is, or was reached through, external DTD content
    pub fn chaos_active(&self) -> bool {
        self.chaos.active()
    }

    /// Stop the parameter reference pre-pass, e.g. inside a literal
    pub fn suppress_chaos(&mut self) {
        self.chaos.suppress();
    }

    pub fn unsuppress_chaos(&mut self) {
        self.chaos.unsuppress();
    }

    pub fn head(&self) -> Option<Head> {
        self.expansion.head()
    }

    /// Snapshot the active expansion for a markup structure starting now
    pub fn boundary(&self) -> BoundaryToken {
        BoundaryToken::new(self.expansion.head())
    }

    /// Lock in the current expansion and compare it with the snapshot
    pub fn check_boundary(&self, token: &mut BoundaryToken, what: &str) -> Result<()> {
        token.lock_in(self.expansion.head());
        token.check(what)
    }

    /// Resolve a system identifier against the nearest origin
    pub fn resolve_path(&self, system_id: &str) -> String {
        let base = self.expansion.origin().or(self.options.path.as_deref());
        resolve_path(base, system_id)
    }
}

fn is_absolute(path: &str) -> bool {
    path.contains("://") || path.starts_with('/')
}

/// Join a relative system identifier with the directory of `base`
pub fn resolve_path(base: Option<&str>, system_id: &str) -> String {
    let joined = match base {
        Some(base) if !is_absolute(system_id) => match base.rfind('/') {
            Some(slash) => format!("{}{}", &base[..=slash], system_id),
            None => system_id.to_string(),
        },
        _ => system_id.to_string(),
    };
    normalize_dots(&joined)
}

/// Remove `.` segments and fold `..` into the preceding segment
fn normalize_dots(path: &str) -> String {
    let (prefix, rest) = match path.find("://") {
        Some(i) => match path[i + 3..].find('/') {
            Some(j) => path.split_at(i + 3 + j),
            None => return path.to_string(),
        },
        None => ("", path),
    };
    let mut segments: Vec<&str> = Vec::new();
    let parts: Vec<&str> = rest.split('/').collect();
    for (i, segment) in parts.iter().enumerate() {
        match *segment {
            "." => {
                if i == parts.len() - 1 {
                    segments.push("");
                }
            }
            ".." => {
                if segments.last().is_some_and(|s| !s.is_empty() && *s != "..") {
                    segments.pop();
                } else if !rest.starts_with('/') {
                    segments.push("..");
                }
                if i == parts.len() - 1 {
                    segments.push("");
                }
            }
            _ => segments.push(segment),
        }
    }
    format!("{}{}", prefix, segments.join("/"))
}
