//! Parse configuration

/// What the root production parses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// A complete document
    #[default]
    Document,
    /// A standalone external DTD subset
    ExtSubset,
    /// An external parsed entity (content fragment)
    ExtEntity,
}

/// Treatment of spaces produced by character references during the
/// type-dependent attribute normalization pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharRefSpaces {
    /// Referenced spaces collapse and trim like literal ones
    #[default]
    Fold,
    /// Referenced spaces are preserved verbatim
    Literal,
}

pub const DEFAULT_MAX_EXPANSION_COUNT: usize = 10_000;
pub const DEFAULT_MAX_EXPANSION_SIZE: usize = 20_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Caller encoding override; in-band declarations are then ignored
    pub encoding: Option<String>,
    /// Ceiling on entity expansions across the whole parse
    pub max_expansion_count: usize,
    /// Ceiling on text consumed by one expansion, nested expansions included
    pub max_expansion_size: usize,
    pub target: Target,
    /// Origin of the top-level input, used for relative system identifiers
    pub path: Option<String>,
    pub char_ref_spaces: CharRefSpaces,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            encoding: None,
            max_expansion_count: DEFAULT_MAX_EXPANSION_COUNT,
            max_expansion_size: DEFAULT_MAX_EXPANSION_SIZE,
            target: Target::Document,
            path: None,
            char_ref_spaces: CharRefSpaces::Fold,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    pub fn max_expansion_count(mut self, limit: usize) -> Self {
        self.max_expansion_count = limit;
        self
    }

    pub fn max_expansion_size(mut self, limit: usize) -> Self {
        self.max_expansion_size = limit;
        self
    }

    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn char_ref_spaces(mut self, policy: CharRefSpaces) -> Self {
        self.char_ref_spaces = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ParseOptions::default();
        assert_eq!(options.max_expansion_count, 10_000);
        assert_eq!(options.max_expansion_size, 20_000);
        assert_eq!(options.target, Target::Document);
        assert_eq!(options.char_ref_spaces, CharRefSpaces::Fold);
    }

    #[test]
    fn test_chained_setters() {
        let options = ParseOptions::new()
            .encoding("UTF-16")
            .target(Target::ExtSubset)
            .path("dtd/main.dtd");
        assert_eq!(options.encoding.as_deref(), Some("UTF-16"));
        assert_eq!(options.target, Target::ExtSubset);
        assert_eq!(options.path.as_deref(), Some("dtd/main.dtd"));
    }
}
