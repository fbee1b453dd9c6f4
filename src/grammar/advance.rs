//! Advancer combinators
//!
//! Small matchers fed one codepoint at a time. Non-greedy forms report
//! `Matched` on the codepoint that completes them. Greedy forms only know
//! they are finished when they see a codepoint past the match, which they
//! hand back as `Overran` for the caller to re-dispatch.

use crate::core::chars::{describe, is_name_char, is_name_start, is_whitespace, Codepoint};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Consumed; more input needed
    Pending,
    /// Consumed; the match is complete
    Matched,
    /// Match complete; the codepoint was not consumed
    Overran(Codepoint),
    /// No match; carries the expectation
    Failed(String),
}

pub trait Advancer {
    fn advance(&mut self, cp: Codepoint) -> Step;
}

/// Codepoint class as stored in production states
pub type Class = fn(Codepoint) -> bool;

/// Required whitespace between two tokens
pub type Space = OneOrMore<Class>;

/// Optional whitespace
pub type OptionalSpace = ZeroOrMore<Class>;

pub fn space() -> Space {
    one_or_more(is_whitespace as Class, "whitespace")
}

pub fn optional_space() -> OptionalSpace {
    zero_or_more(is_whitespace as Class)
}

/// Exactly one codepoint satisfying a predicate
pub struct One<P> {
    pred: P,
    expected: &'static str,
}

pub fn one<P: Fn(Codepoint) -> bool>(pred: P, expected: &'static str) -> One<P> {
    One { pred, expected }
}

impl<P: Fn(Codepoint) -> bool> Advancer for One<P> {
    fn advance(&mut self, cp: Codepoint) -> Step {
        if (self.pred)(cp) {
            Step::Matched
        } else {
            Step::Failed(self.expected.to_string())
        }
    }
}

/// Greedy run of zero or more codepoints
pub struct ZeroOrMore<P> {
    pred: P,
}

pub fn zero_or_more<P: Fn(Codepoint) -> bool>(pred: P) -> ZeroOrMore<P> {
    ZeroOrMore { pred }
}

impl<P: Fn(Codepoint) -> bool> Advancer for ZeroOrMore<P> {
    fn advance(&mut self, cp: Codepoint) -> Step {
        if (self.pred)(cp) {
            Step::Pending
        } else {
            Step::Overran(cp)
        }
    }
}

/// Greedy run of one or more codepoints
pub struct OneOrMore<P> {
    pred: P,
    expected: &'static str,
    seen: bool,
}

pub fn one_or_more<P: Fn(Codepoint) -> bool>(pred: P, expected: &'static str) -> OneOrMore<P> {
    OneOrMore { pred, expected, seen: false }
}

impl<P: Fn(Codepoint) -> bool> Advancer for OneOrMore<P> {
    fn advance(&mut self, cp: Codepoint) -> Step {
        match ((self.pred)(cp), self.seen) {
            (true, _) => {
                self.seen = true;
                Step::Pending
            }
            (false, true) => Step::Overran(cp),
            (false, false) => Step::Failed(self.expected.to_string()),
        }
    }
}

const ORDINALS: [&str; 10] = [
    "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth", "tenth",
];

/// An exact literal, with ordinal-aware failure messages
pub struct Series {
    chars: Vec<char>,
    pos: usize,
}

pub fn series(literal: &str) -> Series {
    Series { chars: literal.chars().collect(), pos: 0 }
}

impl Series {
    fn literal(&self) -> String {
        self.chars.iter().collect()
    }

    fn expectation(&self) -> String {
        let wanted = self.chars[self.pos];
        if self.pos == 0 {
            return format!("\"{}\"", self.literal());
        }
        let total = self.chars.iter().filter(|&&c| c == wanted).count();
        if total == 1 {
            return format!("the {} of {}", wanted, self.literal());
        }
        let nth = self.chars[..self.pos].iter().filter(|&&c| c == wanted).count();
        match ORDINALS.get(nth) {
            Some(ordinal) => format!("the {} {} of {}", ordinal, wanted, self.literal()),
            None => format!("{} at position {} of {}", wanted, self.pos + 1, self.literal()),
        }
    }
}

impl Advancer for Series {
    fn advance(&mut self, cp: Codepoint) -> Step {
        match self.chars.get(self.pos) {
            Some(&c) if c as Codepoint == cp => {
                self.pos += 1;
                if self.pos == self.chars.len() {
                    Step::Matched
                } else {
                    Step::Pending
                }
            }
            Some(_) => Step::Failed(self.expectation()),
            None => Step::Overran(cp),
        }
    }
}

/// Longest match among literal alternatives
pub struct OneOf {
    options: &'static [&'static str],
    alive: Vec<usize>,
    pos: usize,
    matched: Option<&'static str>,
}

pub fn one_of(options: &'static [&'static str]) -> OneOf {
    OneOf {
        options,
        alive: (0..options.len()).collect(),
        pos: 0,
        matched: None,
    }
}

impl OneOf {
    /// The alternative that matched
    pub fn matched(&self) -> Option<&'static str> {
        self.matched
    }

    fn expectation(&self) -> String {
        let quoted: Vec<String> = self
            .alive
            .iter()
            .map(|&i| format!("\"{}\"", self.options[i]))
            .collect();
        match quoted.split_last() {
            Some((last, rest)) if !rest.is_empty() => format!("{} or {}", rest.join(", "), last),
            Some((last, _)) => last.clone(),
            None => String::from("nothing"),
        }
    }
}

impl Advancer for OneOf {
    fn advance(&mut self, cp: Codepoint) -> Step {
        let pos = self.pos;
        let options = self.options;
        // Alternatives ending exactly here
        let complete = self.alive.iter().copied().find(|&i| options[i].chars().count() == pos);
        let next: Vec<usize> = self
            .alive
            .iter()
            .copied()
            .filter(|&i| options[i].chars().nth(pos).map(|c| c as Codepoint) == Some(cp))
            .collect();

        if next.is_empty() {
            return match complete {
                Some(i) => {
                    self.matched = Some(options[i]);
                    Step::Overran(cp)
                }
                None => Step::Failed(self.expectation()),
            };
        }

        self.pos += 1;
        self.alive = next;
        let longer = self.alive.iter().any(|&i| options[i].chars().count() > self.pos);
        if !longer {
            self.matched = self.alive.first().map(|&i| options[i]);
            return Step::Matched;
        }
        Step::Pending
    }
}

/// Greedy Name (or Nmtoken) accumulator
pub struct NameAdvancer {
    name: String,
    nmtoken: bool,
}

impl NameAdvancer {
    pub fn name() -> Self {
        NameAdvancer { name: String::new(), nmtoken: false }
    }

    pub fn nmtoken() -> Self {
        NameAdvancer { name: String::new(), nmtoken: true }
    }

    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.name)
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl Advancer for NameAdvancer {
    fn advance(&mut self, cp: Codepoint) -> Step {
        let accepted = if self.name.is_empty() && !self.nmtoken {
            is_name_start(cp)
        } else {
            is_name_char(cp)
        };
        match (accepted, char::from_u32(cp)) {
            (true, Some(c)) => {
                self.name.push(c);
                Step::Pending
            }
            _ if self.name.is_empty() => Step::Failed(if self.nmtoken {
                "a name token".to_string()
            } else {
                format!("a name (found {})", describe(cp))
            }),
            _ => Step::Overran(cp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn feed<A: Advancer>(advancer: &mut A, text: &str) -> Vec<Step> {
        text.chars().map(|c| advancer.advance(c as Codepoint)).collect()
    }

    #[test]
    fn test_one() {
        let mut space = one(is_whitespace, "whitespace");
        assert_eq!(space.advance(' ' as u32), Step::Matched);
        assert_eq!(space.advance('x' as u32), Step::Failed("whitespace".into()));
    }

    #[test]
    fn test_zero_or_more_overruns() {
        let mut spaces = zero_or_more(is_whitespace);
        assert_eq!(feed(&mut spaces, "  x"), vec![Step::Pending, Step::Pending, Step::Overran('x' as u32)]);
        let mut spaces = zero_or_more(is_whitespace);
        assert_eq!(spaces.advance('x' as u32), Step::Overran('x' as u32));
    }

    #[test]
    fn test_one_or_more_requires_one() {
        let mut spaces = one_or_more(is_whitespace, "whitespace");
        assert_eq!(spaces.advance('x' as u32), Step::Failed("whitespace".into()));
        let mut spaces = one_or_more(is_whitespace, "whitespace");
        assert_eq!(feed(&mut spaces, " >"), vec![Step::Pending, Step::Overran('>' as u32)]);
    }

    #[test]
    fn test_space_runs() {
        let mut required = space();
        assert_eq!(required.advance('>' as u32), Step::Failed("whitespace".into()));
        let mut required = space();
        assert_eq!(feed(&mut required, "\t\n>"), vec![Step::Pending, Step::Pending, Step::Overran('>' as u32)]);
        let mut optional = optional_space();
        assert_eq!(optional.advance('=' as u32), Step::Overran('=' as u32));
    }

    #[test]
    fn test_series_ordinal_message() {
        let mut attlist = series("ATTLIST");
        assert_eq!(feed(&mut attlist, "AT"), vec![Step::Pending, Step::Pending]);
        assert_eq!(attlist.advance('X' as u32), Step::Failed("the second T of ATTLIST".into()));

        let mut attlist = series("ATTLIST");
        feed(&mut attlist, "ATT");
        assert_eq!(attlist.advance('X' as u32), Step::Failed("the L of ATTLIST".into()));

        let mut cdata = series("CDATA[");
        assert_eq!(cdata.advance('x' as u32), Step::Failed("\"CDATA[\"".into()));
    }

    #[test]
    fn test_series_completes() {
        let mut doctype = series("DOCTYPE");
        let steps = feed(&mut doctype, "DOCTYPE");
        assert_eq!(steps.last(), Some(&Step::Matched));
    }

    #[test]
    fn test_one_of_longest_match() {
        const TYPES: &[&str] = &["ID", "IDREF", "IDREFS"];
        let mut types = one_of(TYPES);
        assert_eq!(feed(&mut types, "ID "), vec![Step::Pending, Step::Pending, Step::Overran(' ' as u32)]);
        assert_eq!(types.matched(), Some("ID"));

        let mut types = one_of(TYPES);
        let steps = feed(&mut types, "IDREFS");
        assert_eq!(steps.last(), Some(&Step::Matched));
        assert_eq!(types.matched(), Some("IDREFS"));
    }

    #[test]
    fn test_one_of_combined_message() {
        const SPECS: &[&str] = &["EMPTY", "ANY", "("];
        let mut specs = one_of(SPECS);
        assert_eq!(specs.advance('x' as u32), Step::Failed("\"EMPTY\", \"ANY\" or \"(\"".into()));
    }

    #[test]
    fn test_one_of_distinct_prefixes() {
        const KEYWORDS: &[&str] = &["ELEMENT", "ENTITY", "ATTLIST", "NOTATION"];
        let mut keywords = one_of(KEYWORDS);
        let steps = feed(&mut keywords, "ENTITY");
        assert_eq!(steps.last(), Some(&Step::Matched));
        assert_eq!(keywords.matched(), Some("ENTITY"));
    }

    #[test]
    fn test_name_advancer() {
        let mut name = NameAdvancer::name();
        assert_eq!(feed(&mut name, "a-1"), vec![Step::Pending; 3]);
        assert_eq!(name.advance('=' as u32), Step::Overran('=' as u32));
        assert_eq!(name.take(), "a-1");

        let mut name = NameAdvancer::name();
        assert!(matches!(name.advance('1' as u32), Step::Failed(_)));

        let mut token = NameAdvancer::nmtoken();
        assert_eq!(token.advance('1' as u32), Step::Pending);
    }
}
