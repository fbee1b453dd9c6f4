//! Quoted literals: attribute values, entity values and external identifiers
//!
//! The chaos pre-pass is suppressed between the quotes. A quote equal to
//! the delimiter only closes the literal when it comes from the same entity
//! as the opening quote.

use super::{AMP, LT, PERCENT};
use super::reference::{PeReference, RefMode, Reference};
use crate::core::chars::{is_pubid_char, is_quote, is_whitespace, to_string, Codepoint, EOF, SPACE};
use crate::core::dtd::ExternalId;
use crate::grammar::advance::{one_of, space, Advancer, OneOf, Space, Step};
use crate::grammar::context::Context;
use crate::grammar::control::{Control, Input, Product, Production};
use crate::grammar::expansion::BoundaryToken;

/// Where an attribute value occurs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueMode {
    /// Start tags
    Normal,
    /// Declared defaults: the text as written is kept as well, to be
    /// re-read in the context of each start tag
    Default,
}

/// Opening quote and its entity
struct Delimiter {
    quote: Codepoint,
    token: BoundaryToken,
}

impl Delimiter {
    fn closes(&self, cp: Codepoint, cx: &Context<'_>) -> bool {
        cp == self.quote && self.token.is_same(&cx.head())
    }
}

/// `"..."` of an attribute, resumed at the opening quote
///
/// Whitespace folds to spaces and references resolve in both modes.
pub struct AttValue {
    mode: ValueMode,
    delimiter: Option<Delimiter>,
    chars: Vec<Codepoint>,
    literal: Vec<bool>,
    /// Text as written in the entity of the quotes
    written: Vec<Codepoint>,
    /// The pending reference was written there too
    reference_written: bool,
}

impl AttValue {
    pub fn new(mode: ValueMode) -> Self {
        AttValue {
            mode,
            delimiter: None,
            chars: Vec::new(),
            literal: Vec::new(),
            written: Vec::new(),
            reference_written: false,
        }
    }

    fn push(&mut self, cp: Codepoint, literal: bool) {
        self.chars.push(cp);
        self.literal.push(literal);
    }

    fn finish(&mut self) -> Product {
        let chars = std::mem::take(&mut self.chars);
        let literal = std::mem::take(&mut self.literal);
        match self.mode {
            ValueMode::Normal => Product::Value { chars, literal },
            ValueMode::Default => Product::Written { text: std::mem::take(&mut self.written), chars, literal },
        }
    }
}

impl Production for AttValue {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let cp = match input {
            Input::Char(cp) => cp,
            Input::Returned(Product::Text(text)) => {
                for cp in text {
                    self.push(cp, false);
                }
                return Control::Continue;
            }
            Input::Returned(Product::Value { chars, literal }) => {
                self.chars.extend(chars);
                self.literal.extend(literal);
                return Control::Continue;
            }
            Input::Returned(Product::Written { text, chars, literal }) => {
                if self.reference_written {
                    self.written.extend(text);
                }
                self.chars.extend(chars);
                self.literal.extend(literal);
                return Control::Continue;
            }
            Input::Returned(_) | Input::Reply(_) => return Control::Continue,
        };

        let Some(delimiter) = &self.delimiter else {
            if !is_quote(cp) {
                return Control::fail("a quoted attribute value");
            }
            self.delimiter = Some(Delimiter { quote: cp, token: cx.boundary() });
            cx.suppress_chaos();
            return Control::Continue;
        };

        if delimiter.closes(cp, cx) {
            cx.unsuppress_chaos();
            return Control::Done(self.finish(), None);
        }
        let in_quotes_entity = delimiter.token.is_same(&cx.head());
        match cp {
            EOF => Control::fail("the closing quote of the attribute value"),
            LT => Control::fail("\"&lt;\" instead of \"<\" in the attribute value"),
            AMP => {
                self.reference_written = in_quotes_entity;
                let mode = match self.mode {
                    ValueMode::Normal => RefMode::Attribute,
                    ValueMode::Default => RefMode::Default,
                };
                Control::call(Reference::new(mode, cx.boundary()))
            }
            _ => {
                if self.mode == ValueMode::Default && in_quotes_entity {
                    self.written.push(cp);
                }
                self.push(if is_whitespace(cp) { SPACE } else { cp }, false);
                Control::Continue
            }
        }
    }
}

/// Literal replacement text of an entity declaration, resumed at the
/// opening quote
pub struct EntityValue {
    delimiter: Option<Delimiter>,
    chars: Vec<Codepoint>,
}

impl EntityValue {
    pub fn new() -> Self {
        EntityValue { delimiter: None, chars: Vec::new() }
    }
}

impl Production for EntityValue {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let cp = match input {
            Input::Char(cp) => cp,
            Input::Returned(Product::Text(text)) => {
                self.chars.extend(text);
                return Control::Continue;
            }
            Input::Returned(_) | Input::Reply(_) => return Control::Continue,
        };

        let Some(delimiter) = &self.delimiter else {
            if !is_quote(cp) {
                return Control::fail("a quoted entity value");
            }
            self.delimiter = Some(Delimiter { quote: cp, token: cx.boundary() });
            cx.suppress_chaos();
            return Control::Continue;
        };

        if delimiter.closes(cp, cx) {
            cx.unsuppress_chaos();
            return Control::Done(Product::Text(std::mem::take(&mut self.chars)), None);
        }
        match cp {
            EOF => Control::fail("the closing quote of the entity value"),
            PERCENT if cx.chaos_active() => Control::call(PeReference::new(false, cx.boundary())),
            PERCENT => Control::fail("no parameter entity reference inside a declaration of the internal subset"),
            AMP => Control::call(Reference::new(RefMode::EntityValue, cx.boundary())),
            _ => {
                self.chars.push(cp);
                Control::Continue
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiteralKind {
    Public,
    System,
}

enum IdState {
    Keyword(OneOf),
    Gap { run: Space, next: LiteralKind },
    Literal { quote: Codepoint, kind: LiteralKind },
    AfterPublic(Space),
}

const ID_KEYWORDS: &[&str] = &["SYSTEM", "PUBLIC"];

/// `SYSTEM "..."` or `PUBLIC "..." "..."`, resumed at the keyword
pub struct ExternalIdentifier {
    system_required: bool,
    state: IdState,
    public_id: Option<String>,
    buf: Vec<Codepoint>,
}

impl ExternalIdentifier {
    /// Notation declarations pass `false`: their public form may omit the
    /// system literal
    pub fn new(system_required: bool) -> Self {
        ExternalIdentifier {
            system_required,
            state: IdState::Keyword(one_of(ID_KEYWORDS)),
            public_id: None,
            buf: Vec::new(),
        }
    }

    fn open(&mut self, quote: Codepoint, kind: LiteralKind, cx: &mut Context<'_>) -> Control {
        cx.suppress_chaos();
        self.state = IdState::Literal { quote, kind };
        Control::Continue
    }

    fn product(&mut self, system_id: Option<String>) -> Product {
        Product::ExternalId(ExternalId { public_id: self.public_id.take(), system_id })
    }
}

impl Production for ExternalIdentifier {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let Input::Char(cp) = input else {
            return Control::Continue;
        };
        match &mut self.state {
            IdState::Keyword(keyword) => match keyword.advance(cp) {
                Step::Pending => Control::Continue,
                Step::Matched => {
                    let next = match keyword.matched() {
                        Some("PUBLIC") => LiteralKind::Public,
                        _ => LiteralKind::System,
                    };
                    self.state = IdState::Gap { run: space(), next };
                    Control::Continue
                }
                Step::Failed(expectation) => Control::fail(expectation),
                Step::Overran(_) => Control::fail("\"SYSTEM\" or \"PUBLIC\""),
            },
            IdState::Gap { run, next } => {
                let next = *next;
                match run.advance(cp) {
                    Step::Pending => Control::Continue,
                    Step::Overran(quote) if is_quote(quote) => self.open(quote, next, cx),
                    Step::Failed(expectation) => Control::fail(expectation),
                    _ => Control::fail("a quoted literal"),
                }
            }
            IdState::Literal { quote, kind } => {
                let kind = *kind;
                if cp == *quote {
                    cx.unsuppress_chaos();
                    let literal = to_string(&std::mem::take(&mut self.buf));
                    return match kind {
                        LiteralKind::Public => {
                            self.public_id = Some(literal);
                            self.state = IdState::AfterPublic(space());
                            Control::Continue
                        }
                        LiteralKind::System => Control::Done(self.product(Some(literal)), None),
                    };
                }
                if cp == EOF {
                    return Control::fail("the closing quote of the literal");
                }
                if kind == LiteralKind::Public && !is_pubid_char(cp) {
                    return Control::fail("a public identifier character");
                }
                self.buf.push(cp);
                Control::Continue
            }
            IdState::AfterPublic(run) => match run.advance(cp) {
                Step::Pending => Control::Continue,
                Step::Overran(quote) if is_quote(quote) => self.open(quote, LiteralKind::System, cx),
                _ if !self.system_required => Control::Done(self.product(None), Some(cp)),
                Step::Failed(expectation) => Control::fail(expectation),
                _ => Control::fail("a system literal"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{failure, parse_str};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_attribute_whitespace_folds() {
        let doc = parse_str("<a x=\"1\t2\n3\"/>").unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.get_attribute(root, "x"), Some("1 2 3"));
    }

    #[test]
    fn test_character_reference_whitespace_survives() {
        let doc = parse_str("<a x=\"1&#10;2\"/>").unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.get_attribute(root, "x"), Some("1\n2"));
    }

    #[test]
    fn test_lt_in_attribute() {
        let msg = failure("<a x=\"<\"/>");
        assert!(msg.contains("instead of \"<\""), "{}", msg);
    }

    #[test]
    fn test_quote_from_entity_is_data() {
        let doc = parse_str("<!DOCTYPE a [<!ENTITY q '\"'>]><a x=\"say &q;hi&q;\"/>").unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.get_attribute(root, "x"), Some("say \"hi\""));
    }

    #[test]
    fn test_entity_value_bypasses_general_references() {
        let doc = parse_str(
            "<!DOCTYPE a [<!ENTITY b \"B\"><!ENTITY e \"[&b;&#65;]\">]><a>&e;</a>",
        )
        .unwrap();
        assert_eq!(doc.text(doc.root_element_id().unwrap()), "[BA]");
        let e = doc.dtd.entity("e").and_then(|d| d.value.clone()).unwrap();
        assert_eq!(crate::core::chars::to_string(&e), "[&b;A]");
    }

    #[test]
    fn test_parameter_reference_inside_internal_declaration() {
        let msg = failure("<!DOCTYPE a [<!ENTITY % p \"x\"><!ENTITY e \"%p;\">]><a/>");
        assert!(msg.contains("no parameter entity reference"), "{}", msg);
    }

    #[test]
    fn test_public_identifier() {
        let doc = parse_str("<!DOCTYPE a [<!NOTATION n PUBLIC \"-//A//B\">]><a/>").unwrap();
        let notation = &doc.dtd.notations["n"];
        assert_eq!(notation.external.public_id.as_deref(), Some("-//A//B"));
        assert_eq!(notation.external.system_id, None);
    }

    #[test]
    fn test_public_identifier_characters() {
        let msg = failure("<!DOCTYPE a [<!NOTATION n PUBLIC \"a{b\">]><a/>");
        assert!(msg.contains("a public identifier character"), "{}", msg);
    }
}
