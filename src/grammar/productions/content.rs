//! Elements, attributes and character content

use super::literal::{AttValue, ValueMode};
use super::misc::{Cdata, Comment, DeclPosition, Pi};
use super::reference::{RefMode, Reference};
use super::{AMP, BANG, DASH, EQ, GT, LBRACKET, LT, QMARK, RBRACKET, SLASH};
use crate::core::chars::{codepoints, is_name_start, is_quote, to_string, Codepoint, EOF};
use crate::core::dtd::{AttDefault, AttType};
use crate::core::entities::quote_literal;
use crate::grammar::advance::{
    one, optional_space, series, space, Advancer, Class, NameAdvancer, One, OptionalSpace, Series, Space, Step,
};
use crate::grammar::context::Context;
use crate::grammar::control::{Control, Input, Product, Production};
use crate::grammar::expansion::BoundaryToken;
use crate::options::CharRefSpaces;

enum ContentState {
    Data,
    Lt(BoundaryToken),
    Bang(BoundaryToken),
}

/// Character data and markup up to an end tag (or end of input for an
/// external parsed entity)
pub struct Content {
    top_level: bool,
    state: ContentState,
    text: Vec<Codepoint>,
    /// Consecutive `]` at the end of `text`
    brackets: usize,
}

impl Content {
    pub fn new(top_level: bool) -> Self {
        Content { top_level, state: ContentState::Data, text: Vec::new(), brackets: 0 }
    }

    fn flush(&mut self, cx: &mut Context<'_>) {
        if !self.text.is_empty() {
            cx.builder().text(&to_string(&self.text));
            self.text.clear();
        }
        self.brackets = 0;
    }

    fn data(&mut self, cp: Codepoint, cx: &mut Context<'_>) -> Control {
        match cp {
            LT => {
                self.flush(cx);
                self.state = ContentState::Lt(cx.boundary());
                Control::Continue
            }
            AMP => {
                self.brackets = 0;
                Control::call(Reference::new(RefMode::Content, cx.boundary()))
            }
            EOF if self.top_level => {
                self.flush(cx);
                Control::done()
            }
            EOF => Control::fail("\"</\" to close the open element"),
            GT if self.brackets >= 2 => Control::fail("character data without \"]]>\""),
            _ => {
                self.brackets = if cp == RBRACKET { self.brackets + 1 } else { 0 };
                self.text.push(cp);
                Control::Continue
            }
        }
    }
}

impl Production for Content {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let cp = match input {
            Input::Char(cp) => cp,
            Input::Returned(Product::Text(text)) => {
                self.text.extend(text);
                self.brackets = 0;
                return Control::Continue;
            }
            Input::Returned(_) | Input::Reply(_) => return Control::Continue,
        };
        match std::mem::replace(&mut self.state, ContentState::Data) {
            ContentState::Data => self.data(cp, cx),
            ContentState::Lt(_) if cp == SLASH && self.top_level => {
                Control::fail("content other than an end tag (no element is open)")
            }
            ContentState::Lt(token) if cp == SLASH => Control::Done(Product::EndTag(token), None),
            ContentState::Lt(token) if cp == QMARK => Control::call(Pi::new(token, true, DeclPosition::None)),
            ContentState::Lt(token) if cp == BANG => {
                self.state = ContentState::Bang(token);
                Control::Continue
            }
            ContentState::Lt(token) if is_name_start(cp) => Control::call_with(Element::new(token), cp),
            ContentState::Lt(_) => Control::fail("a name, \"/\", \"?\" or \"!\""),
            ContentState::Bang(token) if cp == DASH => Control::call(Comment::new(token, true)),
            ContentState::Bang(token) if cp == LBRACKET => Control::call(Cdata::new(token)),
            ContentState::Bang(_) => Control::fail("\"--\" or \"[CDATA[\""),
        }
    }
}

enum ElementState {
    Name(NameAdvancer),
    Attributes(Space),
    EmptyClose(One<Class>),
    Content,
    EndName(Series),
    EndSpace(OptionalSpace),
}

/// Start tag, content and end tag, resumed at the first name character
pub struct Element {
    token: BoundaryToken,
    /// Taken at the `<` of the end tag
    end_token: Option<BoundaryToken>,
    state: ElementState,
    name: String,
    attributes: Vec<(String, String)>,
    defaults_injected: bool,
}

impl Element {
    pub fn new(token: BoundaryToken) -> Self {
        Element {
            token,
            end_token: None,
            state: ElementState::Name(NameAdvancer::name()),
            name: String::new(),
            attributes: Vec::new(),
            defaults_injected: false,
        }
    }

    /// Text for declared defaults missing from the start tag
    fn defaults(&self, cx: &Context<'_>) -> Option<Vec<Codepoint>> {
        let mut text = String::new();
        for def in cx.dtd().attributes_for(&self.name) {
            let Some(raw) = def.default.literal() else {
                continue;
            };
            if self.attributes.iter().any(|(name, _)| *name == def.name) {
                continue;
            }
            text.push(' ');
            text.push_str(&def.name);
            text.push('=');
            text.push_str(&quote_literal(raw));
        }
        (!text.is_empty()).then(|| codepoints(&text))
    }

    fn check(&mut self, cx: &mut Context<'_>) -> Result<(), crate::error::Error> {
        cx.check_boundary(&mut self.token, &format!("element \"{}\"", self.name))
    }

    fn close_start_tag(&mut self, cp: Codepoint, cx: &mut Context<'_>) -> Control {
        if !self.defaults_injected {
            self.defaults_injected = true;
            if let Some(mut text) = self.defaults(cx) {
                text.push(cp);
                return Control::Inject(text);
            }
        }
        if cp == SLASH {
            self.state = ElementState::EmptyClose(one((|cp: Codepoint| cp == GT) as Class, "the > of />"));
            return Control::Continue;
        }
        if let Err(err) = self.check(cx) {
            return Control::Abort(err);
        }
        cx.builder().start_element(&self.name, &self.attributes);
        self.state = ElementState::Content;
        Control::call(Content::new(false))
    }

    fn close_end_tag(&mut self, cx: &mut Context<'_>) -> Control {
        if let Some(token) = &mut self.end_token {
            if let Err(err) = cx.check_boundary(token, "end tag") {
                return Control::Abort(err);
            }
        }
        if let Err(err) = self.check(cx) {
            return Control::Abort(err);
        }
        cx.builder().end_element();
        Control::done()
    }
}

impl Production for Element {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let cp = match input {
            Input::Char(cp) => cp,
            Input::Returned(Product::Attribute { name, value }) => {
                if self.attributes.iter().any(|(existing, _)| *existing == name) {
                    return Control::fail(format!("attribute \"{}\" to appear only once", name));
                }
                self.attributes.push((name, value));
                return Control::Continue;
            }
            Input::Returned(Product::EndTag(token)) => {
                self.end_token = Some(token);
                self.state = ElementState::EndName(series(&self.name));
                return Control::Continue;
            }
            Input::Returned(_) | Input::Reply(_) => return Control::Continue,
        };
        match &mut self.state {
            ElementState::Name(name) => match name.advance(cp) {
                Step::Overran(next) => {
                    self.name = name.take();
                    self.state = ElementState::Attributes(space());
                    Control::Holdover(next)
                }
                Step::Failed(expectation) => Control::fail(expectation),
                _ => Control::Continue,
            },
            ElementState::Attributes(run) => match run.advance(cp) {
                Step::Pending => Control::Continue,
                _ if cp == GT || cp == SLASH => self.close_start_tag(cp, cx),
                Step::Overran(_) if is_name_start(cp) => {
                    self.state = ElementState::Attributes(space());
                    Control::call_with(Attribute::new(self.name.clone()), cp)
                }
                _ if is_name_start(cp) => Control::fail("whitespace before the attribute"),
                _ => Control::fail("an attribute, \">\" or \"/>\""),
            },
            ElementState::EmptyClose(close) => match close.advance(cp) {
                Step::Failed(expectation) => Control::fail(expectation),
                _ => {
                    if let Err(err) = self.check(cx) {
                        return Control::Abort(err);
                    }
                    let builder = cx.builder();
                    builder.start_element(&self.name, &self.attributes);
                    builder.end_element();
                    Control::done()
                }
            },
            ElementState::Content => Control::fail("the element content"),
            ElementState::EndName(end) => match end.advance(cp) {
                Step::Pending => Control::Continue,
                Step::Matched => {
                    self.state = ElementState::EndSpace(optional_space());
                    Control::Continue
                }
                _ => Control::fail(format!("the end tag \"</{}>\"", self.name)),
            },
            ElementState::EndSpace(run) => match run.advance(cp) {
                Step::Pending => Control::Continue,
                Step::Overran(GT) => self.close_end_tag(cx),
                _ => Control::fail(format!("\">\" to close the end tag \"</{}>\"", self.name)),
            },
        }
    }
}

enum AttributeState {
    Name(NameAdvancer),
    BeforeEq(OptionalSpace),
    AfterEq(OptionalSpace),
    Value,
}

/// `name="value"` inside a start tag, resumed at the first name character
pub struct Attribute {
    element: String,
    state: AttributeState,
    name: String,
}

impl Attribute {
    pub fn new(element: String) -> Self {
        Attribute { element, state: AttributeState::Name(NameAdvancer::name()), name: String::new() }
    }

    /// Type normalization and the declared-value checks
    fn finish(&mut self, chars: Vec<Codepoint>, literal: Vec<bool>, cx: &Context<'_>) -> Control {
        let name = std::mem::take(&mut self.name);
        let Some(def) = cx.dtd().attribute(&self.element, &name) else {
            return Control::Done(Product::Attribute { name, value: to_string(&chars) }, None);
        };
        let keep_literal = cx.options().char_ref_spaces == CharRefSpaces::Literal;
        let value = def.att_type.normalize(&chars, &literal, keep_literal);
        if let AttDefault::Fixed { value: fixed, .. } = &def.default {
            if *fixed != value {
                return Control::fail(format!("attribute \"{}\" to have the fixed value \"{}\"", name, fixed));
            }
        }
        if matches!(def.att_type, AttType::Entity | AttType::Entities) {
            for token in value.split(' ') {
                if !cx.dtd().entity(token).is_some_and(|decl| decl.is_unparsed()) {
                    return Control::fail(format!("entity \"{}\" to be a declared unparsed entity", token));
                }
            }
        }
        Control::Done(Product::Attribute { name, value }, None)
    }
}

impl Production for Attribute {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let cp = match input {
            Input::Char(cp) => cp,
            Input::Returned(Product::Value { chars, literal }) => return self.finish(chars, literal, cx),
            Input::Returned(_) | Input::Reply(_) => return Control::Continue,
        };
        match &mut self.state {
            AttributeState::Name(name) => match name.advance(cp) {
                Step::Overran(next) => {
                    self.name = name.take();
                    self.state = AttributeState::BeforeEq(optional_space());
                    Control::Holdover(next)
                }
                Step::Failed(expectation) => Control::fail(expectation),
                _ => Control::Continue,
            },
            AttributeState::BeforeEq(run) => match run.advance(cp) {
                Step::Pending => Control::Continue,
                Step::Overran(EQ) => {
                    self.state = AttributeState::AfterEq(optional_space());
                    Control::Continue
                }
                _ => Control::fail("\"=\""),
            },
            AttributeState::AfterEq(run) => match run.advance(cp) {
                Step::Pending => Control::Continue,
                Step::Overran(quote) if is_quote(quote) => {
                    self.state = AttributeState::Value;
                    Control::call_with(AttValue::new(ValueMode::Normal), quote)
                }
                _ => Control::fail("a quoted attribute value"),
            },
            AttributeState::Value => Control::fail("the attribute value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{failure, parse_str};
    use crate::options::{CharRefSpaces, ParseOptions};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nested_elements() {
        let doc = parse_str("<a><b x='1'>t</b><c/></a>").unwrap();
        let root = doc.root_element_id().unwrap();
        let names: Vec<_> = doc.children(root).filter_map(|id| doc.node_name(id)).collect();
        assert_eq!(names, vec!["b", "c"]);
        let b = doc.children(root).next().unwrap();
        assert_eq!(doc.get_attribute(b, "x"), Some("1"));
        assert_eq!(doc.text(b), "t");
    }

    #[test]
    fn test_mismatched_end_tag() {
        let msg = failure("<a><b></a>");
        assert!(msg.contains("the end tag \"</b>\""), "{}", msg);
    }

    #[test]
    fn test_duplicate_attribute() {
        let msg = failure("<a x='1' x='2'/>");
        assert!(msg.contains("attribute \"x\" to appear only once"), "{}", msg);
    }

    #[test]
    fn test_cdata_terminator_in_text() {
        let msg = failure("<a>x]]>y</a>");
        assert!(msg.contains("without \"]]>\""), "{}", msg);
    }

    #[test]
    fn test_unclosed_element() {
        let msg = failure("<a>text");
        assert!(msg.contains("end of input"), "{}", msg);
    }

    #[test]
    fn test_default_attributes_injected() {
        let doc = parse_str(
            "<!DOCTYPE a [<!ENTITY v \"val\"><!ATTLIST a d CDATA \"&v;!\" f CDATA #FIXED 'x' i CDATA #IMPLIED>]><a/>",
        )
        .unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.get_attribute_values(root), vec![("d", "val!"), ("f", "x")]);
    }

    #[test]
    fn test_given_attribute_suppresses_default() {
        let doc = parse_str("<!DOCTYPE a [<!ATTLIST a d CDATA 'dflt'>]><a d='mine'>x</a>").unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.get_attribute_values(root), vec![("d", "mine")]);
    }

    #[test]
    fn test_fixed_value_mismatch() {
        let msg = failure("<!DOCTYPE a [<!ATTLIST a f CDATA #FIXED 'x'>]><a f='y'/>");
        assert!(msg.contains("fixed value \"x\""), "{}", msg);
    }

    #[test]
    fn test_token_normalization() {
        let doc = parse_str("<!DOCTYPE a [<!ATTLIST a t NMTOKENS #IMPLIED>]><a t='  x   y '/>").unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.get_attribute(root, "t"), Some("x y"));
    }

    #[test]
    fn test_char_ref_space_policy() {
        let input = "<!DOCTYPE a [<!ATTLIST a t NMTOKENS #IMPLIED>]><a t='x&#32;&#32;y'/>";
        let folded = parse_str(input).unwrap();
        let root = folded.root_element_id().unwrap();
        assert_eq!(folded.get_attribute(root, "t"), Some("x y"));

        let options = ParseOptions::default().char_ref_spaces(CharRefSpaces::Literal);
        let literal = crate::parse(input, &options).unwrap();
        let root = literal.root_element_id().unwrap();
        assert_eq!(literal.get_attribute(root, "t"), Some("x  y"));
    }

    #[test]
    fn test_entity_attribute_must_be_unparsed() {
        let dtd = "<!NOTATION n SYSTEM 'n'><!ENTITY pic SYSTEM 'p.gif' NDATA n><!ATTLIST a src ENTITY #IMPLIED>";
        assert!(parse_str(&format!("<!DOCTYPE a [{}]><a src='pic'/>", dtd)).is_ok());
        let msg = failure(&format!("<!DOCTYPE a [{}]><a src='other'/>", dtd));
        assert!(msg.contains("entity \"other\" to be a declared unparsed entity"), "{}", msg);
    }

    #[test]
    fn test_end_tag_boundary() {
        let msg = failure("<!DOCTYPE a [<!ENTITY e \"</\">]><a>&e;a>");
        assert!(msg.contains("end tag started in entity \"e\" but ended in the document entity"), "{}", msg);
        assert!(parse_str("<!DOCTYPE a [<!ENTITY e \"</a>\">]><a>&e;").is_err());
    }

    #[test]
    fn test_fixed_default_with_reference() {
        let dtd = "<!ENTITY v \"x\"><!ATTLIST a f CDATA #FIXED \"&v;\">";
        let msg = failure(&format!("<!DOCTYPE a [{}]><a f='y'/>", dtd));
        assert!(msg.contains("attribute \"f\" to have the fixed value \"x\""), "{}", msg);

        let doc = parse_str(&format!("<!DOCTYPE a [{}]><a f='x'/>", dtd)).unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.get_attribute(root, "f"), Some("x"));
    }

    #[test]
    fn test_fixed_tokens_compare_normalized() {
        let dtd = "<!ATTLIST a t NMTOKENS #FIXED ' r1&#32; r2 '>";
        assert!(parse_str(&format!("<!DOCTYPE a [{}]><a t='r1  r2'/>", dtd)).is_ok());
        let msg = failure(&format!("<!DOCTYPE a [{}]><a t='r1 r3'/>", dtd));
        assert!(msg.contains("fixed value \"r1 r2\""), "{}", msg);
    }

    #[test]
    fn test_element_must_end_in_its_entity() {
        let msg = failure("<!DOCTYPE a [<!ENTITY open \"<b>\">]><a>&open;</b></a>");
        assert!(msg.contains("element \"b\" started in entity \"open\""), "{}", msg);
    }
}
