//! Comments, processing instructions, XML/text declarations and CDATA

use super::{DASH, EQ, GT, QMARK, RBRACKET};
use crate::core::chars::{
    is_decimal_digit, is_enc_name_char, is_enc_name_start, is_name_start, is_quote, is_whitespace, to_string,
    Codepoint, EOF,
};
use crate::dom::XmlDeclaration;
use crate::grammar::advance::{optional_space, series, space, Advancer, NameAdvancer, OptionalSpace, Series, Space, Step};
use crate::grammar::context::Context;
use crate::grammar::control::{Control, Input, Production, Reply, Signal};
use crate::grammar::expansion::BoundaryToken;

/// `<!--...-->`, resumed after `<!-`
pub struct Comment {
    token: BoundaryToken,
    emit: bool,
    opened: bool,
    suppressed: bool,
    dashes: u8,
    text: Vec<Codepoint>,
}

impl Comment {
    pub fn new(token: BoundaryToken, emit: bool) -> Self {
        Comment {
            token,
            emit,
            opened: false,
            suppressed: false,
            dashes: 0,
            text: Vec::new(),
        }
    }

    fn finish(&mut self, cx: &mut Context<'_>) -> Control {
        cx.unsuppress_chaos();
        if let Err(err) = cx.check_boundary(&mut self.token, "comment") {
            return Control::Abort(err);
        }
        if self.emit {
            cx.builder().comment(&to_string(&self.text));
        }
        Control::done()
    }
}

impl Production for Comment {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let Input::Char(cp) = input else {
            return Control::Continue;
        };
        if !self.suppressed {
            cx.suppress_chaos();
            self.suppressed = true;
        }
        if !self.opened {
            if cp != DASH {
                return Control::fail("\"<!--\"");
            }
            self.opened = true;
            return Control::Continue;
        }
        if cp == EOF {
            return Control::fail("\"-->\" to end the comment");
        }
        match (self.dashes, cp) {
            (2, GT) => self.finish(cx),
            (2, _) => Control::fail("\">\" (comments may not contain \"--\")"),
            (_, DASH) => {
                self.dashes += 1;
                Control::Continue
            }
            (1, _) => {
                self.dashes = 0;
                self.text.extend([DASH, cp]);
                Control::Continue
            }
            _ => {
                self.text.push(cp);
                Control::Continue
            }
        }
    }
}

/// Whether an `xml` target is a declaration here
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclPosition {
    None,
    /// Very start of a document entity
    Xml,
}

enum PiState {
    Target(NameAdvancer),
    Space,
    Data,
    Question,
    Declaration,
}

/// `<?target data?>`, resumed after `<?`
pub struct Pi {
    token: BoundaryToken,
    emit: bool,
    position: DeclPosition,
    suppressed: bool,
    state: PiState,
    target: String,
    data: Vec<Codepoint>,
}

impl Pi {
    pub fn new(token: BoundaryToken, emit: bool, position: DeclPosition) -> Self {
        Pi {
            token,
            emit,
            position,
            suppressed: false,
            state: PiState::Target(NameAdvancer::name()),
            target: String::new(),
            data: Vec::new(),
        }
    }

    fn finish(&mut self, cx: &mut Context<'_>) -> Control {
        cx.unsuppress_chaos();
        if let Err(err) = cx.check_boundary(&mut self.token, "processing instruction") {
            return Control::Abort(err);
        }
        if self.emit && !matches!(self.state, PiState::Declaration) {
            cx.builder().processing_instruction(&self.target, &to_string(&self.data));
        }
        Control::done()
    }

    fn after_target(&mut self, cp: Codepoint) -> Control {
        if self.target.eq_ignore_ascii_case("xml") {
            if self.target == "xml" && self.position == DeclPosition::Xml {
                self.state = PiState::Declaration;
                return Control::call_with(XmlDecl::new(false), cp);
            }
            return Control::fail("a processing instruction target other than \"xml\"");
        }
        if is_whitespace(cp) {
            self.state = PiState::Space;
            Control::Continue
        } else if cp == QMARK {
            self.state = PiState::Question;
            Control::Continue
        } else {
            Control::fail("whitespace or \"?>\"")
        }
    }
}

impl Production for Pi {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let cp = match input {
            Input::Char(cp) => cp,
            Input::Returned(_) => return self.finish(cx),
            Input::Reply(_) => return Control::Continue,
        };
        if !self.suppressed {
            cx.suppress_chaos();
            self.suppressed = true;
        }
        if cp == EOF {
            return Control::fail("\"?>\" to end the processing instruction");
        }
        match &mut self.state {
            PiState::Target(name) => match name.advance(cp) {
                Step::Pending => Control::Continue,
                Step::Overran(next) => {
                    self.target = name.take();
                    self.after_target(next)
                }
                Step::Failed(expectation) => Control::fail(expectation),
                Step::Matched => Control::Continue,
            },
            PiState::Space if is_whitespace(cp) => Control::Continue,
            PiState::Space => {
                self.state = PiState::Data;
                Control::Holdover(cp)
            }
            PiState::Data if cp == QMARK => {
                self.state = PiState::Question;
                Control::Continue
            }
            PiState::Data => {
                self.data.push(cp);
                Control::Continue
            }
            PiState::Question if cp == GT => self.finish(cx),
            PiState::Question if cp == QMARK => {
                self.data.push(QMARK);
                Control::Continue
            }
            PiState::Question => {
                self.data.extend([QMARK, cp]);
                self.state = PiState::Data;
                Control::Continue
            }
            PiState::Declaration => Control::fail("the end of the XML declaration"),
        }
    }
}

enum DeclState {
    Space(Space),
    Name(NameAdvancer),
    BeforeEq(OptionalSpace),
    AfterEq(OptionalSpace),
    Value { quote: Codepoint },
    Close,
    Declaring,
}

/// Pseudo-attributes of `<?xml ...?>`, resumed at the whitespace after
/// the target
pub struct XmlDecl {
    text: bool,
    /// Pseudo-attributes already read: 0 none, 1 version, 2 encoding, 3 standalone
    stage: u8,
    state: DeclState,
    current: String,
    value: Vec<Codepoint>,
    decl: XmlDeclaration,
}

impl XmlDecl {
    /// `text` selects the text declaration of external entities
    pub fn new(text: bool) -> Self {
        XmlDecl {
            text,
            stage: 0,
            state: DeclState::Space(space()),
            current: String::new(),
            value: Vec::new(),
            decl: XmlDeclaration::default(),
        }
    }

    fn allowed(&self) -> &'static [&'static str] {
        match (self.text, self.stage) {
            (false, 0) => &["version"],
            (false, 1) => &["encoding", "standalone"],
            (false, 2) => &["standalone"],
            (true, 0) => &["version", "encoding"],
            (true, 1) => &["encoding"],
            _ => &[],
        }
    }

    fn expectation(&self) -> String {
        let mut options: Vec<String> = self.allowed().iter().map(|name| format!("\"{}\"", name)).collect();
        if self.ready_to_close() {
            options.push("\"?>\"".to_string());
        }
        match options.split_last() {
            Some((last, rest)) if !rest.is_empty() => format!("{} or {}", rest.join(", "), last),
            Some((last, _)) => last.clone(),
            None => "\"?>\"".to_string(),
        }
    }

    fn ready_to_close(&self) -> bool {
        if self.text {
            self.decl.encoding.is_some()
        } else {
            self.stage >= 1
        }
    }

    fn accept_name(&mut self, name: String) -> Result<(), String> {
        if !self.allowed().contains(&name.as_str()) {
            return Err(self.expectation());
        }
        self.stage = match name.as_str() {
            "version" => 1,
            "encoding" => 2,
            _ => 3,
        };
        self.current = name;
        Ok(())
    }

    fn accept_value(&mut self) -> Result<(), &'static str> {
        let value = to_string(&self.value);
        self.value.clear();
        match self.current.as_str() {
            "version" => {
                let valid = value
                    .strip_prefix("1.")
                    .is_some_and(|minor| !minor.is_empty() && minor.chars().all(|c| is_decimal_digit(c as u32)));
                if !valid {
                    return Err("a version number such as \"1.0\"");
                }
                self.decl.version = Some(value);
            }
            "encoding" => {
                let mut chars = value.chars().map(|c| c as Codepoint);
                let valid = chars.next().is_some_and(is_enc_name_start) && chars.all(is_enc_name_char);
                if !valid {
                    return Err("an encoding name");
                }
                self.decl.encoding = Some(value);
            }
            _ => {
                self.decl.standalone = Some(match value.as_str() {
                    "yes" => true,
                    "no" => false,
                    _ => return Err("\"yes\" or \"no\""),
                });
            }
        }
        Ok(())
    }

    fn finish(&mut self, cx: &mut Context<'_>) -> Control {
        if !self.ready_to_close() {
            return Control::fail(self.expectation());
        }
        if !self.text {
            cx.builder().set_declaration(self.decl.clone());
        }
        match self.decl.encoding.clone() {
            Some(label) => {
                self.state = DeclState::Declaring;
                Control::Signal(Signal::DeclareEncoding(label))
            }
            None => Control::done(),
        }
    }
}

impl Production for XmlDecl {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let cp = match input {
            Input::Char(cp) => cp,
            Input::Reply(Reply::Acknowledged) => return Control::done(),
            Input::Reply(_) | Input::Returned(_) => return Control::Continue,
        };
        match &mut self.state {
            DeclState::Space(run) => match run.advance(cp) {
                Step::Pending => Control::Continue,
                _ if cp == QMARK => {
                    self.state = DeclState::Close;
                    Control::Continue
                }
                Step::Overran(_) if is_name_start(cp) => {
                    self.state = DeclState::Name(NameAdvancer::name());
                    Control::Holdover(cp)
                }
                Step::Failed(expectation) => Control::fail(expectation),
                _ => Control::fail(self.expectation()),
            },
            DeclState::Name(name) => match name.advance(cp) {
                Step::Overran(next) => {
                    let name = name.take();
                    match self.accept_name(name) {
                        Ok(()) => {
                            self.state = DeclState::BeforeEq(optional_space());
                            Control::Holdover(next)
                        }
                        Err(expectation) => Control::fail(expectation),
                    }
                }
                Step::Failed(expectation) => Control::fail(expectation),
                _ => Control::Continue,
            },
            DeclState::BeforeEq(run) => match run.advance(cp) {
                Step::Pending => Control::Continue,
                Step::Overran(EQ) => {
                    self.state = DeclState::AfterEq(optional_space());
                    Control::Continue
                }
                _ => Control::fail("\"=\""),
            },
            DeclState::AfterEq(run) => match run.advance(cp) {
                Step::Pending => Control::Continue,
                Step::Overran(quote) if is_quote(quote) => {
                    self.state = DeclState::Value { quote };
                    Control::Continue
                }
                _ => Control::fail("a quoted value"),
            },
            DeclState::Value { quote } => {
                if cp == *quote {
                    match self.accept_value() {
                        Ok(()) => {
                            self.state = DeclState::Space(space());
                            Control::Continue
                        }
                        Err(expectation) => Control::fail(expectation),
                    }
                } else if cp == EOF {
                    Control::fail("the closing quote of the pseudo-attribute")
                } else {
                    self.value.push(cp);
                    Control::Continue
                }
            }
            DeclState::Close if cp == GT => self.finish(cx),
            DeclState::Close => Control::fail("the > of ?>"),
            DeclState::Declaring => Control::fail("nothing after the declaration"),
        }
    }
}

/// `<![CDATA[...]]>`, resumed after `<![`
pub struct Cdata {
    token: BoundaryToken,
    keyword: Series,
    opened: bool,
    text: Vec<Codepoint>,
}

impl Cdata {
    pub fn new(token: BoundaryToken) -> Self {
        Cdata { token, keyword: series("CDATA["), opened: false, text: Vec::new() }
    }
}

impl Production for Cdata {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let Input::Char(cp) = input else {
            return Control::Continue;
        };
        if !self.opened {
            return match self.keyword.advance(cp) {
                Step::Matched => {
                    self.opened = true;
                    Control::Continue
                }
                Step::Failed(expectation) => Control::fail(expectation),
                _ => Control::Continue,
            };
        }
        if cp == EOF {
            return Control::fail("\"]]>\" to end the CDATA section");
        }
        if cp == GT && self.text.ends_with(&[RBRACKET, RBRACKET]) {
            self.text.truncate(self.text.len() - 2);
            if let Err(err) = cx.check_boundary(&mut self.token, "CDATA section") {
                return Control::Abort(err);
            }
            cx.builder().cdata(&to_string(&self.text));
            return Control::done();
        }
        self.text.push(cp);
        Control::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{failure, parse_str};
    use crate::dom::{NodeKind, XmlDeclaration};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_comment_and_pi() {
        let doc = parse_str("<!-- hi --><?go fast?><a><?x?></a>").unwrap();
        let kinds: Vec<_> = doc
            .children(doc.document_id())
            .filter_map(|id| doc.get_node(id).map(|n| n.kind()))
            .collect();
        assert_eq!(kinds, vec![NodeKind::Comment, NodeKind::ProcessingInstruction, NodeKind::Element]);
        let comment = doc.children(doc.document_id()).next().unwrap();
        assert_eq!(doc.text_content(comment), Some(" hi "));
    }

    #[test]
    fn test_double_dash_in_comment() {
        let msg = failure("<a><!-- a -- b --></a>");
        assert!(msg.contains("may not contain \"--\""), "{}", msg);
    }

    #[test]
    fn test_xml_declaration() {
        let doc = parse_str("<?xml version=\"1.0\" encoding='UTF-8' standalone=\"yes\"?><a/>").unwrap();
        assert_eq!(
            doc.declaration,
            Some(XmlDeclaration {
                version: Some("1.0".into()),
                encoding: Some("UTF-8".into()),
                standalone: Some(true),
            })
        );
    }

    #[test]
    fn test_declaration_order() {
        let msg = failure("<?xml encoding=\"UTF-8\"?><a/>");
        assert!(msg.contains("Expected \"version\""), "{}", msg);
        let msg = failure("<?xml version=\"1.0\" standalone=\"yes\" encoding=\"UTF-8\"?><a/>");
        assert!(msg.contains("Expected \"?>\""), "{}", msg);
    }

    #[test]
    fn test_bad_version() {
        let msg = failure("<?xml version=\"2.0\"?><a/>");
        assert!(msg.contains("a version number"), "{}", msg);
    }

    #[test]
    fn test_reserved_target() {
        let msg = failure("<a/><?xml version=\"1.0\"?>");
        assert!(msg.contains("other than \"xml\""), "{}", msg);
        let msg = failure("<?XML version=\"1.0\"?><a/>");
        assert!(msg.contains("other than \"xml\""), "{}", msg);
    }

    #[test]
    fn test_cdata() {
        let doc = parse_str("<a><![CDATA[<x>]]]]></a>").unwrap();
        let root = doc.root_element_id().unwrap();
        let child = doc.children(root).next().unwrap();
        assert_eq!(doc.get_node(child).map(|n| n.kind()), Some(NodeKind::CData));
        assert_eq!(doc.text_content(child), Some("<x>]]"));
    }

    #[test]
    fn test_cdata_keyword() {
        let msg = failure("<a><![CDAT[x]]></a>");
        assert!(msg.contains("the second A of CDATA["), "{}", msg);
    }
}
