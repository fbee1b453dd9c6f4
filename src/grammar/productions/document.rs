//! Root productions: the document entity and the external resources

use super::content::{Content, Element};
use super::misc::{Comment, DeclPosition, Pi, XmlDecl};
use super::subset::{Doctype, Subset, SubsetMode};
use super::{BANG, DASH, LT, QMARK};
use crate::core::chars::{codepoints, is_name_start, is_whitespace, Codepoint, EOF};
use crate::grammar::context::Context;
use crate::grammar::control::{Control, Input, Product, Production};
use crate::grammar::expansion::BoundaryToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Nothing read yet; an XML declaration is still possible
    Start,
    Prolog,
    /// After the root element's end tag
    Epilog,
}

enum DocumentState {
    Misc,
    Lt { token: BoundaryToken, first: bool },
    Bang(BoundaryToken),
}

/// `prolog element Misc*`
pub struct Document {
    phase: Phase,
    state: DocumentState,
    doctype: bool,
}

impl Document {
    pub fn new() -> Self {
        Document { phase: Phase::Start, state: DocumentState::Misc, doctype: false }
    }

    fn misc(&mut self, cp: Codepoint, cx: &mut Context<'_>) -> Control {
        let first = self.phase == Phase::Start;
        if first {
            self.phase = Phase::Prolog;
        }
        match cp {
            LT => {
                self.state = DocumentState::Lt { token: cx.boundary(), first };
                Control::Continue
            }
            _ if is_whitespace(cp) => Control::Continue,
            EOF if self.phase == Phase::Epilog => Control::Done(Product::Unit, None),
            EOF => Control::fail("a root element"),
            _ if self.phase == Phase::Epilog => Control::fail("only comments, processing instructions and whitespace after the root element"),
            _ => Control::fail("markup (character data is not allowed before the root element)"),
        }
    }
}

impl Production for Document {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let cp = match input {
            Input::Char(cp) => cp,
            Input::Returned(_) | Input::Reply(_) => return Control::Continue,
        };
        match std::mem::replace(&mut self.state, DocumentState::Misc) {
            DocumentState::Misc => self.misc(cp, cx),
            DocumentState::Lt { token, first } if cp == QMARK => {
                let position = if first { DeclPosition::Xml } else { DeclPosition::None };
                Control::call(Pi::new(token, true, position))
            }
            DocumentState::Lt { token, .. } if cp == BANG => {
                self.state = DocumentState::Bang(token);
                Control::Continue
            }
            DocumentState::Lt { .. } if self.phase == Phase::Epilog && is_name_start(cp) => {
                Control::fail("a comment or processing instruction (a document has exactly one root element)")
            }
            DocumentState::Lt { token, .. } if is_name_start(cp) => {
                self.phase = Phase::Epilog;
                Control::call_with(Element::new(token), cp)
            }
            DocumentState::Lt { .. } => Control::fail("a name, \"?\" or \"!\""),
            DocumentState::Bang(token) if cp == DASH => Control::call(Comment::new(token, true)),
            DocumentState::Bang(token) if cp == 'D' as Codepoint && !self.doctype && self.phase == Phase::Prolog => {
                self.doctype = true;
                Control::call_with(Doctype::new(token), cp)
            }
            DocumentState::Bang(_) if self.doctype || self.phase == Phase::Epilog => Control::fail("\"--\""),
            DocumentState::Bang(_) => Control::fail("\"--\" or \"DOCTYPE\""),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Body {
    Subset,
    Entity,
    /// Keep the text as is for later expansion
    Replacement,
}

enum RootState {
    /// Matching the `<?xml` prefix of a text declaration
    Probe(Vec<Codepoint>),
    Declaring,
    /// Re-reading injected probe text; the body starts at the next codepoint
    Restart,
    Running,
    Collect(Vec<Codepoint>),
}

/// Optional text declaration followed by an external subset, an external
/// parsed entity or raw replacement text
pub struct ExternalRoot {
    body: Body,
    state: RootState,
}

impl ExternalRoot {
    pub fn subset() -> Self {
        Self::with_body(Body::Subset)
    }

    pub fn entity() -> Self {
        Self::with_body(Body::Entity)
    }

    pub fn replacement() -> Self {
        Self::with_body(Body::Replacement)
    }

    fn with_body(body: Body) -> Self {
        ExternalRoot { body, state: RootState::Probe(Vec::new()) }
    }

    fn start(&mut self, cp: Option<Codepoint>) -> Control {
        let production: Box<dyn Production> = match self.body {
            Body::Subset => Box::new(Subset::new(SubsetMode::External)),
            Body::Entity => Box::new(Content::new(true)),
            Body::Replacement => {
                self.state = RootState::Collect(Vec::new());
                return match cp {
                    Some(cp) => Control::Holdover(cp),
                    None => Control::Continue,
                };
            }
        };
        self.state = RootState::Running;
        Control::Call(production, cp)
    }

    /// The probe text turned out not to be a text declaration
    fn mismatch(&mut self, mut seen: Vec<Codepoint>, cp: Codepoint) -> Control {
        if seen.is_empty() {
            return self.start(Some(cp));
        }
        if self.body == Body::Replacement {
            if cp != EOF {
                seen.push(cp);
                self.state = RootState::Collect(seen);
                return Control::Continue;
            }
            return Control::Done(Product::Text(seen), None);
        }
        if cp == EOF {
            return Control::fail("the rest of the markup");
        }
        seen.push(cp);
        self.state = RootState::Restart;
        Control::Inject(seen)
    }
}

impl Production for ExternalRoot {
    fn resume(&mut self, input: Input, _cx: &mut Context<'_>) -> Control {
        let cp = match input {
            Input::Char(cp) => cp,
            Input::Returned(_) => {
                return match self.state {
                    RootState::Declaring => self.start(None),
                    _ => Control::Done(Product::Unit, None),
                };
            }
            Input::Reply(_) => return Control::Continue,
        };
        match std::mem::replace(&mut self.state, RootState::Running) {
            RootState::Probe(mut seen) => {
                let prefix = codepoints("<?xml");
                if seen.len() == prefix.len() && is_whitespace(cp) {
                    self.state = RootState::Declaring;
                    return Control::call_with(XmlDecl::new(true), cp);
                }
                if seen.len() < prefix.len() && prefix[seen.len()] == cp {
                    seen.push(cp);
                    self.state = RootState::Probe(seen);
                    return Control::Continue;
                }
                self.mismatch(seen, cp)
            }
            RootState::Restart => self.start(Some(cp)),
            RootState::Collect(mut text) => {
                if cp == EOF {
                    return Control::Done(Product::Text(text), None);
                }
                text.push(cp);
                self.state = RootState::Collect(text);
                Control::Continue
            }
            RootState::Declaring | RootState::Running => Control::fail("the end of the resource"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{failure, parse_str};
    use crate::dom::NodeKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prolog_and_epilog() {
        let doc = parse_str("<?xml version=\"1.0\"?>\n<!-- a -->\n<?pi data?>\n<r/>\n<!-- b -->\n").unwrap();
        let kinds: Vec<NodeKind> = doc
            .children(doc.document_id())
            .filter_map(|id| doc.get_node(id).map(|node| node.kind()))
            .collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Comment, NodeKind::ProcessingInstruction, NodeKind::Element, NodeKind::Comment]
        );
        assert_eq!(doc.declaration.as_ref().and_then(|d| d.version.as_deref()), Some("1.0"));
        assert_eq!(doc.root_name(), Some("r"));
    }

    #[test]
    fn test_declaration_must_come_first() {
        let msg = failure(" <?xml version=\"1.0\"?><r/>");
        assert!(msg.contains("a processing instruction target other than \"xml\""), "{}", msg);
    }

    #[test]
    fn test_text_before_root() {
        let msg = failure("hello<r/>");
        assert!(msg.contains("character data is not allowed before the root element"), "{}", msg);
    }

    #[test]
    fn test_single_root() {
        let msg = failure("<a/><b/>");
        assert!(msg.contains("exactly one root element"), "{}", msg);
    }

    #[test]
    fn test_missing_root() {
        let msg = failure("<!-- only a comment -->");
        assert!(msg.contains("Expected a root element."), "{}", msg);
    }

    #[test]
    fn test_doctype_after_root() {
        let msg = failure("<a/><!DOCTYPE a>");
        assert!(msg.contains("Expected \"--\"."), "{}", msg);
    }

    #[test]
    fn test_second_doctype() {
        let msg = failure("<!DOCTYPE a><!DOCTYPE a><a/>");
        assert!(msg.contains("Expected \"--\"."), "{}", msg);
    }

    #[test]
    fn test_doctype_name() {
        let doc = parse_str("<!DOCTYPE greeting><greeting>hi</greeting>").unwrap();
        assert_eq!(doc.doctype.as_ref().map(|d| d.name.as_str()), Some("greeting"));
        assert_eq!(doc.text(doc.root_element_id().unwrap()), "hi");
    }
}
