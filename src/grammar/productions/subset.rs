//! Document type declaration, internal/external subsets and conditional
//! sections

use super::decls::{AttlistDecl, ElementDecl, EntityDecl, NotationDecl};
use super::literal::ExternalIdentifier;
use super::misc::{Comment, DeclPosition, Pi};
use super::reference::PeReference;
use super::{BANG, DASH, GT, LBRACKET, LT, PERCENT, QMARK, RBRACKET};
use crate::core::chars::{is_name_start, is_whitespace, Codepoint, EOF};
use crate::core::dtd::ExternalId;
use crate::dom::DocType;
use crate::grammar::advance::{one_of, series, space, Advancer, NameAdvancer, OneOf, Series, Space, Step};
use crate::grammar::context::Context;
use crate::grammar::control::{Control, Input, Product, Production, Reply, Signal};
use crate::grammar::expansion::BoundaryToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsetMode {
    /// Between `[` and `]` of the DOCTYPE
    Internal,
    /// A whole external subset or external parameter entity
    External,
    /// Body of an INCLUDE section, up to `]]>`
    Include,
}

const DECL_KEYWORDS: &[&str] = &["ELEMENT", "ENTITY", "ATTLIST", "NOTATION"];

enum SubsetState {
    Idle,
    Lt(BoundaryToken),
    Bang(BoundaryToken),
    Keyword(BoundaryToken, OneOf),
    /// `]` or `]]` of an INCLUDE section's end
    Close(u8),
}

/// Markup declarations, declaration separators and, outside the internal
/// subset, conditional sections
pub struct Subset {
    mode: SubsetMode,
    state: SubsetState,
}

impl Subset {
    pub fn new(mode: SubsetMode) -> Self {
        Subset { mode, state: SubsetState::Idle }
    }

    fn idle(&mut self, cp: Codepoint, cx: &mut Context<'_>) -> Control {
        match cp {
            _ if is_whitespace(cp) => Control::Continue,
            LT => {
                self.state = SubsetState::Lt(cx.boundary());
                Control::Continue
            }
            PERCENT => Control::call(PeReference::new(true, cx.boundary())),
            RBRACKET if self.mode == SubsetMode::Internal => Control::done(),
            RBRACKET if self.mode == SubsetMode::Include => {
                self.state = SubsetState::Close(1);
                Control::Continue
            }
            EOF if self.mode == SubsetMode::External => Control::Done(Product::Unit, None),
            EOF if self.mode == SubsetMode::Include => Control::fail("\"]]>\" to end the conditional section"),
            EOF => Control::fail("\"]\" to end the internal subset"),
            _ => Control::fail("a markup declaration"),
        }
    }

    fn declaration(keyword: &str, token: BoundaryToken) -> Control {
        match keyword {
            "ELEMENT" => Control::call(ElementDecl::new(token)),
            "ENTITY" => Control::call(EntityDecl::new(token)),
            "ATTLIST" => Control::call(AttlistDecl::new(token)),
            _ => Control::call(NotationDecl::new(token)),
        }
    }
}

impl Production for Subset {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let Input::Char(cp) = input else {
            return Control::Continue;
        };
        match std::mem::replace(&mut self.state, SubsetState::Idle) {
            SubsetState::Idle => self.idle(cp, cx),
            SubsetState::Lt(token) if cp == BANG => {
                self.state = SubsetState::Bang(token);
                Control::Continue
            }
            SubsetState::Lt(token) if cp == QMARK => Control::call(Pi::new(token, false, DeclPosition::None)),
            SubsetState::Lt(_) => Control::fail("\"!\" or \"?\""),
            SubsetState::Bang(token) if cp == DASH => Control::call(Comment::new(token, false)),
            SubsetState::Bang(token) if cp == LBRACKET => {
                if !cx.chaos_active() {
                    return Control::fail("a markup declaration (conditional sections belong to the external subset)");
                }
                Control::call(ConditionalSection::new(token))
            }
            SubsetState::Bang(token) => {
                let mut keyword = one_of(DECL_KEYWORDS);
                match keyword.advance(cp) {
                    Step::Failed(_) => Control::fail("\"--\", \"[\", \"ELEMENT\", \"ENTITY\", \"ATTLIST\" or \"NOTATION\""),
                    _ => {
                        self.state = SubsetState::Keyword(token, keyword);
                        Control::Continue
                    }
                }
            }
            SubsetState::Keyword(token, mut keyword) => match keyword.advance(cp) {
                Step::Pending => {
                    self.state = SubsetState::Keyword(token, keyword);
                    Control::Continue
                }
                Step::Matched => match keyword.matched() {
                    Some(matched) => Self::declaration(matched, token),
                    None => Control::fail("a markup declaration"),
                },
                Step::Overran(_) => Control::fail("a markup declaration keyword"),
                Step::Failed(expectation) => Control::fail(expectation),
            },
            SubsetState::Close(1) if cp == RBRACKET => {
                self.state = SubsetState::Close(2);
                Control::Continue
            }
            SubsetState::Close(1) => Control::fail("the second ] of ]]>"),
            SubsetState::Close(_) if cp == GT => Control::done(),
            SubsetState::Close(_) => Control::fail("the > of ]]>"),
        }
    }
}

enum SectionState {
    Space,
    Keyword(OneOf),
    Bracket,
    Including,
    /// Inside IGNORE: nesting depth and the last two codepoints
    Ignoring { depth: usize, last: [Codepoint; 2] },
}

const SECTION_KEYWORDS: &[&str] = &["INCLUDE", "IGNORE"];

/// `<![INCLUDE[...]]>` or `<![IGNORE[...]]>`, resumed after `<![`
pub struct ConditionalSection {
    token: BoundaryToken,
    include: bool,
    state: SectionState,
}

impl ConditionalSection {
    pub fn new(token: BoundaryToken) -> Self {
        ConditionalSection { token, include: false, state: SectionState::Space }
    }

    fn finish(&mut self, cx: &mut Context<'_>) -> Control {
        match cx.check_boundary(&mut self.token, "conditional section") {
            Ok(()) => Control::done(),
            Err(err) => Control::Abort(err),
        }
    }
}

impl Production for ConditionalSection {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let cp = match input {
            Input::Char(cp) => cp,
            Input::Returned(_) => return self.finish(cx),
            Input::Reply(_) => return Control::Continue,
        };
        match &mut self.state {
            SectionState::Space if is_whitespace(cp) => Control::Continue,
            SectionState::Space => {
                self.state = SectionState::Keyword(one_of(SECTION_KEYWORDS));
                Control::Holdover(cp)
            }
            SectionState::Keyword(keyword) => match keyword.advance(cp) {
                Step::Pending => Control::Continue,
                Step::Matched => {
                    self.include = keyword.matched() == Some("INCLUDE");
                    self.state = SectionState::Bracket;
                    Control::Continue
                }
                Step::Failed(expectation) => Control::fail(expectation),
                Step::Overran(_) => Control::fail("\"INCLUDE\" or \"IGNORE\""),
            },
            SectionState::Bracket if is_whitespace(cp) => Control::Continue,
            SectionState::Bracket if cp == LBRACKET => {
                if self.include {
                    self.state = SectionState::Including;
                    Control::call(Subset::new(SubsetMode::Include))
                } else {
                    cx.suppress_chaos();
                    self.state = SectionState::Ignoring { depth: 0, last: [0, 0] };
                    Control::Continue
                }
            }
            SectionState::Bracket => Control::fail("\"[\""),
            SectionState::Including => Control::fail("the end of the conditional section"),
            SectionState::Ignoring { depth, last } => {
                if cp == EOF {
                    return Control::fail("\"]]>\" to end the ignored section");
                }
                if *last == [LT, BANG] && cp == LBRACKET {
                    *depth += 1;
                    *last = [0, 0];
                    return Control::Continue;
                }
                if *last == [RBRACKET, RBRACKET] && cp == GT {
                    if *depth == 0 {
                        cx.unsuppress_chaos();
                        return self.finish(cx);
                    }
                    *depth -= 1;
                    *last = [0, 0];
                    return Control::Continue;
                }
                *last = [last[1], cp];
                Control::Continue
            }
        }
    }
}

enum DoctypeState {
    Keyword(Series),
    Space(Space),
    Name(NameAdvancer),
    AfterName(Space),
    AfterExternal,
    AfterSubset,
    Loading,
}

/// `<!DOCTYPE ...>`, resumed at the `D`
pub struct Doctype {
    token: BoundaryToken,
    state: DoctypeState,
    name: String,
    external: Option<ExternalId>,
}

impl Doctype {
    pub fn new(token: BoundaryToken) -> Self {
        Doctype {
            token,
            state: DoctypeState::Keyword(series("DOCTYPE")),
            name: String::new(),
            external: None,
        }
    }

    fn finish(&mut self, cx: &mut Context<'_>) -> Control {
        if let Err(err) = cx.check_boundary(&mut self.token, "document type declaration") {
            return Control::Abort(err);
        }
        cx.builder().set_doctype(DocType { name: self.name.clone(), external: self.external.clone() });
        let system_id = self.external.as_ref().and_then(|id| id.system_id.clone());
        match system_id {
            Some(system_id) => {
                self.state = DoctypeState::Loading;
                Control::Signal(Signal::DereferenceSubset {
                    name: self.name.clone(),
                    public_id: self.external.as_ref().and_then(|id| id.public_id.clone()),
                    system_id,
                })
            }
            None => Control::done(),
        }
    }
}

impl Production for Doctype {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let cp = match input {
            Input::Char(cp) => cp,
            Input::Returned(Product::ExternalId(id)) => {
                self.external = Some(id);
                self.state = DoctypeState::AfterExternal;
                return Control::Continue;
            }
            Input::Returned(_) => {
                self.state = DoctypeState::AfterSubset;
                return Control::Continue;
            }
            Input::Reply(Reply::SubsetLoaded) => return Control::done(),
            Input::Reply(_) => return Control::Continue,
        };
        match &mut self.state {
            DoctypeState::Keyword(keyword) => match keyword.advance(cp) {
                Step::Matched => {
                    self.state = DoctypeState::Space(space());
                    Control::Continue
                }
                Step::Failed(expectation) => Control::fail(expectation),
                _ => Control::Continue,
            },
            DoctypeState::Space(run) => match run.advance(cp) {
                Step::Pending => Control::Continue,
                Step::Failed(expectation) => Control::fail(expectation),
                _ => {
                    self.state = DoctypeState::Name(NameAdvancer::name());
                    Control::Holdover(cp)
                }
            },
            DoctypeState::Name(name) => match name.advance(cp) {
                Step::Overran(next) => {
                    self.name = name.take();
                    self.state = DoctypeState::AfterName(space());
                    Control::Holdover(next)
                }
                Step::Failed(expectation) => Control::fail(expectation),
                _ => Control::Continue,
            },
            DoctypeState::AfterName(run) => match run.advance(cp) {
                Step::Pending => Control::Continue,
                _ if cp == LBRACKET => Control::call(Subset::new(SubsetMode::Internal)),
                _ if cp == GT => self.finish(cx),
                Step::Overran(_) if is_name_start(cp) => Control::call_with(ExternalIdentifier::new(true), cp),
                _ => Control::fail("\"SYSTEM\", \"PUBLIC\", \"[\" or \">\""),
            },
            DoctypeState::AfterExternal if is_whitespace(cp) => Control::Continue,
            DoctypeState::AfterExternal if cp == LBRACKET => Control::call(Subset::new(SubsetMode::Internal)),
            DoctypeState::AfterExternal if cp == GT => self.finish(cx),
            DoctypeState::AfterExternal => Control::fail("\"[\" or \">\""),
            DoctypeState::AfterSubset if is_whitespace(cp) => Control::Continue,
            DoctypeState::AfterSubset if cp == GT => self.finish(cx),
            DoctypeState::AfterSubset => Control::fail("\">\" to end the document type declaration"),
            DoctypeState::Loading => Control::fail("the external subset to load"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{failure, parse_str};
    use crate::core::dtd::{AttDefault, AttType};
    use crate::dom::DocType;
    use crate::options::{ParseOptions, Target};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_internal_subset() {
        let doc = parse_str("<!DOCTYPE a [ <!-- c --> <?pi x?> <!ELEMENT a ANY> ]><a/>").unwrap();
        assert_eq!(doc.doctype, Some(DocType { name: "a".into(), external: None }));
        assert_eq!(doc.dtd.len(), 1);
    }

    #[test]
    fn test_doctype_keyword() {
        let msg = failure("<!DOCTYPX a><a/>");
        assert!(msg.contains("the E of DOCTYPE"), "{}", msg);
    }

    #[test]
    fn test_conditional_section_needs_external_subset() {
        let msg = failure("<!DOCTYPE a [<![INCLUDE[]]>]><a/>");
        assert!(msg.contains("conditional sections belong to the external subset"), "{}", msg);
    }

    #[test]
    fn test_unknown_declaration() {
        let msg = failure("<!DOCTYPE a [<!ELEMNT a ANY>]><a/>");
        assert!(msg.contains("the E of ELEMENT") || msg.contains("\"ELEMENT\""), "{}", msg);
    }

    fn ext_subset(text: &str) -> crate::Result<crate::Document> {
        crate::parse(text, &ParseOptions::default().target(Target::ExtSubset))
    }

    #[test]
    fn test_parameter_reference_inside_declaration() {
        let doc = ext_subset("<!ENTITY % t \"CDATA\"><!ATTLIST a x %t; #IMPLIED y%t;#REQUIRED>").unwrap();
        assert!(doc.dtd.parameter_entity("t").is_some());
        let x = doc.dtd.attribute("a", "x").unwrap();
        assert_eq!((&x.att_type, &x.default), (&AttType::CData, &AttDefault::Implied));
        assert_eq!(doc.dtd.attribute("a", "y").unwrap().default, AttDefault::Required);
    }

    #[test]
    fn test_paren_boundary_across_pe() {
        let msg = ext_subset("<!ENTITY % open \"(a\"><!ELEMENT e %open;)>").unwrap_err().to_string();
        assert!(
            msg.contains("parenthesized group started in parameter entity \"%open;\" but ended in the document entity"),
            "{}",
            msg
        );
        assert!(ext_subset("<!ENTITY % model \"(a|b)\"><!ELEMENT e %model;>").is_ok());
    }

    #[test]
    fn test_doctype_without_resolver() {
        let err = crate::parse("<!DOCTYPE a PUBLIC \"-//X\" \"a.dtd\"><a/>", &Default::default()).unwrap_err();
        assert!(matches!(err, crate::Error::MissingResolver { .. }), "{:?}", err);
    }
}
