//! Markup declarations: ELEMENT, ATTLIST, ENTITY and NOTATION
//!
//! Each is resumed right after its keyword and owns the boundary token taken
//! at its `<`, checked at the closing `>`.

use super::literal::{AttValue, EntityValue, ExternalIdentifier, ValueMode};
use super::{COMMA, GT, HASH, LPAREN, PERCENT, PIPE, RPAREN};
use crate::core::chars::{is_name_start, is_quote, is_whitespace, to_char, to_string, Codepoint};
use crate::core::dtd::{
    AttDef, AttDefault, AttType, ContentParticle, ContentSpec, EntityDecl as EntityDefinition, ExternalId,
    NotationDecl as NotationDefinition, Occurrence, Particle,
};
use crate::error::Error;
use crate::grammar::advance::{one_of, series, space, Advancer, NameAdvancer, OneOf, Series, Space, Step};
use crate::grammar::context::Context;
use crate::grammar::control::{Control, Input, Product, Production};
use crate::grammar::expansion::BoundaryToken;
use crate::options::CharRefSpaces;

/// Required whitespace between two tokens; `Ok(false)` once `cp` is past it
fn gap(run: &mut Space, cp: Codepoint) -> Result<bool, Control> {
    match run.advance(cp) {
        Step::Pending => Ok(true),
        Step::Failed(expectation) => Err(Control::fail(expectation)),
        Step::Matched | Step::Overran(_) => Ok(false),
    }
}

fn closed(token: &mut BoundaryToken, what: &str, cx: &mut Context<'_>) -> Result<(), Error> {
    cx.check_boundary(token, what)
}

enum ElementState {
    Space(Space),
    Name(NameAdvancer),
    SpecSpace(Space),
    Spec(OneOf),
    Model,
    Tail,
}

const SPEC_KEYWORDS: &[&str] = &["EMPTY", "ANY", "("];

/// `<!ELEMENT name spec>`
pub struct ElementDecl {
    token: BoundaryToken,
    state: ElementState,
    name: String,
    spec: Option<ContentSpec>,
}

impl ElementDecl {
    pub fn new(token: BoundaryToken) -> Self {
        ElementDecl { token, state: ElementState::Space(space()), name: String::new(), spec: None }
    }

    fn finish(&mut self, cx: &mut Context<'_>) -> Control {
        if let Err(err) = closed(&mut self.token, "element declaration", cx) {
            return Control::Abort(err);
        }
        let spec = self.spec.take().unwrap_or(ContentSpec::Any);
        if !cx.dtd_mut().add_element(self.name.clone(), spec) {
            return Control::fail(format!("element \"{}\" to be declared only once", self.name));
        }
        Control::done()
    }
}

impl Production for ElementDecl {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let cp = match input {
            Input::Char(cp) => cp,
            Input::Returned(Product::ContentSpec(spec)) => {
                self.spec = Some(spec);
                self.state = ElementState::Tail;
                return Control::Continue;
            }
            Input::Returned(_) | Input::Reply(_) => return Control::Continue,
        };
        match &mut self.state {
            ElementState::Space(run) => match gap(run, cp) {
                Ok(true) => Control::Continue,
                Ok(false) => {
                    self.state = ElementState::Name(NameAdvancer::name());
                    Control::Holdover(cp)
                }
                Err(control) => control,
            },
            ElementState::Name(name) => match name.advance(cp) {
                Step::Overran(next) => {
                    self.name = name.take();
                    self.state = ElementState::SpecSpace(space());
                    Control::Holdover(next)
                }
                Step::Failed(expectation) => Control::fail(expectation),
                _ => Control::Continue,
            },
            ElementState::SpecSpace(run) => match gap(run, cp) {
                Ok(true) => Control::Continue,
                Ok(false) => {
                    self.state = ElementState::Spec(one_of(SPEC_KEYWORDS));
                    Control::Holdover(cp)
                }
                Err(control) => control,
            },
            ElementState::Spec(keyword) => match keyword.advance(cp) {
                Step::Pending => Control::Continue,
                Step::Matched => match keyword.matched() {
                    Some("(") => {
                        self.state = ElementState::Model;
                        Control::call(ContentModel::new())
                    }
                    Some("EMPTY") => {
                        self.spec = Some(ContentSpec::Empty);
                        self.state = ElementState::Tail;
                        Control::Continue
                    }
                    _ => {
                        self.spec = Some(ContentSpec::Any);
                        self.state = ElementState::Tail;
                        Control::Continue
                    }
                },
                Step::Failed(expectation) => Control::fail(expectation),
                Step::Overran(_) => Control::fail("a content specification"),
            },
            ElementState::Model => Control::fail("the content model"),
            ElementState::Tail if is_whitespace(cp) => Control::Continue,
            ElementState::Tail if cp == GT => self.finish(cx),
            ElementState::Tail => Control::fail("\">\" to end the element declaration"),
        }
    }
}

#[derive(Default)]
struct Group {
    items: Vec<ContentParticle>,
    separator: Option<Codepoint>,
}

enum ModelState {
    Start,
    Pcdata(Series),
    MixedNext,
    MixedGap,
    MixedName(NameAdvancer),
    MixedStar,
    Particle,
    Name(NameAdvancer),
    Occurrence(ContentParticle),
    AfterParticle,
    Final(ContentParticle),
}

/// Mixed or children content model, resumed after the opening `(`
pub struct ContentModel {
    state: ModelState,
    groups: Vec<Group>,
    names: Vec<String>,
}

impl ContentModel {
    pub fn new() -> Self {
        ContentModel { state: ModelState::Start, groups: vec![Group::default()], names: Vec::new() }
    }

    fn push(&mut self, particle: ContentParticle) {
        if let Some(group) = self.groups.last_mut() {
            group.items.push(particle);
        }
    }

    fn close_group(&mut self) -> Control {
        let Some(group) = self.groups.pop() else {
            return Control::fail("a content particle");
        };
        let item = match group.separator {
            Some(PIPE) => Particle::Choice(group.items),
            _ => Particle::Seq(group.items),
        };
        let particle = ContentParticle { item, occurrence: Occurrence::Once };
        self.state = if self.groups.is_empty() {
            ModelState::Final(particle)
        } else {
            ModelState::Occurrence(particle)
        };
        Control::Continue
    }
}

impl Production for ContentModel {
    fn resume(&mut self, input: Input, _cx: &mut Context<'_>) -> Control {
        let Input::Char(cp) = input else {
            return Control::Continue;
        };
        match std::mem::replace(&mut self.state, ModelState::Particle) {
            ModelState::Start if is_whitespace(cp) => {
                self.state = ModelState::Start;
                Control::Continue
            }
            ModelState::Start if cp == HASH => {
                self.state = ModelState::Pcdata(series("PCDATA"));
                Control::Continue
            }
            ModelState::Start => Control::Holdover(cp),
            ModelState::Pcdata(mut keyword) => match keyword.advance(cp) {
                Step::Matched => {
                    self.state = ModelState::MixedNext;
                    Control::Continue
                }
                Step::Failed(expectation) => Control::fail(expectation),
                _ => {
                    self.state = ModelState::Pcdata(keyword);
                    Control::Continue
                }
            },
            ModelState::MixedNext if is_whitespace(cp) => {
                self.state = ModelState::MixedNext;
                Control::Continue
            }
            ModelState::MixedNext if cp == PIPE => {
                self.state = ModelState::MixedGap;
                Control::Continue
            }
            ModelState::MixedNext if cp == RPAREN => {
                self.state = ModelState::MixedStar;
                Control::Continue
            }
            ModelState::MixedNext => Control::fail("\"|\" or \")\""),
            ModelState::MixedGap if is_whitespace(cp) => {
                self.state = ModelState::MixedGap;
                Control::Continue
            }
            ModelState::MixedGap => {
                self.state = ModelState::MixedName(NameAdvancer::name());
                Control::Holdover(cp)
            }
            ModelState::MixedName(mut name) => match name.advance(cp) {
                Step::Overran(next) => {
                    self.names.push(name.take());
                    self.state = ModelState::MixedNext;
                    Control::Holdover(next)
                }
                Step::Failed(expectation) => Control::fail(expectation),
                _ => {
                    self.state = ModelState::MixedName(name);
                    Control::Continue
                }
            },
            ModelState::MixedStar if cp == '*' as Codepoint => {
                let names = std::mem::take(&mut self.names);
                Control::Done(Product::ContentSpec(ContentSpec::Mixed(names)), None)
            }
            ModelState::MixedStar if !self.names.is_empty() => {
                Control::fail("\"*\" after a mixed content model naming elements")
            }
            ModelState::MixedStar => Control::Done(Product::ContentSpec(ContentSpec::Mixed(Vec::new())), Some(cp)),
            ModelState::Particle if is_whitespace(cp) => Control::Continue,
            ModelState::Particle if cp == LPAREN => {
                self.groups.push(Group::default());
                Control::Continue
            }
            ModelState::Particle if is_name_start(cp) => {
                let mut name = NameAdvancer::name();
                name.advance(cp);
                self.state = ModelState::Name(name);
                Control::Continue
            }
            ModelState::Particle => Control::fail("a name or \"(\""),
            ModelState::Name(mut name) => match name.advance(cp) {
                Step::Overran(next) => {
                    let particle = ContentParticle { item: Particle::Name(name.take()), occurrence: Occurrence::Once };
                    self.state = ModelState::Occurrence(particle);
                    Control::Holdover(next)
                }
                _ => {
                    self.state = ModelState::Name(name);
                    Control::Continue
                }
            },
            ModelState::Occurrence(mut particle) => {
                self.state = ModelState::AfterParticle;
                match Occurrence::from_char(cp) {
                    Some(occurrence) => {
                        particle.occurrence = occurrence;
                        self.push(particle);
                        Control::Continue
                    }
                    None => {
                        self.push(particle);
                        Control::Holdover(cp)
                    }
                }
            }
            ModelState::AfterParticle if is_whitespace(cp) => {
                self.state = ModelState::AfterParticle;
                Control::Continue
            }
            ModelState::AfterParticle if cp == PIPE || cp == COMMA => {
                let Some(group) = self.groups.last_mut() else {
                    return Control::fail("a content particle");
                };
                match group.separator {
                    Some(separator) if separator != cp => {
                        Control::fail(format!("\"{}\" between the particles of one group", to_char(separator)))
                    }
                    _ => {
                        group.separator = Some(cp);
                        Control::Continue
                    }
                }
            }
            ModelState::AfterParticle if cp == RPAREN => self.close_group(),
            ModelState::AfterParticle => Control::fail("\"|\", \",\" or \")\""),
            ModelState::Final(mut particle) => {
                let holdover = match Occurrence::from_char(cp) {
                    Some(occurrence) => {
                        particle.occurrence = occurrence;
                        None
                    }
                    None => Some(cp),
                };
                Control::Done(Product::ContentSpec(ContentSpec::Children(particle)), holdover)
            }
        }
    }
}

enum AttlistState {
    Space(Space),
    Element(NameAdvancer),
    Gap(Space),
    Name(NameAdvancer),
    TypeSpace(Space),
    Type(OneOf),
    NotationSpace(Space),
    EnumBefore,
    EnumToken(NameAdvancer),
    EnumAfter,
    DefaultSpace(Space),
    DefaultKeyword(OneOf),
    FixedSpace(Space),
    Value,
}

const TYPE_KEYWORDS: &[&str] = &[
    "CDATA", "ID", "IDREF", "IDREFS", "ENTITY", "ENTITIES", "NMTOKEN", "NMTOKENS", "NOTATION", "(",
];
const DEFAULT_KEYWORDS: &[&str] = &["REQUIRED", "IMPLIED", "FIXED"];

/// `<!ATTLIST element (name type default)*>`
pub struct AttlistDecl {
    token: BoundaryToken,
    state: AttlistState,
    element: String,
    name: String,
    att_type: AttType,
    notation: bool,
    tokens: Vec<String>,
    fixed: bool,
    defs: Vec<AttDef>,
}

impl AttlistDecl {
    pub fn new(token: BoundaryToken) -> Self {
        AttlistDecl {
            token,
            state: AttlistState::Space(space()),
            element: String::new(),
            name: String::new(),
            att_type: AttType::CData,
            notation: false,
            tokens: Vec::new(),
            fixed: false,
            defs: Vec::new(),
        }
    }

    fn on_type(&mut self, keyword: &str) {
        self.state = match keyword {
            "(" => {
                self.notation = false;
                AttlistState::EnumBefore
            }
            "NOTATION" => AttlistState::NotationSpace(space()),
            _ => {
                self.att_type = AttType::from_keyword(keyword).unwrap_or(AttType::CData);
                AttlistState::DefaultSpace(space())
            }
        };
    }

    fn define(&mut self, default: AttDefault) {
        let att_type = std::mem::replace(&mut self.att_type, AttType::CData);
        self.defs.push(AttDef { name: std::mem::take(&mut self.name), att_type, default });
        self.fixed = false;
        self.state = AttlistState::Gap(space());
    }

    fn finish(&mut self, cx: &mut Context<'_>) -> Control {
        if let Err(err) = closed(&mut self.token, "attribute-list declaration", cx) {
            return Control::Abort(err);
        }
        for def in self.defs.drain(..) {
            cx.dtd_mut().add_attribute(&self.element, def);
        }
        Control::done()
    }
}

impl Production for AttlistDecl {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let cp = match input {
            Input::Char(cp) => cp,
            Input::Returned(Product::Written { text, chars, literal }) => {
                let raw = to_string(&text);
                let default = if self.fixed {
                    let keep_literal = cx.options().char_ref_spaces == CharRefSpaces::Literal;
                    AttDefault::Fixed { raw, value: self.att_type.normalize(&chars, &literal, keep_literal) }
                } else {
                    AttDefault::Default(raw)
                };
                self.define(default);
                return Control::Continue;
            }
            Input::Returned(_) | Input::Reply(_) => return Control::Continue,
        };
        match &mut self.state {
            AttlistState::Space(run) => match gap(run, cp) {
                Ok(true) => Control::Continue,
                Ok(false) => {
                    self.state = AttlistState::Element(NameAdvancer::name());
                    Control::Holdover(cp)
                }
                Err(control) => control,
            },
            AttlistState::Element(name) => match name.advance(cp) {
                Step::Overran(next) => {
                    self.element = name.take();
                    self.state = AttlistState::Gap(space());
                    Control::Holdover(next)
                }
                Step::Failed(expectation) => Control::fail(expectation),
                _ => Control::Continue,
            },
            AttlistState::Gap(run) => match run.advance(cp) {
                Step::Pending => Control::Continue,
                _ if cp == GT => self.finish(cx),
                Step::Overran(_) if is_name_start(cp) => {
                    self.state = AttlistState::Name(NameAdvancer::name());
                    Control::Holdover(cp)
                }
                Step::Failed(expectation) if is_name_start(cp) => Control::fail(expectation),
                _ => Control::fail("an attribute name or \">\""),
            },
            AttlistState::Name(name) => match name.advance(cp) {
                Step::Overran(next) => {
                    self.name = name.take();
                    self.state = AttlistState::TypeSpace(space());
                    Control::Holdover(next)
                }
                Step::Failed(expectation) => Control::fail(expectation),
                _ => Control::Continue,
            },
            AttlistState::TypeSpace(run) => match gap(run, cp) {
                Ok(true) => Control::Continue,
                Ok(false) => {
                    self.state = AttlistState::Type(one_of(TYPE_KEYWORDS));
                    Control::Holdover(cp)
                }
                Err(control) => control,
            },
            AttlistState::Type(keyword) => match keyword.advance(cp) {
                Step::Pending => Control::Continue,
                Step::Matched => {
                    let matched = keyword.matched().unwrap_or("CDATA");
                    self.on_type(matched);
                    Control::Continue
                }
                Step::Overran(next) => {
                    let matched = keyword.matched().unwrap_or("CDATA");
                    self.on_type(matched);
                    Control::Holdover(next)
                }
                Step::Failed(expectation) => Control::fail(expectation),
            },
            AttlistState::NotationSpace(run) => match gap(run, cp) {
                Ok(true) => Control::Continue,
                Ok(false) if cp == LPAREN => {
                    self.notation = true;
                    self.state = AttlistState::EnumBefore;
                    Control::Continue
                }
                Ok(false) => Control::fail("\"(\""),
                Err(control) => control,
            },
            AttlistState::EnumBefore if is_whitespace(cp) => Control::Continue,
            AttlistState::EnumBefore => {
                let mut token = if self.notation { NameAdvancer::name() } else { NameAdvancer::nmtoken() };
                match token.advance(cp) {
                    Step::Failed(expectation) => Control::fail(expectation),
                    _ => {
                        self.state = AttlistState::EnumToken(token);
                        Control::Continue
                    }
                }
            }
            AttlistState::EnumToken(token) => match token.advance(cp) {
                Step::Overran(next) => {
                    self.tokens.push(token.take());
                    self.state = AttlistState::EnumAfter;
                    Control::Holdover(next)
                }
                _ => Control::Continue,
            },
            AttlistState::EnumAfter if is_whitespace(cp) => Control::Continue,
            AttlistState::EnumAfter if cp == PIPE => {
                self.state = AttlistState::EnumBefore;
                Control::Continue
            }
            AttlistState::EnumAfter if cp == RPAREN => {
                let tokens = std::mem::take(&mut self.tokens);
                self.att_type = if self.notation { AttType::Notation(tokens) } else { AttType::Enumeration(tokens) };
                self.state = AttlistState::DefaultSpace(space());
                Control::Continue
            }
            AttlistState::EnumAfter => Control::fail("\"|\" or \")\""),
            AttlistState::DefaultSpace(run) => match gap(run, cp) {
                Ok(true) => Control::Continue,
                Ok(false) if cp == HASH => {
                    self.state = AttlistState::DefaultKeyword(one_of(DEFAULT_KEYWORDS));
                    Control::Continue
                }
                Ok(false) if is_quote(cp) => {
                    self.state = AttlistState::Value;
                    Control::call_with(AttValue::new(ValueMode::Default), cp)
                }
                Ok(false) => Control::fail("\"#REQUIRED\", \"#IMPLIED\", \"#FIXED\" or a quoted default value"),
                Err(control) => control,
            },
            AttlistState::DefaultKeyword(keyword) => match keyword.advance(cp) {
                Step::Pending => Control::Continue,
                Step::Matched => {
                    match keyword.matched() {
                        Some("REQUIRED") => self.define(AttDefault::Required),
                        Some("IMPLIED") => self.define(AttDefault::Implied),
                        _ => {
                            self.fixed = true;
                            self.state = AttlistState::FixedSpace(space());
                        }
                    }
                    Control::Continue
                }
                Step::Failed(expectation) => Control::fail(expectation),
                Step::Overran(_) => Control::fail("\"REQUIRED\", \"IMPLIED\" or \"FIXED\""),
            },
            AttlistState::FixedSpace(run) => match gap(run, cp) {
                Ok(true) => Control::Continue,
                Ok(false) if is_quote(cp) => {
                    self.state = AttlistState::Value;
                    Control::call_with(AttValue::new(ValueMode::Default), cp)
                }
                Ok(false) => Control::fail("a quoted default value"),
                Err(control) => control,
            },
            AttlistState::Value => Control::fail("the default value"),
        }
    }
}

enum EntityState {
    Space(Space),
    PercentSpace(Space),
    Name(NameAdvancer),
    DefSpace(Space),
    Definition,
    AfterExternal(Space),
    Ndata(Series),
    NdataSpace(Space),
    NdataName(NameAdvancer),
    Tail,
}

/// `<!ENTITY [%] name definition>`
pub struct EntityDecl {
    token: BoundaryToken,
    state: EntityState,
    parameter: bool,
    name: String,
    value: Option<Vec<Codepoint>>,
    external: Option<ExternalId>,
    ndata: Option<String>,
}

impl EntityDecl {
    pub fn new(token: BoundaryToken) -> Self {
        EntityDecl {
            token,
            state: EntityState::Space(space()),
            parameter: false,
            name: String::new(),
            value: None,
            external: None,
            ndata: None,
        }
    }

    fn finish(&mut self, cx: &mut Context<'_>) -> Control {
        if let Err(err) = closed(&mut self.token, "entity declaration", cx) {
            return Control::Abort(err);
        }
        let decl = match self.value.take() {
            Some(value) => EntityDefinition::internal(value),
            None => {
                let external = self.external.take().unwrap_or_default();
                let path = external.system_id.as_deref().map(|system_id| cx.resolve_path(system_id));
                EntityDefinition { value: None, external: Some(external), path, ndata: self.ndata.take() }
            }
        };
        let name = std::mem::take(&mut self.name);
        cx.dtd_mut().add_entity(name, decl, self.parameter);
        Control::done()
    }
}

impl Production for EntityDecl {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let cp = match input {
            Input::Char(cp) => cp,
            Input::Returned(Product::Text(value)) => {
                self.value = Some(value);
                self.state = EntityState::Tail;
                return Control::Continue;
            }
            Input::Returned(Product::ExternalId(id)) => {
                self.external = Some(id);
                self.state = EntityState::AfterExternal(space());
                return Control::Continue;
            }
            Input::Returned(_) | Input::Reply(_) => return Control::Continue,
        };
        match &mut self.state {
            EntityState::Space(run) => match gap(run, cp) {
                Ok(true) => Control::Continue,
                Ok(false) if cp == PERCENT && !self.parameter => {
                    self.parameter = true;
                    self.state = EntityState::PercentSpace(space());
                    Control::Continue
                }
                Ok(false) => {
                    self.state = EntityState::Name(NameAdvancer::name());
                    Control::Holdover(cp)
                }
                Err(control) => control,
            },
            EntityState::PercentSpace(run) => match gap(run, cp) {
                Ok(true) => Control::Continue,
                Ok(false) => {
                    self.state = EntityState::Name(NameAdvancer::name());
                    Control::Holdover(cp)
                }
                Err(control) => control,
            },
            EntityState::Name(name) => match name.advance(cp) {
                Step::Overran(next) => {
                    self.name = name.take();
                    self.state = EntityState::DefSpace(space());
                    Control::Holdover(next)
                }
                Step::Failed(expectation) => Control::fail(expectation),
                _ => Control::Continue,
            },
            EntityState::DefSpace(run) => match gap(run, cp) {
                Ok(true) => Control::Continue,
                Ok(false) if is_quote(cp) => {
                    self.state = EntityState::Definition;
                    Control::call_with(EntityValue::new(), cp)
                }
                Ok(false) if is_name_start(cp) => {
                    self.state = EntityState::Definition;
                    Control::call_with(ExternalIdentifier::new(true), cp)
                }
                Ok(false) => Control::fail("a quoted entity value, \"SYSTEM\" or \"PUBLIC\""),
                Err(control) => control,
            },
            EntityState::Definition => Control::fail("the entity definition"),
            EntityState::AfterExternal(run) => match run.advance(cp) {
                Step::Pending => Control::Continue,
                _ if cp == GT => self.finish(cx),
                Step::Overran(_) if !self.parameter && cp == 'N' as Codepoint => {
                    self.state = EntityState::Ndata(series("NDATA"));
                    Control::Holdover(cp)
                }
                _ => Control::fail("\"NDATA\" or \">\""),
            },
            EntityState::Ndata(keyword) => match keyword.advance(cp) {
                Step::Matched => {
                    self.state = EntityState::NdataSpace(space());
                    Control::Continue
                }
                Step::Failed(expectation) => Control::fail(expectation),
                _ => Control::Continue,
            },
            EntityState::NdataSpace(run) => match gap(run, cp) {
                Ok(true) => Control::Continue,
                Ok(false) => {
                    self.state = EntityState::NdataName(NameAdvancer::name());
                    Control::Holdover(cp)
                }
                Err(control) => control,
            },
            EntityState::NdataName(name) => match name.advance(cp) {
                Step::Overran(next) => {
                    self.ndata = Some(name.take());
                    self.state = EntityState::Tail;
                    Control::Holdover(next)
                }
                Step::Failed(expectation) => Control::fail(expectation),
                _ => Control::Continue,
            },
            EntityState::Tail if is_whitespace(cp) => Control::Continue,
            EntityState::Tail if cp == GT => self.finish(cx),
            EntityState::Tail => Control::fail("\">\" to end the entity declaration"),
        }
    }
}

enum NotationState {
    Space(Space),
    Name(NameAdvancer),
    IdSpace(Space),
    Identifier,
    Tail,
}

/// `<!NOTATION name external-id>`
pub struct NotationDecl {
    token: BoundaryToken,
    state: NotationState,
    name: String,
    external: Option<ExternalId>,
}

impl NotationDecl {
    pub fn new(token: BoundaryToken) -> Self {
        NotationDecl { token, state: NotationState::Space(space()), name: String::new(), external: None }
    }

    fn finish(&mut self, cx: &mut Context<'_>) -> Control {
        if let Err(err) = closed(&mut self.token, "notation declaration", cx) {
            return Control::Abort(err);
        }
        let decl = NotationDefinition { external: self.external.take().unwrap_or_default() };
        if !cx.dtd_mut().add_notation(self.name.clone(), decl) {
            return Control::fail(format!("notation \"{}\" to be declared only once", self.name));
        }
        Control::done()
    }
}

impl Production for NotationDecl {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let cp = match input {
            Input::Char(cp) => cp,
            Input::Returned(Product::ExternalId(id)) => {
                self.external = Some(id);
                self.state = NotationState::Tail;
                return Control::Continue;
            }
            Input::Returned(_) | Input::Reply(_) => return Control::Continue,
        };
        match &mut self.state {
            NotationState::Space(run) => match gap(run, cp) {
                Ok(true) => Control::Continue,
                Ok(false) => {
                    self.state = NotationState::Name(NameAdvancer::name());
                    Control::Holdover(cp)
                }
                Err(control) => control,
            },
            NotationState::Name(name) => match name.advance(cp) {
                Step::Overran(next) => {
                    self.name = name.take();
                    self.state = NotationState::IdSpace(space());
                    Control::Holdover(next)
                }
                Step::Failed(expectation) => Control::fail(expectation),
                _ => Control::Continue,
            },
            NotationState::IdSpace(run) => match gap(run, cp) {
                Ok(true) => Control::Continue,
                Ok(false) => {
                    self.state = NotationState::Identifier;
                    Control::call_with(ExternalIdentifier::new(false), cp)
                }
                Err(control) => control,
            },
            NotationState::Identifier => Control::fail("an external identifier"),
            NotationState::Tail if is_whitespace(cp) => Control::Continue,
            NotationState::Tail if cp == GT => self.finish(cx),
            NotationState::Tail => Control::fail("\">\" to end the notation declaration"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{failure, parse_str};
    use crate::core::dtd::{AttDefault, AttType, ContentParticle, ContentSpec, Occurrence, Particle};
    use pretty_assertions::assert_eq;

    fn name(n: &str, occurrence: Occurrence) -> ContentParticle {
        ContentParticle { item: Particle::Name(n.into()), occurrence }
    }

    #[test]
    fn test_element_declarations() {
        let doc = parse_str(
            "<!DOCTYPE a [\
             <!ELEMENT a (b, (c | d)*, e?)+>\
             <!ELEMENT b (#PCDATA)>\
             <!ELEMENT c (#PCDATA | x | y)*>\
             <!ELEMENT d EMPTY>\
             <!ELEMENT e ANY>\
             ]><a/>",
        )
        .unwrap();
        let spec = |n: &str| doc.dtd.elements[n].content_spec.clone();
        assert_eq!(
            spec("a"),
            ContentSpec::Children(ContentParticle {
                item: Particle::Seq(vec![
                    name("b", Occurrence::Once),
                    ContentParticle {
                        item: Particle::Choice(vec![name("c", Occurrence::Once), name("d", Occurrence::Once)]),
                        occurrence: Occurrence::ZeroOrMore,
                    },
                    name("e", Occurrence::Optional),
                ]),
                occurrence: Occurrence::OneOrMore,
            })
        );
        assert_eq!(spec("b"), ContentSpec::Mixed(vec![]));
        assert_eq!(spec("c"), ContentSpec::Mixed(vec!["x".into(), "y".into()]));
        assert_eq!(spec("d"), ContentSpec::Empty);
        assert_eq!(spec("e"), ContentSpec::Any);
    }

    #[test]
    fn test_mixed_names_need_star() {
        let msg = failure("<!DOCTYPE a [<!ELEMENT a (#PCDATA | b)>]><a/>");
        assert!(msg.contains("\"*\" after a mixed content model"), "{}", msg);
    }

    #[test]
    fn test_mixed_separators() {
        let msg = failure("<!DOCTYPE a [<!ELEMENT a (b | c, d)>]><a/>");
        assert!(msg.contains("\"|\" between the particles"), "{}", msg);
    }

    #[test]
    fn test_duplicate_element_declaration() {
        let msg = failure("<!DOCTYPE a [<!ELEMENT a ANY><!ELEMENT a EMPTY>]><a/>");
        assert!(msg.contains("element \"a\" to be declared only once"), "{}", msg);
    }

    #[test]
    fn test_attlist_declaration() {
        let doc = parse_str(
            "<!DOCTYPE a [<!NOTATION gif SYSTEM 'g'>\
             <!ATTLIST a id ID #REQUIRED kind (x | y) 'x' fmt NOTATION (gif) #IMPLIED ref IDREFS #FIXED \"r1 r2\">\
             ]><a id='i' ref='r1 r2'/>",
        )
        .unwrap();
        let defs = doc.dtd.attributes_for("a");
        assert_eq!(defs.len(), 4);
        assert_eq!(defs[0].att_type, AttType::Id);
        assert_eq!(defs[0].default, AttDefault::Required);
        assert_eq!(defs[1].att_type, AttType::Enumeration(vec!["x".into(), "y".into()]));
        assert_eq!(defs[1].default, AttDefault::Default("x".into()));
        assert_eq!(defs[2].att_type, AttType::Notation(vec!["gif".into()]));
        assert_eq!(defs[3].att_type, AttType::IdRefs);
        assert_eq!(defs[3].default, AttDefault::Fixed { raw: "r1 r2".into(), value: "r1 r2".into() });
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.get_attribute(root, "kind"), Some("x"));
    }

    #[test]
    fn test_fixed_default_with_reference() {
        let doc = parse_str(
            "<!DOCTYPE a [<!ENTITY v \" x \"><!ATTLIST a f NMTOKENS #FIXED '&v;&#32;y\t&lt;'>]><a/>",
        )
        .unwrap();
        let def = doc.dtd.attribute("a", "f").unwrap();
        assert_eq!(
            def.default,
            AttDefault::Fixed { raw: "&v;&#32;y\t&lt;".into(), value: "x y <".into() }
        );
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.get_attribute(root, "f"), Some("x y <"));
    }

    #[test]
    fn test_default_references_must_be_declared_first() {
        let msg = failure("<!DOCTYPE a [<!ATTLIST a f CDATA 'x&v;'><!ENTITY v 'y'>]><a/>");
        assert!(msg.contains("entity \"v\" to have been declared"), "{}", msg);
    }

    #[test]
    fn test_attlist_type_keyword() {
        let msg = failure("<!DOCTYPE a [<!ATTLIST a b CDATAX #IMPLIED>]><a/>");
        assert!(msg.contains("whitespace"), "{}", msg);
    }

    #[test]
    fn test_entity_declarations() {
        let doc = parse_str(
            "<!DOCTYPE a [\
             <!ENTITY % p 'param'>\
             <!ENTITY g \"general\">\
             <!ENTITY ext SYSTEM \"sub/ext.xml\">\
             <!NOTATION n PUBLIC '-//N'>\
             <!ENTITY pic PUBLIC '-//P' 'pic.gif' NDATA n>\
             ]><a/>",
        )
        .unwrap();
        assert!(doc.dtd.parameter_entity("p").is_some());
        assert!(doc.dtd.entity("p").is_none());
        assert!(!doc.dtd.entity("g").unwrap().is_external());
        let ext = doc.dtd.entity("ext").unwrap();
        assert_eq!(ext.path.as_deref(), Some("sub/ext.xml"));
        let pic = doc.dtd.entity("pic").unwrap();
        assert_eq!(pic.ndata.as_deref(), Some("n"));
        assert_eq!(pic.external.as_ref().and_then(|id| id.public_id.as_deref()), Some("-//P"));
    }

    #[test]
    fn test_parameter_entity_cannot_be_unparsed() {
        let msg = failure("<!DOCTYPE a [<!ENTITY % p SYSTEM 'p' NDATA n>]><a/>");
        assert!(msg.contains("Expected \"NDATA\" or \">\""), "{}", msg);
    }

    #[test]
    fn test_duplicate_notation() {
        let msg = failure("<!DOCTYPE a [<!NOTATION n SYSTEM 'a'><!NOTATION n SYSTEM 'b'>]><a/>");
        assert!(msg.contains("notation \"n\" to be declared only once"), "{}", msg);
    }

    #[test]
    fn test_declaration_must_end_in_its_entity() {
        let msg = failure("<!DOCTYPE a [<!ENTITY % open \"<!ELEMENT a ANY\"> %open; >]><a/>");
        assert!(msg.contains("element declaration started in"), "{}", msg);
    }
}
