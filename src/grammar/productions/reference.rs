//! Entity, character and parameter-entity references

use super::{HASH, LOWER_X, SEMI};
use crate::core::chars::{codepoints, is_decimal_digit, is_hex_digit, is_name_start, Codepoint};
use crate::core::entities::{char_ref, predefined};
use crate::grammar::advance::{Advancer, NameAdvancer, Step};
use crate::grammar::context::Context;
use crate::grammar::control::{Control, EntityKind, Input, Product, Production, Reply, Signal};
use crate::grammar::expansion::BoundaryToken;

/// Where a general reference occurs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefMode {
    Content,
    Attribute,
    /// Inside an entity literal: character references resolve, general
    /// references are bypassed
    EntityValue,
    /// Declared attribute default: resolved like `Attribute`, each
    /// reference also handed back as written
    Default,
}

enum State {
    Start,
    CharStart,
    CharDigits { hex: bool },
    Name(NameAdvancer),
    Expanding,
}

/// `&...;`, resumed after the ampersand
pub struct Reference {
    mode: RefMode,
    token: BoundaryToken,
    digits: String,
    /// `&name;` of an entity being expanded for a declared default
    written: Option<String>,
    state: State,
}

impl Reference {
    pub fn new(mode: RefMode, token: BoundaryToken) -> Self {
        Reference { mode, token, digits: String::new(), written: None, state: State::Start }
    }

    fn resolved(&self, written: String, chars: Vec<Codepoint>, literal: Vec<bool>) -> Product {
        match self.mode {
            RefMode::Default => Product::Written { text: codepoints(&written), chars, literal },
            RefMode::Attribute => Product::Value { chars, literal },
            _ => Product::Text(chars),
        }
    }

    fn character(&mut self, hex: bool, cx: &mut Context<'_>) -> Control {
        if let Err(err) = cx.check_boundary(&mut self.token, "character reference") {
            return Control::Abort(err);
        }
        let Some(value) = char_ref(&self.digits, hex) else {
            return Control::fail(format!(
                "a reference to a legal character (\"{}\" is not one)",
                self.digits
            ));
        };
        let marker = if hex { "x" } else { "" };
        let written = format!("&#{}{};", marker, self.digits);
        Control::Done(self.resolved(written, vec![value], vec![true]), None)
    }

    fn entity(&mut self, name: String, cx: &mut Context<'_>) -> Control {
        if let Err(err) = cx.check_boundary(&mut self.token, "entity reference") {
            return Control::Abort(err);
        }
        let written = format!("&{};", name);
        if self.mode == RefMode::EntityValue {
            return Control::Done(Product::Text(codepoints(&written)), None);
        }
        let in_attribute = matches!(self.mode, RefMode::Attribute | RefMode::Default);
        match cx.dtd().entity(&name) {
            Some(decl) if decl.is_unparsed() => {
                Control::fail(format!("a parsed entity (\"{}\" is unparsed)", name))
            }
            Some(decl) if decl.is_external() && in_attribute => Control::fail(format!(
                "no reference to external entity \"{}\" in an attribute value",
                name
            )),
            Some(_) => {
                self.state = State::Expanding;
                self.written = Some(written);
                Control::Signal(Signal::Expand { name, kind: EntityKind::General, pad: false })
            }
            None => match predefined(&name) {
                Some(cp) => Control::Done(self.resolved(written, vec![cp], vec![false]), None),
                None => Control::fail(format!("entity \"{}\" to have been declared", name)),
            },
        }
    }

    fn advance(&mut self, cp: Codepoint, cx: &mut Context<'_>) -> Control {
        match &mut self.state {
            State::Start if cp == HASH => {
                self.state = State::CharStart;
                Control::Continue
            }
            State::Start => {
                let mut name = NameAdvancer::name();
                match name.advance(cp) {
                    Step::Failed(expectation) => Control::fail(expectation),
                    _ => {
                        self.state = State::Name(name);
                        Control::Continue
                    }
                }
            }
            State::CharStart if cp == LOWER_X => {
                self.state = State::CharDigits { hex: true };
                Control::Continue
            }
            State::CharStart if is_decimal_digit(cp) => {
                self.digits.push(crate::core::chars::to_char(cp));
                self.state = State::CharDigits { hex: false };
                Control::Continue
            }
            State::CharStart => Control::fail("a decimal digit or \"x\""),
            State::CharDigits { hex } => {
                let hex = *hex;
                let valid = if hex { is_hex_digit(cp) } else { is_decimal_digit(cp) };
                if valid {
                    self.digits.push(crate::core::chars::to_char(cp));
                    Control::Continue
                } else if cp == SEMI && !self.digits.is_empty() {
                    self.character(hex, cx)
                } else if hex {
                    Control::fail("a hexadecimal digit or \";\"")
                } else {
                    Control::fail("a decimal digit or \";\"")
                }
            }
            State::Name(name) => match name.advance(cp) {
                Step::Pending => Control::Continue,
                Step::Overran(SEMI) => {
                    let name = name.take();
                    self.entity(name, cx)
                }
                Step::Failed(expectation) => Control::fail(expectation),
                _ => Control::fail("\";\" to end the entity reference"),
            },
            State::Expanding => Control::fail("nothing while an entity is expanded"),
        }
    }
}

impl Production for Reference {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        match input {
            Input::Char(cp) => self.advance(cp, cx),
            Input::Reply(Reply::Expanded) => match self.written.take() {
                Some(written) if self.mode == RefMode::Default => {
                    Control::Done(self.resolved(written, Vec::new(), Vec::new()), None)
                }
                _ => Control::done(),
            },
            Input::Reply(_) | Input::Returned(_) => Control::Continue,
        }
    }
}

/// `%name;`, resumed after the percent sign
///
/// A detour is started by the chaos pre-pass on any unquoted `%`; when no
/// name follows it hands the `%` back as [`Product::Passthrough`].
pub struct PeReference {
    pad: bool,
    detour: bool,
    token: BoundaryToken,
    name: NameAdvancer,
    started: bool,
    expanding: bool,
}

impl PeReference {
    pub fn new(pad: bool, token: BoundaryToken) -> Self {
        PeReference {
            pad,
            detour: false,
            token,
            name: NameAdvancer::name(),
            started: false,
            expanding: false,
        }
    }

    pub fn detour(token: BoundaryToken) -> Self {
        PeReference { detour: true, ..Self::new(true, token) }
    }

    fn expand(&mut self, cx: &mut Context<'_>) -> Control {
        if let Err(err) = cx.check_boundary(&mut self.token, "parameter entity reference") {
            return Control::Abort(err);
        }
        let name = self.name.take();
        if cx.dtd().parameter_entity(&name).is_none() {
            return Control::fail(format!("parameter entity \"%{};\" to have been declared", name));
        }
        self.expanding = true;
        Control::Signal(Signal::Expand { name, kind: EntityKind::Parameter, pad: self.pad })
    }
}

impl Production for PeReference {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control {
        let cp = match input {
            Input::Char(cp) => cp,
            Input::Reply(Reply::Expanded) => return Control::done(),
            Input::Reply(_) | Input::Returned(_) => return Control::Continue,
        };
        if self.expanding {
            return Control::fail("nothing while a parameter entity is expanded");
        }
        if !self.started && self.detour && !is_name_start(cp) {
            return Control::Done(Product::Passthrough, Some(cp));
        }
        self.started = true;
        match self.name.advance(cp) {
            Step::Pending => Control::Continue,
            Step::Overran(SEMI) => self.expand(cx),
            Step::Failed(expectation) => Control::fail(expectation),
            _ => Control::fail("\";\" to end the parameter entity reference"),
        }
    }
}
