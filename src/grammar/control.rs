//! The protocol between productions and the driver
//!
//! A production is resumed with one [`Input`] at a time and answers with a
//! [`Control`] value telling the driver what to do next.

use super::context::Context;
use crate::core::chars::Codepoint;
use super::expansion::BoundaryToken;
use crate::core::dtd::{ContentSpec, ExternalId};
use crate::error::Error;

/// One grammar nonterminal as a resumable state machine
pub trait Production {
    fn resume(&mut self, input: Input, cx: &mut Context<'_>) -> Control;
}

/// What a production is resumed with
#[derive(Debug)]
pub enum Input {
    /// The next codepoint, or `EOF`
    Char(Codepoint),
    /// Result of a child production started with [`Control::Call`]
    Returned(Product),
    /// Answer to a [`Control::Signal`]
    Reply(Reply),
}

/// Values handed from a finished production to its caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Product {
    Unit,
    /// Character data: literal contents or resolved references
    Text(Vec<Codepoint>),
    /// Attribute value before type normalization; `literal[i]` marks
    /// characters produced by character references
    Value { chars: Vec<Codepoint>, literal: Vec<bool> },
    /// A value together with its text as written, for declared defaults
    Written { text: Vec<Codepoint>, chars: Vec<Codepoint>, literal: Vec<bool> },
    Attribute { name: String, value: String },
    ExternalId(ExternalId),
    ContentSpec(ContentSpec),
    /// A chaos-mode `%` that did not start a reference
    Passthrough,
    /// `</` seen; carries the token taken at its `<`
    EndTag(BoundaryToken),
}

/// Requests only the driver can satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Splice the replacement text of a declared entity into the input
    Expand { name: String, kind: EntityKind, pad: bool },
    /// Load and parse the external subset named by the DOCTYPE
    DereferenceSubset {
        name: String,
        public_id: Option<String>,
        system_id: String,
    },
    /// In-band encoding declaration
    DeclareEncoding(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// The replacement text now sits ahead of the remaining input
    Expanded,
    /// The external subset was parsed into the declaration store
    SubsetLoaded,
    Acknowledged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    General,
    Parameter,
}

/// A production's answer to one input
pub enum Control {
    /// Input consumed; feed the next codepoint
    Continue,
    /// Re-feed this codepoint before any new input
    Holdover(Codepoint),
    /// Synthetic input read ahead of the remaining input
    Inject(Vec<Codepoint>),
    /// Expectation failure; the string completes "Expected ..."
    Fail(String),
    /// Failure that is not a grammar expectation
    Abort(Error),
    /// Start a child production, optionally re-feeding a codepoint to it first
    Call(Box<dyn Production>, Option<Codepoint>),
    /// Finish, handing a product to the caller and optionally a holdover
    Done(Product, Option<Codepoint>),
    Signal(Signal),
}

impl Control {
    pub fn call(production: impl Production + 'static) -> Self {
        Control::Call(Box::new(production), None)
    }

    pub fn call_with(production: impl Production + 'static, cp: Codepoint) -> Self {
        Control::Call(Box::new(production), Some(cp))
    }

    pub fn fail(expectation: impl Into<String>) -> Self {
        Control::Fail(expectation.into())
    }

    pub fn done() -> Self {
        Control::Done(Product::Unit, None)
    }
}

impl From<Result<(), Error>> for Control {
    fn from(result: Result<(), Error>) -> Self {
        match result {
            Ok(()) => Control::Continue,
            Err(err) => Control::Abort(err),
        }
    }
}

impl std::fmt::Debug for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Control::Continue => f.write_str("Continue"),
            Control::Holdover(cp) => f.debug_tuple("Holdover").field(cp).finish(),
            Control::Inject(cps) => f.debug_tuple("Inject").field(&cps.len()).finish(),
            Control::Fail(msg) => f.debug_tuple("Fail").field(msg).finish(),
            Control::Abort(err) => f.debug_tuple("Abort").field(err).finish(),
            Control::Call(_, cp) => f.debug_tuple("Call").field(cp).finish(),
            Control::Done(product, cp) => f.debug_tuple("Done").field(product).field(cp).finish(),
            Control::Signal(signal) => f.debug_tuple("Signal").field(signal).finish(),
        }
    }
}
