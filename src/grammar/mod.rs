//! Grammar engine
//!
//! Productions are resumable state machines stacked by the [`driver`]. They
//! read one codepoint per resume and answer with a [`control::Control`]
//! value; anything needing outside help (entity text, the external subset,
//! an encoding switch) is raised as a signal and answered by the driver or
//! the pipeline around it.

pub mod advance;
pub mod context;
pub mod control;
pub mod driver;
pub mod expansion;
pub mod position;
pub mod productions;

pub use driver::{Driver, Event, Fetch, FetchKind, Root};
