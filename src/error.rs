//! Error types
//!
//! Every failure is terminal: the first error latches the pipeline and is
//! returned from every later call. Grammar failures carry a fully positioned
//! message built by the driver (see `grammar::position`).

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// Undefined byte or malformed byte sequence in the active encoding
    #[error("Decoding failed: {0}")]
    Decode(String),

    /// An in-band declaration contradicts what the decoder already fixed
    #[error("Decoding failed: cannot switch encoding from {from} to {to} ({reason})")]
    EncodingConflict {
        from: String,
        to: String,
        reason: &'static str,
    },

    /// Encoding label not present in the codec tables
    #[error("unrecognized encoding \"{0}\"")]
    UnknownEncoding(String),

    /// Input ended in the middle of a multi-byte sequence
    #[error("Decoding failed: input ended abruptly ({0} byte(s) of an incomplete sequence)")]
    Truncated(usize),

    /// Positioned grammar expectation failure
    #[error("{0}")]
    Syntax(String),

    /// Too many entity expansions in the whole document
    #[error("entity expansion count exceeded the maximum of {limit} (while expanding \"{entity}\")")]
    ExpansionCount { entity: String, limit: usize },

    /// An expansion (including nested expansions) produced too much text
    #[error("expansion of entity \"{entity}\" exceeded the maximum size of {limit} characters")]
    ExpansionSize { entity: String, limit: usize },

    /// An entity references itself, directly or transitively
    #[error("entity \"{entity}\" is recursive: {chain}")]
    Recursion { entity: String, chain: String },

    /// A markup structure starts and ends in different entity expansions
    #[error("{0}")]
    Boundary(String),

    /// External content was referenced but no resolver was configured
    #[error("no dereference resolver configured; cannot fetch {kind} \"{name}\" ({system_id})")]
    MissingResolver {
        kind: &'static str,
        name: String,
        system_id: String,
    },

    /// The resolver returned something unusable
    #[error("invalid dereference result: {0}")]
    InvalidResource(String),

    /// Reading a byte stream failed
    #[error("I/O error: {0}")]
    Io(String),

    /// A chunk was written while the pipeline awaits a dereferenced resource
    #[error("pipeline is halted awaiting a dereferenced resource")]
    Halted,

    /// The pipeline already produced its result
    #[error("pipeline already finished")]
    Finished,
}

impl Error {
    /// Halted is backpressure, not a parse failure; it never latches.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Halted)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
