//! ConformXML - Conforming streaming XML 1.0 parser with DTD support
//!
//! Layers:
//! - Decoder: bytes to normalized codepoints, encoding sniffing and switching
//! - Grammar: resumable productions driven one codepoint at a time
//! - Expansion: entity replacement text read depth-first ahead of the input
//! - Gateway: external entities and the external subset via resolvers
//!
//! The pure-Rust API (`parse`, `Parser`, `parse_async`, `Pipeline`) backs the
//! NIFs exported to `ConformXML.Native`.

use rustler::{Binary, Env, NifResult, Term};

pub mod core;
pub mod dom;
pub mod error;
pub mod gateway;
pub mod grammar;
pub mod options;
pub mod parser;
pub mod pipeline;
pub mod strategy;
mod term;

pub use dom::Document;
pub use error::{Error, Result};
pub use gateway::{AsyncResolver, DerefKind, DerefRequest, EntityBody, MapResolver, NoResolver, Resolver, Resource};
pub use options::{CharRefSpaces, ParseOptions, Target};
pub use parser::{parse, parse_async, Parser, Source};
pub use pipeline::{Pipeline, Status};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// NIFs
// ============================================================================

/// Parse one document: `{:ok, tree}` or `{:error, message}`
#[rustler::nif(name = "parse", schedule = "DirtyCpu")]
fn nif_parse<'a>(env: Env<'a>, input: Binary<'a>, opts: Term<'a>) -> NifResult<Term<'a>> {
    let term::NifOptions { options, resources } = term::decode_options(opts)?;
    let result = Parser::new(options)
        .resolver(MapResolver::new(&resources))
        .parse(input.as_slice());
    Ok(term::result_to_term(env, result))
}

/// Parse independent documents in parallel; one result per input
#[rustler::nif(name = "parse_many", schedule = "DirtyCpu")]
fn nif_parse_many<'a>(env: Env<'a>, inputs: Vec<Binary<'a>>, opts: Term<'a>) -> NifResult<Term<'a>> {
    let term::NifOptions { options, resources } = term::decode_options(opts)?;
    let slices: Vec<&[u8]> = inputs.iter().map(|input| input.as_slice()).collect();
    let results = strategy::parse_parallel(&slices, &options, &resources);

    let mut list = Term::list_new_empty(env);
    for result in results.into_iter().rev() {
        list = list.list_prepend(term::result_to_term(env, result));
    }
    Ok(list)
}

rustler::init!("Elixir.ConformXML.Native");
