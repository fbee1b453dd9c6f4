//! DOM Module - Arena-based XML Document
//!
//! The tree sink of the grammar:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for cache-friendly traversal
//! - Interned names; character data owned by its node
//! - Doctype record and the DTD declaration store

pub mod document;
pub mod names;
pub mod node;

pub use document::{DocType, Document, TreeBuilder, XmlDeclaration};
pub use names::{NamePool, Sym};
pub use node::{Attr, Node, NodeId, NodeKind, Payload};
