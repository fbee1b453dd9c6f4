//! Arena nodes
//!
//! Nodes are addressed by [`NodeId`] (index into the arena; 0 is the
//! document node) and linked to their parent and siblings in both
//! directions.

use std::ops::Range;

use super::names::Sym;

pub type NodeId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
}

/// What a node holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Document,
    /// `attrs` indexes the document's attribute arena
    Element { name: Sym, attrs: Range<u32> },
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction { target: Sym, data: String },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub payload: Payload,
}

impl Node {
    pub fn new(payload: Payload, parent: Option<NodeId>) -> Self {
        Node {
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            payload,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.payload {
            Payload::Document => NodeKind::Document,
            Payload::Element { .. } => NodeKind::Element,
            Payload::Text(_) => NodeKind::Text,
            Payload::CData(_) => NodeKind::CData,
            Payload::Comment(_) => NodeKind::Comment,
            Payload::ProcessingInstruction { .. } => NodeKind::ProcessingInstruction,
        }
    }

    /// Text of a character data node or data of a PI
    pub fn content(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(s) | Payload::CData(s) | Payload::Comment(s) => Some(s),
            Payload::ProcessingInstruction { data, .. } => Some(data),
            Payload::Document | Payload::Element { .. } => None,
        }
    }
}

/// One specified or defaulted attribute, already normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: Sym,
    pub value: String,
}
