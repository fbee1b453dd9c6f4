//! Dereference gateway
//!
//! Requests raised for external entities and the external DTD subset, the
//! resources callers answer with, and the resolver traits used by the entry
//! points.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;

use crate::error::{Error, Result};
use crate::grammar::{Fetch, FetchKind};

/// What kind of resource a request is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerefKind {
    /// An external general or parameter entity
    Entity,
    /// The external subset named by the DOCTYPE
    Dtd,
}

impl DerefKind {
    pub fn label(self) -> &'static str {
        match self {
            DerefKind::Entity => "ENTITY",
            DerefKind::Dtd => "DTD",
        }
    }
}

impl fmt::Display for DerefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A request for external content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerefRequest {
    /// Entity name, or the DOCTYPE name for the external subset
    pub name: String,
    /// System identifier resolved against the declaring resource
    pub path: String,
    /// `path` with characters outside the URI set percent-encoded
    pub path_encoded: String,
    pub public_id: Option<String>,
    pub system_id: String,
    pub kind: DerefKind,
}

impl DerefRequest {
    pub(crate) fn from_fetch(fetch: &Fetch) -> Self {
        let kind = match fetch.kind {
            FetchKind::Entity { .. } => DerefKind::Entity,
            FetchKind::Subset => DerefKind::Dtd,
        };
        DerefRequest {
            name: fetch.name.clone(),
            path: fetch.path.clone(),
            path_encoded: encode_uri(&fetch.path),
            public_id: fetch.public_id.clone(),
            system_id: fetch.system_id.clone(),
            kind,
        }
    }
}

/// Percent-encode everything but unreserved and reserved URI characters
pub fn encode_uri(path: &str) -> String {
    const KEEP: &[u8] = b";,/?:@&=+$-_.!~*'()#";
    let mut out = String::with_capacity(path.len());
    for &byte in path.as_bytes() {
        if byte.is_ascii_alphanumeric() || KEEP.contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Content of a dereferenced resource
pub enum EntityBody {
    Text(String),
    Bytes(Vec<u8>),
    Stream(Box<dyn Read>),
}

impl fmt::Debug for EntityBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityBody::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            EntityBody::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            EntityBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// A resolver's answer: the content and an optional encoding override
#[derive(Debug)]
pub struct Resource {
    pub encoding: Option<String>,
    pub entity: EntityBody,
}

impl Resource {
    pub fn text(text: impl Into<String>) -> Self {
        Resource { encoding: None, entity: EntityBody::Text(text.into()) }
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Resource { encoding: None, entity: EntityBody::Bytes(bytes.into()) }
    }

    pub fn stream(reader: impl Read + 'static) -> Self {
        Resource { encoding: None, entity: EntityBody::Stream(Box::new(reader)) }
    }

    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }
}

/// Synchronous source of external content
pub trait Resolver {
    fn resolve(&mut self, request: &DerefRequest) -> Result<Resource>;
}

impl<F> Resolver for F
where
    F: FnMut(&DerefRequest) -> Result<Resource>,
{
    fn resolve(&mut self, request: &DerefRequest) -> Result<Resource> {
        self(request)
    }
}

/// Asynchronous source of external content
#[allow(async_fn_in_trait)]
pub trait AsyncResolver {
    async fn resolve(&mut self, request: &DerefRequest) -> Result<Resource>;
}

/// Refuses every request
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResolver;

impl Resolver for NoResolver {
    fn resolve(&mut self, request: &DerefRequest) -> Result<Resource> {
        Err(Error::MissingResolver {
            kind: request.kind.label(),
            name: request.name.clone(),
            system_id: request.system_id.clone(),
        })
    }
}

/// Serves resources from memory, by system identifier first and resolved
/// path second
#[derive(Debug, Clone, Copy)]
pub struct MapResolver<'a> {
    resources: &'a HashMap<String, Vec<u8>>,
}

impl<'a> MapResolver<'a> {
    pub fn new(resources: &'a HashMap<String, Vec<u8>>) -> Self {
        MapResolver { resources }
    }
}

impl Resolver for MapResolver<'_> {
    fn resolve(&mut self, request: &DerefRequest) -> Result<Resource> {
        self.resources
            .get(&request.system_id)
            .or_else(|| self.resources.get(&request.path))
            .map(|bytes| Resource::bytes(bytes.clone()))
            .ok_or_else(|| Error::InvalidResource(format!("no resource for {} \"{}\" ({})", request.kind, request.name, request.path)))
    }
}
