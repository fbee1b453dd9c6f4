//! Elixir Term Conversion Utilities
//!
//! Decodes NIF option maps and converts parsed documents to Elixir terms.

use std::collections::HashMap;

use rustler::types::atom::nil;
use rustler::{Atom, Binary, Encoder, Env, NewBinary, NifResult, Term};

use crate::dom::{Document, NodeId, NodeKind};
use crate::error::Error;
use crate::options::{ParseOptions, Target};

rustler::atoms! {
    ok,
    error,
    document,
    element,
    comment,
    pi,
    cdata,
    encoding,
    max_expansion_count,
    max_expansion_size,
    target,
    path,
    resources,
    ext_subset,
    ext_entity,
}

/// Options decoded from the NIF option map
pub struct NifOptions {
    pub options: ParseOptions,
    /// System identifier or resolved path -> content
    pub resources: HashMap<String, Vec<u8>>,
}

/// Value under `key`, treating a missing key and `nil` alike
fn lookup<'a>(opts: Term<'a>, key: Atom) -> Option<Term<'a>> {
    let value = opts.map_get(key).ok()?;
    if value == nil().to_term(opts.get_env()) {
        return None;
    }
    Some(value)
}

/// Decode `%{encoding, max_expansion_count, max_expansion_size, target, path, resources}`
pub fn decode_options(opts: Term<'_>) -> NifResult<NifOptions> {
    let mut options = ParseOptions::default();
    if !opts.is_map() {
        return Ok(NifOptions { options, resources: HashMap::new() });
    }
    if let Some(value) = lookup(opts, encoding()) {
        options.encoding = Some(value.decode::<String>()?);
    }
    if let Some(value) = lookup(opts, max_expansion_count()) {
        options.max_expansion_count = value.decode::<usize>()?;
    }
    if let Some(value) = lookup(opts, max_expansion_size()) {
        options.max_expansion_size = value.decode::<usize>()?;
    }
    if let Some(value) = lookup(opts, target()) {
        let atom = value.decode::<Atom>()?;
        options.target = if atom == ext_subset() {
            Target::ExtSubset
        } else if atom == ext_entity() {
            Target::ExtEntity
        } else if atom == document() {
            Target::Document
        } else {
            return Err(rustler::Error::BadArg);
        };
    }
    if let Some(value) = lookup(opts, path()) {
        options.path = Some(value.decode::<String>()?);
    }
    let mut map = HashMap::new();
    if let Some(value) = lookup(opts, resources()) {
        let entries: HashMap<String, Binary> = value.decode()?;
        for (key, binary) in entries {
            map.insert(key, binary.as_slice().to_vec());
        }
    }
    Ok(NifOptions { options, resources: map })
}

/// `{:ok, tree}` or `{:error, message}`
pub fn result_to_term<'a>(env: Env<'a>, result: Result<Document, Error>) -> Term<'a> {
    match result {
        Ok(doc) => (ok(), document_to_term(env, &doc)).encode(env),
        Err(err) => (error(), err.to_string()).encode(env),
    }
}

/// `{:document, doctype_name | nil, [node]}` for every top-level node
pub fn document_to_term<'a>(env: Env<'a>, doc: &Document) -> Term<'a> {
    let doctype = match &doc.doctype {
        Some(doctype) => str_to_binary(env, &doctype.name),
        None => nil().encode(env),
    };
    let children = children_to_term(env, doc, doc.document_id());
    (document(), doctype, children).encode(env)
}

fn children_to_term<'a>(env: Env<'a>, doc: &Document, id: NodeId) -> Term<'a> {
    let mut list = Term::list_new_empty(env);
    let mut child = doc.get_node(id).and_then(|node| node.last_child);
    while let Some(cid) = child {
        list = list.list_prepend(node_to_term(env, doc, cid));
        child = doc.get_node(cid).and_then(|node| node.prev_sibling);
    }
    list
}

/// Convert one node
///
/// Elements become `{:element, name, [{name, value}], children}`, text a
/// binary, CDATA `{:cdata, text}`, comments `{:comment, text}` and
/// processing instructions `{:pi, target, data}`.
pub fn node_to_term<'a>(env: Env<'a>, doc: &Document, id: NodeId) -> Term<'a> {
    let Some(node) = doc.get_node(id) else {
        return nil().encode(env);
    };
    let content = || str_to_binary(env, doc.text_content(id).unwrap_or(""));
    match node.kind() {
        NodeKind::Element => {
            let name = str_to_binary(env, doc.node_name(id).unwrap_or(""));
            let mut attrs = Term::list_new_empty(env);
            for (attr_name, value) in doc.get_attribute_values(id).into_iter().rev() {
                let pair = (str_to_binary(env, attr_name), str_to_binary(env, value));
                attrs = attrs.list_prepend(pair.encode(env));
            }
            (element(), name, attrs, children_to_term(env, doc, id)).encode(env)
        }
        NodeKind::Text => content(),
        NodeKind::CData => (cdata(), content()).encode(env),
        NodeKind::Comment => (comment(), content()).encode(env),
        NodeKind::ProcessingInstruction => {
            let target = str_to_binary(env, doc.node_name(id).unwrap_or(""));
            (pi(), target, content()).encode(env)
        }
        NodeKind::Document => children_to_term(env, doc, id),
    }
}

/// Convert a string to a binary term (more efficient than .encode())
#[inline]
fn str_to_binary<'a>(env: Env<'a>, s: &str) -> Term<'a> {
    let bytes = s.as_bytes();
    let mut binary = NewBinary::new(env, bytes.len());
    binary.as_mut_slice().copy_from_slice(bytes);
    binary.into()
}
