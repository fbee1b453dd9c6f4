//! Parsed document and its builder
//!
//! Nodes live in one arena addressed by `NodeId`; attributes in a second
//! arena sliced per element. Names are interned, character data is owned by
//! its node.
//!
//! Productions never touch the arena directly; they go through
//! [`TreeBuilder`], which owns the open-element stack.

use super::names::NamePool;
use super::node::{Attr, Node, NodeId, Payload};
use crate::core::dtd::{DtdDeclarations, ExternalId};

/// The `<!DOCTYPE>` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocType {
    pub name: String,
    pub external: Option<ExternalId>,
}

/// Pseudo-attributes of the XML or text declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: Option<String>,
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
}

/// A parsed XML document stored in arena format
#[derive(Debug, Clone)]
pub struct Document {
    /// Index 0 is the document node
    nodes: Vec<Node>,
    attributes: Vec<Attr>,
    pub names: NamePool,
    /// First element child of the document node
    root_element: Option<NodeId>,
    pub doctype: Option<DocType>,
    pub declaration: Option<XmlDeclaration>,
    /// Declarations from the internal and external subsets
    pub dtd: DtdDeclarations,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(256);
        nodes.push(Node::new(Payload::Document, None));
        Document {
            nodes,
            attributes: Vec::with_capacity(128),
            names: NamePool::new(),
            root_element: None,
            doctype: None,
            declaration: None,
            dtd: DtdDeclarations::new(),
        }
    }

    /// The document node
    pub fn document_id(&self) -> NodeId {
        0
    }

    /// Get root element ID
    pub fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    /// Element name or PI target
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        match self.get_node(id)?.payload {
            Payload::Element { name, .. } => Some(self.names.resolve(name)),
            Payload::ProcessingInstruction { target, .. } => Some(self.names.resolve(target)),
            _ => None,
        }
    }

    /// Content of a text, CDATA, comment or PI node
    pub fn text_content(&self, id: NodeId) -> Option<&str> {
        self.get_node(id)?.content()
    }

    /// Attributes of an element in document order, defaults last
    pub fn attributes(&self, id: NodeId) -> &[Attr] {
        match self.get_node(id).map(|node| &node.payload) {
            Some(Payload::Element { attrs, .. }) => {
                self.attributes.get(attrs.start as usize..attrs.end as usize).unwrap_or(&[])
            }
            _ => &[],
        }
    }

    pub fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<&str> {
        let sym = self.names.get(name)?;
        self.attributes(node_id)
            .iter()
            .find(|attr| attr.name == sym)
            .map(|attr| attr.value.as_str())
    }

    /// Name and value of every attribute of an element
    pub fn get_attribute_values(&self, node_id: NodeId) -> Vec<(&str, &str)> {
        self.attributes(node_id)
            .iter()
            .map(|attr| (self.names.resolve(attr.name), attr.value.as_str()))
            .collect()
    }

    /// Child nodes in document order
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let first = self.get_node(id).and_then(|n| n.first_child);
        std::iter::successors(first, move |&child| self.get_node(child).and_then(|n| n.next_sibling))
    }

    /// Nodes below `id` in document order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let next = self.get_node(id).and_then(|n| n.first_child);
        Descendants { doc: self, top: id, next }
    }

    /// Concatenated text and CDATA content at or below a node
    pub fn text(&self, id: NodeId) -> String {
        std::iter::once(id)
            .chain(self.descendants(id))
            .filter_map(|n| match &self.get_node(n)?.payload {
                Payload::Text(text) | Payload::CData(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn root_name(&self) -> Option<&str> {
        self.root_element.and_then(|id| self.node_name(id))
    }

    /// Add `node` as the last child of its parent
    fn append(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len() as NodeId;
        let parent = node.parent.unwrap_or(0) as usize;
        let prev = self.nodes[parent].last_child.replace(id);
        self.nodes.push(Node { prev_sibling: prev, ..node });
        match prev {
            Some(prev) => self.nodes[prev as usize].next_sibling = Some(id),
            None => self.nodes[parent].first_child = Some(id),
        }
        id
    }
}

/// Preorder walk of a subtree following sibling and parent links
pub struct Descendants<'a> {
    doc: &'a Document,
    top: NodeId,
    next: Option<NodeId>,
}

impl Descendants<'_> {
    fn successor(&self, id: NodeId) -> Option<NodeId> {
        let node = self.doc.get_node(id)?;
        if let Some(child) = node.first_child {
            return Some(child);
        }
        let mut current = id;
        loop {
            if current == self.top {
                return None;
            }
            let node = self.doc.get_node(current)?;
            if let Some(sibling) = node.next_sibling {
                return Some(sibling);
            }
            current = node.parent?;
        }
    }
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.successor(current);
        Some(current)
    }
}

/// Incremental construction of a [`Document`]
#[derive(Debug, Default)]
pub struct TreeBuilder {
    doc: Document,
    /// Open elements; the document node is implied below the first entry
    open: Vec<NodeId>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn parent(&self) -> NodeId {
        self.open.last().copied().unwrap_or(0)
    }

    /// Whether no element is open
    pub fn at_top_level(&self) -> bool {
        self.open.is_empty()
    }

    pub fn dtd(&self) -> &DtdDeclarations {
        &self.doc.dtd
    }

    pub fn dtd_mut(&mut self) -> &mut DtdDeclarations {
        &mut self.doc.dtd
    }

    pub fn set_doctype(&mut self, doctype: DocType) {
        self.doc.doctype = Some(doctype);
    }

    pub fn set_declaration(&mut self, declaration: XmlDeclaration) {
        self.doc.declaration = Some(declaration);
    }

    /// Open an element with its final attribute list
    pub fn start_element(&mut self, name: &str, attributes: &[(String, String)]) -> NodeId {
        let parent = self.parent();
        let name = self.doc.names.intern(name);
        let start = self.doc.attributes.len() as u32;
        for (attr_name, value) in attributes {
            let name = self.doc.names.intern(attr_name);
            self.doc.attributes.push(Attr { name, value: value.clone() });
        }
        let attrs = start..self.doc.attributes.len() as u32;
        let id = self.doc.append(Node::new(Payload::Element { name, attrs }, Some(parent)));
        if parent == 0 && self.doc.root_element.is_none() {
            self.doc.root_element = Some(id);
        }
        self.open.push(id);
        id
    }

    /// Close the innermost open element
    pub fn end_element(&mut self) {
        self.open.pop();
    }

    /// Append character data, merging with a preceding text node
    pub fn text(&mut self, content: &str) {
        if content.is_empty() {
            return;
        }
        let parent = self.parent();
        if let Some(last) = self.doc.nodes[parent as usize].last_child {
            if let Payload::Text(text) = &mut self.doc.nodes[last as usize].payload {
                text.push_str(content);
                return;
            }
        }
        self.leaf(Payload::Text(content.to_string()));
    }

    pub fn cdata(&mut self, content: &str) {
        self.leaf(Payload::CData(content.to_string()));
    }

    pub fn comment(&mut self, content: &str) {
        self.leaf(Payload::Comment(content.to_string()));
    }

    pub fn processing_instruction(&mut self, target: &str, data: &str) {
        let target = self.doc.names.intern(target);
        self.leaf(Payload::ProcessingInstruction { target, data: data.to_string() });
    }

    fn leaf(&mut self, payload: Payload) {
        let parent = self.parent();
        self.doc.append(Node::new(payload, Some(parent)));
    }

    /// Take the declaration store, leaving an empty one behind
    pub fn take_dtd(&mut self) -> DtdDeclarations {
        std::mem::take(&mut self.doc.dtd)
    }

    pub fn restore_dtd(&mut self, dtd: DtdDeclarations) {
        self.doc.dtd = dtd;
    }

    pub fn finish(self) -> Document {
        self.doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::node::NodeKind;
    use pretty_assertions::assert_eq;

    fn sample() -> Document {
        let mut builder = TreeBuilder::new();
        builder.comment(" head ");
        builder.start_element("root", &[("id".into(), "r1".into())]);
        builder.text("a");
        builder.text("b");
        builder.start_element("child", &[]);
        builder.cdata("<raw>");
        builder.end_element();
        builder.processing_instruction("pi", "data");
        builder.end_element();
        builder.finish()
    }

    #[test]
    fn test_root_and_attributes() {
        let doc = sample();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.root_name(), Some("root"));
        assert_eq!(doc.get_attribute(root, "id"), Some("r1"));
        assert_eq!(doc.get_attribute(root, "missing"), None);
        assert_eq!(doc.get_attribute_values(root), vec![("id", "r1")]);
    }

    #[test]
    fn test_adjacent_text_merges() {
        let doc = sample();
        let root = doc.root_element_id().unwrap();
        let first = doc.children(root).next().unwrap();
        assert_eq!(doc.text_content(first), Some("ab"));
        assert_eq!(doc.children(root).count(), 3);
    }

    #[test]
    fn test_descendant_text() {
        let doc = sample();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.text(root), "ab<raw>");
    }

    #[test]
    fn test_descendants_in_document_order() {
        let doc = sample();
        let kinds: Vec<NodeKind> = doc
            .descendants(doc.document_id())
            .filter_map(|id| doc.get_node(id).map(Node::kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Comment,
                NodeKind::Element,
                NodeKind::Text,
                NodeKind::Element,
                NodeKind::CData,
                NodeKind::ProcessingInstruction,
            ]
        );
        let child = doc.children(doc.root_element_id().unwrap()).nth(1).unwrap();
        assert_eq!(doc.descendants(child).count(), 1);
    }

    #[test]
    fn test_document_children() {
        let doc = sample();
        let kinds: Vec<NodeKind> = doc
            .children(doc.document_id())
            .filter_map(|id| doc.get_node(id).map(Node::kind))
            .collect();
        assert_eq!(kinds, vec![NodeKind::Comment, NodeKind::Element]);
    }

    #[test]
    fn test_processing_instruction() {
        let doc = sample();
        let pi = doc
            .descendants(doc.document_id())
            .find(|&id| doc.get_node(id).map(Node::kind) == Some(NodeKind::ProcessingInstruction))
            .unwrap();
        assert_eq!(doc.node_name(pi), Some("pi"));
        assert_eq!(doc.text_content(pi), Some("data"));
    }
}
