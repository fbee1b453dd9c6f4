//! DTD Declaration Store
//!
//! Collects declarations while the subsets are parsed. Productions consult
//! the store mid-parse: references resolve against it, start tags read
//! attribute defaults from it. Entity and attribute declarations follow the
//! first-declaration-wins rule.

use std::collections::HashMap;
use std::sync::Arc;

use super::chars::{to_string, Codepoint, SPACE};

/// Collected DTD declarations
#[derive(Debug, Default, Clone)]
pub struct DtdDeclarations {
    /// Element declarations: name -> content spec
    pub elements: HashMap<String, ElementDecl>,
    /// Attribute lists: element name -> attributes in declaration order
    pub attlists: HashMap<String, Vec<AttDef>>,
    /// General entities: name -> definition
    pub entities: HashMap<String, EntityDecl>,
    /// Parameter entities: name -> definition
    pub pe_entities: HashMap<String, EntityDecl>,
    /// Notations: name -> definition
    pub notations: HashMap<String, NotationDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDecl {
    pub content_spec: ContentSpec,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSpec {
    Empty,
    Any,
    /// `(#PCDATA | a | b)*`; the list is empty for plain `(#PCDATA)`
    Mixed(Vec<String>),
    Children(ContentParticle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentParticle {
    pub item: Particle,
    pub occurrence: Occurrence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Particle {
    Name(String),
    Choice(Vec<ContentParticle>),
    Seq(Vec<ContentParticle>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    Once,
    Optional,
    ZeroOrMore,
    OneOrMore,
}

impl Occurrence {
    pub fn from_char(cp: Codepoint) -> Option<Self> {
        match char::from_u32(cp)? {
            '?' => Some(Occurrence::Optional),
            '*' => Some(Occurrence::ZeroOrMore),
            '+' => Some(Occurrence::OneOrMore),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttDef {
    pub name: String,
    pub att_type: AttType,
    pub default: AttDefault,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttType {
    CData,
    Id,
    IdRef,
    IdRefs,
    Entity,
    Entities,
    NmToken,
    NmTokens,
    Notation(Vec<String>),
    Enumeration(Vec<String>),
}

impl AttType {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "CDATA" => AttType::CData,
            "ID" => AttType::Id,
            "IDREF" => AttType::IdRef,
            "IDREFS" => AttType::IdRefs,
            "ENTITY" => AttType::Entity,
            "ENTITIES" => AttType::Entities,
            "NMTOKEN" => AttType::NmToken,
            "NMTOKENS" => AttType::NmTokens,
            _ => return None,
        })
    }

    /// Attribute value after type normalization
    pub fn normalize(&self, chars: &[Codepoint], literal: &[bool], keep_literal: bool) -> String {
        match self {
            AttType::CData => to_string(chars),
            _ => to_string(&normalize_tokens(chars, literal, keep_literal)),
        }
    }
}

/// Default declaration; literal values are kept as written so they can be
/// re-read in the context of each start tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttDefault {
    Required,
    Implied,
    /// `value` is the expanded and normalized literal every start tag must match
    Fixed { raw: String, value: String },
    Default(String),
}

impl AttDefault {
    /// The raw literal to inject when the attribute is absent
    pub fn literal(&self) -> Option<&str> {
        match self {
            AttDefault::Fixed { raw, .. } | AttDefault::Default(raw) => Some(raw),
            AttDefault::Required | AttDefault::Implied => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalId {
    pub public_id: Option<String>,
    pub system_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDecl {
    /// Replacement text of an internal entity
    pub value: Option<Arc<[Codepoint]>>,
    pub external: Option<ExternalId>,
    /// System identifier resolved against the declaring resource
    pub path: Option<String>,
    /// Notation name of an unparsed entity
    pub ndata: Option<String>,
}

impl EntityDecl {
    pub fn internal(value: Vec<Codepoint>) -> Self {
        EntityDecl {
            value: Some(value.into()),
            external: None,
            path: None,
            ndata: None,
        }
    }

    pub fn is_external(&self) -> bool {
        self.value.is_none()
    }

    pub fn is_unparsed(&self) -> bool {
        self.ndata.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotationDecl {
    pub external: ExternalId,
}

impl DtdDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element declaration; false if the type was already declared
    pub fn add_element(&mut self, name: String, content_spec: ContentSpec) -> bool {
        if self.elements.contains_key(&name) {
            return false;
        }
        self.elements.insert(name, ElementDecl { content_spec });
        true
    }

    /// Add an attribute definition; the first definition of a name wins
    pub fn add_attribute(&mut self, element: &str, def: AttDef) {
        let defs = self.attlists.entry(element.to_string()).or_default();
        if !defs.iter().any(|existing| existing.name == def.name) {
            defs.push(def);
        }
    }

    /// Add an entity declaration; the first declaration wins
    pub fn add_entity(&mut self, name: String, decl: EntityDecl, is_pe: bool) {
        let map = if is_pe { &mut self.pe_entities } else { &mut self.entities };
        map.entry(name).or_insert(decl);
    }

    /// Add a notation declaration; false if already declared
    pub fn add_notation(&mut self, name: String, decl: NotationDecl) -> bool {
        if self.notations.contains_key(&name) {
            return false;
        }
        self.notations.insert(name, decl);
        true
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDecl> {
        self.entities.get(name)
    }

    pub fn parameter_entity(&self, name: &str) -> Option<&EntityDecl> {
        self.pe_entities.get(name)
    }

    /// Attribute definitions for an element, in declaration order
    pub fn attributes_for(&self, element: &str) -> &[AttDef] {
        self.attlists.get(element).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn attribute(&self, element: &str, name: &str) -> Option<&AttDef> {
        self.attributes_for(element).iter().find(|def| def.name == name)
    }

    /// Number of declarations of every kind
    pub fn len(&self) -> usize {
        self.elements.len()
            + self.attlists.values().map(Vec::len).sum::<usize>()
            + self.entities.len()
            + self.pe_entities.len()
            + self.notations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collapse runs of spaces and trim, for every attribute type except CDATA
///
/// `literal[i]` marks spaces that came from character references; those
/// are left alone when `keep_literal` is set.
pub fn normalize_tokens(chars: &[Codepoint], literal: &[bool], keep_literal: bool) -> Vec<Codepoint> {
    let mut out: Vec<Codepoint> = Vec::with_capacity(chars.len());
    let mut pending_space = false;
    for (i, &cp) in chars.iter().enumerate() {
        let protected = keep_literal && literal.get(i).copied().unwrap_or(false);
        if cp == SPACE && !protected {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(SPACE);
            pending_space = false;
        }
        out.push(cp);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chars::{codepoints, to_string};

    #[test]
    fn test_first_entity_declaration_wins() {
        let mut dtd = DtdDeclarations::new();
        dtd.add_entity("foo".into(), EntityDecl::internal(codepoints("one")), false);
        dtd.add_entity("foo".into(), EntityDecl::internal(codepoints("two")), false);
        let value = dtd.entity("foo").and_then(|d| d.value.clone()).unwrap();
        assert_eq!(to_string(&value), "one");
        assert!(dtd.parameter_entity("foo").is_none());
    }

    #[test]
    fn test_duplicate_element() {
        let mut dtd = DtdDeclarations::new();
        assert!(dtd.add_element("a".into(), ContentSpec::Empty));
        assert!(!dtd.add_element("a".into(), ContentSpec::Any));
        assert_eq!(dtd.elements["a"].content_spec, ContentSpec::Empty);
    }

    #[test]
    fn test_first_attribute_definition_wins() {
        let mut dtd = DtdDeclarations::new();
        let def = |default: &str| AttDef {
            name: "x".into(),
            att_type: AttType::CData,
            default: AttDefault::Default(default.into()),
        };
        dtd.add_attribute("a", def("1"));
        dtd.add_attribute("a", def("2"));
        assert_eq!(dtd.attributes_for("a").len(), 1);
        assert_eq!(dtd.attribute("a", "x").unwrap().default.literal(), Some("1"));
        assert!(dtd.attributes_for("b").is_empty());
    }

    #[test]
    fn test_normalize_tokens() {
        let chars = codepoints("  a   b  ");
        assert_eq!(to_string(&normalize_tokens(&chars, &[], false)), "a b");
    }

    #[test]
    fn test_normalize_keeps_literal_spaces() {
        let chars = codepoints(" a  b");
        let literal = [true, false, false, true, false];
        assert_eq!(to_string(&normalize_tokens(&chars, &literal, true)), " a  b");
        assert_eq!(to_string(&normalize_tokens(&chars, &literal, false)), "a b");
    }

    #[test]
    fn test_normalize_by_type() {
        let chars = codepoints(" a  b ");
        assert_eq!(AttType::CData.normalize(&chars, &[], false), " a  b ");
        assert_eq!(AttType::NmTokens.normalize(&chars, &[], false), "a b");
    }
}
