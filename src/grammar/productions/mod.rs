//! Production state machines, one per grammar nonterminal
//!
//! Each production is resumed with the codepoint following whatever its
//! caller already consumed; the doc comment of each constructor says where
//! that is.

mod content;
mod decls;
mod document;
mod literal;
mod misc;
mod reference;
mod subset;

pub use content::{Attribute, Content, Element};
pub use decls::{AttlistDecl, ContentModel, ElementDecl, EntityDecl, NotationDecl};
pub use document::{Document, ExternalRoot};
pub use literal::{AttValue, EntityValue, ExternalIdentifier, ValueMode};
pub use misc::{Cdata, Comment, DeclPosition, Pi, XmlDecl};
pub use reference::{PeReference, RefMode, Reference};
pub use subset::{ConditionalSection, Doctype, Subset, SubsetMode};

use crate::core::chars::Codepoint;

pub(crate) const LT: Codepoint = '<' as Codepoint;
pub(crate) const GT: Codepoint = '>' as Codepoint;
pub(crate) const AMP: Codepoint = '&' as Codepoint;
pub(crate) const PERCENT: Codepoint = '%' as Codepoint;
pub(crate) const SEMI: Codepoint = ';' as Codepoint;
pub(crate) const EQ: Codepoint = '=' as Codepoint;
pub(crate) const SLASH: Codepoint = '/' as Codepoint;
pub(crate) const QMARK: Codepoint = '?' as Codepoint;
pub(crate) const BANG: Codepoint = '!' as Codepoint;
pub(crate) const DASH: Codepoint = '-' as Codepoint;
pub(crate) const HASH: Codepoint = '#' as Codepoint;
pub(crate) const LBRACKET: Codepoint = '[' as Codepoint;
pub(crate) const RBRACKET: Codepoint = ']' as Codepoint;
pub(crate) const LPAREN: Codepoint = '(' as Codepoint;
pub(crate) const RPAREN: Codepoint = ')' as Codepoint;
pub(crate) const PIPE: Codepoint = '|' as Codepoint;
pub(crate) const COMMA: Codepoint = ',' as Codepoint;
pub(crate) const LOWER_X: Codepoint = 'x' as Codepoint;

#[cfg(test)]
pub(crate) mod testing {
    //! Runs productions through a real pipeline

    use crate::dom::Document;
    use crate::error::Result;
    use crate::options::ParseOptions;

    pub fn parse_str(input: &str) -> Result<Document> {
        crate::parse(input, &ParseOptions::default())
    }

    pub fn failure(input: &str) -> String {
        match parse_str(input) {
            Ok(_) => panic!("expected {:?} to fail", input),
            Err(err) => err.to_string(),
        }
    }
}
