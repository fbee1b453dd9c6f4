//! Core XML primitives
//!
//! This module contains the building blocks below the grammar:
//! - Chars: XML 1.0 character class predicates
//! - CodePage: single and double-byte lookup tables
//! - Encoding: labels, byte-order marks and signatures
//! - Decoder: pull-based byte to codepoint conversion with sniffing
//! - Entities: predefined entities and character references
//! - DTD: declaration store consulted during parsing

pub mod chars;
pub mod codepage;
pub mod decoder;
pub mod dtd;
pub mod encoding;
pub mod entities;
