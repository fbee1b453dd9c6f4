//! XML 1.0 character classes
//!
//! Pure predicates over codepoints. `EOF` is a distinguished value outside
//! the Unicode range so it never satisfies any class.

/// Codepoint type flowing through the grammar
pub type Codepoint = u32;

/// End-of-input marker, distinct from every legal value
pub const EOF: Codepoint = u32::MAX;

pub const TAB: Codepoint = 0x09;
pub const LF: Codepoint = 0x0A;
pub const CR: Codepoint = 0x0D;
pub const SPACE: Codepoint = 0x20;

/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_char(cp: Codepoint) -> bool {
    matches!(cp,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// S ::= (#x20 | #x9 | #xD | #xA)+
#[inline]
pub fn is_whitespace(cp: Codepoint) -> bool {
    matches!(cp, 0x20 | 0x9 | 0xD | 0xA)
}

/// NameStartChar (fifth edition)
pub fn is_name_start(cp: Codepoint) -> bool {
    matches!(cp,
        0x3A // ':'
        | 0x41..=0x5A
        | 0x5F // '_'
        | 0x61..=0x7A
        | 0xC0..=0xD6
        | 0xD8..=0xF6
        | 0xF8..=0x2FF
        | 0x370..=0x37D
        | 0x37F..=0x1FFF
        | 0x200C..=0x200D
        | 0x2070..=0x218F
        | 0x2C00..=0x2FEF
        | 0x3001..=0xD7FF
        | 0xF900..=0xFDCF
        | 0xFDF0..=0xFFFD
        | 0x10000..=0xEFFFF
    )
}

/// NameChar (fifth edition)
pub fn is_name_char(cp: Codepoint) -> bool {
    is_name_start(cp)
        || matches!(cp,
            0x2D | 0x2E // '-', '.'
            | 0x30..=0x39
            | 0xB7
            | 0x300..=0x36F
            | 0x203F..=0x2040
        )
}

/// PubidChar ::= #x20 | #xD | #xA | [a-zA-Z0-9] | [-'()+,./:=?;!*#@$_%]
pub fn is_pubid_char(cp: Codepoint) -> bool {
    match char::from_u32(cp) {
        Some(c) if c.is_ascii_alphanumeric() => true,
        Some(c) => " \r\n-'()+,./:=?;!*#@$_%".contains(c),
        None => false,
    }
}

/// First character of an EncName: [A-Za-z]
#[inline]
pub fn is_enc_name_start(cp: Codepoint) -> bool {
    matches!(cp, 0x41..=0x5A | 0x61..=0x7A)
}

/// Remaining EncName characters: [A-Za-z0-9._] | '-'
#[inline]
pub fn is_enc_name_char(cp: Codepoint) -> bool {
    is_enc_name_start(cp) || matches!(cp, 0x30..=0x39 | 0x2E | 0x5F | 0x2D)
}

#[inline]
pub fn is_decimal_digit(cp: Codepoint) -> bool {
    matches!(cp, 0x30..=0x39)
}

#[inline]
pub fn is_hex_digit(cp: Codepoint) -> bool {
    matches!(cp, 0x30..=0x39 | 0x41..=0x46 | 0x61..=0x66)
}

/// Quote delimiters for literals
#[inline]
pub fn is_quote(cp: Codepoint) -> bool {
    cp == '"' as u32 || cp == '\'' as u32
}

/// Convert a codepoint to `char`, mapping non-scalars to U+FFFD
#[inline]
pub fn to_char(cp: Codepoint) -> char {
    char::from_u32(cp).unwrap_or('\u{FFFD}')
}

/// Collect codepoints into a `String`
pub fn to_string(cps: &[Codepoint]) -> String {
    cps.iter().map(|&cp| to_char(cp)).collect()
}

/// Explode a string into codepoints
pub fn codepoints(s: &str) -> Vec<Codepoint> {
    s.chars().map(|c| c as Codepoint).collect()
}

/// Human-readable rendering of a codepoint for messages
pub fn describe(cp: Codepoint) -> String {
    match cp {
        EOF => "end of input".to_string(),
        0x9 => "\\t".to_string(),
        0xA => "\\n".to_string(),
        0xD => "\\r".to_string(),
        _ if cp < 0x20 || !is_char(cp) => format!("U+{:04X}", cp),
        _ => to_char(cp).to_string(),
    }
}
