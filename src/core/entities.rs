//! XML Entity Helpers
//!
//! Handles the entity forms that never go through the expansion engine:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Declared entities always take precedence over the built-in table; the
//! built-ins are only a fallback for undeclared names.

use super::chars::{is_char, Codepoint};

/// Resolve one of the five predefined general entities
#[inline]
pub fn predefined(name: &str) -> Option<Codepoint> {
    let c = match name {
        "lt" => '<',
        "gt" => '>',
        "amp" => '&',
        "quot" => '"',
        "apos" => '\'',
        _ => return None,
    };
    Some(c as Codepoint)
}

/// Decode the digits of a character reference (without `&#`, `x` and `;`)
///
/// Returns `None` for empty input, overflow, or a value outside the
/// legal character set.
pub fn char_ref(digits: &str, hex: bool) -> Option<Codepoint> {
    if digits.is_empty() {
        return None;
    }
    let radix = if hex { 16 } else { 10 };
    let value = u32::from_str_radix(digits, radix).ok()?;
    is_char(value).then_some(value)
}

/// Encode a literal so it can be re-read inside a quoted attribute value
///
/// Picks the delimiter that does not occur in `raw`. Raw attribute default
/// literals never contain both quote characters.
pub fn quote_literal(raw: &str) -> String {
    let quote = if raw.contains('"') { '\'' } else { '"' };
    let mut out = String::with_capacity(raw.len() + 2);
    out.push(quote);
    out.push_str(raw);
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_entities() {
        assert_eq!(predefined("lt"), Some('<' as u32));
        assert_eq!(predefined("apos"), Some('\'' as u32));
        assert_eq!(predefined("nbsp"), None);
    }

    #[test]
    fn test_numeric_decimal() {
        assert_eq!(char_ref("65", false), Some(65));
    }

    #[test]
    fn test_numeric_hex() {
        assert_eq!(char_ref("1F600", true), Some(0x1F600));
        assert_eq!(char_ref("1f600", true), Some(0x1F600));
    }

    #[test]
    fn test_illegal_references() {
        assert_eq!(char_ref("0", false), None);
        assert_eq!(char_ref("D800", true), None);
        assert_eq!(char_ref("FFFE", true), None);
        assert_eq!(char_ref("99999999999", false), None);
        assert_eq!(char_ref("", true), None);
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("a&amp;b"), "\"a&amp;b\"");
        assert_eq!(quote_literal("say \"hi\""), "'say \"hi\"'");
    }
}
