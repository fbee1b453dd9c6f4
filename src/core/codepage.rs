//! Code page tables for legacy encodings
//!
//! Single-byte pages resolve the upper half (0x80-0xFF) through a 128-entry
//! table built once per decoder from `encoding_rs`. Shift_JIS resolves two
//! byte sequences through the same crate. Both are pure lookups: the
//! decoder owns all streaming state.

use encoding_rs::Encoding;

/// Marker for an undefined table entry
const UNDEFINED: u32 = u32::MAX;

/// A one-byte code page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePage {
    /// 7-bit ASCII; every byte above 0x7F is undefined
    Ascii,
    /// ISO-8859-1: bytes map directly to U+0000-U+00FF
    Latin1,
    /// Any other single-byte page known to `encoding_rs`
    Legacy(&'static Encoding),
}

impl CodePage {
    /// Build the upper-half lookup table for this page
    pub fn table(self) -> ByteTable {
        let mut upper = [UNDEFINED; 128];
        match self {
            CodePage::Ascii => {}
            CodePage::Latin1 => {
                for (i, slot) in upper.iter_mut().enumerate() {
                    *slot = 0x80 + i as u32;
                }
            }
            CodePage::Legacy(encoding) => {
                for (i, slot) in upper.iter_mut().enumerate() {
                    let byte = [0x80 + i as u8];
                    if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(&byte) {
                        let mut chars = text.chars();
                        if let (Some(c), None) = (chars.next(), chars.next()) {
                            *slot = c as u32;
                        }
                    }
                }
            }
        }
        ByteTable { upper: Box::new(upper) }
    }
}

/// Resolved upper half of a one-byte code page
#[derive(Debug, Clone)]
pub struct ByteTable {
    upper: Box<[u32; 128]>,
}

impl ByteTable {
    /// Look up one byte; `None` when the page leaves it undefined
    #[inline]
    pub fn lookup(&self, byte: u8) -> Option<u32> {
        if byte < 0x80 {
            return Some(byte as u32);
        }
        match self.upper[(byte - 0x80) as usize] {
            UNDEFINED => None,
            cp => Some(cp),
        }
    }
}

/// Shift_JIS byte classes
pub mod shift_jis {
    /// Bytes that stand alone: ASCII and half-width katakana
    #[inline]
    pub fn is_single(byte: u8) -> bool {
        byte < 0x80 || (0xA1..=0xDF).contains(&byte)
    }

    /// Bytes that open a two-byte sequence
    #[inline]
    pub fn is_lead(byte: u8) -> bool {
        matches!(byte, 0x81..=0x9F | 0xE0..=0xFC)
    }

    /// Single-byte lookup
    #[inline]
    pub fn single(byte: u8) -> Option<u32> {
        match byte {
            0x00..=0x7F => Some(byte as u32),
            0xA1..=0xDF => Some(0xFF61 + (byte - 0xA1) as u32),
            _ => None,
        }
    }

    /// Two-byte lookup keyed by the combined 16-bit value
    pub fn double(lead: u8, trail: u8) -> Option<u32> {
        let bytes = [lead, trail];
        let text = encoding_rs::SHIFT_JIS.decode_without_bom_handling_and_without_replacement(&bytes)?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c as u32),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_identity() {
        let table = CodePage::Latin1.table();
        assert_eq!(table.lookup(0x41), Some(0x41));
        assert_eq!(table.lookup(0xE9), Some(0xE9));
    }

    #[test]
    fn test_ascii_rejects_high_bytes() {
        let table = CodePage::Ascii.table();
        assert_eq!(table.lookup(0x7F), Some(0x7F));
        assert_eq!(table.lookup(0x80), None);
    }

    #[test]
    fn test_windows_1252_euro() {
        let table = CodePage::Legacy(encoding_rs::WINDOWS_1252).table();
        assert_eq!(table.lookup(0x80), Some(0x20AC));
    }

    #[test]
    fn test_koi8r() {
        let table = CodePage::Legacy(encoding_rs::KOI8_R).table();
        // 0xC1 is CYRILLIC SMALL LETTER A
        assert_eq!(table.lookup(0xC1), Some(0x0430));
    }

    #[test]
    fn test_shift_jis_lookups() {
        assert_eq!(shift_jis::single(0xB1), Some(0xFF71));
        assert!(shift_jis::is_lead(0x82));
        // 0x82A0 is HIRAGANA LETTER A
        assert_eq!(shift_jis::double(0x82, 0xA0), Some(0x3042));
        assert_eq!(shift_jis::single(0x80), None);
    }
}
