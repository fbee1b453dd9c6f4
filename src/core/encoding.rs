//! XML Encoding Identification
//!
//! Encoding labels, byte-order-mark and signature tables used to sniff the
//! first four bytes of an entity, and the width/order/family attributes the
//! decoder consults before allowing an in-band encoding change.

use super::codepage::CodePage;
use crate::error::{Error, Result};

/// Order of bytes within a 16 or 32-bit unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// 1234
    Big,
    /// 4321
    Little,
    /// 2143, one of the two unusual UCS-4 orders
    Unusual2143,
    /// 3412, the other unusual UCS-4 order
    Unusual3412,
}

/// How bytes become codepoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Utf8,
    /// UTF-16 when `surrogates` is true, UCS-2 otherwise
    Utf16 { surrogates: bool },
    Ucs4,
    SingleByte(CodePage),
    ShiftJis,
}

/// An encoding identifier with its (possibly unfixed) byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlEncoding {
    pub name: &'static str,
    pub scheme: Scheme,
    pub order: Option<ByteOrder>,
}

impl XmlEncoding {
    pub const UTF8: XmlEncoding = XmlEncoding { name: "UTF-8", scheme: Scheme::Utf8, order: None };

    const fn multi(name: &'static str, scheme: Scheme, order: ByteOrder) -> Self {
        XmlEncoding { name, scheme, order: Some(order) }
    }

    /// Bytes per unit: 1 for all 8-bit forms, 2 for UTF-16/UCS-2, 4 for UCS-4
    pub fn width(&self) -> usize {
        match self.scheme {
            Scheme::Utf8 | Scheme::SingleByte(_) | Scheme::ShiftJis => 1,
            Scheme::Utf16 { .. } => 2,
            Scheme::Ucs4 => 4,
        }
    }

    /// Code page family; encodings in one family decode identical bytes identically
    pub fn family(&self) -> &'static str {
        match self.scheme {
            Scheme::Utf8 => "UTF-8",
            Scheme::Utf16 { .. } => "UTF-16",
            Scheme::Ucs4 => "UCS-4",
            Scheme::ShiftJis => "Shift_JIS",
            Scheme::SingleByte(CodePage::Ascii) => "US-ASCII",
            Scheme::SingleByte(CodePage::Latin1) => "ISO-8859-1",
            Scheme::SingleByte(CodePage::Legacy(encoding)) => encoding.name(),
        }
    }

    /// Whether surrogate pairs may appear
    pub fn allows_surrogates(&self) -> bool {
        !matches!(self.scheme, Scheme::Utf16 { surrogates: false })
    }

    /// Byte order to use when none was fixed by a BOM or signature
    pub fn effective_order(&self) -> ByteOrder {
        self.order.unwrap_or(ByteOrder::Big)
    }

    /// Look up an encoding label (case-insensitive)
    pub fn from_label(label: &str) -> Result<Self> {
        lookup(label).ok_or_else(|| Error::UnknownEncoding(label.to_string()))
    }
}

impl std::fmt::Display for XmlEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.scheme, self.order) {
            (Scheme::Ucs4, Some(ByteOrder::Unusual2143)) => write!(f, "{} (2143)", self.name),
            (Scheme::Ucs4, Some(ByteOrder::Unusual3412)) => write!(f, "{} (3412)", self.name),
            _ => f.write_str(self.name),
        }
    }
}

fn lookup(label: &str) -> Option<XmlEncoding> {
    use encoding_rs as e;
    use ByteOrder::*;

    let upper = label.trim().to_ascii_uppercase();
    let single = |name: &'static str, page: CodePage| XmlEncoding { name, scheme: Scheme::SingleByte(page), order: None };
    let legacy = |name: &'static str, encoding: &'static e::Encoding| single(name, CodePage::Legacy(encoding));

    Some(match upper.as_str() {
        "UTF-8" | "UTF8" => XmlEncoding::UTF8,
        "UTF-16" | "UNICODE" => XmlEncoding { name: "UTF-16", scheme: Scheme::Utf16 { surrogates: true }, order: None },
        "UTF-16BE" => XmlEncoding::multi("UTF-16BE", Scheme::Utf16 { surrogates: true }, Big),
        "UTF-16LE" => XmlEncoding::multi("UTF-16LE", Scheme::Utf16 { surrogates: true }, Little),
        "ISO-10646-UCS-2" | "UCS-2" | "CSUNICODE" => {
            XmlEncoding { name: "ISO-10646-UCS-2", scheme: Scheme::Utf16 { surrogates: false }, order: None }
        }
        "UCS-2BE" => XmlEncoding::multi("UCS-2BE", Scheme::Utf16 { surrogates: false }, Big),
        "UCS-2LE" => XmlEncoding::multi("UCS-2LE", Scheme::Utf16 { surrogates: false }, Little),
        "ISO-10646-UCS-4" | "UCS-4" | "UTF-32" | "CSUCS4" => {
            XmlEncoding { name: "ISO-10646-UCS-4", scheme: Scheme::Ucs4, order: None }
        }
        "UTF-32BE" | "UCS-4BE" => XmlEncoding::multi("UTF-32BE", Scheme::Ucs4, Big),
        "UTF-32LE" | "UCS-4LE" => XmlEncoding::multi("UTF-32LE", Scheme::Ucs4, Little),
        "US-ASCII" | "ASCII" | "ANSI_X3.4-1968" | "ISO646-US" | "CSASCII" => single("US-ASCII", CodePage::Ascii),
        "ISO-8859-1" | "ISO_8859-1" | "LATIN1" | "L1" | "CP819" | "IBM819" => single("ISO-8859-1", CodePage::Latin1),
        "ISO-8859-2" | "ISO_8859-2" | "LATIN2" | "L2" => legacy("ISO-8859-2", e::ISO_8859_2),
        "ISO-8859-3" | "ISO_8859-3" | "LATIN3" | "L3" => legacy("ISO-8859-3", e::ISO_8859_3),
        "ISO-8859-4" | "ISO_8859-4" | "LATIN4" | "L4" => legacy("ISO-8859-4", e::ISO_8859_4),
        "ISO-8859-5" | "ISO_8859-5" | "CYRILLIC" => legacy("ISO-8859-5", e::ISO_8859_5),
        "ISO-8859-6" | "ISO_8859-6" | "ARABIC" => legacy("ISO-8859-6", e::ISO_8859_6),
        "ISO-8859-7" | "ISO_8859-7" | "GREEK" => legacy("ISO-8859-7", e::ISO_8859_7),
        "ISO-8859-8" | "ISO_8859-8" | "HEBREW" => legacy("ISO-8859-8", e::ISO_8859_8),
        "ISO-8859-10" | "ISO_8859-10" | "LATIN6" | "L6" => legacy("ISO-8859-10", e::ISO_8859_10),
        "ISO-8859-13" | "ISO_8859-13" => legacy("ISO-8859-13", e::ISO_8859_13),
        "ISO-8859-14" | "ISO_8859-14" | "LATIN8" => legacy("ISO-8859-14", e::ISO_8859_14),
        "ISO-8859-15" | "ISO_8859-15" | "LATIN9" => legacy("ISO-8859-15", e::ISO_8859_15),
        "ISO-8859-16" | "ISO_8859-16" | "LATIN10" => legacy("ISO-8859-16", e::ISO_8859_16),
        "WINDOWS-874" | "CP874" => legacy("windows-874", e::WINDOWS_874),
        "WINDOWS-1250" | "CP1250" => legacy("windows-1250", e::WINDOWS_1250),
        "WINDOWS-1251" | "CP1251" => legacy("windows-1251", e::WINDOWS_1251),
        "WINDOWS-1252" | "CP1252" => legacy("windows-1252", e::WINDOWS_1252),
        "WINDOWS-1253" | "CP1253" => legacy("windows-1253", e::WINDOWS_1253),
        "WINDOWS-1254" | "CP1254" => legacy("windows-1254", e::WINDOWS_1254),
        "WINDOWS-1255" | "CP1255" => legacy("windows-1255", e::WINDOWS_1255),
        "WINDOWS-1256" | "CP1256" => legacy("windows-1256", e::WINDOWS_1256),
        "WINDOWS-1257" | "CP1257" => legacy("windows-1257", e::WINDOWS_1257),
        "WINDOWS-1258" | "CP1258" => legacy("windows-1258", e::WINDOWS_1258),
        "KOI8-R" => legacy("KOI8-R", e::KOI8_R),
        "KOI8-U" => legacy("KOI8-U", e::KOI8_U),
        "IBM866" | "CP866" => legacy("IBM866", e::IBM866),
        "MACINTOSH" | "MAC" | "X-MAC-ROMAN" | "CSMACINTOSH" => legacy("macintosh", e::MACINTOSH),
        "SHIFT_JIS" | "SHIFT-JIS" | "SJIS" | "MS_KANJI" | "WINDOWS-31J" | "CSSHIFTJIS" => {
            XmlEncoding { name: "Shift_JIS", scheme: Scheme::ShiftJis, order: None }
        }
        _ => return None,
    })
}

/// Byte-order marks; longest entries first. Matched bytes are consumed.
pub const BYTE_ORDER_MARKS: &[(&[u8], XmlEncoding)] = &[
    (&[0x00, 0x00, 0xFE, 0xFF], XmlEncoding::multi("ISO-10646-UCS-4", Scheme::Ucs4, ByteOrder::Big)),
    (&[0xFF, 0xFE, 0x00, 0x00], XmlEncoding::multi("ISO-10646-UCS-4", Scheme::Ucs4, ByteOrder::Little)),
    (&[0x00, 0x00, 0xFF, 0xFE], XmlEncoding::multi("ISO-10646-UCS-4", Scheme::Ucs4, ByteOrder::Unusual2143)),
    (&[0xFE, 0xFF, 0x00, 0x00], XmlEncoding::multi("ISO-10646-UCS-4", Scheme::Ucs4, ByteOrder::Unusual3412)),
    (&[0xEF, 0xBB, 0xBF], XmlEncoding::UTF8),
    (&[0xFE, 0xFF], XmlEncoding::multi("UTF-16", Scheme::Utf16 { surrogates: true }, ByteOrder::Big)),
    (&[0xFF, 0xFE], XmlEncoding::multi("UTF-16", Scheme::Utf16 { surrogates: true }, ByteOrder::Little)),
];

/// "<" and "<?" in each multi-byte order; matched bytes are real content.
pub const SIGNATURES: &[(&[u8], XmlEncoding)] = &[
    (&[0x00, 0x00, 0x00, 0x3C], XmlEncoding::multi("ISO-10646-UCS-4", Scheme::Ucs4, ByteOrder::Big)),
    (&[0x3C, 0x00, 0x00, 0x00], XmlEncoding::multi("ISO-10646-UCS-4", Scheme::Ucs4, ByteOrder::Little)),
    (&[0x00, 0x00, 0x3C, 0x00], XmlEncoding::multi("ISO-10646-UCS-4", Scheme::Ucs4, ByteOrder::Unusual2143)),
    (&[0x00, 0x3C, 0x00, 0x00], XmlEncoding::multi("ISO-10646-UCS-4", Scheme::Ucs4, ByteOrder::Unusual3412)),
    (&[0x00, 0x3C, 0x00, 0x3F], XmlEncoding::multi("UTF-16BE", Scheme::Utf16 { surrogates: true }, ByteOrder::Big)),
    (&[0x3C, 0x00, 0x3F, 0x00], XmlEncoding::multi("UTF-16LE", Scheme::Utf16 { surrogates: true }, ByteOrder::Little)),
    (&[0x00, 0x3C], XmlEncoding::multi("UTF-16BE", Scheme::Utf16 { surrogates: true }, ByteOrder::Big)),
    (&[0x3C, 0x00], XmlEncoding::multi("UTF-16LE", Scheme::Utf16 { surrogates: true }, ByteOrder::Little)),
];

/// Find the first table entry that prefixes `head`
pub fn match_table(table: &[(&[u8], XmlEncoding)], head: &[u8]) -> Option<(usize, XmlEncoding)> {
    table
        .iter()
        .find(|(prefix, _)| head.starts_with(prefix))
        .map(|(prefix, encoding)| (prefix.len(), *encoding))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_case_insensitive() {
        assert_eq!(XmlEncoding::from_label("utf-8").unwrap(), XmlEncoding::UTF8);
        assert_eq!(XmlEncoding::from_label("Shift_JIS").unwrap().scheme, Scheme::ShiftJis);
        assert_eq!(XmlEncoding::from_label("latin1").unwrap().name, "ISO-8859-1");
    }

    #[test]
    fn test_unknown_label() {
        assert_eq!(
            XmlEncoding::from_label("EBCDIC-XYZ"),
            Err(Error::UnknownEncoding("EBCDIC-XYZ".into()))
        );
    }

    #[test]
    fn test_widths() {
        assert_eq!(XmlEncoding::from_label("UTF-16").unwrap().width(), 2);
        assert_eq!(XmlEncoding::from_label("UCS-4").unwrap().width(), 4);
        assert_eq!(XmlEncoding::from_label("KOI8-R").unwrap().width(), 1);
    }

    #[test]
    fn test_bom_table_prefers_ucs4() {
        let (len, enc) = match_table(BYTE_ORDER_MARKS, &[0xFF, 0xFE, 0x00, 0x00]).unwrap();
        assert_eq!(len, 4);
        assert_eq!(enc.scheme, Scheme::Ucs4);
        let (len, enc) = match_table(BYTE_ORDER_MARKS, &[0xFF, 0xFE, 0x3C, 0x00]).unwrap();
        assert_eq!(len, 2);
        assert_eq!(enc.order, Some(ByteOrder::Little));
    }

    #[test]
    fn test_signature_table() {
        let (_, enc) = match_table(SIGNATURES, &[0x3C, 0x00, 0x3F, 0x00]).unwrap();
        assert_eq!(enc.name, "UTF-16LE");
        assert!(match_table(SIGNATURES, b"<?xm").is_none());
    }

    #[test]
    fn test_ucs2_disallows_surrogates() {
        assert!(!XmlEncoding::from_label("UCS-2").unwrap().allows_surrogates());
        assert!(XmlEncoding::from_label("UTF-16").unwrap().allows_surrogates());
    }
}
