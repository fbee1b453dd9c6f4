//! Byte to codepoint decoder
//!
//! Accepts byte chunks in order and yields normalized codepoints on demand.
//! Decoding is lazy: bytes are only converted when the driver pulls the next
//! codepoint, so an in-band encoding declaration takes effect exactly at the
//! byte following the declaration.

use std::collections::VecDeque;

use log::debug;

use super::chars::{Codepoint, CR, LF};
use super::codepage::{shift_jis, ByteTable};
use super::encoding::{match_table, ByteOrder, Scheme, XmlEncoding, BYTE_ORDER_MARKS, SIGNATURES};
use crate::error::{Error, Result};

/// Outcome of pulling one codepoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    Char(Codepoint),
    /// More bytes are needed, or the decoder is halted
    Wait,
    /// Input ended and every byte was decoded
    End,
}

/// Streaming decoder state for one entity
#[derive(Debug)]
pub struct Decoder {
    encoding: XmlEncoding,
    table: Option<ByteTable>,
    /// Caller-declared encoding; in-band declarations are ignored
    explicit: bool,
    /// Input arrived as already-decoded text
    textual: bool,
    sniffed: bool,
    order_fixed: bool,
    bom_seen: bool,
    non_ascii_seen: bool,
    surrogates_seen: bool,
    bytes: Vec<u8>,
    cursor: usize,
    /// Decoded but not yet delivered
    queue: VecDeque<Codepoint>,
    after_cr: bool,
    halted: bool,
    ended: bool,
}

impl Decoder {
    /// Create a decoder, validating an explicit encoding immediately
    pub fn new(explicit: Option<&str>) -> Result<Self> {
        let encoding = match explicit {
            Some(label) => XmlEncoding::from_label(label)?,
            None => XmlEncoding::UTF8,
        };
        Ok(Decoder {
            table: table_for(&encoding),
            encoding,
            explicit: explicit.is_some(),
            textual: false,
            sniffed: false,
            order_fixed: false,
            bom_seen: false,
            non_ascii_seen: false,
            surrogates_seen: false,
            bytes: Vec::new(),
            cursor: 0,
            queue: VecDeque::new(),
            after_cr: false,
            halted: false,
            ended: false,
        })
    }

    /// The active encoding
    pub fn encoding(&self) -> XmlEncoding {
        self.encoding
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Suspend delivery; already decoded codepoints stay queued
    pub fn halt(&mut self) {
        self.halted = true;
    }

    /// Resume delivery, replaying queued codepoints first
    pub fn resume(&mut self) {
        self.halted = false;
    }

    /// Accept the next chunk of bytes
    pub fn write(&mut self, chunk: &[u8]) -> Result<()> {
        if self.halted {
            return Err(Error::Halted);
        }
        if self.ended {
            return Err(Error::Finished);
        }
        if self.cursor > 0 && self.cursor == self.bytes.len() {
            self.bytes.clear();
            self.cursor = 0;
        }
        self.bytes.extend_from_slice(chunk);
        Ok(())
    }

    /// Accept already-decoded text; no sniffing or code page applies
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        if self.halted {
            return Err(Error::Halted);
        }
        if self.ended {
            return Err(Error::Finished);
        }
        let mut chars = text.chars().peekable();
        if !self.textual && !self.sniffed && chars.peek() == Some(&'\u{FEFF}') {
            chars.next();
        }
        self.textual = true;
        self.sniffed = true;
        for c in chars {
            if let Some(cp) = self.normalize(c as Codepoint) {
                self.queue.push_back(cp);
            }
        }
        Ok(())
    }

    /// Signal end of input
    pub fn end(&mut self) {
        self.ended = true;
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Pull the next normalized codepoint
    pub fn next(&mut self) -> Result<Pull> {
        loop {
            if self.halted {
                return Ok(Pull::Wait);
            }
            if let Some(cp) = self.queue.pop_front() {
                return Ok(Pull::Char(cp));
            }
            if !self.sniffed && !self.sniff()? {
                return Ok(if self.ended { Pull::End } else { Pull::Wait });
            }
            match self.decode_one()? {
                Some(raw) => {
                    if let Some(cp) = self.normalize(raw) {
                        return Ok(Pull::Char(cp));
                    }
                }
                None if self.ended => {
                    let reserved = self.bytes.len() - self.cursor;
                    if reserved > 0 {
                        return Err(Error::Truncated(reserved));
                    }
                    return Ok(Pull::End);
                }
                None => return Ok(Pull::Wait),
            }
        }
    }

    /// Apply an in-band encoding declaration under the transition rule
    pub fn set_encoding(&mut self, label: &str) -> Result<()> {
        let next = XmlEncoding::from_label(label)?;
        if self.explicit || self.textual {
            debug!("ignoring in-band encoding {} (active: {})", next, self.encoding);
            return Ok(());
        }
        let current = self.encoding;
        let conflict = |reason: &'static str| Error::EncodingConflict {
            from: current.to_string(),
            to: next.to_string(),
            reason,
        };

        if (self.non_ascii_seen || self.bom_seen) && next.family() != current.family() {
            return Err(conflict("code page family differs after non-ASCII content or a byte order mark"));
        }
        if next.width() != current.width() {
            return Err(conflict("byte width differs"));
        }
        if self.order_fixed {
            if let Some(order) = next.order {
                if Some(order) != current.order {
                    return Err(conflict("byte order differs"));
                }
            }
        }
        if self.surrogates_seen && !next.allows_surrogates() {
            return Err(conflict("surrogate pairs were already decoded"));
        }

        let order = if self.order_fixed { current.order } else { next.order };
        self.encoding = XmlEncoding { order, ..next };
        self.table = table_for(&self.encoding);
        debug!("encoding switched from {} to {}", current, self.encoding);
        Ok(())
    }

    /// Resolve the encoding from the first four bytes; false if too few
    fn sniff(&mut self) -> Result<bool> {
        let head = &self.bytes[self.cursor..];
        if head.len() < 4 && !self.ended {
            return Ok(false);
        }
        self.sniffed = true;

        if head.len() < 4 {
            debug!("fewer than four bytes; decoding as {}", self.encoding);
            return Ok(true);
        }

        if self.explicit {
            if let Some((len, bom)) = match_table(BYTE_ORDER_MARKS, head) {
                let declared = self.encoding;
                let consistent = bom.family() == declared.family()
                    && declared.order.is_none_or(|order| Some(order) == bom.order);
                if !consistent {
                    return Err(Error::EncodingConflict {
                        from: bom.to_string(),
                        to: declared.to_string(),
                        reason: "byte order mark contradicts the declared encoding",
                    });
                }
                self.cursor += len;
                self.bom_seen = true;
                if bom.order.is_some() {
                    self.encoding.order = bom.order;
                    self.order_fixed = true;
                }
            }
            debug!("using declared encoding {}", self.encoding);
            return Ok(true);
        }

        if let Some((len, bom)) = match_table(BYTE_ORDER_MARKS, head) {
            self.cursor += len;
            self.bom_seen = true;
            self.adopt(bom);
            debug!("byte order mark selects {}", self.encoding);
        } else if let Some((_, signature)) = match_table(SIGNATURES, head) {
            self.adopt(signature);
            debug!("signature selects {}", self.encoding);
        }
        Ok(true)
    }

    fn adopt(&mut self, encoding: XmlEncoding) {
        self.order_fixed = encoding.order.is_some();
        self.encoding = encoding;
        self.table = table_for(&encoding);
    }

    /// Collapse CR LF and lone CR to LF, across chunk boundaries
    fn normalize(&mut self, raw: Codepoint) -> Option<Codepoint> {
        if self.after_cr {
            self.after_cr = false;
            if raw == LF {
                return None;
            }
        }
        if raw == CR {
            self.after_cr = true;
            return Some(LF);
        }
        Some(raw)
    }

    /// Convert one codepoint; `None` when the remaining bytes are reserved
    fn decode_one(&mut self) -> Result<Option<Codepoint>> {
        let available = &self.bytes[self.cursor..];
        if available.is_empty() {
            return Ok(None);
        }
        let decoded = match self.encoding.scheme {
            Scheme::Utf8 => decode_utf8(available)?,
            Scheme::Utf16 { surrogates } => {
                let order = self.encoding.effective_order();
                let step = decode_utf16(available, order, surrogates)?;
                if matches!(step, Some((cp, _)) if cp >= 0x10000) {
                    self.surrogates_seen = true;
                }
                step
            }
            Scheme::Ucs4 => decode_ucs4(available, self.encoding.effective_order())?,
            Scheme::SingleByte(_) => {
                let byte = available[0];
                let cp = self
                    .table
                    .as_ref()
                    .and_then(|table| table.lookup(byte))
                    .ok_or_else(|| undefined(&[byte], &self.encoding))?;
                Some((cp, 1))
            }
            Scheme::ShiftJis => decode_shift_jis(available, &self.encoding)?,
        };
        Ok(decoded.map(|(cp, len)| {
            self.cursor += len;
            if cp >= 0x80 {
                self.non_ascii_seen = true;
            }
            cp
        }))
    }
}

fn table_for(encoding: &XmlEncoding) -> Option<ByteTable> {
    match encoding.scheme {
        Scheme::SingleByte(page) => Some(page.table()),
        _ => None,
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("0x{:02X}", b)).collect::<Vec<_>>().join(" ")
}

fn undefined(bytes: &[u8], encoding: &XmlEncoding) -> Error {
    Error::Decode(format!("{} is undefined in {}", hex(bytes), encoding))
}

fn decode_utf8(bytes: &[u8]) -> Result<Option<(Codepoint, usize)>> {
    let lead = bytes[0];
    let (len, initial) = match lead {
        0x00..=0x7F => return Ok(Some((lead as Codepoint, 1))),
        0xC2..=0xDF => (2, (lead & 0x1F) as Codepoint),
        0xE0..=0xEF => (3, (lead & 0x0F) as Codepoint),
        0xF0..=0xF4 => (4, (lead & 0x07) as Codepoint),
        _ => return Err(Error::Decode(format!("invalid UTF-8 leading byte {}", hex(&[lead])))),
    };

    let present = &bytes[..bytes.len().min(len)];
    // Second-byte ranges that exclude overlongs, surrogates and values above U+10FFFF
    let second_ok = |b: u8| match lead {
        0xE0 => (0xA0..=0xBF).contains(&b),
        0xED => (0x80..=0x9F).contains(&b),
        0xF0 => (0x90..=0xBF).contains(&b),
        0xF4 => (0x80..=0x8F).contains(&b),
        _ => (0x80..=0xBF).contains(&b),
    };
    for (i, &b) in present.iter().enumerate().skip(1) {
        let valid = if i == 1 { second_ok(b) } else { b & 0xC0 == 0x80 };
        if !valid {
            return Err(Error::Decode(format!(
                "invalid UTF-8 continuation in sequence {}",
                hex(&present[..=i])
            )));
        }
    }
    if present.len() < len {
        return Ok(None);
    }

    let cp = present[1..]
        .iter()
        .fold(initial, |acc, &b| (acc << 6) | (b & 0x3F) as Codepoint);
    Ok(Some((cp, len)))
}

fn unit16(bytes: &[u8], order: ByteOrder) -> u32 {
    match order {
        ByteOrder::Little => u16::from_le_bytes([bytes[0], bytes[1]]) as u32,
        _ => u16::from_be_bytes([bytes[0], bytes[1]]) as u32,
    }
}

fn decode_utf16(bytes: &[u8], order: ByteOrder, surrogates: bool) -> Result<Option<(Codepoint, usize)>> {
    if bytes.len() < 2 {
        return Ok(None);
    }
    let high = unit16(bytes, order);
    match high {
        0xD800..=0xDFFF if !surrogates => Err(Error::Decode(format!(
            "surrogate unit {} is not allowed without surrogate support",
            hex(&bytes[..2])
        ))),
        0xD800..=0xDBFF => {
            if bytes.len() < 4 {
                return Ok(None);
            }
            let low = unit16(&bytes[2..], order);
            if !(0xDC00..=0xDFFF).contains(&low) {
                return Err(Error::Decode(format!(
                    "high surrogate not followed by a low surrogate: {}",
                    hex(&bytes[..4])
                )));
            }
            Ok(Some((0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00), 4)))
        }
        0xDC00..=0xDFFF => Err(Error::Decode(format!("unpaired low surrogate {}", hex(&bytes[..2])))),
        _ => Ok(Some((high, 2))),
    }
}

fn decode_ucs4(bytes: &[u8], order: ByteOrder) -> Result<Option<(Codepoint, usize)>> {
    if bytes.len() < 4 {
        return Ok(None);
    }
    let [b0, b1, b2, b3] = [bytes[0], bytes[1], bytes[2], bytes[3]];
    let ordered = match order {
        ByteOrder::Big => [b0, b1, b2, b3],
        ByteOrder::Little => [b3, b2, b1, b0],
        ByteOrder::Unusual2143 => [b1, b0, b3, b2],
        ByteOrder::Unusual3412 => [b2, b3, b0, b1],
    };
    let cp = u32::from_be_bytes(ordered);
    if cp > 0x10FFFF {
        return Err(Error::Decode(format!("{} is outside the Unicode range", hex(&bytes[..4]))));
    }
    Ok(Some((cp, 4)))
}

fn decode_shift_jis(bytes: &[u8], encoding: &XmlEncoding) -> Result<Option<(Codepoint, usize)>> {
    let lead = bytes[0];
    if shift_jis::is_single(lead) {
        return shift_jis::single(lead)
            .map(|cp| Some((cp, 1)))
            .ok_or_else(|| undefined(&[lead], encoding));
    }
    if !shift_jis::is_lead(lead) {
        return Err(undefined(&[lead], encoding));
    }
    if bytes.len() < 2 {
        return Ok(None);
    }
    shift_jis::double(lead, bytes[1])
        .map(|cp| Some((cp, 2)))
        .ok_or_else(|| undefined(&bytes[..2], encoding))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chars::codepoints;

    fn drain(decoder: &mut Decoder) -> Result<Vec<Codepoint>> {
        let mut out = Vec::new();
        loop {
            match decoder.next()? {
                Pull::Char(cp) => out.push(cp),
                Pull::Wait | Pull::End => return Ok(out),
            }
        }
    }

    fn decode_bytes(explicit: Option<&str>, bytes: &[u8]) -> Result<Vec<Codepoint>> {
        let mut decoder = Decoder::new(explicit)?;
        decoder.write(bytes)?;
        decoder.end();
        drain(&mut decoder)
    }

    const SAMPLE: &str = "<doc a='é'>Ωmega ☃ 𝄞</doc>";

    fn utf16(text: &str, little: bool) -> Vec<u8> {
        text.encode_utf16()
            .flat_map(|u| if little { u.to_le_bytes() } else { u.to_be_bytes() })
            .collect()
    }

    fn ucs4(text: &str, order: ByteOrder) -> Vec<u8> {
        text.chars()
            .flat_map(|c| {
                let [a, b, c, d] = (c as u32).to_be_bytes();
                match order {
                    ByteOrder::Big => [a, b, c, d],
                    ByteOrder::Little => [d, c, b, a],
                    ByteOrder::Unusual2143 => [b, a, d, c],
                    ByteOrder::Unusual3412 => [c, d, a, b],
                }
            })
            .collect()
    }

    #[test]
    fn test_utf8_round_trip() {
        assert_eq!(decode_bytes(None, SAMPLE.as_bytes()).unwrap(), codepoints(SAMPLE));
    }

    #[test]
    fn test_utf16_round_trip_by_signature() {
        for little in [false, true] {
            let decoded = decode_bytes(None, &utf16(SAMPLE, little)).unwrap();
            assert_eq!(decoded, codepoints(SAMPLE));
        }
    }

    #[test]
    fn test_ucs4_round_trip_all_orders() {
        for order in [ByteOrder::Big, ByteOrder::Little, ByteOrder::Unusual2143, ByteOrder::Unusual3412] {
            let decoded = decode_bytes(None, &ucs4(SAMPLE, order)).unwrap();
            assert_eq!(decoded, codepoints(SAMPLE), "order {:?}", order);
        }
    }

    #[test]
    fn test_legacy_round_trips() {
        let cases: &[(&str, &'static encoding_rs::Encoding, &str)] = &[
            ("windows-1252", encoding_rs::WINDOWS_1252, "<p>€ café</p>"),
            ("ISO-8859-5", encoding_rs::ISO_8859_5, "<p>Привет</p>"),
            ("KOI8-R", encoding_rs::KOI8_R, "<p>мир</p>"),
            ("ISO-8859-7", encoding_rs::ISO_8859_7, "<p>Ωμέγα</p>"),
            ("Shift_JIS", encoding_rs::SHIFT_JIS, "<p>あいう ｱｲｳ</p>"),
        ];
        for (label, encoding, text) in cases {
            let (bytes, _, unmappable) = encoding.encode(text);
            assert!(!unmappable);
            let decoded = decode_bytes(Some(*label), &bytes).unwrap();
            assert_eq!(decoded, codepoints(text), "{}", label);
        }
    }

    #[test]
    fn test_latin1_round_trip() {
        let text = "<p>naïve ß</p>";
        let bytes: Vec<u8> = text.chars().map(|c| c as u32 as u8).collect();
        assert_eq!(decode_bytes(Some("ISO-8859-1"), &bytes).unwrap(), codepoints(text));
    }

    #[test]
    fn test_bom_is_consumed() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"<a/>");
        assert_eq!(decode_bytes(None, &bytes).unwrap(), codepoints("<a/>"));

        for (bom, little) in [(vec![0xFE, 0xFF], false), (vec![0xFF, 0xFE], true)] {
            let mut bytes = bom;
            bytes.extend(utf16("<a/>", little));
            let mut decoder = Decoder::new(None).unwrap();
            decoder.write(&bytes).unwrap();
            decoder.end();
            assert_eq!(drain(&mut decoder).unwrap(), codepoints("<a/>"));
            assert_eq!(decoder.encoding().name, "UTF-16");
        }
    }

    #[test]
    fn test_every_bom_entry_fixes_its_encoding() {
        for (bom, expected) in BYTE_ORDER_MARKS {
            let payload = match (expected.scheme, expected.order) {
                (Scheme::Ucs4, Some(order)) => ucs4("<x/>", order),
                (Scheme::Utf16 { .. }, Some(ByteOrder::Little)) => utf16("<x/>", true),
                (Scheme::Utf16 { .. }, _) => utf16("<x/>", false),
                _ => b"<x/>".to_vec(),
            };
            let mut bytes = bom.to_vec();
            bytes.extend(payload);
            let mut decoder = Decoder::new(None).unwrap();
            decoder.write(&bytes).unwrap();
            decoder.end();
            assert_eq!(drain(&mut decoder).unwrap(), codepoints("<x/>"));
            assert_eq!(decoder.encoding(), *expected);
        }
    }

    #[test]
    fn test_signature_bytes_are_emitted() {
        for (_, expected) in SIGNATURES {
            let payload = match (expected.scheme, expected.order) {
                (Scheme::Ucs4, Some(order)) => ucs4("<?x?>", order),
                (_, Some(ByteOrder::Little)) => utf16("<?x?>", true),
                _ => utf16("<?x?>", false),
            };
            let mut decoder = Decoder::new(None).unwrap();
            decoder.write(&payload).unwrap();
            decoder.end();
            assert_eq!(drain(&mut decoder).unwrap(), codepoints("<?x?>"));
            assert_eq!(decoder.encoding().scheme, expected.scheme);
        }
    }

    #[test]
    fn test_newlines_normalized_across_chunks() {
        let mut decoder = Decoder::new(None).unwrap();
        decoder.write(b"<a>x\r").unwrap();
        let first = drain(&mut decoder).unwrap();
        decoder.write(b"\ny\rz\r\r\n</a>").unwrap();
        decoder.end();
        let mut all = first;
        all.extend(drain(&mut decoder).unwrap());
        assert_eq!(all, codepoints("<a>x\ny\nz\n\n</a>"));
    }

    #[test]
    fn test_halt_defers_delivery() {
        let mut decoder = Decoder::new(None).unwrap();
        decoder.write(b"<abc/>").unwrap();
        assert_eq!(decoder.next().unwrap(), Pull::Char('<' as u32));
        decoder.halt();
        assert_eq!(decoder.next().unwrap(), Pull::Wait);
        assert_eq!(decoder.write(b"more"), Err(Error::Halted));
        decoder.resume();
        assert_eq!(decoder.next().unwrap(), Pull::Char('a' as u32));
    }

    #[test]
    fn test_short_input_uses_default() {
        assert_eq!(decode_bytes(None, b"ab").unwrap(), codepoints("ab"));
    }

    #[test]
    fn test_truncated_sequence() {
        assert_eq!(decode_bytes(None, &[b'<', b'a', b'>', 0xE2, 0x98]), Err(Error::Truncated(2)));
    }

    #[test]
    fn test_malformed_utf8_names_bytes() {
        let err = decode_bytes(None, &[b'<', b'a', b'>', 0xC3, 0x28]).unwrap_err();
        assert!(err.to_string().contains("0xC3 0x28"), "{}", err);
        let err = decode_bytes(None, &[b'<', b'a', b'>', 0xFF]).unwrap_err();
        assert!(err.to_string().contains("0xFF"), "{}", err);
    }

    #[test]
    fn test_ucs2_rejects_surrogates() {
        let bytes = utf16("<a>𝄞</a>", false);
        assert!(matches!(decode_bytes(Some("UCS-2"), &bytes), Err(Error::Decode(_))));
    }

    #[test]
    fn test_utf16_unpaired_high_surrogate() {
        let bytes = [0x00, 0x3C, 0x00, 0x61, 0xD8, 0x34, 0x00, 0x61];
        assert!(matches!(decode_bytes(None, &bytes), Err(Error::Decode(_))));
    }

    #[test]
    fn test_switch_after_ascii_is_allowed() {
        let mut decoder = Decoder::new(None).unwrap();
        decoder.write(b"<?xml?>\xE9").unwrap();
        decoder.end();
        for _ in 0..7 {
            decoder.next().unwrap();
        }
        decoder.set_encoding("ISO-8859-1").unwrap();
        assert_eq!(decoder.next().unwrap(), Pull::Char(0xE9));
    }

    #[test]
    fn test_switch_after_non_ascii_requires_same_family() {
        let mut decoder = Decoder::new(Some("ISO-8859-1")).unwrap();
        decoder.explicit = false;
        decoder.write("<a>\u{e9}".chars().map(|c| c as u8).collect::<Vec<_>>().as_slice()).unwrap();
        decoder.end();
        drain(&mut decoder).unwrap();
        let err = decoder.set_encoding("windows-1252").unwrap_err();
        assert!(matches!(err, Error::EncodingConflict { .. }));
        assert!(err.to_string().contains("ISO-8859-1"));
        assert!(err.to_string().contains("windows-1252"));
        assert!(decoder.set_encoding("latin1").is_ok());
    }

    #[test]
    fn test_switch_width_conflict() {
        let mut decoder = Decoder::new(None).unwrap();
        decoder.write(&utf16("<?xml?>", true)).unwrap();
        decoder.end();
        drain(&mut decoder).unwrap();
        assert!(matches!(decoder.set_encoding("UTF-8"), Err(Error::EncodingConflict { .. })));
        assert!(matches!(decoder.set_encoding("UTF-16BE"), Err(Error::EncodingConflict { .. })));
        assert!(decoder.set_encoding("UTF-16").is_ok());
        assert_eq!(decoder.encoding().order, Some(ByteOrder::Little));
    }

    #[test]
    fn test_switch_after_bom_requires_same_family() {
        let mut decoder = Decoder::new(None).unwrap();
        decoder.write(&[0xEF, 0xBB, 0xBF, b'<', b'a', b'/', b'>']).unwrap();
        decoder.end();
        drain(&mut decoder).unwrap();
        assert!(matches!(decoder.set_encoding("US-ASCII"), Err(Error::EncodingConflict { .. })));
        assert!(decoder.set_encoding("utf-8").is_ok());
    }

    #[test]
    fn test_explicit_conflicting_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend(utf16("<a/>", true));
        assert!(matches!(decode_bytes(Some("UTF-8"), &bytes), Err(Error::EncodingConflict { .. })));
    }

    #[test]
    fn test_text_input_strips_bom_and_normalizes() {
        let mut decoder = Decoder::new(None).unwrap();
        decoder.write_text("\u{FEFF}<a>\r\n</a>").unwrap();
        decoder.end();
        assert_eq!(drain(&mut decoder).unwrap(), codepoints("<a>\n</a>"));
    }
}
