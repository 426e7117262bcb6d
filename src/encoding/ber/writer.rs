// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! BER encoder.
//!
//! Produces definite-length encodings by default (minimal length octets,
//! minimal two's complement integers). Indefinite-length constructs can be
//! written explicitly with [`BerWriter::begin_indefinite`] and
//! [`BerWriter::end_of_contents`].

use crate::core::{CodecError, Result};
use crate::encoding::header::{universal, Tag};

/// Append-only BER byte writer.
#[derive(Debug, Clone, Default)]
pub struct BerWriter {
    buffer: Vec<u8>,
}

impl BerWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of bytes written.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing was written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consume the writer and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Write identifier and length octets. `None` writes the indefinite form.
    pub fn write_header(&mut self, tag: Tag, constructed: bool, length: Option<usize>) {
        self.write_identifier(tag, constructed);
        match length {
            Some(len) => self.write_length(len),
            None => self.buffer.push(0x80),
        }
    }

    fn write_identifier(&mut self, tag: Tag, constructed: bool) {
        let mut first = tag.class.bits() << 6;
        if constructed {
            first |= 0x20;
        }
        if tag.number < 0x1F {
            self.buffer.push(first | tag.number as u8);
            return;
        }
        self.buffer.push(first | 0x1F);
        let mut groups = Vec::with_capacity(5);
        let mut number = tag.number;
        loop {
            groups.push((number & 0x7F) as u8);
            number >>= 7;
            if number == 0 {
                break;
            }
        }
        for (i, group) in groups.iter().enumerate().rev() {
            self.buffer.push(if i == 0 { *group } else { group | 0x80 });
        }
    }

    fn write_length(&mut self, len: usize) {
        if len < 0x80 {
            self.buffer.push(len as u8);
            return;
        }
        let bytes = (len as u64).to_be_bytes();
        let skip = bytes.iter().take_while(|&&b| b == 0).count();
        let significant = &bytes[skip..];
        self.buffer.push(0x80 | significant.len() as u8);
        self.buffer.extend_from_slice(significant);
    }

    /// Write a complete TLV with the given content octets.
    pub fn write_tlv(&mut self, tag: Tag, constructed: bool, content: &[u8]) {
        self.write_header(tag, constructed, Some(content.len()));
        self.buffer.extend_from_slice(content);
    }

    /// Write raw, already encoded bytes.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Write a BOOLEAN.
    pub fn write_bool(&mut self, tag: Tag, value: bool) {
        self.write_tlv(tag, false, &[if value { 0xFF } else { 0x00 }]);
    }

    /// Write an INTEGER or ENUMERATED with minimal two's complement content.
    pub fn write_integer(&mut self, tag: Tag, value: i64) {
        self.write_tlv(tag, false, &encode_integer(value));
    }

    /// Write an OCTET STRING (or any primitive with raw content).
    pub fn write_octets(&mut self, tag: Tag, content: &[u8]) {
        self.write_tlv(tag, false, content);
    }

    /// Write a character string as UTF-8 octets.
    pub fn write_str(&mut self, tag: Tag, value: &str) {
        self.write_tlv(tag, false, value.as_bytes());
    }

    /// Write a NULL.
    pub fn write_null(&mut self, tag: Tag) {
        self.write_tlv(tag, false, &[]);
    }

    /// Write a BIT STRING.
    pub fn write_bit_string(&mut self, tag: Tag, bits: &[u8], unused_trailing: u8) {
        let mut content = Vec::with_capacity(bits.len() + 1);
        content.push(unused_trailing);
        content.extend_from_slice(bits);
        self.write_tlv(tag, false, &content);
    }

    /// Write an OBJECT IDENTIFIER.
    pub fn write_oid(&mut self, tag: Tag, arcs: &[u64]) -> Result<()> {
        let content = encode_oid(arcs)?;
        self.write_tlv(tag, false, &content);
        Ok(())
    }

    /// Write a definite-length constructed value whose content is produced by `body`.
    pub fn write_constructed<F>(&mut self, tag: Tag, body: F) -> Result<()>
    where
        F: FnOnce(&mut BerWriter) -> Result<()>,
    {
        let mut inner = BerWriter::new();
        body(&mut inner)?;
        self.write_tlv(tag, true, inner.as_bytes());
        Ok(())
    }

    /// Write a SEQUENCE with universal tag 16.
    pub fn write_sequence<F>(&mut self, body: F) -> Result<()>
    where
        F: FnOnce(&mut BerWriter) -> Result<()>,
    {
        self.write_constructed(Tag::universal(universal::SEQUENCE), body)
    }

    /// Open an indefinite-length constructed value.
    pub fn begin_indefinite(&mut self, tag: Tag) {
        self.write_header(tag, true, None);
    }

    /// Close an indefinite-length constructed value.
    pub fn end_of_contents(&mut self) {
        self.buffer.extend_from_slice(&[0x00, 0x00]);
    }
}

/// Minimal two's complement big-endian encoding of `value`.
pub fn encode_integer(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

/// Content octets of an OBJECT IDENTIFIER.
pub fn encode_oid(arcs: &[u64]) -> Result<Vec<u8>> {
    if arcs.len() < 2 {
        return Err(CodecError::parse(
            "encode_oid",
            "an object identifier needs at least two arcs",
        ));
    }
    if arcs[0] > 2 || (arcs[0] < 2 && arcs[1] >= 40) {
        return Err(CodecError::parse(
            "encode_oid",
            format!("invalid leading arcs {}.{}", arcs[0], arcs[1]),
        ));
    }
    let first = arcs[0]
        .checked_mul(40)
        .and_then(|v| v.checked_add(arcs[1]))
        .ok_or_else(|| CodecError::parse("encode_oid", "leading arc overflow"))?;

    let mut content = Vec::new();
    for arc in std::iter::once(first).chain(arcs[2..].iter().copied()) {
        let mut groups = Vec::with_capacity(10);
        let mut value = arc;
        loop {
            groups.push((value & 0x7F) as u8);
            value >>= 7;
            if value == 0 {
                break;
            }
        }
        for (i, group) in groups.iter().enumerate().rev() {
            content.push(if i == 0 { *group } else { group | 0x80 });
        }
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_minimal() {
        assert_eq!(encode_integer(0), vec![0x00]);
        assert_eq!(encode_integer(127), vec![0x7F]);
        assert_eq!(encode_integer(128), vec![0x00, 0x80]);
        assert_eq!(encode_integer(-1), vec![0xFF]);
        assert_eq!(encode_integer(-128), vec![0x80]);
        assert_eq!(encode_integer(-129), vec![0xFF, 0x7F]);
        assert_eq!(encode_integer(i64::MIN).len(), 8);
    }

    #[test]
    fn test_long_length() {
        let mut w = BerWriter::new();
        w.write_octets(Tag::universal(universal::OCTET_STRING), &[0u8; 300]);
        assert_eq!(&w.as_bytes()[..4], &[0x04, 0x82, 0x01, 0x2C]);
        assert_eq!(w.len(), 304);
    }

    #[test]
    fn test_high_tag_number() {
        let mut w = BerWriter::new();
        w.write_null(Tag::application(200));
        assert_eq!(w.into_bytes(), vec![0x5F, 0x81, 0x48, 0x00]);
    }

    #[test]
    fn test_constructed() {
        let mut w = BerWriter::new();
        w.write_sequence(|w| {
            w.write_bool(Tag::universal(universal::BOOLEAN), true);
            w.write_integer(Tag::context(0), 5);
            Ok(())
        })
        .unwrap();
        assert_eq!(
            w.into_bytes(),
            vec![0x30, 0x06, 0x01, 0x01, 0xFF, 0x80, 0x01, 0x05]
        );
    }

    #[test]
    fn test_indefinite() {
        let mut w = BerWriter::new();
        w.begin_indefinite(Tag::universal(universal::SEQUENCE));
        w.write_null(Tag::universal(universal::NULL));
        w.end_of_contents();
        assert_eq!(w.into_bytes(), vec![0x30, 0x80, 0x05, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_oid() {
        assert_eq!(
            encode_oid(&[1, 2, 840, 113549]).unwrap(),
            vec![0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D]
        );
        assert!(encode_oid(&[1]).is_err());
        assert!(encode_oid(&[3, 1]).is_err());
    }
}
