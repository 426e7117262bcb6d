// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Type+length header codecs.
//!
//! All record headers in this crate normalize to one [`Header`] shape no matter
//! which wire encoding produced them:
//!
//! - [`HeaderEncoding::Ber`]: identifier octet(s) with class, constructed flag and
//!   a low- or high-tag-number form, followed by a short, long or indefinite length.
//! - [`HeaderEncoding::Fixed16`]: one type byte and one size byte.
//! - [`HeaderEncoding::Fixed32`]: little-endian u16 type and u16 size.
//! - [`HeaderEncoding::Variable`]: one type byte and a size byte whose high bit
//!   announces a second, high-order size byte.
//!
//! The three fixed encodings describe trace records whose size field counts the
//! header itself; their `length` is normalized to the content length.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::cursor::ByteCursor;
use crate::core::Result;

/// Flag in the low size byte of a variable header announcing a high size byte.
pub const VARIABLE_SIZE_2BYTES: u8 = 0x80;

/// Universal tag numbers.
pub mod universal {
    /// End-of-contents marker
    pub const END_OF_CONTENTS: u32 = 0;
    /// BOOLEAN
    pub const BOOLEAN: u32 = 1;
    /// INTEGER
    pub const INTEGER: u32 = 2;
    /// BIT STRING
    pub const BIT_STRING: u32 = 3;
    /// OCTET STRING
    pub const OCTET_STRING: u32 = 4;
    /// NULL
    pub const NULL: u32 = 5;
    /// OBJECT IDENTIFIER
    pub const OBJECT_IDENTIFIER: u32 = 6;
    /// ObjectDescriptor
    pub const OBJECT_DESCRIPTOR: u32 = 7;
    /// EXTERNAL
    pub const EXTERNAL: u32 = 8;
    /// REAL
    pub const REAL: u32 = 9;
    /// ENUMERATED
    pub const ENUMERATED: u32 = 10;
    /// UTF8String
    pub const UTF8_STRING: u32 = 12;
    /// RELATIVE-OID
    pub const RELATIVE_OID: u32 = 13;
    /// SEQUENCE and SEQUENCE OF
    pub const SEQUENCE: u32 = 16;
    /// SET and SET OF
    pub const SET: u32 = 17;
    /// NumericString
    pub const NUMERIC_STRING: u32 = 18;
    /// PrintableString
    pub const PRINTABLE_STRING: u32 = 19;
    /// TeletexString
    pub const TELETEX_STRING: u32 = 20;
    /// VideotexString
    pub const VIDEOTEX_STRING: u32 = 21;
    /// IA5String
    pub const IA5_STRING: u32 = 22;
    /// UTCTime
    pub const UTC_TIME: u32 = 23;
    /// GeneralizedTime
    pub const GENERALIZED_TIME: u32 = 24;
    /// GraphicString
    pub const GRAPHIC_STRING: u32 = 25;
    /// VisibleString
    pub const VISIBLE_STRING: u32 = 26;
    /// GeneralString
    pub const GENERAL_STRING: u32 = 27;
    /// UniversalString
    pub const UNIVERSAL_STRING: u32 = 28;
    /// BMPString
    pub const BMP_STRING: u32 = 30;

    /// ASN.1 name of a universal tag, if it has one.
    pub fn name(tag: u32) -> Option<&'static str> {
        Some(match tag {
            END_OF_CONTENTS => "EOC",
            BOOLEAN => "BOOLEAN",
            INTEGER => "INTEGER",
            BIT_STRING => "BIT STRING",
            OCTET_STRING => "OCTET STRING",
            NULL => "NULL",
            OBJECT_IDENTIFIER => "OBJECT IDENTIFIER",
            OBJECT_DESCRIPTOR => "ObjectDescriptor",
            EXTERNAL => "EXTERNAL",
            REAL => "REAL",
            ENUMERATED => "ENUMERATED",
            UTF8_STRING => "UTF8String",
            RELATIVE_OID => "RELATIVE-OID",
            SEQUENCE => "SEQUENCE",
            SET => "SET",
            NUMERIC_STRING => "NumericString",
            PRINTABLE_STRING => "PrintableString",
            TELETEX_STRING => "TeletexString",
            VIDEOTEX_STRING => "VideotexString",
            IA5_STRING => "IA5String",
            UTC_TIME => "UTCTime",
            GENERALIZED_TIME => "GeneralizedTime",
            GRAPHIC_STRING => "GraphicString",
            VISIBLE_STRING => "VisibleString",
            GENERAL_STRING => "GeneralString",
            UNIVERSAL_STRING => "UniversalString",
            BMP_STRING => "BMPString",
            _ => return None,
        })
    }

    /// Whether a universal tag denotes a character string or time type.
    pub fn is_text(tag: u32) -> bool {
        matches!(
            tag,
            OBJECT_DESCRIPTOR
                | UTF8_STRING
                | NUMERIC_STRING
                | PRINTABLE_STRING
                | TELETEX_STRING
                | VIDEOTEX_STRING
                | IA5_STRING
                | UTC_TIME
                | GENERALIZED_TIME
                | GRAPHIC_STRING
                | VISIBLE_STRING
                | GENERAL_STRING
                | UNIVERSAL_STRING
                | BMP_STRING
        )
    }
}

/// Tag class (top two bits of the BER identifier octet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagClass {
    /// Universal
    Universal,
    /// Application
    Application,
    /// Context-specific
    Context,
    /// Private
    Private,
}

impl TagClass {
    /// Class from the two class bits.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::Context,
            _ => TagClass::Private,
        }
    }

    /// The two class bits.
    pub fn bits(self) -> u8 {
        match self {
            TagClass::Universal => 0,
            TagClass::Application => 1,
            TagClass::Context => 2,
            TagClass::Private => 3,
        }
    }

    /// Upper-case label used in tag notation.
    pub fn as_str(self) -> &'static str {
        match self {
            TagClass::Universal => "UNIVERSAL",
            TagClass::Application => "APPLICATION",
            TagClass::Context => "CONTEXT",
            TagClass::Private => "PRIVATE",
        }
    }
}

/// A (class, number) tag pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Tag class
    pub class: TagClass,
    /// Tag number
    pub number: u32,
}

impl Tag {
    /// Create a tag.
    pub const fn new(class: TagClass, number: u32) -> Self {
        Self { class, number }
    }

    /// Universal-class tag.
    pub const fn universal(number: u32) -> Self {
        Self::new(TagClass::Universal, number)
    }

    /// Application-class tag.
    pub const fn application(number: u32) -> Self {
        Self::new(TagClass::Application, number)
    }

    /// Context-specific tag.
    pub const fn context(number: u32) -> Self {
        Self::new(TagClass::Context, number)
    }

    /// Private-class tag.
    pub const fn private(number: u32) -> Self {
        Self::new(TagClass::Private, number)
    }

    /// Whether this is a universal-class tag.
    pub fn is_universal(&self) -> bool {
        self.class == TagClass::Universal
    }

    /// Display name: the ASN.1 name for known universal tags, tag notation otherwise.
    pub fn type_label(&self) -> String {
        if self.is_universal() {
            if let Some(name) = universal::name(self.number) {
                return name.to_string();
            }
        }
        self.to_string()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}]", self.class.as_str(), self.number)
    }
}

/// Wire encoding of a record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderEncoding {
    /// BER identifier and length octets
    Ber,
    /// 1-byte type, 1-byte record size
    Fixed16,
    /// Little-endian 2-byte type, 2-byte record size
    Fixed32,
    /// 1-byte type, 1- or 2-byte record size
    Variable,
}

/// A decoded record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Tag class (always universal for the fixed trace encodings)
    pub class: TagClass,
    /// Tag number or record type
    pub tag: u32,
    /// Constructed flag
    pub constructed: bool,
    /// Content length, `None` for indefinite length
    pub length: Option<usize>,
    /// Number of bytes the header itself occupied
    pub header_len: usize,
}

impl Header {
    /// The (class, number) pair of this header.
    pub fn as_tag(&self) -> Tag {
        Tag::new(self.class, self.tag)
    }

    /// Whether this is the end-of-contents marker (`00 00`).
    pub fn is_end_of_contents(&self) -> bool {
        self.class == TagClass::Universal
            && self.tag == universal::END_OF_CONTENTS
            && !self.constructed
            && self.length == Some(0)
    }

    /// Whether the length is indefinite.
    pub fn is_indefinite(&self) -> bool {
        self.length.is_none()
    }

    /// Header plus content length, for definite lengths.
    pub fn total_len(&self) -> Option<usize> {
        self.length.map(|len| self.header_len.saturating_add(len))
    }

    /// Offset one past the content, given the offset the header started at.
    pub fn content_end(&self, header_start: usize) -> Option<usize> {
        self.total_len()
            .map(|total| header_start.saturating_add(total))
    }
}

/// Decode one BER header at the cursor position.
///
/// Only truncation fails. Tag numbers too large for `u32` saturate and lengths
/// too large for `usize` saturate; both keep the cursor in sync with the
/// encoding so the caller can clamp and continue.
pub fn decode_header(cursor: &mut ByteCursor<'_>) -> Result<Header> {
    let start = cursor.tell();
    let result = decode_ber_header(cursor, start);
    if result.is_err() {
        // Reads past the identifier may have succeeded; a header is all or nothing.
        cursor.seek_to(start)?;
    }
    result
}

fn decode_ber_header(cursor: &mut ByteCursor<'_>, start: usize) -> Result<Header> {
    let first = cursor.read_u8()?;
    let class = TagClass::from_bits(first >> 6);
    let constructed = first & 0x20 != 0;

    let mut tag = u32::from(first & 0x1F);
    if tag == 0x1F {
        // High-tag-number form: base-128, high bit is the continuation flag
        tag = 0;
        loop {
            let byte = cursor.read_u8()?;
            tag = tag
                .checked_mul(128)
                .and_then(|t| t.checked_add(u32::from(byte & 0x7F)))
                .unwrap_or(u32::MAX);
            if byte & 0x80 == 0 {
                break;
            }
        }
    }

    let first_len = cursor.read_u8()?;
    let length = if first_len & 0x80 == 0 {
        Some(usize::from(first_len))
    } else {
        let count = usize::from(first_len & 0x7F);
        if count == 0 {
            None
        } else {
            let octets = cursor.read_bytes(count)?;
            let value = octets.iter().fold(0u64, |acc, &b| {
                acc.checked_mul(256)
                    .and_then(|v| v.checked_add(u64::from(b)))
                    .unwrap_or(u64::MAX)
            });
            Some(usize::try_from(value).unwrap_or(usize::MAX))
        }
    };

    Ok(Header {
        class,
        tag,
        constructed,
        length,
        header_len: cursor.tell() - start,
    })
}

/// Decode one header in the given wire encoding.
pub fn decode_header_with(cursor: &mut ByteCursor<'_>, encoding: HeaderEncoding) -> Result<Header> {
    let start = cursor.tell();
    let (tag, record_size) = match encoding {
        HeaderEncoding::Ber => return decode_header(cursor),
        HeaderEncoding::Fixed16 => {
            let bytes = cursor.read_bytes(2)?;
            (u32::from(bytes[0]), usize::from(bytes[1]))
        }
        HeaderEncoding::Fixed32 => {
            let bytes = cursor.read_bytes(4)?;
            (
                u32::from(u16::from_le_bytes([bytes[0], bytes[1]])),
                usize::from(u16::from_le_bytes([bytes[2], bytes[3]])),
            )
        }
        HeaderEncoding::Variable => {
            let bytes = cursor.peek_bytes(2)?;
            let (record_type, low) = (bytes[0], bytes[1]);
            if low & VARIABLE_SIZE_2BYTES != 0 {
                let bytes = cursor.read_bytes(3)?;
                let size = usize::from(low & !VARIABLE_SIZE_2BYTES)
                    + usize::from(bytes[2]) * usize::from(VARIABLE_SIZE_2BYTES);
                (u32::from(record_type), size)
            } else {
                cursor.skip(2)?;
                (u32::from(record_type), usize::from(low))
            }
        }
    };
    let header_len = cursor.tell() - start;
    Ok(Header {
        class: TagClass::Universal,
        tag,
        constructed: false,
        length: Some(record_size.saturating_sub(header_len)),
        header_len,
    })
}
