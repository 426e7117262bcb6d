// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Primitive content decoders, one per [`DecodedValue`] variant.
//!
//! Each function receives the (already clamped) content octets of one
//! primitive encoding. A malformed encoding is reported as [`Malformed`] so the
//! decoder can record a diagnostic and fall back to an opaque value.

use std::fmt;

use crate::core::DecodedValue;
use crate::encoding::header::universal;

/// Content octets that are not a valid encoding for the declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Malformed(pub String);

impl fmt::Display for Malformed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of one primitive decode.
pub type ValueResult = std::result::Result<DecodedValue, Malformed>;

fn malformed(message: impl Into<String>) -> Malformed {
    Malformed(message.into())
}

/// BOOLEAN: exactly one octet, zero is false.
pub fn decode_boolean(content: &[u8]) -> ValueResult {
    match content {
        [b] => Ok(DecodedValue::Bool(*b != 0)),
        _ => Err(malformed(format!(
            "BOOLEAN needs 1 content octet, got {}",
            content.len()
        ))),
    }
}

/// INTEGER or ENUMERATED: big-endian two's complement, at most 8 octets.
pub fn decode_integer(content: &[u8]) -> ValueResult {
    if content.is_empty() {
        return Err(malformed("INTEGER has no content octets"));
    }
    if content.len() > 8 {
        return Err(malformed(format!(
            "INTEGER of {} octets does not fit in 64 bits",
            content.len()
        )));
    }
    let fill = if content[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut bytes = [fill; 8];
    bytes[8 - content.len()..].copy_from_slice(content);
    Ok(DecodedValue::Int(i64::from_be_bytes(bytes)))
}

/// BIT STRING: leading unused-bit count followed by the packed bits.
pub fn decode_bit_string(content: &[u8]) -> ValueResult {
    let Some((&unused, bits)) = content.split_first() else {
        return Err(malformed("BIT STRING has no content octets"));
    };
    if unused > 7 || (bits.is_empty() && unused != 0) {
        return Err(malformed(format!(
            "BIT STRING unused bit count {unused} is invalid"
        )));
    }
    Ok(DecodedValue::BitString {
        bits: bits.to_vec(),
        unused_trailing: unused,
    })
}

fn decode_arcs(content: &[u8]) -> std::result::Result<Vec<u64>, Malformed> {
    let mut arcs = Vec::new();
    let mut value: u64 = 0;
    let mut pending = false;
    for &byte in content {
        if value > (u64::MAX >> 7) {
            return Err(malformed("object identifier arc overflows 64 bits"));
        }
        value = (value << 7) | u64::from(byte & 0x7F);
        pending = byte & 0x80 != 0;
        if !pending {
            arcs.push(value);
            value = 0;
        }
    }
    if pending {
        return Err(malformed("object identifier ends inside an arc"));
    }
    Ok(arcs)
}

/// OBJECT IDENTIFIER: base-128 arcs, the first one packing two arcs.
pub fn decode_object_id(content: &[u8]) -> ValueResult {
    if content.is_empty() {
        return Err(malformed("OBJECT IDENTIFIER has no content octets"));
    }
    let packed = decode_arcs(content)?;
    let mut arcs = Vec::with_capacity(packed.len() + 1);
    match packed[0] {
        v if v < 40 => arcs.extend([0, v]),
        v if v < 80 => arcs.extend([1, v - 40]),
        v => arcs.extend([2, v - 80]),
    }
    arcs.extend_from_slice(&packed[1..]);
    Ok(DecodedValue::ObjectId(arcs))
}

/// RELATIVE-OID: base-128 arcs without the packed leading pair.
pub fn decode_relative_oid(content: &[u8]) -> ValueResult {
    decode_arcs(content).map(DecodedValue::ObjectId)
}

/// NULL: no content octets.
pub fn decode_null(content: &[u8]) -> ValueResult {
    if content.is_empty() {
        Ok(DecodedValue::None)
    } else {
        Err(malformed(format!(
            "NULL carries {} content octets",
            content.len()
        )))
    }
}

/// REAL: binary, decimal or special-value form.
pub fn decode_real(content: &[u8]) -> ValueResult {
    let Some((&first, rest)) = content.split_first() else {
        return Ok(DecodedValue::Real(0.0));
    };

    if first & 0x80 != 0 {
        return decode_binary_real(first, rest).map(DecodedValue::Real);
    }
    if first & 0x40 != 0 {
        let value = match first {
            0x40 => f64::INFINITY,
            0x41 => f64::NEG_INFINITY,
            0x42 => f64::NAN,
            0x43 => -0.0,
            other => {
                return Err(malformed(format!("unknown REAL special value {other:#04x}")));
            }
        };
        return Ok(DecodedValue::Real(value));
    }

    let text = std::str::from_utf8(rest)
        .map_err(|_| malformed("decimal REAL is not ASCII"))?
        .trim()
        .replace(',', ".");
    text.parse::<f64>()
        .map(DecodedValue::Real)
        .map_err(|_| malformed(format!("decimal REAL {text:?} does not parse")))
}

fn decode_binary_real(first: u8, rest: &[u8]) -> std::result::Result<f64, Malformed> {
    let negative = first & 0x40 != 0;
    let base: f64 = match (first >> 4) & 0x03 {
        0 => 2.0,
        1 => 8.0,
        2 => 16.0,
        _ => return Err(malformed("REAL uses reserved base")),
    };
    let scale = i32::from((first >> 2) & 0x03);

    let (exp_len, rest) = match first & 0x03 {
        3 => {
            let Some((&n, rest)) = rest.split_first() else {
                return Err(malformed("REAL exponent length missing"));
            };
            (usize::from(n), rest)
        }
        n => (usize::from(n) + 1, rest),
    };
    if exp_len == 0 || exp_len > 8 || rest.len() < exp_len {
        return Err(malformed("REAL exponent is truncated or too long"));
    }
    let (exp_bytes, mantissa_bytes) = rest.split_at(exp_len);

    let fill = if exp_bytes[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut buf = [fill; 8];
    buf[8 - exp_len..].copy_from_slice(exp_bytes);
    let exponent = i64::from_be_bytes(buf).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;

    let mantissa = mantissa_bytes
        .iter()
        .fold(0f64, |acc, &b| acc * 256.0 + f64::from(b));
    let value = mantissa * 2f64.powi(scale) * base.powi(exponent);
    Ok(if negative { -value } else { value })
}

/// Character string and time types.
pub fn decode_text(tag: u32, content: &[u8]) -> ValueResult {
    match tag {
        universal::BMP_STRING => {
            if content.len() % 2 != 0 {
                return Err(malformed("BMPString has an odd number of octets"));
            }
            let units: Vec<u16> = content
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            Ok(DecodedValue::Text(String::from_utf16_lossy(&units)))
        }
        universal::UNIVERSAL_STRING => {
            if content.len() % 4 != 0 {
                return Err(malformed("UniversalString length is not a multiple of 4"));
            }
            let text = content
                .chunks_exact(4)
                .map(|c| {
                    char::from_u32(u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                        .unwrap_or(char::REPLACEMENT_CHARACTER)
                })
                .collect();
            Ok(DecodedValue::Text(text))
        }
        _ => Ok(DecodedValue::Text(
            String::from_utf8_lossy(content).into_owned(),
        )),
    }
}

/// Label of a named number.
pub fn named_label(value: i64, named_values: &[(i64, String)]) -> Option<String> {
    named_values
        .iter()
        .find(|(v, _)| *v == value)
        .map(|(_, name)| name.clone())
}

/// Comma-separated names of the set bits of a bit string.
pub fn named_bits(value: &DecodedValue, named_values: &[(i64, String)]) -> Option<String> {
    let names: Vec<&str> = named_values
        .iter()
        .filter(|(bit, _)| {
            usize::try_from(*bit)
                .ok()
                .and_then(|index| value.bit(index))
                .unwrap_or(false)
        })
        .map(|(_, name)| name.as_str())
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}
