//! Canonical CBOR encoding for deterministic serialization.
//!
//! Content is signed over these bytes, so the same content must always
//! produce the same encoding:
//! - Map keys are text, sorted by their encoded bytes
//! - Integers use the smallest valid encoding
//! - Definite lengths only
//! - Floats are always written as 64-bit (major type 7, 0xfb)
//! - Dates are tag 1004 (RFC 8943 full-date) over `YYYY-MM-DD` text
//!
//! Decoding re-encodes what it parsed and requires byte equality with the
//! input, so there is exactly one accepted encoding per value.

use chrono::NaiveDate;
use ciborium::value::Value;

use crate::content::{validate_extension, Content, FieldMap, FieldValue, DATE_FORMAT};
use crate::error::ContentError;

/// CBOR tag for an RFC 3339 full-date string.
pub const TAG_FULL_DATE: u64 = 1004;

/// Encode content to canonical CBOR bytes.
pub fn canonical_content_bytes(content: &Content) -> Vec<u8> {
    canonical_fields_bytes(&content.to_fields())
}

/// Encode a flat field map to canonical CBOR bytes.
pub fn canonical_fields_bytes(fields: &FieldMap) -> Vec<u8> {
    let entries = fields
        .iter()
        .map(|(name, value)| {
            let mut key = Vec::new();
            encode_text(&mut key, name);
            let mut val = Vec::new();
            encode_field_value(&mut val, value);
            (key, val)
        })
        .collect();

    let mut buf = Vec::new();
    encode_map_canonical(&mut buf, entries);
    buf
}

/// Decode content from canonical CBOR bytes.
pub fn decode_content(bytes: &[u8]) -> Result<Content, ContentError> {
    let fields = decode_fields(bytes)?;
    Content::from_fields(fields)
}

/// Decode a flat field map from canonical CBOR bytes.
pub fn decode_fields(bytes: &[u8]) -> Result<FieldMap, ContentError> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| ContentError::Malformed(e.to_string()))?;

    let entries = match value {
        Value::Map(entries) => entries,
        _ => return Err(ContentError::Malformed("expected map".into())),
    };

    let mut fields = FieldMap::new();
    for (key, value) in entries {
        let name = match key {
            Value::Text(name) => name,
            _ => return Err(ContentError::Malformed("map keys must be text".into())),
        };
        let value = cbor_value_to_field(&name, value)?;
        if fields.insert(name.clone(), value).is_some() {
            return Err(ContentError::Malformed(format!("duplicate field {}", name)));
        }
    }
    validate_extension(&fields)?;

    if canonical_fields_bytes(&fields) != bytes {
        return Err(ContentError::Malformed("non-canonical encoding".into()));
    }

    Ok(fields)
}

fn cbor_value_to_field(name: &str, value: Value) -> Result<FieldValue, ContentError> {
    match value {
        Value::Text(s) => Ok(FieldValue::Text(s)),
        Value::Integer(i) => i64::try_from(i)
            .map(FieldValue::Integer)
            .map_err(|_| ContentError::Malformed(format!("integer out of range in {}", name))),
        Value::Float(x) => Ok(FieldValue::Float(x)),
        Value::Tag(TAG_FULL_DATE, inner) => match *inner {
            Value::Text(s) => NaiveDate::parse_from_str(&s, DATE_FORMAT)
                .map(FieldValue::Date)
                .map_err(|e| ContentError::Malformed(format!("invalid date in {}: {}", name, e))),
            _ => Err(ContentError::Malformed(format!("invalid date in {}", name))),
        },
        _ => Err(ContentError::Malformed(format!(
            "unsupported value type in {}",
            name
        ))),
    }
}

/// Encode a single field value.
fn encode_field_value(buf: &mut Vec<u8>, value: &FieldValue) {
    match value {
        FieldValue::Text(s) => encode_text(buf, s),
        FieldValue::Integer(i) => encode_integer(buf, *i),
        FieldValue::Float(x) => encode_f64(buf, *x),
        FieldValue::Date(d) => {
            encode_uint(buf, 6, TAG_FULL_DATE);
            encode_text(buf, &d.format(DATE_FORMAT).to_string());
        }
    }
}

/// Encode a signed integer (major types 0 and 1).
pub(crate) fn encode_integer(buf: &mut Vec<u8>, n: i64) {
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
pub(crate) fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a 64-bit float (major type 7).
fn encode_f64(buf: &mut Vec<u8>, x: f64) {
    buf.push(0xfb);
    buf.extend_from_slice(&x.to_be_bytes());
}

/// Encode a byte string (major type 2).
pub(crate) fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
pub(crate) fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode a map canonically (major type 5) from pre-encoded entries.
///
/// Entries are sorted by their encoded key bytes.
pub(crate) fn encode_map_canonical(buf: &mut Vec<u8>, mut entries: Vec<(Vec<u8>, Vec<u8>)>) {
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, entries.len() as u64);
    for (key, value) in entries {
        buf.extend_from_slice(&key);
        buf.extend_from_slice(&value);
    }
}
