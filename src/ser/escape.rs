//! RFC 8259 output formatting for scalars.

use std::io::Write as _;

use crate::core::errors::JsonError;
use crate::core::value::JsonValue;

// Byte classes for output escaping: 0 passes through, `b'u'` becomes a
// `\u00XX` escape, anything else is the short escape letter. `/` is accepted
// escaped on input but never escaped on output.
static ESCAPE: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 0x20 {
        table[i] = b'u';
        i += 1;
    }
    table[0x08] = b'b';
    table[0x09] = b't';
    table[0x0A] = b'n';
    table[0x0C] = b'f';
    table[0x0D] = b'r';
    table[b'"' as usize] = b'"';
    table[b'\\' as usize] = b'\\';
    table
};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Write `value` as a quoted JSON string, escaping in chunks so clean runs
/// are copied wholesale.
pub(crate) fn write_escaped(out: &mut Vec<u8>, value: &str) {
    out.push(b'"');
    let bytes = value.as_bytes();
    let mut start = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        let escape = ESCAPE[byte as usize];
        if escape == 0 {
            continue;
        }
        if start < i {
            out.extend_from_slice(&bytes[start..i]);
        }
        if escape == b'u' {
            out.extend_from_slice(b"\\u00");
            out.push(HEX_DIGITS[(byte >> 4) as usize]);
            out.push(HEX_DIGITS[(byte & 0x0F) as usize]);
        } else {
            out.push(b'\\');
            out.push(escape);
        }
        start = i + 1;
    }
    if start < bytes.len() {
        out.extend_from_slice(&bytes[start..]);
    }
    out.push(b'"');
}

pub(crate) fn write_integer(out: &mut Vec<u8>, v: i64) {
    let _ = write!(out, "{v}");
}

pub(crate) fn write_u64(out: &mut Vec<u8>, v: u64) {
    let _ = write!(out, "{v}");
}

/// Shortest-roundtrip formatting via the host formatter. JSON has no
/// spelling for non-finite doubles.
pub(crate) fn write_float(out: &mut Vec<u8>, v: f64) -> Result<(), JsonError> {
    if !v.is_finite() {
        return Err(JsonError::InvalidData(format!(
            "{v} has no JSON representation"
        )));
    }
    let _ = write!(out, "{v}");
    Ok(())
}

/// Serialize a dynamic value. Composites contribute their buffers verbatim.
pub(crate) fn write_value(out: &mut Vec<u8>, value: &JsonValue) -> Result<(), JsonError> {
    match value {
        JsonValue::Null => out.extend_from_slice(b"null"),
        JsonValue::Bool(true) => out.extend_from_slice(b"true"),
        JsonValue::Bool(false) => out.extend_from_slice(b"false"),
        JsonValue::Integer(n) => write_integer(out, *n),
        JsonValue::Float(f) => write_float(out, *f)?,
        JsonValue::String(s) => write_escaped(out, s),
        JsonValue::Object(o) => out.extend_from_slice(o.as_bytes()),
        JsonValue::Array(a) => out.extend_from_slice(a.as_bytes()),
    }
    Ok(())
}
