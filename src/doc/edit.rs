//! The mutation engine: every edit changes the JSON buffer and the index
//! description together, and leaves all absolute offsets coherent.
//!
//! All entry points operate on a value that is a direct child of the
//! document's root composite. Nested edits go through extract-edit-replace
//! on the facades, so a single root header adjustment is always enough.

use crate::core::errors::JsonError;
use crate::core::value::JsonValue;
use crate::convert::number::{parse_float, parse_integer};
use crate::convert::string::decode_string;
use crate::doc::{JsonArray, JsonObject};
use crate::index::description::{splice, JsonDescription};
use crate::index::lookup::DocReader;
use crate::index::record::{
    shift_json_offsets, COMPOSITE_HEADER_SIZE, REC_CHILDREN_LENGTH, REC_JSON_LENGTH,
    REC_MEMBER_COUNT, TAG_ARRAY, TAG_ESCAPED_KEY, TAG_ESCAPED_STRING, TAG_FALSE, TAG_FLOAT,
    TAG_INTEGER, TAG_KEY, TAG_NULL, TAG_OBJECT, TAG_STRING, TAG_TRUE,
};
use crate::scan::fnv1a;
use crate::ser::escape::{write_escaped, write_value};

use byteorder::{ByteOrder, LittleEndian};

fn push_u8(records: &mut Vec<u8>, v: u8) {
    records.push(v);
}

fn push_i32(records: &mut Vec<u8>, v: i32) {
    let mut field = [0u8; 4];
    LittleEndian::write_i32(&mut field, v);
    records.extend_from_slice(&field);
}

fn push_u32(records: &mut Vec<u8>, v: u32) {
    let mut field = [0u8; 4];
    LittleEndian::write_u32(&mut field, v);
    records.extend_from_slice(&field);
}

fn push_mark(records: &mut Vec<u8>, tag: u8, json_at: usize) {
    push_u8(records, tag);
    push_i32(records, json_at as i32);
}

fn push_span(records: &mut Vec<u8>, tag: u8, json_at: usize, json_len: usize) {
    push_u8(records, tag);
    push_i32(records, json_at as i32);
    push_i32(records, json_len as i32);
}

/// Append records describing `value`, whose serialized bytes `json` will
/// land at absolute buffer position `json_at`.
fn describe_value(records: &mut Vec<u8>, value: &JsonValue, json_at: usize, json: &[u8]) {
    match value {
        JsonValue::Null => push_mark(records, TAG_NULL, json_at),
        JsonValue::Bool(true) => push_mark(records, TAG_TRUE, json_at),
        JsonValue::Bool(false) => push_mark(records, TAG_FALSE, json_at),
        JsonValue::Integer(_) => push_span(records, TAG_INTEGER, json_at, json.len()),
        JsonValue::Float(_) => push_span(records, TAG_FLOAT, json_at, json.len()),
        JsonValue::String(_) => {
            let tag = if json.contains(&b'\\') {
                TAG_ESCAPED_STRING
            } else {
                TAG_STRING
            };
            push_span(records, tag, json_at, json.len());
        }
        JsonValue::Object(nested) => splice_composite(records, nested.description(), json_at),
        JsonValue::Array(nested) => splice_composite(records, nested.description(), json_at),
    }
}

/// Copy a nested document's records and relocate their offsets to the
/// insertion point.
fn splice_composite(records: &mut Vec<u8>, desc: &JsonDescription, json_at: usize) {
    let root = desc.root();
    let copied = desc.slice(root, desc.record_size(root));
    let start = records.len();
    records.extend_from_slice(&copied);
    let end = records.len();
    let delta = json_at as i32 - desc.json_offset(root) as i32;
    shift_json_offsets(records, start, end, i32::MIN, delta);
}

fn key_record(records: &mut Vec<u8>, escaped_key: &[u8], json_at: usize) {
    let raw = &escaped_key[1..escaped_key.len() - 1];
    let tag = if raw.contains(&b'\\') { TAG_ESCAPED_KEY } else { TAG_KEY };
    push_u8(records, tag);
    push_i32(records, json_at as i32);
    push_i32(records, escaped_key.len() as i32);
    push_u32(records, fnv1a(raw));
}

/// Remove a key/value pair from the root object. Returns false when the key
/// is absent.
pub(super) fn remove_object_key(
    buffer: &mut Vec<u8>,
    desc: &mut JsonDescription,
    key: &str,
) -> bool {
    let root = desc.root();
    let found = DocReader::new(desc, buffer).find_key(root, key.as_bytes(), false, None);
    let Some(found) = found else {
        return false;
    };

    let key_offset = found.key_offset;
    let records_end = desc.skip_record(found.value_offset);
    let removed_records = records_end - key_offset;

    let key_json_start = desc.json_offset(key_offset);
    let value_json_end = desc.json_offset(found.value_offset) + desc.json_length(found.value_offset);
    let member_count = desc.member_count(root);
    let first_pair = key_offset == root + COMPOSITE_HEADER_SIZE;

    // The pair goes together with one enclosing comma: the one after it when
    // the pair is first, the one before it otherwise.
    let (span_start, span_end) = if first_pair {
        if member_count > 1 {
            let mut end = value_json_end;
            while buffer[end] != b',' {
                end += 1;
            }
            (key_json_start, end + 1)
        } else {
            (key_json_start, value_json_end)
        }
    } else {
        let mut start = key_json_start - 1;
        while buffer[start] != b',' {
            start -= 1;
        }
        (start, value_json_end)
    };
    let removed_json = span_end - span_start;

    splice(buffer, span_start, removed_json, 0);

    desc.shift_offsets_tail(span_end, -(removed_json as i32), key_offset..records_end);
    desc.prepare_rewrite(key_offset, removed_records, 0);
    desc.set_i32(root + REC_MEMBER_COUNT, (member_count - 1) as i32);
    desc.set_i32(
        root + REC_CHILDREN_LENGTH,
        (desc.children_length(root) - removed_records) as i32,
    );
    desc.set_i32(
        root + REC_JSON_LENGTH,
        (desc.json_length(root) - removed_json) as i32,
    );
    true
}

/// Remove the Nth element of the root array. Returns false when out of range.
pub(super) fn remove_array_element(
    buffer: &mut Vec<u8>,
    desc: &mut JsonDescription,
    n: usize,
) -> bool {
    let root = desc.root();
    let element = DocReader::new(desc, buffer).array_element(root, n);
    let Some(element) = element else {
        return false;
    };

    let records_end = desc.skip_record(element);
    let removed_records = records_end - element;
    let element_start = desc.json_offset(element);
    let element_end = element_start + desc.json_length(element);
    let member_count = desc.member_count(root);

    let (span_start, span_end) = if n == 0 {
        if member_count > 1 {
            let mut end = element_end;
            while buffer[end] != b',' {
                end += 1;
            }
            (element_start, end + 1)
        } else {
            (element_start, element_end)
        }
    } else {
        let mut start = element_start - 1;
        while buffer[start] != b',' {
            start -= 1;
        }
        (start, element_end)
    };
    let removed_json = span_end - span_start;

    splice(buffer, span_start, removed_json, 0);

    desc.shift_offsets_tail(span_end, -(removed_json as i32), element..records_end);
    desc.prepare_rewrite(element, removed_records, 0);
    desc.set_i32(root + REC_MEMBER_COUNT, (member_count - 1) as i32);
    desc.set_i32(
        root + REC_CHILDREN_LENGTH,
        (desc.children_length(root) - removed_records) as i32,
    );
    desc.set_i32(
        root + REC_JSON_LENGTH,
        (desc.json_length(root) - removed_json) as i32,
    );
    true
}

/// Set `key` on the root object: replace the value in place when the key
/// exists, splice a new pair before the closing brace otherwise.
pub(super) fn insert_object_key(
    buffer: &mut Vec<u8>,
    desc: &mut JsonDescription,
    key: &str,
    value: JsonValue,
) -> Result<(), JsonError> {
    let root = desc.root();
    let existing = DocReader::new(desc, buffer).find_key(root, key.as_bytes(), false, None);
    if let Some(found) = existing {
        return replace_value(buffer, desc, found.value_offset, value);
    }

    let member_count = desc.member_count(root);
    let close = desc.json_offset(root) + desc.json_length(root) - 1;

    let mut payload = Vec::new();
    if member_count > 0 {
        payload.push(b',');
    }
    let key_rel = payload.len();
    write_escaped(&mut payload, key);
    let key_len = payload.len() - key_rel;
    payload.push(b':');
    let value_rel = payload.len();
    write_value(&mut payload, &value)?;

    let mut records = Vec::new();
    key_record(
        &mut records,
        &payload[key_rel..key_rel + key_len],
        close + key_rel,
    );
    describe_value(&mut records, &value, close + value_rel, &payload[value_rel..]);

    splice(buffer, close, 0, payload.len());
    buffer[close..close + payload.len()].copy_from_slice(&payload);

    let insert_at = root + COMPOSITE_HEADER_SIZE + desc.children_length(root);
    desc.shift_offsets_tail(close, payload.len() as i32, 0..0);
    desc.prepare_rewrite(insert_at, 0, records.len());
    desc.write_records_at(insert_at, &records);
    desc.set_i32(root + REC_MEMBER_COUNT, (member_count + 1) as i32);
    desc.set_i32(
        root + REC_CHILDREN_LENGTH,
        (desc.children_length(root) + records.len()) as i32,
    );
    desc.set_i32(
        root + REC_JSON_LENGTH,
        (desc.json_length(root) + payload.len()) as i32,
    );
    Ok(())
}

/// Append a value before the root array's closing bracket.
pub(super) fn push_array_element(
    buffer: &mut Vec<u8>,
    desc: &mut JsonDescription,
    value: JsonValue,
) -> Result<(), JsonError> {
    let root = desc.root();
    let member_count = desc.member_count(root);
    let close = desc.json_offset(root) + desc.json_length(root) - 1;

    let mut payload = Vec::new();
    if member_count > 0 {
        payload.push(b',');
    }
    let value_rel = payload.len();
    write_value(&mut payload, &value)?;

    let mut records = Vec::new();
    describe_value(&mut records, &value, close + value_rel, &payload[value_rel..]);

    splice(buffer, close, 0, payload.len());
    buffer[close..close + payload.len()].copy_from_slice(&payload);

    let insert_at = root + COMPOSITE_HEADER_SIZE + desc.children_length(root);
    desc.shift_offsets_tail(close, payload.len() as i32, 0..0);
    desc.prepare_rewrite(insert_at, 0, records.len());
    desc.write_records_at(insert_at, &records);
    desc.set_i32(root + REC_MEMBER_COUNT, (member_count + 1) as i32);
    desc.set_i32(
        root + REC_CHILDREN_LENGTH,
        (desc.children_length(root) + records.len()) as i32,
    );
    desc.set_i32(
        root + REC_JSON_LENGTH,
        (desc.json_length(root) + payload.len()) as i32,
    );
    Ok(())
}

/// Rewrite the value record at `value_offset` (a direct child of the root)
/// with a new dynamic value, resizing both buffer and description.
pub(super) fn replace_value(
    buffer: &mut Vec<u8>,
    desc: &mut JsonDescription,
    value_offset: usize,
    value: JsonValue,
) -> Result<(), JsonError> {
    let root = desc.root();
    let old_json_offset = desc.json_offset(value_offset);
    let old_json_len = desc.json_length(value_offset);
    let old_records = desc.record_size(value_offset);

    let mut json = Vec::new();
    write_value(&mut json, &value)?;
    let mut records = Vec::new();
    describe_value(&mut records, &value, old_json_offset, &json);

    let delta_json = json.len() as i32 - old_json_len as i32;
    let delta_records = records.len() as i32 - old_records as i32;

    desc.shift_offsets_tail(
        old_json_offset + old_json_len,
        delta_json,
        value_offset..value_offset + old_records,
    );
    desc.prepare_rewrite(value_offset, old_records, records.len());
    desc.write_records_at(value_offset, &records);
    desc.set_i32(
        root + REC_CHILDREN_LENGTH,
        desc.children_length(root) as i32 + delta_records,
    );
    desc.set_i32(
        root + REC_JSON_LENGTH,
        desc.json_length(root) as i32 + delta_json,
    );

    splice(buffer, old_json_offset, old_json_len, json.len());
    buffer[old_json_offset..old_json_offset + json.len()].copy_from_slice(&json);
    Ok(())
}

/// Materialize the value record at `at` as an owned dynamic value. Composite
/// values are extracted into standalone documents rebased to offset zero.
pub(super) fn extract_value(reader: DocReader<'_>, at: usize) -> Result<JsonValue, JsonError> {
    let tag = reader.desc.tag(at);
    match tag {
        TAG_NULL => Ok(JsonValue::Null),
        TAG_TRUE => Ok(JsonValue::Bool(true)),
        TAG_FALSE => Ok(JsonValue::Bool(false)),
        TAG_INTEGER => {
            let data = reader.data_slice(at);
            match parse_integer(data) {
                Some(n) => Ok(JsonValue::Integer(n)),
                // beyond 64-bit range: degrade to the closest double
                None => parse_float(data).map(JsonValue::Float).ok_or_else(|| {
                    JsonError::InvalidData(format!(
                        "unparseable number: {}",
                        String::from_utf8_lossy(data)
                    ))
                }),
            }
        }
        TAG_FLOAT => {
            let data = reader.data_slice(at);
            parse_float(data).map(JsonValue::Float).ok_or_else(|| {
                JsonError::InvalidData(format!(
                    "unparseable number: {}",
                    String::from_utf8_lossy(data)
                ))
            })
        }
        TAG_STRING | TAG_ESCAPED_STRING | TAG_KEY | TAG_ESCAPED_KEY => {
            let escaped = matches!(tag, TAG_ESCAPED_STRING | TAG_ESCAPED_KEY);
            decode_string(reader.data_slice(at), escaped).map(JsonValue::String)
        }
        TAG_OBJECT => {
            let (buffer, sub) = extract_composite(reader, at);
            Ok(JsonValue::Object(JsonObject::from_parts(buffer, sub)))
        }
        TAG_ARRAY => {
            let (buffer, sub) = extract_composite(reader, at);
            Ok(JsonValue::Array(JsonArray::from_parts(buffer, sub)))
        }
        other => unreachable!("corrupt index description: unknown tag {other:#x}"),
    }
}

fn extract_composite(reader: DocReader<'_>, at: usize) -> (Vec<u8>, JsonDescription) {
    let (offset, length) = reader.json_bounds(at);
    let buffer = reader.buffer[offset..offset + length].to_vec();
    let mut sub = JsonDescription::from_records(reader.desc.slice(at, reader.desc.record_size(at)));
    sub.advance_all_json_offsets(-(offset as i32));
    (buffer, sub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build_index;
    use crate::index::record::read_i32;

    #[test]
    fn scalar_values_describe_to_fixed_records() {
        let mut records = Vec::new();
        describe_value(&mut records, &JsonValue::Null, 40, b"null");
        assert_eq!(records.len(), 5);
        assert_eq!(records[0], TAG_NULL);
        assert_eq!(read_i32(&records, 1), 40);

        records.clear();
        describe_value(&mut records, &JsonValue::Integer(12), 7, b"12");
        assert_eq!(records.len(), 9);
        assert_eq!(records[0], TAG_INTEGER);
        assert_eq!(read_i32(&records, 5), 2);
    }

    #[test]
    fn string_records_pick_the_escaped_tag_from_the_payload() {
        let mut records = Vec::new();
        describe_value(&mut records, &JsonValue::String("ab".into()), 0, br#""ab""#);
        assert_eq!(records[0], TAG_STRING);

        records.clear();
        describe_value(
            &mut records,
            &JsonValue::String("a\"b".into()),
            0,
            br#""a\"b""#,
        );
        assert_eq!(records[0], TAG_ESCAPED_STRING);
    }

    #[test]
    fn composite_splices_relocate_every_offset() {
        let nested = JsonArray::parse(&b"[1,[2]]"[..]).unwrap();
        let mut records = Vec::new();
        describe_value(&mut records, &JsonValue::Array(nested), 100, b"[1,[2]]");

        // outer array header
        assert_eq!(records[0], TAG_ARRAY);
        assert_eq!(read_i32(&records, 1), 100);
        // first element "1" sat at offset 1, now 101
        assert_eq!(read_i32(&records, 18), 101);
        // inner array sat at offset 3, now 103
        assert_eq!(read_i32(&records, 27), 103);
    }

    #[test]
    fn key_records_hash_the_raw_spelling() {
        let mut records = Vec::new();
        key_record(&mut records, br#""user""#, 1);
        assert_eq!(records[0], TAG_KEY);
        assert_eq!(read_i32(&records, 5), 6);
        assert_eq!(
            u32::from_le_bytes(records[9..13].try_into().unwrap()),
            fnv1a(b"user")
        );

        records.clear();
        key_record(&mut records, br#""a\"b""#, 1);
        assert_eq!(records[0], TAG_ESCAPED_KEY);
        assert_eq!(
            u32::from_le_bytes(records[9..13].try_into().unwrap()),
            fnv1a(br#"a\"b"#)
        );
    }

    #[test]
    fn extract_rebases_nested_documents_to_zero() {
        let json = br#"{"pad":123456789,"doc":{"x":1}}"#;
        let desc = build_index(json).unwrap();
        let reader = DocReader::new(&desc, json);
        let found = reader.find_key(desc.root(), b"doc", false, None).unwrap();
        let JsonValue::Object(doc) = extract_value(reader, found.value_offset).unwrap() else {
            panic!("expected an object");
        };
        assert_eq!(doc.as_bytes(), br#"{"x":1}"#);
        doc.debug_verify();
    }

    #[test]
    fn oversized_integers_degrade_to_doubles() {
        let json = br#"{"n":123456789012345678901234567890}"#;
        let desc = build_index(json).unwrap();
        let reader = DocReader::new(&desc, json);
        let found = reader.find_key(desc.root(), b"n", false, None).unwrap();
        let JsonValue::Float(f) = extract_value(reader, found.value_offset).unwrap() else {
            panic!("expected a float fallback");
        };
        assert_eq!(
            f,
            "123456789012345678901234567890".parse::<f64>().unwrap()
        );
    }
}
