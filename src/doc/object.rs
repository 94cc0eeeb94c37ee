use std::fmt;

use crate::core::errors::JsonError;
use crate::core::value::JsonValue;
use crate::doc::edit;
use crate::index::lookup::DocReader;
use crate::index::record::TAG_OBJECT;
use crate::index::{build_index, verify_invariants, JsonDescription};

/// A JSON object backed by its serialized bytes and an index description.
///
/// Reads walk the index against the buffer; nothing is materialized until a
/// value is asked for. Edits rewrite both in place, so serialization is just
/// handing out the buffer.
#[derive(Debug, Clone)]
pub struct JsonObject {
    buffer: Vec<u8>,
    desc: JsonDescription,
}

impl JsonObject {
    /// An empty object, `{}`.
    pub fn new() -> Self {
        let buffer = b"{}".to_vec();
        let desc = build_index(&buffer).expect("empty object literal parses");
        Self { buffer, desc }
    }

    /// Index `bytes`, which must hold a top-level JSON object.
    pub fn parse(bytes: impl Into<Vec<u8>>) -> Result<Self, JsonError> {
        let buffer = bytes.into();
        let desc = build_index(&buffer)?;
        if desc.tag(desc.root()) != TAG_OBJECT {
            return Err(JsonError::InvalidTopLevelObject);
        }
        Ok(Self { buffer, desc })
    }

    pub(crate) fn from_parts(buffer: Vec<u8>, desc: JsonDescription) -> Self {
        Self { buffer, desc }
    }

    pub(crate) fn description(&self) -> &JsonDescription {
        &self.desc
    }

    fn reader(&self) -> DocReader<'_> {
        DocReader::new(&self.desc, &self.buffer)
    }

    /// Number of key/value pairs.
    pub fn len(&self) -> usize {
        self.desc.member_count(self.desc.root())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.reader()
            .find_key(self.desc.root(), key.as_bytes(), false, None)
            .is_some()
    }

    /// Materialize the value under `key`. Returns `None` when the key is
    /// absent or the value cannot be decoded.
    pub fn get(&self, key: &str) -> Option<JsonValue> {
        let found = self
            .reader()
            .find_key(self.desc.root(), key.as_bytes(), false, None)?;
        edit::extract_value(self.reader(), found.value_offset).ok()
    }

    /// All keys in declaration order.
    pub fn keys(&self) -> Vec<String> {
        self.reader().keys(self.desc.root(), false)
    }

    /// Set `key` to `value`, replacing any existing value in place.
    pub fn insert(&mut self, key: &str, value: impl Into<JsonValue>) -> Result<(), JsonError> {
        edit::insert_object_key(&mut self.buffer, &mut self.desc, key, value.into())
    }

    /// Remove `key` and its value. Returns false when the key is absent.
    pub fn remove(&mut self, key: &str) -> bool {
        edit::remove_object_key(&mut self.buffer, &mut self.desc, key)
    }

    /// The serialized document, whitespace preserved as parsed.
    pub fn as_bytes(&self) -> &[u8] {
        let root = self.desc.root();
        let offset = self.desc.json_offset(root);
        &self.buffer[offset..offset + self.desc.json_length(root)]
    }

    pub fn into_bytes(self) -> Vec<u8> {
        let root = self.desc.root();
        let offset = self.desc.json_offset(root);
        let length = self.desc.json_length(root);
        if offset == 0 && length == self.buffer.len() {
            self.buffer
        } else {
            self.buffer[offset..offset + length].to_vec()
        }
    }

    /// Assert the description's structural invariants. Test support.
    #[doc(hidden)]
    pub fn debug_verify(&self) {
        verify_invariants(&self.desc, &self.buffer);
    }
}

impl Default for JsonObject {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JsonObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_non_objects() {
        assert!(matches!(
            JsonObject::parse(&b"[1,2]"[..]),
            Err(JsonError::InvalidTopLevelObject)
        ));
        assert!(matches!(
            JsonObject::parse(&b"42"[..]),
            Err(JsonError::InvalidTopLevelObject)
        ));
        assert!(JsonObject::parse(&b"{}"[..]).is_ok());
    }

    #[test]
    fn get_materializes_scalars() {
        let obj = JsonObject::parse(&br#"{"s":"x","i":-3,"f":1.5,"b":true,"n":null}"#[..]).unwrap();
        assert_eq!(obj.get("s"), Some(JsonValue::String("x".into())));
        assert_eq!(obj.get("i"), Some(JsonValue::Integer(-3)));
        assert_eq!(obj.get("f"), Some(JsonValue::Float(1.5)));
        assert_eq!(obj.get("b"), Some(JsonValue::Bool(true)));
        assert_eq!(obj.get("n"), Some(JsonValue::Null));
        assert_eq!(obj.get("missing"), None);
    }

    #[test]
    fn nested_objects_extract_as_standalone_documents() {
        let obj = JsonObject::parse(&br#"{"outer":{"inner":7}}"#[..]).unwrap();
        let Some(JsonValue::Object(nested)) = obj.get("outer") else {
            panic!("expected an object");
        };
        assert_eq!(nested.as_bytes(), br#"{"inner":7}"#);
        assert_eq!(nested.get("inner"), Some(JsonValue::Integer(7)));
        nested.debug_verify();
    }

    #[test]
    fn insert_then_read_back() {
        let mut obj = JsonObject::new();
        obj.insert("username", "Joannis").unwrap();
        obj.debug_verify();
        assert_eq!(obj.as_bytes(), br#"{"username":"Joannis"}"#);

        obj.insert("age", 32).unwrap();
        obj.debug_verify();
        assert_eq!(obj.get("age"), Some(JsonValue::Integer(32)));
        assert_eq!(obj.get("username"), Some(JsonValue::String("Joannis".into())));
    }

    #[test]
    fn insert_replaces_existing_keys_in_place() {
        let mut obj = JsonObject::parse(&br#"{"a":1,"b":2,"c":3}"#[..]).unwrap();
        obj.insert("b", "middle").unwrap();
        obj.debug_verify();
        assert_eq!(obj.as_bytes(), br#"{"a":1,"b":"middle","c":3}"#);
        assert_eq!(obj.get("c"), Some(JsonValue::Integer(3)));
    }

    #[test]
    fn remove_middle_key() {
        let mut obj = JsonObject::parse(&br#"{"a":1,"b":2,"c":3}"#[..]).unwrap();
        assert!(obj.remove("b"));
        obj.debug_verify();
        assert_eq!(obj.as_bytes(), br#"{"a":1,"c":3}"#);
        assert_eq!(obj.get("a"), Some(JsonValue::Integer(1)));
        assert_eq!(obj.get("c"), Some(JsonValue::Integer(3)));
        assert!(!obj.remove("b"));
    }

    #[test]
    fn remove_first_and_last_keys() {
        let mut obj = JsonObject::parse(&br#"{"a":1,"b":2,"c":3}"#[..]).unwrap();
        assert!(obj.remove("a"));
        obj.debug_verify();
        assert_eq!(obj.as_bytes(), br#"{"b":2,"c":3}"#);
        assert!(obj.remove("c"));
        obj.debug_verify();
        assert_eq!(obj.as_bytes(), br#"{"b":2}"#);
        assert!(obj.remove("b"));
        obj.debug_verify();
        assert_eq!(obj.as_bytes(), b"{}");
        assert!(obj.is_empty());
    }

    #[test]
    fn escaped_keys_insert_and_resolve() {
        let mut obj = JsonObject::new();
        obj.insert("quo\"te", 1).unwrap();
        obj.debug_verify();
        assert!(obj.contains_key("quo\"te"));
        assert_eq!(obj.get("quo\"te"), Some(JsonValue::Integer(1)));
        assert!(obj.remove("quo\"te"));
        assert_eq!(obj.as_bytes(), b"{}");
    }

    #[test]
    fn whitespace_documents_survive_edits() {
        let mut obj = JsonObject::parse(&b"{ \"a\" : 1 , \"b\" : 2 }"[..]).unwrap();
        assert!(obj.remove("a"));
        obj.debug_verify();
        assert_eq!(obj.get("b"), Some(JsonValue::Integer(2)));
        obj.insert("c", 3).unwrap();
        obj.debug_verify();
        assert_eq!(obj.get("c"), Some(JsonValue::Integer(3)));
    }
}
