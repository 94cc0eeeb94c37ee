use std::fmt;

use crate::core::errors::JsonError;
use crate::core::value::JsonValue;
use crate::de::ArrayCursor;
use crate::doc::edit;
use crate::index::lookup::DocReader;
use crate::index::record::TAG_ARRAY;
use crate::index::{build_index, verify_invariants, JsonDescription};

/// A JSON array backed by its serialized bytes and an index description.
#[derive(Debug, Clone)]
pub struct JsonArray {
    buffer: Vec<u8>,
    desc: JsonDescription,
}

impl JsonArray {
    /// An empty array, `[]`.
    pub fn new() -> Self {
        let buffer = b"[]".to_vec();
        let desc = build_index(&buffer).expect("empty array literal parses");
        Self { buffer, desc }
    }

    /// Index `bytes`, which must hold a top-level JSON array.
    pub fn parse(bytes: impl Into<Vec<u8>>) -> Result<Self, JsonError> {
        let buffer = bytes.into();
        let desc = build_index(&buffer)?;
        if desc.tag(desc.root()) != TAG_ARRAY {
            return Err(JsonError::InvalidData(
                "top-level JSON value is not an array".into(),
            ));
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

    pub fn len(&self) -> usize {
        self.desc.member_count(self.desc.root())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialize the Nth element.
    pub fn get(&self, n: usize) -> Option<JsonValue> {
        let at = self.reader().array_element(self.desc.root(), n)?;
        edit::extract_value(self.reader(), at).ok()
    }

    /// Append `value`.
    pub fn push(&mut self, value: impl Into<JsonValue>) -> Result<(), JsonError> {
        edit::push_array_element(&mut self.buffer, &mut self.desc, value.into())
    }

    /// Replace the Nth element. Fails with `EndOfArray` past the end.
    pub fn replace(&mut self, n: usize, value: impl Into<JsonValue>) -> Result<(), JsonError> {
        let at = self
            .reader()
            .array_element(self.desc.root(), n)
            .ok_or(JsonError::EndOfArray)?;
        edit::replace_value(&mut self.buffer, &mut self.desc, at, value.into())
    }

    /// Remove the Nth element. Returns false when out of range.
    pub fn remove(&mut self, n: usize) -> bool {
        edit::remove_array_element(&mut self.buffer, &mut self.desc, n)
    }

    /// A typed cursor over the elements, consuming one record per decode.
    pub fn cursor(&self) -> ArrayCursor<'_, '_> {
        ArrayCursor::over_array(&self.desc, &self.buffer, self.desc.root())
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

impl Default for JsonArray {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JsonArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_non_arrays() {
        assert!(JsonArray::parse(&b"{}"[..]).is_err());
        assert!(JsonArray::parse(&b"[]"[..]).is_ok());
    }

    #[test]
    fn push_builds_a_document() {
        let mut arr = JsonArray::new();
        arr.push("admin").unwrap();
        arr.debug_verify();
        assert_eq!(arr.as_bytes(), br#"["admin"]"#);
        arr.push(2).unwrap();
        arr.push(JsonValue::Null).unwrap();
        arr.debug_verify();
        assert_eq!(arr.as_bytes(), br#"["admin",2,null]"#);
        assert_eq!(arr.len(), 3);
    }

    #[test]
    fn replace_routes_on_value_kind() {
        let mut arr = JsonArray::parse(&b"[1,2,3]"[..]).unwrap();
        arr.replace(1, "two").unwrap();
        arr.debug_verify();
        assert_eq!(arr.as_bytes(), br#"[1,"two",3]"#);

        let mut nested = JsonArray::new();
        nested.push(true).unwrap();
        arr.replace(2, nested).unwrap();
        arr.debug_verify();
        assert_eq!(arr.as_bytes(), br#"[1,"two",[true]]"#);
        assert_eq!(
            arr.get(2).unwrap().as_array().unwrap().get(0),
            Some(JsonValue::Bool(true))
        );

        assert!(matches!(arr.replace(9, 0), Err(JsonError::EndOfArray)));
    }

    #[test]
    fn remove_first_middle_last() {
        let mut arr = JsonArray::parse(&b"[1,2,3,4]"[..]).unwrap();
        assert!(arr.remove(0));
        arr.debug_verify();
        assert_eq!(arr.as_bytes(), b"[2,3,4]");
        assert!(arr.remove(1));
        arr.debug_verify();
        assert_eq!(arr.as_bytes(), b"[2,4]");
        assert!(arr.remove(1));
        arr.debug_verify();
        assert_eq!(arr.as_bytes(), b"[2]");
        assert!(arr.remove(0));
        arr.debug_verify();
        assert_eq!(arr.as_bytes(), b"[]");
        assert!(!arr.remove(0));
    }

    #[test]
    fn nested_document_substitution_relocates_offsets() {
        let mut arr = JsonArray::parse(&b"[0,0]"[..]).unwrap();
        let nested = JsonObject::parse(&br#"{"k":"v"}"#[..]).unwrap();
        arr.replace(0, nested).unwrap();
        arr.debug_verify();
        assert_eq!(arr.as_bytes(), br#"[{"k":"v"},0]"#);
        let Some(JsonValue::Object(inner)) = arr.get(0) else {
            panic!("expected an object");
        };
        assert_eq!(inner.get("k"), Some(JsonValue::String("v".into())));
    }

    use crate::doc::JsonObject;
}
