//! The structural decoder driver: a `serde::Deserializer` that walks the
//! index description against the source buffer.
//!
//! Struct decoding is pull-based. The derived `Deserialize` impl hands over
//! its field list, and the driver looks each field up by name, carrying a
//! sequential-access hint so that documents whose keys arrive in declaration
//! order never rescan, while out-of-order documents stay correct through the
//! lookup's wrap-around. Unescaped strings are borrowed straight out of the
//! input buffer.

use std::str::FromStr;

use serde::de::{
    self, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;

use crate::convert::number::{parse_float, parse_integer, parse_unsigned};
use crate::convert::string::{decode_string, snake_to_camel, unescape};
use crate::core::errors::JsonError;
use crate::index::description::JsonDescription;
use crate::index::lookup::DocReader;
use crate::index::record::{
    COMPOSITE_HEADER_SIZE, TAG_ARRAY, TAG_ESCAPED_KEY, TAG_ESCAPED_STRING, TAG_FALSE, TAG_FLOAT,
    TAG_INTEGER, TAG_KEY, TAG_NULL, TAG_OBJECT, TAG_STRING, TAG_TRUE,
};
use crate::index::build_index;

/// What a missing key, or a `null` standing in for a value, decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingKeyPolicy {
    /// Presence is required for non-optional fields; `null` satisfies
    /// optionals.
    #[default]
    Default,
    /// Missing keys satisfy optionals, decoding to the type's empty state.
    DecodeNilForKeyNotFound,
    /// A `null` value for an optional is an error rather than `None`.
    TreatNilValuesAsMissing,
}

impl FromStr for MissingKeyPolicy {
    type Err = JsonError;

    fn from_str(s: &str) -> Result<Self, JsonError> {
        match s {
            "default" => Ok(Self::Default),
            "decode_nil_for_key_not_found" => Ok(Self::DecodeNilForKeyNotFound),
            "treat_nil_values_as_missing" => Ok(Self::TreatNilValuesAsMissing),
            other => Err(JsonError::UnknownStrategy(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DecoderSettings {
    pub snake_case_keys: bool,
    pub missing_key_policy: MissingKeyPolicy,
}

/// Build the index for `json` and decode `T` from its root record.
pub(crate) fn decode_document<'de, T: de::Deserialize<'de>>(
    json: &'de [u8],
    settings: DecoderSettings,
) -> Result<T, JsonError> {
    let desc = build_index(json)?;
    let driver = Driver::new(&desc, json, desc.root(), settings);
    T::deserialize(driver)
}

fn conversion_error(data: &[u8], target: &'static str) -> JsonError {
    JsonError::TypeConversion {
        value: String::from_utf8_lossy(data).into_owned(),
        target,
    }
}

pub(crate) struct Driver<'de, 'a> {
    desc: &'a JsonDescription,
    buffer: &'de [u8],
    at: usize,
    settings: DecoderSettings,
    path: String,
}

impl<'de, 'a> Driver<'de, 'a>
where
    'de: 'a,
{
    pub fn new(
        desc: &'a JsonDescription,
        buffer: &'de [u8],
        at: usize,
        settings: DecoderSettings,
    ) -> Self {
        Self {
            desc,
            buffer,
            at,
            settings,
            path: String::from("$"),
        }
    }

    fn child(&self, at: usize, path: String) -> Driver<'de, 'a> {
        Driver {
            desc: self.desc,
            buffer: self.buffer,
            at,
            settings: self.settings,
            path,
        }
    }

    fn reader(&self) -> DocReader<'a> {
        DocReader::new(self.desc, self.buffer)
    }

    #[inline]
    fn tag(&self) -> u8 {
        self.desc.tag(self.at)
    }

    /// Data span sliced with the buffer's own lifetime, so strings can be
    /// borrowed by the caller.
    fn data(&self) -> &'de [u8] {
        let offset = self.desc.json_offset(self.at);
        let length = self.desc.json_length(self.at);
        match self.tag() {
            TAG_STRING | TAG_ESCAPED_STRING | TAG_KEY | TAG_ESCAPED_KEY => {
                &self.buffer[offset + 1..offset + length - 1]
            }
            _ => &self.buffer[offset..offset + length],
        }
    }

    fn borrowed_str(&self) -> Result<&'de str, JsonError> {
        std::str::from_utf8(self.data()).map_err(|e| JsonError::InvalidData(e.to_string()))
    }

    fn type_error(&self, expected: &'static str) -> JsonError {
        JsonError::Decoding {
            expected,
            path: self.path.clone(),
        }
    }

    fn integer<T>(
        &self,
        target: &'static str,
        convert: impl FnOnce(i64) -> Option<T>,
    ) -> Result<T, JsonError> {
        if self.tag() != TAG_INTEGER {
            return Err(self.type_error("integer"));
        }
        let data = self.data();
        let value = parse_integer(data).ok_or_else(|| conversion_error(data, target))?;
        convert(value).ok_or_else(|| conversion_error(data, target))
    }

    fn unsigned<T>(
        &self,
        target: &'static str,
        convert: impl FnOnce(u64) -> Option<T>,
    ) -> Result<T, JsonError> {
        if self.tag() != TAG_INTEGER {
            return Err(self.type_error("integer"));
        }
        let data = self.data();
        let value = parse_unsigned(data).ok_or_else(|| conversion_error(data, target))?;
        convert(value).ok_or_else(|| conversion_error(data, target))
    }

    fn float(&self) -> Result<f64, JsonError> {
        match self.tag() {
            TAG_INTEGER | TAG_FLOAT => {
                let data = self.data();
                parse_float(data).ok_or_else(|| conversion_error(data, "double"))
            }
            _ => Err(self.type_error("number")),
        }
    }
}

macro_rules! deserialize_integer {
    ($method:ident, $visit:ident, $t:ty, $name:literal) => {
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
            let value = self.integer($name, |n| <$t>::try_from(n).ok())?;
            visitor.$visit(value)
        }
    };
}

macro_rules! deserialize_unsigned {
    ($method:ident, $visit:ident, $t:ty, $name:literal) => {
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
            let value = self.unsigned($name, |n| <$t>::try_from(n).ok())?;
            visitor.$visit(value)
        }
    };
}

impl<'de, 'a> de::Deserializer<'de> for Driver<'de, 'a>
where
    'de: 'a,
{
    type Error = JsonError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        match self.tag() {
            TAG_NULL => visitor.visit_unit(),
            TAG_TRUE => visitor.visit_bool(true),
            TAG_FALSE => visitor.visit_bool(false),
            TAG_INTEGER => {
                let data = self.data();
                if let Some(n) = parse_integer(data) {
                    visitor.visit_i64(n)
                } else if let Some(n) = parse_unsigned(data) {
                    visitor.visit_u64(n)
                } else {
                    // past the 64-bit range: deliver the closest double
                    match parse_float(data) {
                        Some(f) => visitor.visit_f64(f),
                        None => Err(conversion_error(data, "number")),
                    }
                }
            }
            TAG_FLOAT => visitor.visit_f64(self.float()?),
            TAG_STRING => visitor.visit_borrowed_str(self.borrowed_str()?),
            TAG_ESCAPED_STRING => visitor.visit_string(decode_string(self.data(), true)?),
            TAG_OBJECT => visitor.visit_map(MapEntries::new(self)),
            TAG_ARRAY => visitor.visit_seq(ArrayCursor::from_driver(&self)),
            _ => Err(self.type_error("value")),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        match self.tag() {
            TAG_TRUE => visitor.visit_bool(true),
            TAG_FALSE => visitor.visit_bool(false),
            _ => Err(self.type_error("boolean")),
        }
    }

    deserialize_integer!(deserialize_i8, visit_i8, i8, "Int8");
    deserialize_integer!(deserialize_i16, visit_i16, i16, "Int16");
    deserialize_integer!(deserialize_i32, visit_i32, i32, "Int32");
    deserialize_integer!(deserialize_i64, visit_i64, i64, "Int64");
    deserialize_unsigned!(deserialize_u8, visit_u8, u8, "UInt8");
    deserialize_unsigned!(deserialize_u16, visit_u16, u16, "UInt16");
    deserialize_unsigned!(deserialize_u32, visit_u32, u32, "UInt32");
    deserialize_unsigned!(deserialize_u64, visit_u64, u64, "UInt64");

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        visitor.visit_f32(self.float()? as f32)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        visitor.visit_f64(self.float()?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        let decoded;
        let s = match self.tag() {
            TAG_STRING => self.borrowed_str()?,
            TAG_ESCAPED_STRING => {
                decoded = decode_string(self.data(), true)?;
                &decoded
            }
            _ => return Err(self.type_error("character")),
        };
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(self.type_error("character")),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        match self.tag() {
            TAG_STRING => visitor.visit_borrowed_str(self.borrowed_str()?),
            TAG_ESCAPED_STRING => visitor.visit_string(decode_string(self.data(), true)?),
            _ => Err(self.type_error("string")),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        match self.tag() {
            TAG_STRING => visitor.visit_borrowed_bytes(self.data()),
            TAG_ESCAPED_STRING => visitor.visit_byte_buf(unescape(self.data())?),
            TAG_ARRAY => visitor.visit_seq(ArrayCursor::from_driver(&self)),
            _ => Err(self.type_error("bytes")),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        if self.tag() == TAG_NULL {
            if self.settings.missing_key_policy == MissingKeyPolicy::TreatNilValuesAsMissing {
                return Err(JsonError::MissingValue { path: self.path });
            }
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        if self.tag() == TAG_NULL {
            visitor.visit_unit()
        } else {
            Err(self.type_error("null"))
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, JsonError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, JsonError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        if self.tag() != TAG_ARRAY {
            return Err(JsonError::MissingUnkeyedContainer { path: self.path });
        }
        visitor.visit_seq(ArrayCursor::from_driver(&self))
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, JsonError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, JsonError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        if self.tag() != TAG_OBJECT {
            return Err(JsonError::MissingKeyedContainer { path: self.path });
        }
        visitor.visit_map(MapEntries::new(self))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, JsonError> {
        if self.tag() != TAG_OBJECT {
            return Err(JsonError::MissingKeyedContainer { path: self.path });
        }
        visitor.visit_map(StructAccess::new(self, fields))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, JsonError> {
        match self.tag() {
            TAG_STRING | TAG_ESCAPED_STRING => visitor.visit_enum(UnitVariant { driver: self }),
            TAG_OBJECT => {
                if self.desc.member_count(self.at) != 1 {
                    return Err(self.type_error("externally tagged enum"));
                }
                visitor.visit_enum(TaggedVariant { driver: self })
            }
            _ => Err(self.type_error("enum")),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        // the index already knows the record's extent; nothing to skip
        visitor.visit_unit()
    }
}

/// Field-list-driven access for struct targets.
struct StructAccess<'de, 'a> {
    driver: Driver<'de, 'a>,
    fields: std::slice::Iter<'static, &'static str>,
    pending: Option<Pending>,
    hint: Option<usize>,
}

enum Pending {
    Value { field: &'static str, at: usize },
    Absent { field: &'static str },
}

impl<'de, 'a> StructAccess<'de, 'a> {
    fn new(driver: Driver<'de, 'a>, fields: &'static [&'static str]) -> Self {
        Self {
            driver,
            fields: fields.iter(),
            pending: None,
            hint: None,
        }
    }
}

impl<'de, 'a> MapAccess<'de> for StructAccess<'de, 'a>
where
    'de: 'a,
{
    type Error = JsonError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, JsonError> {
        loop {
            let Some(&field) = self.fields.next() else {
                return Ok(None);
            };
            let found = self.driver.reader().find_key(
                self.driver.at,
                field.as_bytes(),
                self.driver.settings.snake_case_keys,
                self.hint,
            );
            match found {
                Some(m) => {
                    self.hint = Some(self.driver.desc.skip_record(m.value_offset));
                    self.pending = Some(Pending::Value {
                        field,
                        at: m.value_offset,
                    });
                    return seed
                        .deserialize(de::value::StrDeserializer::new(field))
                        .map(Some);
                }
                None if self.driver.settings.missing_key_policy
                    == MissingKeyPolicy::DecodeNilForKeyNotFound =>
                {
                    self.pending = Some(Pending::Absent { field });
                    return seed
                        .deserialize(de::value::StrDeserializer::new(field))
                        .map(Some);
                }
                // absent: leave the field to serde's missing-field handling
                None => continue,
            }
        }
    }

    fn next_value_seed<S: DeserializeSeed<'de>>(&mut self, seed: S) -> Result<S::Value, JsonError> {
        match self.pending.take() {
            Some(Pending::Value { field, at }) => {
                let path = format!("{}.{field}", self.driver.path);
                seed.deserialize(self.driver.child(at, path))
            }
            Some(Pending::Absent { field }) => seed.deserialize(AbsentValue {
                path: format!("{}.{field}", self.driver.path),
            }),
            None => Err(JsonError::Message("value requested before key".into())),
        }
    }
}

/// Index-order access for map targets.
struct MapEntries<'de, 'a> {
    driver: Driver<'de, 'a>,
    at: usize,
    end: usize,
    value_at: usize,
    last_key: String,
}

impl<'de, 'a> MapEntries<'de, 'a>
where
    'de: 'a,
{
    fn new(driver: Driver<'de, 'a>) -> Self {
        let first = driver.at + COMPOSITE_HEADER_SIZE;
        let end = first + driver.desc.children_length(driver.at);
        Self {
            driver,
            at: first,
            end,
            value_at: 0,
            last_key: String::new(),
        }
    }
}

impl<'de, 'a> MapAccess<'de> for MapEntries<'de, 'a>
where
    'de: 'a,
{
    type Error = JsonError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, JsonError> {
        if self.at >= self.end {
            return Ok(None);
        }
        let key_at = self.at;
        let raw = self.driver.reader().data_slice(key_at);
        let escaped = matches!(
            self.driver.desc.tag(key_at),
            TAG_ESCAPED_KEY | TAG_ESCAPED_STRING
        );
        let key = if self.driver.settings.snake_case_keys {
            let logical = if escaped { unescape(raw)? } else { raw.to_vec() };
            let mut camel = Vec::with_capacity(logical.len());
            snake_to_camel(&logical, &mut camel);
            String::from_utf8(camel).map_err(|e| JsonError::InvalidData(e.to_string()))?
        } else {
            decode_string(raw, escaped)?
        };

        self.value_at = self.driver.desc.skip_record(key_at);
        self.at = self.driver.desc.skip_record(self.value_at);
        self.last_key = key.clone();
        seed.deserialize(key.into_deserializer()).map(Some)
    }

    fn next_value_seed<S: DeserializeSeed<'de>>(&mut self, seed: S) -> Result<S::Value, JsonError> {
        let path = format!("{}.{}", self.driver.path, self.last_key);
        seed.deserialize(self.driver.child(self.value_at, path))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.driver.desc.member_count(self.driver.at))
    }
}

/// A typed cursor over an array's elements, consuming one record at a time.
pub struct ArrayCursor<'de, 'a> {
    desc: &'a JsonDescription,
    buffer: &'de [u8],
    settings: DecoderSettings,
    path: String,
    at: usize,
    end: usize,
    index: usize,
}

impl<'de, 'a> ArrayCursor<'de, 'a>
where
    'de: 'a,
{
    pub(crate) fn over_array(desc: &'a JsonDescription, buffer: &'de [u8], array_at: usize) -> Self {
        let first = array_at + COMPOSITE_HEADER_SIZE;
        Self {
            desc,
            buffer,
            settings: DecoderSettings::default(),
            path: String::from("$"),
            at: first,
            end: first + desc.children_length(array_at),
            index: 0,
        }
    }

    fn from_driver(driver: &Driver<'de, 'a>) -> Self {
        let first = driver.at + COMPOSITE_HEADER_SIZE;
        Self {
            desc: driver.desc,
            buffer: driver.buffer,
            settings: driver.settings,
            path: driver.path.clone(),
            at: first,
            end: first + driver.desc.children_length(driver.at),
            index: 0,
        }
    }

    fn element_driver(&mut self) -> Driver<'de, 'a> {
        let driver = Driver {
            desc: self.desc,
            buffer: self.buffer,
            at: self.at,
            settings: self.settings,
            path: format!("{}[{}]", self.path, self.index),
        };
        self.at = self.desc.skip_record(self.at);
        self.index += 1;
        driver
    }

    /// Whether every element has been consumed.
    pub fn is_at_end(&self) -> bool {
        self.at >= self.end
    }

    /// Decode the next element. Fails with `EndOfArray` past the end.
    pub fn decode<T: de::Deserialize<'de>>(&mut self) -> Result<T, JsonError> {
        if self.is_at_end() {
            return Err(JsonError::EndOfArray);
        }
        T::deserialize(self.element_driver())
    }

    /// Consume the next element if it is `null`. `Ok(false)` leaves the
    /// cursor in place. Fails with `EndOfArray` past the end.
    pub fn decode_nil(&mut self) -> Result<bool, JsonError> {
        if self.is_at_end() {
            return Err(JsonError::EndOfArray);
        }
        if self.desc.tag(self.at) == TAG_NULL {
            self.at = self.desc.skip_record(self.at);
            self.index += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

impl<'de, 'a> SeqAccess<'de> for ArrayCursor<'de, 'a>
where
    'de: 'a,
{
    type Error = JsonError;

    fn next_element_seed<S: DeserializeSeed<'de>>(
        &mut self,
        seed: S,
    ) -> Result<Option<S::Value>, JsonError> {
        if self.is_at_end() {
            return Ok(None);
        }
        seed.deserialize(self.element_driver()).map(Some)
    }
}

/// Stands in for a value whose key was absent under
/// `DecodeNilForKeyNotFound`.
struct AbsentValue {
    path: String,
}

impl<'de> de::Deserializer<'de> for AbsentValue {
    type Error = JsonError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        visitor.visit_unit()
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        visitor.visit_none()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str string bytes
        byte_buf unit unit_struct newtype_struct seq tuple tuple_struct map
        struct enum identifier ignored_any
    }
}

struct UnitVariant<'de, 'a> {
    driver: Driver<'de, 'a>,
}

impl<'de, 'a> EnumAccess<'de> for UnitVariant<'de, 'a>
where
    'de: 'a,
{
    type Error = JsonError;
    type Variant = UnitOnly;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, UnitOnly), JsonError> {
        let path = self.driver.path.clone();
        let name = decode_string(
            self.driver.data(),
            self.driver.tag() == TAG_ESCAPED_STRING,
        )?;
        let value = seed.deserialize(name.into_deserializer())?;
        Ok((value, UnitOnly { path }))
    }
}

struct UnitOnly {
    path: String,
}

impl<'de> VariantAccess<'de> for UnitOnly {
    type Error = JsonError;

    fn unit_variant(self) -> Result<(), JsonError> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, _seed: T) -> Result<T::Value, JsonError> {
        Err(JsonError::Decoding {
            expected: "variant payload",
            path: self.path,
        })
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, _visitor: V) -> Result<V::Value, JsonError> {
        Err(JsonError::Decoding {
            expected: "variant payload",
            path: self.path,
        })
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, JsonError> {
        Err(JsonError::Decoding {
            expected: "variant payload",
            path: self.path,
        })
    }
}

/// `{"Variant": payload}`
struct TaggedVariant<'de, 'a> {
    driver: Driver<'de, 'a>,
}

impl<'de, 'a> EnumAccess<'de> for TaggedVariant<'de, 'a>
where
    'de: 'a,
{
    type Error = JsonError;
    type Variant = Driver<'de, 'a>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Driver<'de, 'a>), JsonError> {
        let key_at = self.driver.at + COMPOSITE_HEADER_SIZE;
        let raw = self.driver.reader().data_slice(key_at);
        let escaped = matches!(
            self.driver.desc.tag(key_at),
            TAG_ESCAPED_KEY | TAG_ESCAPED_STRING
        );
        let name = decode_string(raw, escaped)?;
        let value_at = self.driver.desc.skip_record(key_at);
        let path = format!("{}.{name}", self.driver.path);
        let variant = seed.deserialize(name.into_deserializer())?;
        Ok((variant, self.driver.child(value_at, path)))
    }
}

impl<'de, 'a> VariantAccess<'de> for Driver<'de, 'a>
where
    'de: 'a,
{
    type Error = JsonError;

    fn unit_variant(self) -> Result<(), JsonError> {
        if self.tag() == TAG_NULL {
            Ok(())
        } else {
            Err(self.type_error("null"))
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, JsonError> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, JsonError> {
        self.deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, JsonError> {
        self.deserialize_struct("", fields, visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn decode<'de, T: Deserialize<'de>>(json: &'de [u8], settings: DecoderSettings) -> Result<T, JsonError> {
        decode_document(json, settings)
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Triple {
        a: i64,
        b: i64,
        c: i64,
    }

    #[test]
    fn in_order_and_reversed_documents_agree() {
        let settings = DecoderSettings::default();
        let forward: Triple = decode(br#"{"a":1,"b":2,"c":3}"#, settings).unwrap();
        let reversed: Triple = decode(br#"{"c":3,"b":2,"a":1}"#, settings).unwrap();
        assert_eq!(forward, reversed);
    }

    #[test]
    fn snake_case_setting_reaches_nested_containers() {
        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct Outer {
            innerDoc: Inner,
        }
        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct Inner {
            someValue: i64,
        }
        let settings = DecoderSettings {
            snake_case_keys: true,
            ..Default::default()
        };
        let outer: Outer =
            decode(br#"{"inner_doc":{"some_value":9}}"#, settings).unwrap();
        assert_eq!(outer.innerDoc.someValue, 9);
    }

    #[test]
    fn snake_case_setting_rewrites_map_keys() {
        let settings = DecoderSettings {
            snake_case_keys: true,
            ..Default::default()
        };
        let map: std::collections::BTreeMap<String, i64> =
            decode(br#"{"user_name":1,"plain":2}"#, settings).unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["plain", "userName"]);
    }

    #[test]
    fn unknown_fields_are_skipped_without_walking() {
        #[derive(Debug, Deserialize)]
        struct Narrow {
            wanted: bool,
        }
        let json = br#"{"extra":{"big":[1,2,3,{"deep":null}]},"wanted":true}"#;
        let narrow: Narrow = decode(json, DecoderSettings::default()).unwrap();
        assert!(narrow.wanted);
    }

    #[test]
    fn error_paths_name_array_positions() {
        #[derive(Debug, Deserialize)]
        struct Doc {
            #[allow(dead_code)]
            items: Vec<i64>,
        }
        let err = decode::<Doc>(br#"{"items":[1,"x",3]}"#, DecoderSettings::default()).unwrap_err();
        match err {
            JsonError::Decoding { expected, path } => {
                assert_eq!(expected, "integer");
                assert_eq!(path, "$.items[1]");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unsigned_targets_cover_the_full_u64_range() {
        let settings = DecoderSettings::default();
        let max: u64 = decode(b"18446744073709551615", settings).unwrap();
        assert_eq!(max, u64::MAX);

        let err = decode::<u64>(b"18446744073709551616", settings).unwrap_err();
        assert!(matches!(err, JsonError::TypeConversion { .. }));

        // the same token is out of range for a signed target
        let err = decode::<i64>(b"18446744073709551615", settings).unwrap_err();
        assert!(matches!(err, JsonError::TypeConversion { .. }));
    }

    #[test]
    fn dynamic_decoding_promotes_past_i64_to_u64() {
        let value: serde_json::Value =
            decode(b"18446744073709551615", DecoderSettings::default()).unwrap();
        assert_eq!(value.as_u64(), Some(u64::MAX));
    }

    #[test]
    fn negative_values_reject_unsigned_targets() {
        let err = decode::<u16>(b"-4", DecoderSettings::default()).unwrap_err();
        match err {
            JsonError::TypeConversion { value, target } => {
                assert_eq!(value, "-4");
                assert_eq!(target, "UInt16");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
