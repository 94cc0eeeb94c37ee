//! A `serde::Serializer` that writes RFC 8259 bytes directly.
//!
//! Struct field names and string map keys optionally go through the
//! camelCase → snake_case transform, mirroring the decoder's snake-case
//! lookup mode.

use serde::ser::{self, Serialize};

use crate::convert::string::camel_to_snake;
use crate::core::errors::JsonError;
use crate::ser::escape::{write_escaped, write_float, write_integer, write_u64};

pub(crate) struct Serializer {
    out: Vec<u8>,
    snake_case_keys: bool,
}

impl Serializer {
    pub fn new(snake_case_keys: bool) -> Self {
        Self {
            out: Vec::with_capacity(128),
            snake_case_keys,
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.out
    }

    fn write_key(&mut self, key: &str) {
        if self.snake_case_keys {
            write_escaped(&mut self.out, &camel_to_snake(key));
        } else {
            write_escaped(&mut self.out, key);
        }
    }
}

pub(crate) struct Compound<'a> {
    ser: &'a mut Serializer,
    first: bool,
    close: u8,
}

impl<'a> Compound<'a> {
    fn open(ser: &'a mut Serializer, open: u8, close: u8) -> Self {
        ser.out.push(open);
        Self {
            ser,
            first: true,
            close,
        }
    }

    fn comma(&mut self) {
        if self.first {
            self.first = false;
        } else {
            self.ser.out.push(b',');
        }
    }

    fn close(self) {
        self.ser.out.push(self.close);
    }
}

/// A variant value wrapped as `{"Variant": ...}`; the trailing brace closes
/// both the payload and the wrapper.
pub(crate) struct VariantCompound<'a> {
    inner: Compound<'a>,
}

impl<'a> ser::Serializer for &'a mut Serializer {
    type Ok = ();
    type Error = JsonError;
    type SerializeSeq = Compound<'a>;
    type SerializeTuple = Compound<'a>;
    type SerializeTupleStruct = Compound<'a>;
    type SerializeTupleVariant = VariantCompound<'a>;
    type SerializeMap = Compound<'a>;
    type SerializeStruct = Compound<'a>;
    type SerializeStructVariant = VariantCompound<'a>;

    fn serialize_bool(self, v: bool) -> Result<(), JsonError> {
        self.out
            .extend_from_slice(if v { b"true" as &[u8] } else { b"false" });
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<(), JsonError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<(), JsonError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<(), JsonError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<(), JsonError> {
        write_integer(&mut self.out, v);
        Ok(())
    }

    fn serialize_u8(self, v: u8) -> Result<(), JsonError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<(), JsonError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<(), JsonError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<(), JsonError> {
        write_u64(&mut self.out, v);
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Result<(), JsonError> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<(), JsonError> {
        write_float(&mut self.out, v)
    }

    fn serialize_char(self, v: char) -> Result<(), JsonError> {
        let mut utf8 = [0u8; 4];
        self.serialize_str(v.encode_utf8(&mut utf8))
    }

    fn serialize_str(self, v: &str) -> Result<(), JsonError> {
        write_escaped(&mut self.out, v);
        Ok(())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<(), JsonError> {
        use ser::SerializeSeq;
        let mut seq = self.serialize_seq(Some(v.len()))?;
        for byte in v {
            seq.serialize_element(byte)?;
        }
        seq.end()
    }

    fn serialize_none(self) -> Result<(), JsonError> {
        self.serialize_unit()
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), JsonError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), JsonError> {
        self.out.extend_from_slice(b"null");
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), JsonError> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<(), JsonError> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), JsonError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<(), JsonError> {
        self.out.push(b'{');
        write_escaped(&mut self.out, variant);
        self.out.push(b':');
        value.serialize(&mut *self)?;
        self.out.push(b'}');
        Ok(())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Compound<'a>, JsonError> {
        Ok(Compound::open(self, b'[', b']'))
    }

    fn serialize_tuple(self, len: usize) -> Result<Compound<'a>, JsonError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Compound<'a>, JsonError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<VariantCompound<'a>, JsonError> {
        self.out.push(b'{');
        write_escaped(&mut self.out, variant);
        self.out.push(b':');
        Ok(VariantCompound {
            inner: Compound::open(self, b'[', b']'),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Compound<'a>, JsonError> {
        Ok(Compound::open(self, b'{', b'}'))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Compound<'a>, JsonError> {
        Ok(Compound::open(self, b'{', b'}'))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<VariantCompound<'a>, JsonError> {
        self.out.push(b'{');
        write_escaped(&mut self.out, variant);
        self.out.push(b':');
        Ok(VariantCompound {
            inner: Compound::open(self, b'{', b'}'),
        })
    }
}

impl ser::SerializeSeq for Compound<'_> {
    type Ok = ();
    type Error = JsonError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), JsonError> {
        self.comma();
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), JsonError> {
        self.close();
        Ok(())
    }
}

impl ser::SerializeTuple for Compound<'_> {
    type Ok = ();
    type Error = JsonError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), JsonError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<(), JsonError> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for Compound<'_> {
    type Ok = ();
    type Error = JsonError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), JsonError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<(), JsonError> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleVariant for VariantCompound<'_> {
    type Ok = ();
    type Error = JsonError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), JsonError> {
        ser::SerializeSeq::serialize_element(&mut self.inner, value)
    }

    fn end(self) -> Result<(), JsonError> {
        self.inner.ser.out.push(self.inner.close);
        self.inner.ser.out.push(b'}');
        Ok(())
    }
}

impl ser::SerializeMap for Compound<'_> {
    type Ok = ();
    type Error = JsonError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), JsonError> {
        self.comma();
        let rendered = key.serialize(MapKeySerializer)?;
        self.ser.write_key(&rendered);
        self.ser.out.push(b':');
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), JsonError> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), JsonError> {
        self.close();
        Ok(())
    }
}

impl ser::SerializeStruct for Compound<'_> {
    type Ok = ();
    type Error = JsonError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), JsonError> {
        self.comma();
        self.ser.write_key(key);
        self.ser.out.push(b':');
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), JsonError> {
        self.close();
        Ok(())
    }
}

impl ser::SerializeStructVariant for VariantCompound<'_> {
    type Ok = ();
    type Error = JsonError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), JsonError> {
        ser::SerializeStruct::serialize_field(&mut self.inner, key, value)
    }

    fn end(self) -> Result<(), JsonError> {
        self.inner.ser.out.push(self.inner.close);
        self.inner.ser.out.push(b'}');
        Ok(())
    }
}

/// JSON object keys must be strings; scalar keys render to their decimal or
/// literal text, everything else is refused.
struct MapKeySerializer;

macro_rules! key_display {
    ($method:ident, $t:ty) => {
        fn $method(self, v: $t) -> Result<String, JsonError> {
            Ok(v.to_string())
        }
    };
}

impl ser::Serializer for MapKeySerializer {
    type Ok = String;
    type Error = JsonError;
    type SerializeSeq = ser::Impossible<String, JsonError>;
    type SerializeTuple = ser::Impossible<String, JsonError>;
    type SerializeTupleStruct = ser::Impossible<String, JsonError>;
    type SerializeTupleVariant = ser::Impossible<String, JsonError>;
    type SerializeMap = ser::Impossible<String, JsonError>;
    type SerializeStruct = ser::Impossible<String, JsonError>;
    type SerializeStructVariant = ser::Impossible<String, JsonError>;

    fn serialize_str(self, v: &str) -> Result<String, JsonError> {
        Ok(v.to_owned())
    }

    fn serialize_char(self, v: char) -> Result<String, JsonError> {
        Ok(v.to_string())
    }

    key_display!(serialize_bool, bool);
    key_display!(serialize_i8, i8);
    key_display!(serialize_i16, i16);
    key_display!(serialize_i32, i32);
    key_display!(serialize_i64, i64);
    key_display!(serialize_u8, u8);
    key_display!(serialize_u16, u16);
    key_display!(serialize_u32, u32);
    key_display!(serialize_u64, u64);

    fn serialize_f32(self, _v: f32) -> Result<String, JsonError> {
        Err(JsonError::Message("map key must be a string".into()))
    }

    fn serialize_f64(self, _v: f64) -> Result<String, JsonError> {
        Err(JsonError::Message("map key must be a string".into()))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String, JsonError> {
        Err(JsonError::Message("map key must be a string".into()))
    }

    fn serialize_none(self) -> Result<String, JsonError> {
        Err(JsonError::Message("map key must be a string".into()))
    }

    fn serialize_some<T: ?Sized + Serialize>(self, _value: &T) -> Result<String, JsonError> {
        Err(JsonError::Message("map key must be a string".into()))
    }

    fn serialize_unit(self) -> Result<String, JsonError> {
        Err(JsonError::Message("map key must be a string".into()))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String, JsonError> {
        Err(JsonError::Message("map key must be a string".into()))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String, JsonError> {
        Ok(variant.to_owned())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, JsonError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, JsonError> {
        Err(JsonError::Message("map key must be a string".into()))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, JsonError> {
        Err(JsonError::Message("map key must be a string".into()))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, JsonError> {
        Err(JsonError::Message("map key must be a string".into()))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, JsonError> {
        Err(JsonError::Message("map key must be a string".into()))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, JsonError> {
        Err(JsonError::Message("map key must be a string".into()))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, JsonError> {
        Err(JsonError::Message("map key must be a string".into()))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, JsonError> {
        Err(JsonError::Message("map key must be a string".into()))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, JsonError> {
        Err(JsonError::Message("map key must be a string".into()))
    }
}
