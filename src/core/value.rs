use crate::doc::{JsonArray, JsonObject};

/// A dynamic JSON value.
///
/// Scalars are owned host values; composites carry their own (buffer,
/// description) pair, so moving one into an edit splices real bytes rather
/// than re-serializing a tree.
#[derive(Debug, Clone)]
pub enum JsonValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Object(JsonObject),
    Array(JsonArray),
}

impl JsonValue {
    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JsonValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            JsonValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            JsonValue::Float(f) => Some(*f),
            JsonValue::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&JsonObject> {
        match self {
            JsonValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&JsonArray> {
        match self {
            JsonValue::Array(a) => Some(a),
            _ => None,
        }
    }
}

impl PartialEq for JsonValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsonValue::Null, JsonValue::Null) => true,
            (JsonValue::Bool(a), JsonValue::Bool(b)) => a == b,
            (JsonValue::Integer(a), JsonValue::Integer(b)) => a == b,
            (JsonValue::Float(a), JsonValue::Float(b)) => a == b,
            (JsonValue::String(a), JsonValue::String(b)) => a == b,
            (JsonValue::Object(a), JsonValue::Object(b)) => a.as_bytes() == b.as_bytes(),
            (JsonValue::Array(a), JsonValue::Array(b)) => a.as_bytes() == b.as_bytes(),
            _ => false,
        }
    }
}

impl From<bool> for JsonValue {
    fn from(v: bool) -> Self {
        JsonValue::Bool(v)
    }
}

macro_rules! from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for JsonValue {
            fn from(v: $t) -> Self {
                JsonValue::Integer(i64::from(v))
            }
        })*
    };
}

from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for JsonValue {
    fn from(v: f64) -> Self {
        JsonValue::Float(v)
    }
}

impl From<f32> for JsonValue {
    fn from(v: f32) -> Self {
        JsonValue::Float(f64::from(v))
    }
}

impl From<&str> for JsonValue {
    fn from(v: &str) -> Self {
        JsonValue::String(v.to_owned())
    }
}

impl From<String> for JsonValue {
    fn from(v: String) -> Self {
        JsonValue::String(v)
    }
}

impl From<JsonObject> for JsonValue {
    fn from(v: JsonObject) -> Self {
        JsonValue::Object(v)
    }
}

impl From<JsonArray> for JsonValue {
    fn from(v: JsonArray) -> Self {
        JsonValue::Array(v)
    }
}

impl<T: Into<JsonValue>> From<Option<T>> for JsonValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => JsonValue::Null,
        }
    }
}

impl From<Vec<JsonValue>> for JsonValue {
    fn from(values: Vec<JsonValue>) -> Self {
        let mut array = JsonArray::new();
        for v in values {
            array.push(v);
        }
        JsonValue::Array(array)
    }
}

impl From<serde_json::Value> for JsonValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => JsonValue::Null,
            serde_json::Value::Bool(b) => JsonValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => JsonValue::Integer(i),
                None => JsonValue::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => JsonValue::String(s),
            serde_json::Value::Array(items) => {
                let mut array = JsonArray::new();
                for item in items {
                    // only a non-finite float can fail, and Number has none
                    let _ = array.push(JsonValue::from(item));
                }
                JsonValue::Array(array)
            }
            serde_json::Value::Object(map) => {
                let mut object = JsonObject::new();
                for (key, value) in map {
                    let _ = object.insert(&key, JsonValue::from(value));
                }
                JsonValue::Object(object)
            }
        }
    }
}

impl From<JsonValue> for serde_json::Value {
    fn from(v: JsonValue) -> Self {
        match v {
            JsonValue::Null => serde_json::Value::Null,
            JsonValue::Bool(b) => serde_json::Value::Bool(b),
            JsonValue::Integer(n) => serde_json::Value::from(n),
            JsonValue::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            JsonValue::String(s) => serde_json::Value::String(s),
            JsonValue::Object(o) => serde_json::from_slice(o.as_bytes())
                .expect("object facade holds valid JSON"),
            JsonValue::Array(a) => serde_json::from_slice(a.as_bytes())
                .expect("array facade holds valid JSON"),
        }
    }
}
