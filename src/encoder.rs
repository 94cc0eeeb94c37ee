use parking_lot::Mutex;
use serde::Serialize;

use crate::core::errors::JsonError;
use crate::ser::serializer::Serializer;

#[derive(Debug, Clone, Copy, Default)]
struct EncoderSettings {
    snake_case_keys: bool,
}

/// Serializes typed records to RFC 8259 bytes.
#[derive(Debug, Default)]
pub struct JsonEncoder {
    settings: Mutex<EncoderSettings>,
}

impl JsonEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `camelCase` field names as `snake_case` keys.
    pub fn encode_keys_to_snake_case(&self, enabled: bool) {
        self.settings.lock().snake_case_keys = enabled;
    }

    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, JsonError> {
        let settings = *self.settings.lock();
        let mut serializer = Serializer::new(settings.snake_case_keys);
        value.serialize(&mut serializer)?;
        Ok(serializer.finish())
    }

    pub fn encode_to_string<T: Serialize>(&self, value: &T) -> Result<String, JsonError> {
        let bytes = self.encode(value)?;
        String::from_utf8(bytes).map_err(|e| JsonError::InvalidData(e.to_string()))
    }
}

/// Encode with default settings.
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>, JsonError> {
    JsonEncoder::new().encode(value)
}

/// Encode with default settings to a `String`.
pub fn to_string<T: Serialize>(value: &T) -> Result<String, JsonError> {
    JsonEncoder::new().encode_to_string(value)
}
