use parking_lot::Mutex;
use serde::Deserialize;

use crate::core::errors::JsonError;
use crate::de::{decode_document, DecoderSettings, MissingKeyPolicy};

/// Maps JSON bytes onto typed records.
///
/// Settings live behind a lock so one decoder can be shared across threads;
/// each `decode` call snapshots them and runs its own parse, so concurrent
/// decodes never share parser state.
#[derive(Debug, Default)]
pub struct JsonDecoder {
    settings: Mutex<DecoderSettings>,
}

impl JsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `snake_case` keys in the document as equivalent to `camelCase`
    /// field names.
    pub fn decode_keys_from_snake_case(&self, enabled: bool) {
        self.settings.lock().snake_case_keys = enabled;
    }

    pub fn set_missing_key_policy(&self, policy: MissingKeyPolicy) {
        self.settings.lock().missing_key_policy = policy;
    }

    /// Parse `json` once and decode `T` from the resulting index.
    pub fn decode<'de, T: Deserialize<'de>>(&self, json: &'de [u8]) -> Result<T, JsonError> {
        let settings = *self.settings.lock();
        decode_document(json, settings)
    }
}

/// Decode with default settings.
pub fn from_slice<'de, T: Deserialize<'de>>(json: &'de [u8]) -> Result<T, JsonError> {
    decode_document(json, DecoderSettings::default())
}

/// Decode with default settings from a `&str`.
pub fn from_str<'de, T: Deserialize<'de>>(json: &'de str) -> Result<T, JsonError> {
    from_slice(json.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct User {
        name: String,
        age: u8,
    }

    #[test]
    fn decodes_with_default_settings() {
        let user: User = from_str(r#"{"name":"alice","age":30}"#).unwrap();
        assert_eq!(
            user,
            User {
                name: "alice".into(),
                age: 30
            }
        );
    }

    #[test]
    fn decoder_is_shareable_across_threads() {
        let decoder = std::sync::Arc::new(JsonDecoder::new());
        let mut handles = Vec::new();
        for i in 0u8..4 {
            let decoder = decoder.clone();
            handles.push(std::thread::spawn(move || {
                let json = format!(r#"{{"name":"user{i}","age":{i}}}"#);
                let user: User = decoder.decode(json.as_bytes()).unwrap();
                assert_eq!(user.age, i);
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn strategy_names_parse() {
        use std::str::FromStr;
        assert_eq!(
            MissingKeyPolicy::from_str("default").unwrap(),
            MissingKeyPolicy::Default
        );
        assert_eq!(
            MissingKeyPolicy::from_str("decode_nil_for_key_not_found").unwrap(),
            MissingKeyPolicy::DecodeNilForKeyNotFound
        );
        assert_eq!(
            MissingKeyPolicy::from_str("treat_nil_values_as_missing").unwrap(),
            MissingKeyPolicy::TreatNilValuesAsMissing
        );
        assert!(matches!(
            MissingKeyPolicy::from_str("bogus"),
            Err(JsonError::UnknownStrategy(_))
        ));
    }
}
