mod convert;
mod core;
mod de;
mod decoder;
mod doc;
mod encoder;
mod index;
mod scan;
mod ser;

pub use crate::core::errors::{line_and_column, JsonError, SyntaxReason};
pub use crate::core::value::JsonValue;
pub use crate::de::{ArrayCursor, MissingKeyPolicy};
pub use crate::decoder::{from_slice, from_str, JsonDecoder};
pub use crate::doc::{JsonArray, JsonObject};
pub use crate::encoder::{to_string, to_vec, JsonEncoder};

pub type Result<T> = std::result::Result<T, JsonError>;
