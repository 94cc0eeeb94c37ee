mod cursor;
mod tokenizer;

pub(crate) use cursor::Cursor;
pub(crate) use tokenizer::{fnv1a, Tokenizer, TokenSink};
