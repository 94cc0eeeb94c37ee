use std::fmt;

use thiserror::Error;

/// What the scanner expected when it stopped on an unexpected byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxReason {
    ExpectedValue,
    ExpectedObjectKey,
    ExpectedColon,
    ExpectedComma,
    ExpectedArrayClose,
    ExpectedObjectClose,
}

impl fmt::Display for SyntaxReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyntaxReason::ExpectedValue => "expected a value",
            SyntaxReason::ExpectedObjectKey => "expected an object key",
            SyntaxReason::ExpectedColon => "expected ':'",
            SyntaxReason::ExpectedComma => "expected ','",
            SyntaxReason::ExpectedArrayClose => "expected ']'",
            SyntaxReason::ExpectedObjectClose => "expected '}'",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("unexpected end of input at offset {offset}")]
    MissingData { offset: usize },

    #[error("invalid literal at offset {offset}")]
    InvalidLiteral { offset: usize },

    #[error("unexpected token at offset {offset}: {reason}")]
    UnexpectedToken { offset: usize, reason: SyntaxReason },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("top-level JSON value is not an object")]
    InvalidTopLevelObject,

    #[error("expected {expected} at {path}")]
    Decoding { expected: &'static str, path: String },

    #[error("cannot represent {value} as {target}")]
    TypeConversion { value: String, target: &'static str },

    #[error("expected a keyed container at {path}")]
    MissingKeyedContainer { path: String },

    #[error("expected an unkeyed container at {path}")]
    MissingUnkeyedContainer { path: String },

    #[error("missing value at {path}")]
    MissingValue { path: String },

    #[error("attempted to decode past the end of an array")]
    EndOfArray,

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("nesting depth limit exceeded")]
    StackOverflow,

    #[error("{0}")]
    Message(String),
}

impl JsonError {
    /// The byte offset a syntax error points at, when it carries one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            JsonError::MissingData { offset }
            | JsonError::InvalidLiteral { offset }
            | JsonError::UnexpectedToken { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

/// Translate a byte offset into a 1-based (line, column) pair.
///
/// Syntax errors only store offsets; this walk is done on demand when a
/// caller wants human-oriented positions, so the parse path never pays for
/// line accounting.
pub fn line_and_column(buf: &[u8], offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for &b in buf.iter().take(offset) {
        if b == b'\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

impl serde::de::Error for JsonError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        JsonError::Message(msg.to_string())
    }
}

impl serde::ser::Error for JsonError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        JsonError::Message(msg.to_string())
    }
}
