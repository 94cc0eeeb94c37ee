use crate::core::errors::{JsonError, SyntaxReason};
use crate::scan::Cursor;

pub(crate) const FNV_OFFSET_BASIS: u32 = 0x811C_9DC5;
pub(crate) const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a over the raw key bytes, as stored in object-key records.
#[inline]
pub(crate) fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Receives tokens as the scanner recognizes them.
///
/// The scanner guarantees balanced start/end calls for composites and that
/// object members arrive as alternating key/value tokens.
pub(crate) trait TokenSink {
    type ArrayCtx;
    type ObjectCtx;

    fn string_found(&mut self, start: usize, byte_length: usize, uses_escaping: bool);
    fn object_key_found(&mut self, start: usize, byte_length: usize, uses_escaping: bool, hash: u32);
    fn number_found(&mut self, start: usize, end: usize, is_integer: bool);
    fn boolean_true_found(&mut self, start: usize);
    fn boolean_false_found(&mut self, start: usize);
    fn null_found(&mut self, start: usize);
    fn array_start_found(&mut self, start: usize) -> Self::ArrayCtx;
    fn array_end_found(&mut self, end: usize, member_count: usize, ctx: Self::ArrayCtx);
    fn object_start_found(&mut self, start: usize) -> Self::ObjectCtx;
    fn object_end_found(&mut self, end: usize, member_count: usize, ctx: Self::ObjectCtx);
}

/// Each open composite costs at least one 17-byte header in the index, so
/// any input deeper than this could not be described within i32 offsets.
const MAX_NESTING: usize = (i32::MAX as usize) / 17;

enum Frame<S: TokenSink> {
    Array { ctx: S::ArrayCtx, count: usize },
    Object { ctx: S::ObjectCtx, count: usize },
}

struct StringToken {
    start: usize,
    byte_length: usize,
    uses_escaping: bool,
}

/// Single-pass JSON scanner.
///
/// The scanner is not recursive: open composites live on an explicit frame
/// stack, so nesting depth is bounded by `MAX_NESTING` rather than the call
/// stack.
pub(crate) struct Tokenizer<'a, 'sink, S: TokenSink> {
    buf: &'a [u8],
    cursor: Cursor<'a>,
    sink: &'sink mut S,
}

impl<'a, 'sink, S: TokenSink> Tokenizer<'a, 'sink, S> {
    pub fn new(buf: &'a [u8], sink: &'sink mut S) -> Self {
        Self {
            buf,
            cursor: Cursor::new(buf),
            sink,
        }
    }

    /// Scan one complete top-level value, pushing every token into the sink.
    ///
    /// Trailing bytes after the value are left unread.
    pub fn scan_document(&mut self) -> Result<(), JsonError> {
        let mut frames: Vec<Frame<S>> = Vec::new();

        'value: loop {
            self.cursor.skip_whitespace()?;
            match self.cursor.peek_at(0) {
                b'"' => {
                    let tok = self.scan_string()?;
                    self.sink
                        .string_found(tok.start, tok.byte_length, tok.uses_escaping);
                }
                b'{' => {
                    if frames.len() >= MAX_NESTING {
                        return Err(JsonError::StackOverflow);
                    }
                    let start = self.cursor.offset();
                    let ctx = self.sink.object_start_found(start);
                    self.cursor.advance(1);
                    self.cursor.skip_whitespace()?;
                    if self.cursor.peek_at(0) == b'}' {
                        self.cursor.advance(1);
                        self.sink.object_end_found(self.cursor.offset(), 0, ctx);
                    } else {
                        frames.push(Frame::Object { ctx, count: 0 });
                        self.scan_object_key()?;
                        continue 'value;
                    }
                }
                b'[' => {
                    if frames.len() >= MAX_NESTING {
                        return Err(JsonError::StackOverflow);
                    }
                    let start = self.cursor.offset();
                    let ctx = self.sink.array_start_found(start);
                    self.cursor.advance(1);
                    self.cursor.skip_whitespace()?;
                    if self.cursor.peek_at(0) == b']' {
                        self.cursor.advance(1);
                        self.sink.array_end_found(self.cursor.offset(), 0, ctx);
                    } else {
                        frames.push(Frame::Array { ctx, count: 0 });
                        continue 'value;
                    }
                }
                b't' => {
                    let start = self.cursor.offset();
                    self.cursor
                        .match_literal(b"true")
                        .map_err(|offset| JsonError::InvalidLiteral { offset })?;
                    self.sink.boolean_true_found(start);
                }
                b'f' => {
                    let start = self.cursor.offset();
                    self.cursor
                        .match_literal(b"false")
                        .map_err(|offset| JsonError::InvalidLiteral { offset })?;
                    self.sink.boolean_false_found(start);
                }
                b'n' => {
                    let start = self.cursor.offset();
                    self.cursor
                        .match_literal(b"null")
                        .map_err(|offset| JsonError::InvalidLiteral { offset })?;
                    self.sink.null_found(start);
                }
                b'-' | b'0'..=b'9' => self.scan_number()?,
                _ => {
                    return Err(JsonError::UnexpectedToken {
                        offset: self.cursor.offset(),
                        reason: SyntaxReason::ExpectedValue,
                    })
                }
            }

            // A value just completed; close any composites that end here.
            loop {
                let in_array = match frames.last_mut() {
                    None => return Ok(()),
                    Some(Frame::Array { count, .. }) => {
                        *count += 1;
                        true
                    }
                    Some(Frame::Object { count, .. }) => {
                        *count += 1;
                        false
                    }
                };
                self.cursor.skip_whitespace()?;
                match (in_array, self.cursor.peek_at(0)) {
                    (true, b',') => {
                        self.cursor.advance(1);
                        continue 'value;
                    }
                    (true, b']') => {
                        self.cursor.advance(1);
                        match frames.pop() {
                            Some(Frame::Array { ctx, count }) => {
                                self.sink.array_end_found(self.cursor.offset(), count, ctx)
                            }
                            _ => unreachable!(),
                        }
                    }
                    (false, b',') => {
                        self.cursor.advance(1);
                        self.scan_object_key()?;
                        continue 'value;
                    }
                    (false, b'}') => {
                        self.cursor.advance(1);
                        match frames.pop() {
                            Some(Frame::Object { ctx, count }) => {
                                self.sink.object_end_found(self.cursor.offset(), count, ctx)
                            }
                            _ => unreachable!(),
                        }
                    }
                    _ => {
                        return Err(JsonError::UnexpectedToken {
                            offset: self.cursor.offset(),
                            reason: SyntaxReason::ExpectedComma,
                        })
                    }
                }
            }
        }
    }

    /// Key string plus the `:` separator. Leaves the cursor at the value.
    fn scan_object_key(&mut self) -> Result<(), JsonError> {
        self.cursor.skip_whitespace()?;
        if self.cursor.peek_at(0) != b'"' {
            return Err(JsonError::UnexpectedToken {
                offset: self.cursor.offset(),
                reason: SyntaxReason::ExpectedObjectKey,
            });
        }
        let tok = self.scan_string()?;
        let data = &self.buf[tok.start + 1..tok.start + tok.byte_length - 1];
        self.sink
            .object_key_found(tok.start, tok.byte_length, tok.uses_escaping, fnv1a(data));
        self.cursor.skip_whitespace()?;
        if self.cursor.peek_at(0) != b':' {
            return Err(JsonError::UnexpectedToken {
                offset: self.cursor.offset(),
                reason: SyntaxReason::ExpectedColon,
            });
        }
        self.cursor.advance(1);
        Ok(())
    }

    /// Scan a string token, 8 bytes at a time.
    ///
    /// The word scan stops at the first quote or backslash in the batch; the
    /// byte path then consumes it, so a backslash always swallows the byte
    /// after it and quote parity comes out right. Interior `\u` sequences are
    /// left undecoded.
    fn scan_string(&mut self) -> Result<StringToken, JsonError> {
        let start = self.cursor.offset();
        self.cursor.advance(1);
        let mut uses_escaping = false;
        loop {
            while self.cursor.remaining() >= 8 {
                let word = self.cursor.peek_word();
                let hits = match_byte(word, b'"') | match_byte(word, b'\\');
                if hits == 0 {
                    self.cursor.advance(8);
                } else {
                    self.cursor.advance((hits.trailing_zeros() / 8) as usize);
                    break;
                }
            }
            match self.cursor.peek() {
                None => {
                    return Err(JsonError::MissingData {
                        offset: self.cursor.offset(),
                    })
                }
                Some(b'"') => {
                    self.cursor.advance(1);
                    return Ok(StringToken {
                        start,
                        byte_length: self.cursor.offset() - start,
                        uses_escaping,
                    });
                }
                Some(b'\\') => {
                    uses_escaping = true;
                    if self.cursor.remaining() < 2 {
                        return Err(JsonError::MissingData {
                            offset: self.buf.len(),
                        });
                    }
                    self.cursor.advance(2);
                }
                Some(_) => self.cursor.advance(1),
            }
        }
    }

    /// `-?digits(.digits)?((e|E)(+|-)?digits)?`
    fn scan_number(&mut self) -> Result<(), JsonError> {
        let start = self.cursor.offset();
        let mut is_integer = true;
        if self.cursor.peek() == Some(b'-') {
            self.cursor.advance(1);
        }
        if self.digit_run() == 0 {
            return Err(JsonError::UnexpectedToken {
                offset: start,
                reason: SyntaxReason::ExpectedValue,
            });
        }
        if self.cursor.peek() == Some(b'.') {
            is_integer = false;
            self.cursor.advance(1);
            if self.digit_run() == 0 {
                return Err(JsonError::UnexpectedToken {
                    offset: self.cursor.offset(),
                    reason: SyntaxReason::ExpectedValue,
                });
            }
        }
        if matches!(self.cursor.peek(), Some(b'e') | Some(b'E')) {
            is_integer = false;
            self.cursor.advance(1);
            if matches!(self.cursor.peek(), Some(b'+') | Some(b'-')) {
                self.cursor.advance(1);
            }
            if self.digit_run() == 0 {
                return Err(JsonError::UnexpectedToken {
                    offset: self.cursor.offset(),
                    reason: SyntaxReason::ExpectedValue,
                });
            }
        }
        self.sink
            .number_found(start, self.cursor.offset(), is_integer);
        Ok(())
    }

    fn digit_run(&mut self) -> usize {
        let start = self.cursor.offset();
        while matches!(self.cursor.peek(), Some(b'0'..=b'9')) {
            self.cursor.advance(1);
        }
        self.cursor.offset() - start
    }
}

/// High bit of each byte in the result is set where `word` holds `byte`.
///
/// Borrow propagation can set spurious high bits, but only above a genuine
/// match, so the lowest set bit always points at a real occurrence.
#[inline]
fn match_byte(word: u64, byte: u8) -> u64 {
    const LO: u64 = 0x0101_0101_0101_0101;
    const HI: u64 = 0x8080_8080_8080_8080;
    let x = word ^ (LO.wrapping_mul(u64::from(byte)));
    x.wrapping_sub(LO) & !x & HI
}
