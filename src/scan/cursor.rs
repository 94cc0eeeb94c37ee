use crate::core::errors::JsonError;

/// Eight spaces packed into one word, for the common indentation fast path.
const SPACES: u64 = 0x2020_2020_2020_2020;

/// A borrowed byte slice plus a scan position.
///
/// The cursor never reads past the slice; callers that use the unchecked
/// accessors must have established `remaining()` first.
#[derive(Debug)]
pub(crate) struct Cursor<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.buf.get(self.offset).copied()
    }

    /// Byte at `offset + k`. Callers must have asserted `remaining() >= k + 1`.
    #[inline]
    pub fn peek_at(&self, k: usize) -> u8 {
        self.buf[self.offset + k]
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.offset += n;
    }

    #[inline]
    pub fn slice_from(&self, start: usize) -> &'a [u8] {
        &self.buf[start..self.offset]
    }

    /// Read the next 8 bytes as a little-endian word without advancing.
    /// Callers must have asserted `remaining() >= 8`.
    #[inline]
    pub fn peek_word(&self) -> u64 {
        let chunk: [u8; 8] = self.buf[self.offset..self.offset + 8]
            .try_into()
            .unwrap_or_default();
        u64::from_le_bytes(chunk)
    }

    /// Advance past the byte run matching `literal`, or report where the
    /// mismatch happened.
    pub fn match_literal(&mut self, literal: &[u8]) -> Result<(), usize> {
        for (i, &b) in literal.iter().enumerate() {
            match self.buf.get(self.offset + i) {
                Some(&got) if got == b => {}
                _ => return Err(self.offset + i),
            }
        }
        self.offset += literal.len();
        Ok(())
    }

    /// Skip 0x09/0x0A/0x0D/0x20 and stop at the first other byte.
    ///
    /// Fails with `MissingData` when the buffer runs out, because every call
    /// site needs more input after the whitespace.
    pub fn skip_whitespace(&mut self) -> Result<(), JsonError> {
        loop {
            // Runs of spaces (indented documents) go a word at a time.
            while self.remaining() >= 8 && self.peek_word() == SPACES {
                self.offset += 8;
            }
            match self.peek() {
                Some(0x09) | Some(0x0A) | Some(0x0D) | Some(0x20) => self.offset += 1,
                Some(_) => return Ok(()),
                None => {
                    return Err(JsonError::MissingData {
                        offset: self.offset,
                    })
                }
            }
        }
    }
}
