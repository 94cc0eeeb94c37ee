//! The index description: a compact binary side-table describing the tree
//! structure of a JSON document as offsets into the source buffer.
//!
//! Layout:
//!   [format_version: u8][root record][... depth-first records ...]
//!
//! Records are written front-to-back during the build pass; composite
//! headers are back-patched once their closing delimiter is seen. After a
//! mutation the description is rewritten in place so that every
//! `json_offset` stays an absolute position in the (possibly shifted)
//! source buffer.

use byteorder::{ByteOrder, LittleEndian};

use crate::index::record::{
    self, header_size, read_i32, read_u32, shift_json_offsets, TAG_FALSE, TAG_NULL, TAG_TRUE,
};

pub(crate) const FORMAT_VERSION: u8 = 1;

/// Offset of the top-level value's record, right after the version byte.
pub(crate) const ROOT_OFFSET: usize = 1;

/// Grow-or-shrink a byte window inside `buf` at `at`, shifting the tail.
pub(crate) fn splice(buf: &mut Vec<u8>, at: usize, old_len: usize, new_len: usize) {
    if new_len > old_len {
        let grow = new_len - old_len;
        let tail_end = buf.len();
        buf.resize(tail_end + grow, 0);
        buf.copy_within(at + old_len..tail_end, at + new_len);
    } else if old_len > new_len {
        buf.copy_within(at + old_len.., at + new_len);
        buf.truncate(buf.len() - (old_len - new_len));
    }
}

#[derive(Debug, Clone)]
pub(crate) struct JsonDescription {
    buf: Vec<u8>,
}

impl JsonDescription {
    /// Fresh description ready for a build pass. The capacity guess keeps
    /// typical documents to a single allocation: scalar-heavy JSON produces
    /// at most one record per couple of input bytes.
    pub fn with_capacity_for(json_len: usize) -> Self {
        let mut buf = Vec::with_capacity(json_len / 2 + record::COMPOSITE_HEADER_SIZE + 1);
        buf.push(FORMAT_VERSION);
        Self { buf }
    }

    /// Re-assemble a description from detached record bytes (no version
    /// byte), as produced by [`Self::slice`].
    pub fn from_records(records: Vec<u8>) -> Self {
        let mut buf = Vec::with_capacity(records.len() + 1);
        buf.push(FORMAT_VERSION);
        buf.extend_from_slice(&records);
        Self { buf }
    }

    #[inline]
    pub fn root(&self) -> usize {
        ROOT_OFFSET
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    // ---- write cursor (build pass) ----

    #[inline]
    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    #[inline]
    pub fn write_i32(&mut self, v: i32) {
        let mut field = [0u8; 4];
        LittleEndian::write_i32(&mut field, v);
        self.buf.extend_from_slice(&field);
    }

    #[inline]
    pub fn write_u32(&mut self, v: u32) {
        let mut field = [0u8; 4];
        LittleEndian::write_u32(&mut field, v);
        self.buf.extend_from_slice(&field);
    }

    /// Reserve a back-patch hole of `n` zero bytes and move the writer past it.
    pub fn move_writer(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    // ---- random access ----

    #[inline]
    pub fn tag(&self, at: usize) -> u8 {
        self.buf[at]
    }

    #[inline]
    pub fn get_i32(&self, at: usize) -> i32 {
        read_i32(&self.buf, at)
    }

    #[inline]
    pub fn set_i32(&mut self, at: usize, v: i32) {
        LittleEndian::write_i32(&mut self.buf[at..at + 4], v);
    }

    #[inline]
    pub fn json_offset(&self, at: usize) -> usize {
        read_i32(&self.buf, at + record::REC_JSON_OFFSET) as usize
    }

    /// Byte length of a record's JSON span. `true`/`null`/`false` records
    /// do not store one; their lengths are fixed by the literal.
    pub fn json_length(&self, at: usize) -> usize {
        match self.buf[at] {
            TAG_TRUE | TAG_NULL => 4,
            TAG_FALSE => 5,
            _ => read_i32(&self.buf, at + record::REC_JSON_LENGTH) as usize,
        }
    }

    #[inline]
    pub fn member_count(&self, at: usize) -> usize {
        read_i32(&self.buf, at + record::REC_MEMBER_COUNT) as usize
    }

    #[inline]
    pub fn children_length(&self, at: usize) -> usize {
        read_i32(&self.buf, at + record::REC_CHILDREN_LENGTH) as usize
    }

    #[inline]
    pub fn key_hash(&self, at: usize) -> u32 {
        read_u32(&self.buf, at + record::REC_KEY_HASH)
    }

    #[inline]
    pub fn record_size(&self, at: usize) -> usize {
        record::record_size(&self.buf, at)
    }

    #[inline]
    pub fn skip_record(&self, at: usize) -> usize {
        record::skip_record(&self.buf, at)
    }

    /// Detached copy of `len` record bytes starting at `from`, used when a
    /// sub-document is spliced into another document's description.
    pub fn slice(&self, from: usize, len: usize) -> Vec<u8> {
        self.buf[from..from + len].to_vec()
    }

    // ---- mutation support ----

    /// Grow or shrink the record region at `at` from `old_size` to `new_size`
    /// bytes, shifting everything after it.
    pub fn prepare_rewrite(&mut self, at: usize, old_size: usize, new_size: usize) {
        splice(&mut self.buf, at, old_size, new_size);
    }

    /// Overwrite `new.len()` bytes at `at`.
    pub fn write_records_at(&mut self, at: usize, new: &[u8]) {
        self.buf[at..at + new.len()].copy_from_slice(new);
    }

    /// Add `delta` to every `json_offset` in the description.
    pub fn advance_all_json_offsets(&mut self, delta: i32) {
        let len = self.buf.len();
        shift_json_offsets(&mut self.buf, ROOT_OFFSET, len, i32::MIN, delta);
    }

    /// Cascade a mutation's byte delta: every record whose `json_offset` is
    /// at least `min_json_offset` moves by `delta`. The records in `skip`
    /// (freshly written, already absolute) are left alone.
    pub fn shift_offsets_tail(
        &mut self,
        min_json_offset: usize,
        delta: i32,
        skip: std::ops::Range<usize>,
    ) {
        let len = self.buf.len();
        let mut at = ROOT_OFFSET;
        while at < len {
            if skip.contains(&at) {
                at = skip.end;
                continue;
            }
            let off = read_i32(&self.buf, at + record::REC_JSON_OFFSET);
            if off >= min_json_offset as i32 {
                self.set_i32(at + record::REC_JSON_OFFSET, off + delta);
            }
            at += header_size(self.buf[at]);
        }
    }
}
