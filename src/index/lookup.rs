//! Queries over a (description, buffer) pair: key lookup inside objects,
//! indexed access inside arrays, span accessors and key enumeration.
//!
//! Key lookup is accelerated two ways. Unescaped keys carry an FNV-1a hash,
//! so most non-matching candidates are rejected on (length, hash) alone.
//! Callers that visit keys in declaration order pass a hint (the record
//! offset where the previous search left off) and the scan resumes there,
//! wrapping around once, which makes in-order field decoding O(1) per key
//! amortized instead of O(n).

use crate::convert::string::{decode_string, snake_to_camel, unescape};
use crate::index::description::JsonDescription;
use crate::index::record::{
    COMPOSITE_HEADER_SIZE, TAG_ARRAY, TAG_ESCAPED_KEY, TAG_ESCAPED_STRING, TAG_KEY, TAG_OBJECT,
    TAG_STRING,
};
use crate::scan::fnv1a;

#[derive(Debug, Clone, Copy)]
pub(crate) struct KeyMatch {
    pub key_offset: usize,
    pub value_offset: usize,
}

/// Read-only view over a description and the buffer it describes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DocReader<'a> {
    pub desc: &'a JsonDescription,
    pub buffer: &'a [u8],
}

impl<'a> DocReader<'a> {
    pub fn new(desc: &'a JsonDescription, buffer: &'a [u8]) -> Self {
        Self { desc, buffer }
    }

    /// Full token span, quotes included for strings.
    pub fn json_bounds(&self, at: usize) -> (usize, usize) {
        (self.desc.json_offset(at), self.desc.json_length(at))
    }

    /// Value span with string quotes excluded.
    pub fn data_bounds(&self, at: usize) -> (usize, usize) {
        let (offset, length) = self.json_bounds(at);
        debug_assert!(
            offset + length <= self.buffer.len(),
            "record span escapes the buffer"
        );
        match self.desc.tag(at) {
            TAG_STRING | TAG_ESCAPED_STRING | TAG_KEY | TAG_ESCAPED_KEY => {
                (offset + 1, length - 2)
            }
            _ => (offset, length),
        }
    }

    pub fn json_slice(&self, at: usize) -> &'a [u8] {
        let (offset, length) = self.json_bounds(at);
        &self.buffer[offset..offset + length]
    }

    pub fn data_slice(&self, at: usize) -> &'a [u8] {
        let (offset, length) = self.data_bounds(at);
        &self.buffer[offset..offset + length]
    }

    #[inline]
    pub fn first_child(&self, at: usize) -> usize {
        at + COMPOSITE_HEADER_SIZE
    }

    #[inline]
    pub fn children_end(&self, at: usize) -> usize {
        self.first_child(at) + self.desc.children_length(at)
    }

    /// Record offset of the array's Nth element.
    pub fn array_element(&self, array_at: usize, n: usize) -> Option<usize> {
        debug_assert_eq!(self.desc.tag(array_at), TAG_ARRAY);
        if n >= self.desc.member_count(array_at) {
            return None;
        }
        let mut at = self.first_child(array_at);
        for _ in 0..n {
            at = self.desc.skip_record(at);
        }
        Some(at)
    }

    /// Find `search` among an object's keys.
    ///
    /// `hint` resumes the scan at a child record offset from an earlier
    /// lookup; the scan wraps around to the first child before giving up,
    /// so out-of-order visits stay correct.
    ///
    /// With `snake_case` set, stored keys are normalized `snake_case` →
    /// `camelCase` before comparison and hash acceleration is off (the
    /// stored hash covers the raw spelling).
    pub fn find_key(
        &self,
        object_at: usize,
        search: &[u8],
        snake_case: bool,
        hint: Option<usize>,
    ) -> Option<KeyMatch> {
        debug_assert_eq!(self.desc.tag(object_at), TAG_OBJECT);
        let first = self.first_child(object_at);
        let end = self.children_end(object_at);
        if first == end {
            return None;
        }

        let start = match hint {
            Some(h) if h >= first && h < end => h,
            _ => first,
        };
        let search_hash = if snake_case { 0 } else { fnv1a(search) };

        let mut at = start;
        let mut wrapped = false;
        loop {
            if at >= end {
                if start == first {
                    return None;
                }
                wrapped = true;
                at = first;
            }
            if wrapped && at >= start {
                return None;
            }
            let key_offset = at;
            let value_offset = self.desc.skip_record(key_offset);
            if self.key_matches(key_offset, search, snake_case, search_hash) {
                return Some(KeyMatch {
                    key_offset,
                    value_offset,
                });
            }
            at = self.desc.skip_record(value_offset);
        }
    }

    fn key_matches(&self, key_at: usize, search: &[u8], snake_case: bool, search_hash: u32) -> bool {
        let raw = self.data_slice(key_at);
        let tag = self.desc.tag(key_at);

        if snake_case {
            let logical = match tag {
                TAG_ESCAPED_KEY | TAG_ESCAPED_STRING => match unescape(raw) {
                    Ok(bytes) => bytes,
                    Err(_) => return false,
                },
                _ => raw.to_vec(),
            };
            let mut normalized = Vec::with_capacity(logical.len());
            snake_to_camel(&logical, &mut normalized);
            return normalized == search;
        }

        match tag {
            TAG_KEY => {
                debug_assert_eq!(self.desc.key_hash(key_at), fnv1a(raw), "stale key hash");
                raw.len() == search.len()
                    && self.desc.key_hash(key_at) == search_hash
                    && raw == search
            }
            TAG_ESCAPED_KEY | TAG_ESCAPED_STRING => match unescape(raw) {
                Ok(bytes) => bytes == search,
                Err(_) => false,
            },
            // keys from the pre-hash format generation
            TAG_STRING => raw == search,
            _ => false,
        }
    }

    /// All keys of an object, escape-processed, in declaration order.
    /// Keys that do not decode to valid UTF-8 are skipped.
    pub fn keys(&self, object_at: usize, to_camel_case: bool) -> Vec<String> {
        debug_assert_eq!(self.desc.tag(object_at), TAG_OBJECT);
        let mut out = Vec::with_capacity(self.desc.member_count(object_at));
        let mut at = self.first_child(object_at);
        let end = self.children_end(object_at);
        let mut scratch = Vec::new();
        while at < end {
            let raw = self.data_slice(at);
            let escaped = matches!(self.desc.tag(at), TAG_ESCAPED_KEY | TAG_ESCAPED_STRING);
            let decoded = if to_camel_case {
                let logical = if escaped {
                    unescape(raw).ok()
                } else {
                    Some(raw.to_vec())
                };
                logical.and_then(|bytes| {
                    snake_to_camel(&bytes, &mut scratch);
                    String::from_utf8(scratch.clone()).ok()
                })
            } else {
                decode_string(raw, escaped).ok()
            };
            if let Some(key) = decoded {
                out.push(key);
            }
            at = self.desc.skip_record(self.desc.skip_record(at));
        }
        out
    }
}
