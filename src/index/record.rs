use byteorder::{ByteOrder, LittleEndian};

// Record type tags. Every record starts with one of these.
pub(crate) const TAG_OBJECT: u8 = 0x01;
pub(crate) const TAG_ARRAY: u8 = 0x02;
pub(crate) const TAG_TRUE: u8 = 0x03;
pub(crate) const TAG_FALSE: u8 = 0x04;
pub(crate) const TAG_STRING: u8 = 0x05;
pub(crate) const TAG_ESCAPED_STRING: u8 = 0x06;
pub(crate) const TAG_INTEGER: u8 = 0x07;
pub(crate) const TAG_FLOAT: u8 = 0x08;
pub(crate) const TAG_NULL: u8 = 0x09;
pub(crate) const TAG_KEY: u8 = 0x0A;
pub(crate) const TAG_ESCAPED_KEY: u8 = 0x0B;

// Field offsets relative to the record start (little-endian i32/u32 fields):
//   +0:  type tag (u8)
//   +1:  json_offset (i32)          - all records
//   +5:  json_length (i32)          - string/number/key/composite records
//   +9:  member_count (i32)         - composite records
//   +9:  fnv1a_hash (u32)           - key records
//   +13: children_index_length (i32)- composite records
pub(crate) const REC_JSON_OFFSET: usize = 1;
pub(crate) const REC_JSON_LENGTH: usize = 5;
pub(crate) const REC_MEMBER_COUNT: usize = 9;
pub(crate) const REC_KEY_HASH: usize = 9;
pub(crate) const REC_CHILDREN_LENGTH: usize = 13;

pub(crate) const COMPOSITE_HEADER_SIZE: usize = 17;
pub(crate) const SPAN_RECORD_SIZE: usize = 9;
pub(crate) const MARK_RECORD_SIZE: usize = 5;
pub(crate) const KEY_RECORD_SIZE: usize = 13;

/// Bytes between a record's tag and its first child (composites) or its next
/// DFS neighbor (everything else). A linear walk stepping by `header_size`
/// visits every record in the tree exactly once.
pub(crate) fn header_size(tag: u8) -> usize {
    match tag {
        TAG_OBJECT | TAG_ARRAY => COMPOSITE_HEADER_SIZE,
        TAG_STRING | TAG_ESCAPED_STRING | TAG_INTEGER | TAG_FLOAT => SPAN_RECORD_SIZE,
        TAG_TRUE | TAG_FALSE | TAG_NULL => MARK_RECORD_SIZE,
        TAG_KEY | TAG_ESCAPED_KEY => KEY_RECORD_SIZE,
        other => unreachable!("corrupt index description: unknown tag {other:#x}"),
    }
}

#[inline]
pub(crate) fn read_i32(desc: &[u8], at: usize) -> i32 {
    LittleEndian::read_i32(&desc[at..at + 4])
}

#[inline]
pub(crate) fn read_u32(desc: &[u8], at: usize) -> u32 {
    LittleEndian::read_u32(&desc[at..at + 4])
}

#[inline]
pub(crate) fn write_i32_at(desc: &mut [u8], at: usize, v: i32) {
    LittleEndian::write_i32(&mut desc[at..at + 4], v);
}

/// Total record size, children included for composites.
pub(crate) fn record_size(desc: &[u8], at: usize) -> usize {
    let tag = desc[at];
    match tag {
        TAG_OBJECT | TAG_ARRAY => {
            COMPOSITE_HEADER_SIZE + read_i32(desc, at + REC_CHILDREN_LENGTH) as usize
        }
        _ => header_size(tag),
    }
}

/// Offset of the next sibling record.
#[inline]
pub(crate) fn skip_record(desc: &[u8], at: usize) -> usize {
    at + record_size(desc, at)
}

/// Add `delta` to the `json_offset` of every record in `desc[from..to]`
/// whose current offset is at least `min_offset`.
///
/// Used both to relocate a detached sub-document being spliced in (with
/// `min_offset` 0) and to cascade a mutation's byte delta to the records
/// past the edit point.
pub(crate) fn shift_json_offsets(
    desc: &mut [u8],
    from: usize,
    to: usize,
    min_offset: i32,
    delta: i32,
) {
    let mut at = from;
    while at < to {
        let off = read_i32(desc, at + REC_JSON_OFFSET);
        if off >= min_offset {
            write_i32_at(desc, at + REC_JSON_OFFSET, off + delta);
        }
        at += header_size(desc[at]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_sizes_match_the_record_table() {
        assert_eq!(header_size(TAG_OBJECT), 17);
        assert_eq!(header_size(TAG_ARRAY), 17);
        assert_eq!(header_size(TAG_TRUE), 5);
        assert_eq!(header_size(TAG_FALSE), 5);
        assert_eq!(header_size(TAG_NULL), 5);
        assert_eq!(header_size(TAG_STRING), 9);
        assert_eq!(header_size(TAG_ESCAPED_STRING), 9);
        assert_eq!(header_size(TAG_INTEGER), 9);
        assert_eq!(header_size(TAG_FLOAT), 9);
        assert_eq!(header_size(TAG_KEY), 13);
        assert_eq!(header_size(TAG_ESCAPED_KEY), 13);
    }

    #[test]
    fn shift_respects_the_floor() {
        // two null records at json offsets 3 and 9
        let mut desc = vec![TAG_NULL, 3, 0, 0, 0, TAG_NULL, 9, 0, 0, 0];
        let len = desc.len();
        shift_json_offsets(&mut desc, 0, len, 5, 100);
        assert_eq!(read_i32(&desc, 1), 3);
        assert_eq!(read_i32(&desc, 6), 109);
    }
}
