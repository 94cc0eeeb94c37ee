use crate::core::errors::JsonError;
use crate::index::description::JsonDescription;
use crate::index::record::{
    REC_CHILDREN_LENGTH, REC_JSON_LENGTH, REC_JSON_OFFSET, REC_MEMBER_COUNT, TAG_ARRAY,
    TAG_ESCAPED_KEY, TAG_ESCAPED_STRING, TAG_FALSE, TAG_INTEGER, TAG_FLOAT, TAG_KEY, TAG_NULL,
    TAG_OBJECT, TAG_STRING, TAG_TRUE,
};
use crate::scan::{TokenSink, Tokenizer};

/// Remembers where a composite's header hole was reserved so the end token
/// can fill it in.
pub(crate) struct CompositeCtx {
    header_offset: usize,
    first_child_offset: usize,
}

/// Writes index records as a side effect of the scan.
///
/// Scalar tokens become whole records immediately; composite starts reserve
/// a 12-byte hole for the three deferred header fields, which the matching
/// end token back-patches.
pub(crate) struct IndexBuilder {
    desc: JsonDescription,
}

impl IndexBuilder {
    pub fn new(json_len: usize) -> Self {
        Self {
            desc: JsonDescription::with_capacity_for(json_len),
        }
    }

    pub fn finish(self) -> JsonDescription {
        self.desc
    }

    fn open_composite(&mut self, tag: u8, start: usize) -> CompositeCtx {
        let header_offset = self.desc.len();
        self.desc.write_u8(tag);
        self.desc.write_i32(start as i32);
        self.desc.move_writer(12);
        CompositeCtx {
            header_offset,
            first_child_offset: self.desc.len(),
        }
    }

    fn close_composite(&mut self, end: usize, member_count: usize, ctx: CompositeCtx) {
        let json_offset = self.desc.get_i32(ctx.header_offset + REC_JSON_OFFSET);
        self.desc
            .set_i32(ctx.header_offset + REC_JSON_LENGTH, end as i32 - json_offset);
        self.desc
            .set_i32(ctx.header_offset + REC_MEMBER_COUNT, member_count as i32);
        self.desc.set_i32(
            ctx.header_offset + REC_CHILDREN_LENGTH,
            (self.desc.len() - ctx.first_child_offset) as i32,
        );
    }
}

impl TokenSink for IndexBuilder {
    type ArrayCtx = CompositeCtx;
    type ObjectCtx = CompositeCtx;

    fn string_found(&mut self, start: usize, byte_length: usize, uses_escaping: bool) {
        let tag = if uses_escaping { TAG_ESCAPED_STRING } else { TAG_STRING };
        self.desc.write_u8(tag);
        self.desc.write_i32(start as i32);
        self.desc.write_i32(byte_length as i32);
    }

    fn object_key_found(&mut self, start: usize, byte_length: usize, uses_escaping: bool, hash: u32) {
        let tag = if uses_escaping { TAG_ESCAPED_KEY } else { TAG_KEY };
        self.desc.write_u8(tag);
        self.desc.write_i32(start as i32);
        self.desc.write_i32(byte_length as i32);
        self.desc.write_u32(hash);
    }

    fn number_found(&mut self, start: usize, end: usize, is_integer: bool) {
        let tag = if is_integer { TAG_INTEGER } else { TAG_FLOAT };
        self.desc.write_u8(tag);
        self.desc.write_i32(start as i32);
        self.desc.write_i32((end - start) as i32);
    }

    fn boolean_true_found(&mut self, start: usize) {
        self.desc.write_u8(TAG_TRUE);
        self.desc.write_i32(start as i32);
    }

    fn boolean_false_found(&mut self, start: usize) {
        self.desc.write_u8(TAG_FALSE);
        self.desc.write_i32(start as i32);
    }

    fn null_found(&mut self, start: usize) {
        self.desc.write_u8(TAG_NULL);
        self.desc.write_i32(start as i32);
    }

    fn array_start_found(&mut self, start: usize) -> CompositeCtx {
        self.open_composite(TAG_ARRAY, start)
    }

    fn array_end_found(&mut self, end: usize, member_count: usize, ctx: CompositeCtx) {
        self.close_composite(end, member_count, ctx);
    }

    fn object_start_found(&mut self, start: usize) -> CompositeCtx {
        self.open_composite(TAG_OBJECT, start)
    }

    fn object_end_found(&mut self, end: usize, member_count: usize, ctx: CompositeCtx) {
        self.close_composite(end, member_count, ctx);
    }
}

/// One forward pass: scan `json` and return its index description.
pub(crate) fn build_index(json: &[u8]) -> Result<JsonDescription, JsonError> {
    let mut builder = IndexBuilder::new(json.len());
    Tokenizer::new(json, &mut builder).scan_document()?;
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::record::COMPOSITE_HEADER_SIZE;

    #[test]
    fn empty_object_header() {
        let desc = build_index(b"{}").unwrap();
        let root = desc.root();
        assert_eq!(desc.tag(root), TAG_OBJECT);
        assert_eq!(desc.json_offset(root), 0);
        assert_eq!(desc.json_length(root), 2);
        assert_eq!(desc.member_count(root), 0);
        assert_eq!(desc.children_length(root), 0);
        assert_eq!(desc.len(), root + COMPOSITE_HEADER_SIZE);
    }

    #[test]
    fn object_children_alternate_key_value() {
        let desc = build_index(br#"{"a":1,"bb":"x"}"#).unwrap();
        let root = desc.root();
        assert_eq!(desc.member_count(root), 2);

        let k1 = root + COMPOSITE_HEADER_SIZE;
        assert_eq!(desc.tag(k1), TAG_KEY);
        assert_eq!(desc.json_offset(k1), 1);
        assert_eq!(desc.json_length(k1), 3);

        let v1 = desc.skip_record(k1);
        assert_eq!(desc.tag(v1), TAG_INTEGER);
        assert_eq!(desc.json_offset(v1), 5);
        assert_eq!(desc.json_length(v1), 1);

        let k2 = desc.skip_record(v1);
        assert_eq!(desc.tag(k2), TAG_KEY);
        let v2 = desc.skip_record(k2);
        assert_eq!(desc.tag(v2), TAG_STRING);
        assert_eq!(desc.skip_record(v2), desc.len());
    }

    #[test]
    fn nested_composites_backpatch_lengths() {
        let json = br#"{"a":[true,{"b":null}]}"#;
        let desc = build_index(json).unwrap();
        let root = desc.root();
        assert_eq!(desc.json_length(root), json.len());

        let key = root + COMPOSITE_HEADER_SIZE;
        let arr = desc.skip_record(key);
        assert_eq!(desc.tag(arr), TAG_ARRAY);
        assert_eq!(desc.member_count(arr), 2);
        // the array's child region ends exactly at the object's end
        assert_eq!(desc.skip_record(arr), desc.len());

        let t = arr + COMPOSITE_HEADER_SIZE;
        assert_eq!(desc.tag(t), TAG_TRUE);
        let inner = desc.skip_record(t);
        assert_eq!(desc.tag(inner), TAG_OBJECT);
        assert_eq!(desc.member_count(inner), 1);
    }

    #[test]
    fn escaped_strings_get_their_own_tag() {
        let desc = build_index(br#"{"a\"b":"c\\d"}"#).unwrap();
        let key = desc.root() + COMPOSITE_HEADER_SIZE;
        assert_eq!(desc.tag(key), TAG_ESCAPED_KEY);
        let val = desc.skip_record(key);
        assert_eq!(desc.tag(val), TAG_ESCAPED_STRING);
    }

    #[test]
    fn number_tags_split_on_shape() {
        let desc = build_index(b"[1,2.5,3e2,-4]").unwrap();
        let mut at = desc.root() + COMPOSITE_HEADER_SIZE;
        let mut tags = Vec::new();
        for _ in 0..4 {
            tags.push(desc.tag(at));
            at = desc.skip_record(at);
        }
        assert_eq!(tags, vec![TAG_INTEGER, TAG_FLOAT, TAG_FLOAT, TAG_INTEGER]);
    }
}
