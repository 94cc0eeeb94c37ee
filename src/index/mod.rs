pub(crate) mod builder;
pub(crate) mod description;
pub(crate) mod lookup;
pub(crate) mod record;

pub(crate) use builder::build_index;
pub(crate) use description::JsonDescription;

use crate::scan::fnv1a;
use record::{
    header_size, TAG_ARRAY, TAG_ESCAPED_KEY, TAG_ESCAPED_STRING, TAG_FALSE, TAG_KEY, TAG_NULL,
    TAG_OBJECT, TAG_STRING, TAG_TRUE,
};

/// Walk the whole description and assert its structural invariants against
/// the buffer it describes. Panics on the first violation; meant for tests
/// and debug checks, never for validating untrusted input.
pub(crate) fn verify_invariants(desc: &JsonDescription, buffer: &[u8]) {
    assert_eq!(
        desc.as_bytes()[0],
        description::FORMAT_VERSION,
        "unsupported description format version"
    );
    let end = verify_record(desc, buffer, desc.root());
    assert_eq!(end, desc.len(), "records must cover the description exactly");
}

fn verify_record(desc: &JsonDescription, buffer: &[u8], at: usize) -> usize {
    let tag = desc.tag(at);
    let offset = desc.json_offset(at);
    let length = desc.json_length(at);
    assert!(
        offset + length <= buffer.len(),
        "record span {offset}+{length} escapes buffer of {}",
        buffer.len()
    );

    match tag {
        TAG_OBJECT => {
            let member_count = desc.member_count(at);
            let children_end = at + header_size(tag) + desc.children_length(at);
            let mut child = at + header_size(tag);
            for _ in 0..member_count {
                let key_tag = desc.tag(child);
                assert!(
                    matches!(
                        key_tag,
                        TAG_KEY | TAG_ESCAPED_KEY | TAG_STRING | TAG_ESCAPED_STRING
                    ),
                    "object child is not a key record"
                );
                if key_tag == TAG_KEY {
                    let koff = desc.json_offset(child);
                    let klen = desc.json_length(child);
                    let raw = &buffer[koff + 1..koff + klen - 1];
                    assert_eq!(desc.key_hash(child), fnv1a(raw), "stale key hash");
                }
                child = verify_record(desc, buffer, child);
                child = verify_record(desc, buffer, child);
            }
            assert_eq!(child, children_end, "object member count disagrees with children");
            children_end
        }
        TAG_ARRAY => {
            let member_count = desc.member_count(at);
            let children_end = at + header_size(tag) + desc.children_length(at);
            let mut child = at + header_size(tag);
            for _ in 0..member_count {
                child = verify_record(desc, buffer, child);
            }
            assert_eq!(child, children_end, "array member count disagrees with children");
            children_end
        }
        TAG_TRUE => {
            assert_eq!(&buffer[offset..offset + 4], b"true");
            at + header_size(tag)
        }
        TAG_FALSE => {
            assert_eq!(&buffer[offset..offset + 5], b"false");
            at + header_size(tag)
        }
        TAG_NULL => {
            assert_eq!(&buffer[offset..offset + 4], b"null");
            at + header_size(tag)
        }
        TAG_STRING | TAG_ESCAPED_STRING | TAG_KEY | TAG_ESCAPED_KEY => {
            assert_eq!(buffer[offset], b'"');
            assert_eq!(buffer[offset + length - 1], b'"');
            at + header_size(tag)
        }
        _ => at + header_size(tag),
    }
}
