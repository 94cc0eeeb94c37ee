use serde::{Deserialize, Serialize};
use skimjson::{from_slice, from_str, to_string, to_vec, JsonError, JsonObject};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Everything {
    text: String,
    signed: i64,
    unsigned: u32,
    float: f64,
    flag: bool,
    maybe: Option<String>,
    list: Vec<i64>,
    nested: Inner,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Inner {
    name: String,
    values: Vec<f64>,
}

#[test]
fn decode_of_encode_is_identity() {
    let original = Everything {
        text: "with \"escapes\" and\nnewlines".into(),
        signed: i64::MIN,
        unsigned: u32::MAX,
        float: -0.125,
        flag: true,
        maybe: None,
        list: vec![1, -2, 3],
        nested: Inner {
            name: "inner".into(),
            values: vec![0.5, 2.5e4],
        },
    };
    let encoded = to_vec(&original).unwrap();
    let decoded: Everything = from_slice(&encoded).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn parse_then_serialize_preserves_the_document() {
    let json = br#"{ "a" : [ 1 , 2.5 , "x" ] , "b" : null }"#;
    let obj = JsonObject::parse(&json[..]).unwrap();
    assert_eq!(obj.as_bytes(), json);
}

#[test]
fn integer_boundaries() {
    assert_eq!(from_str::<i64>("9223372036854775807").unwrap(), i64::MAX);
    assert_eq!(from_str::<i64>("-9223372036854775808").unwrap(), i64::MIN);
    assert_eq!(to_string(&i64::MAX).unwrap(), "9223372036854775807");

    assert_eq!(from_str::<u64>("18446744073709551615").unwrap(), u64::MAX);
    assert_eq!(to_string(&u64::MAX).unwrap(), "18446744073709551615");
    let err = from_str::<u64>("18446744073709551616").unwrap_err();
    assert!(matches!(err, JsonError::TypeConversion { .. }));

    let err = from_str::<i64>("9223372036854775808").unwrap_err();
    assert!(matches!(err, JsonError::TypeConversion { .. }));

    let err = from_str::<u8>("256").unwrap_err();
    match err {
        JsonError::TypeConversion { value, target } => {
            assert_eq!(value, "256");
            assert_eq!(target, "UInt8");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = from_str::<u32>("-1").unwrap_err();
    assert!(matches!(err, JsonError::TypeConversion { .. }));
}

#[test]
fn float_spellings_converge() {
    let a: f64 = from_str("1e1").unwrap();
    let b: f64 = from_str("1.0e+1").unwrap();
    let c: f64 = from_str("10.0").unwrap();
    assert_eq!(a, 10.0);
    assert_eq!(a, b);
    assert_eq!(b, c);

    // integer tokens satisfy double requests
    let d: f64 = from_str("10").unwrap();
    assert_eq!(d, 10.0);
}

#[test]
fn doubles_roundtrip_across_the_range() {
    for &value in &[
        0.0,
        -0.0,
        0.1,
        -2.5,
        1e-300,
        1e300,
        f64::MAX,
        f64::MIN_POSITIVE,
        5e-324,
        std::f64::consts::PI,
    ] {
        let encoded = to_string(&value).unwrap();
        let decoded: f64 = from_str(&encoded).unwrap();
        assert_eq!(decoded, value, "{value} reencoded as {encoded}");
    }
}

#[test]
fn floats_that_look_integral_still_roundtrip() {
    let encoded = to_string(&10.0f64).unwrap();
    assert_eq!(encoded, "10");
    let decoded: f64 = from_str(&encoded).unwrap();
    assert_eq!(decoded, 10.0);
}

#[test]
fn top_level_scalars_decode() {
    assert_eq!(from_str::<i64>("42").unwrap(), 42);
    assert_eq!(from_str::<bool>("true").unwrap(), true);
    assert_eq!(from_str::<Option<i64>>("null").unwrap(), None);
    assert_eq!(from_str::<String>(r#""hi""#).unwrap(), "hi");
}

#[test]
fn empty_composites_decode_to_empty_collections() {
    #[derive(Debug, Deserialize)]
    struct Holder {
        items: Vec<i64>,
        table: std::collections::HashMap<String, i64>,
    }
    let holder: Holder = from_slice(br#"{"items":[],"table":{}}"#).unwrap();
    assert!(holder.items.is_empty());
    assert!(holder.table.is_empty());
}

#[test]
fn escaped_strings_reencode_without_solidus_escapes() {
    // \/ is accepted on input but not produced on output
    let s: String = from_str(r#""a\/b""#).unwrap();
    assert_eq!(s, "a/b");
    assert_eq!(to_string(&s).unwrap(), r#""a/b""#);
}

#[test]
fn tuples_and_sequences() {
    let t: (i64, String, bool) = from_str(r#"[7,"x",false]"#).unwrap();
    assert_eq!(t, (7, "x".to_string(), false));
    assert_eq!(to_string(&t).unwrap(), r#"[7,"x",false]"#);
}

#[test]
fn unicode_content_survives_the_loop() {
    let source = "héllo wörld, ✅ 🐛";
    let encoded = to_string(&source).unwrap();
    let decoded: String = from_str(&encoded).unwrap();
    assert_eq!(decoded, source);
}
