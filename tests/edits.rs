use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skimjson::{JsonArray, JsonObject, JsonValue};

const SEED: u64 = 42;

#[test]
fn build_a_document_from_scratch() {
    let mut obj = JsonObject::new();
    obj.insert("username", "Joannis").unwrap();

    let mut roles = JsonArray::new();
    roles.push("admin").unwrap();
    obj.insert("roles", roles).unwrap();
    obj.debug_verify();

    assert_eq!(
        obj.as_bytes(),
        br#"{"username":"Joannis","roles":["admin"]}"#
    );

    // the document reads back coherently after the splices
    assert_eq!(obj.get("username"), Some(JsonValue::String("Joannis".into())));
    let Some(JsonValue::Array(roles)) = obj.get("roles") else {
        panic!("expected an array");
    };
    assert_eq!(roles.get(0), Some(JsonValue::String("admin".into())));
}

#[test]
fn delete_middle_key() {
    let mut obj = JsonObject::parse(&br#"{"a":1,"b":2,"c":3}"#[..]).unwrap();
    assert!(obj.remove("b"));
    obj.debug_verify();
    assert_eq!(obj.as_bytes(), br#"{"a":1,"c":3}"#);
    assert_eq!(obj.get("a"), Some(JsonValue::Integer(1)));
    assert_eq!(obj.get("c"), Some(JsonValue::Integer(3)));
}

#[test]
fn nested_document_splice_keeps_lookups_working() {
    let mut obj = JsonObject::parse(&br#"{"before":true,"target":0,"after":false}"#[..]).unwrap();
    let nested = JsonObject::parse(&br#"{"deep":{"deeper":[1,2,3]}}"#[..]).unwrap();
    obj.insert("target", nested).unwrap();
    obj.debug_verify();

    assert_eq!(obj.get("before"), Some(JsonValue::Bool(true)));
    assert_eq!(obj.get("after"), Some(JsonValue::Bool(false)));
    let Some(JsonValue::Object(target)) = obj.get("target") else {
        panic!("expected an object");
    };
    let Some(JsonValue::Object(deep)) = target.get("deep") else {
        panic!("expected an object");
    };
    let Some(JsonValue::Array(deeper)) = deep.get("deeper") else {
        panic!("expected an array");
    };
    assert_eq!(deeper.get(2), Some(JsonValue::Integer(3)));
}

#[test]
fn growing_and_shrinking_replacements_shift_siblings() {
    let mut obj = JsonObject::parse(&br#"{"a":"short","z":99}"#[..]).unwrap();

    obj.insert("a", "a considerably longer replacement value").unwrap();
    obj.debug_verify();
    assert_eq!(obj.get("z"), Some(JsonValue::Integer(99)));

    obj.insert("a", 0).unwrap();
    obj.debug_verify();
    assert_eq!(obj.as_bytes(), br#"{"a":0,"z":99}"#);
    assert_eq!(obj.get("z"), Some(JsonValue::Integer(99)));
}

#[test]
fn value_replacement_routes_every_kind() {
    let mut obj = JsonObject::parse(&br#"{"v":0,"guard":"g"}"#[..]).unwrap();
    let kinds: Vec<JsonValue> = vec![
        JsonValue::Null,
        JsonValue::Bool(true),
        JsonValue::Integer(-12),
        JsonValue::Float(2.5),
        JsonValue::String("text with \"quotes\"".into()),
        JsonValue::Array(JsonArray::parse(&b"[1,2]"[..]).unwrap()),
        JsonValue::Object(JsonObject::parse(&br#"{"k":null}"#[..]).unwrap()),
    ];
    for value in kinds {
        obj.insert("v", value.clone()).unwrap();
        obj.debug_verify();
        assert_eq!(obj.get("v"), Some(value));
        assert_eq!(obj.get("guard"), Some(JsonValue::String("g".into())));
    }
}

#[test]
fn serialized_form_always_reparses() {
    let mut obj = JsonObject::new();
    obj.insert("a", 1).unwrap();
    obj.insert("b", "two").unwrap();
    obj.remove("a");
    obj.insert("c", JsonValue::Null).unwrap();

    let reparsed = JsonObject::parse(obj.as_bytes().to_vec()).unwrap();
    reparsed.debug_verify();
    assert_eq!(reparsed.keys(), vec!["b", "c"]);
}

/// Drive a random edit sequence against a `serde_json` model and check the
/// index invariants and the visible document after every step.
#[test]
fn randomized_edits_preserve_invariants() {
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut obj = JsonObject::new();
    let mut model = serde_json::Map::new();

    for step in 0..300 {
        let key = format!("k{}", rng.gen_range(0..12));
        match rng.gen_range(0..5) {
            // insert or replace a scalar
            0 | 1 => {
                let n: i64 = rng.gen_range(-1000..1000);
                obj.insert(&key, n).unwrap();
                model.insert(key, serde_json::json!(n));
            }
            2 => {
                let s = format!("value-{step}");
                obj.insert(&key, s.as_str()).unwrap();
                model.insert(key, serde_json::json!(s));
            }
            // insert a nested document
            3 => {
                let mut nested = JsonArray::new();
                nested.push(step as i64).unwrap();
                nested.push(true).unwrap();
                obj.insert(&key, nested).unwrap();
                model.insert(key, serde_json::json!([step, true]));
            }
            // remove
            _ => {
                let removed = obj.remove(&key);
                assert_eq!(removed, model.remove(&key).is_some());
            }
        }
        obj.debug_verify();

        let visible: serde_json::Value = serde_json::from_slice(obj.as_bytes()).unwrap();
        assert_eq!(visible, serde_json::Value::Object(model.clone()));
    }
}

#[test]
fn randomized_array_edits_preserve_invariants() {
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut arr = JsonArray::new();
    let mut model: Vec<serde_json::Value> = Vec::new();

    for step in 0..300 {
        match rng.gen_range(0..4) {
            0 | 1 => {
                arr.push(step as i64).unwrap();
                model.push(serde_json::json!(step));
            }
            2 if !model.is_empty() => {
                let i = rng.gen_range(0..model.len());
                let s = format!("s{step}");
                arr.replace(i, s.as_str()).unwrap();
                model[i] = serde_json::json!(s);
            }
            _ if !model.is_empty() => {
                let i = rng.gen_range(0..model.len());
                assert!(arr.remove(i));
                model.remove(i);
            }
            _ => {}
        }
        arr.debug_verify();

        let visible: serde_json::Value = serde_json::from_slice(arr.as_bytes()).unwrap();
        assert_eq!(visible, serde_json::Value::Array(model.clone()));
    }
}

#[test]
fn empty_key_round_trips_through_edits() {
    let mut obj = JsonObject::new();
    obj.insert("", "empty").unwrap();
    obj.debug_verify();
    assert_eq!(obj.as_bytes(), br#"{"":"empty"}"#);
    assert_eq!(obj.get(""), Some(JsonValue::String("empty".into())));
    assert!(obj.remove(""));
    assert_eq!(obj.as_bytes(), b"{}");
}
