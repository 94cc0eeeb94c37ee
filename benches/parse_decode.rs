use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde::Deserialize;
use skimjson::{from_slice, JsonObject};

const RECORD_COUNT: usize = 200;

#[derive(Deserialize)]
#[allow(dead_code)]
struct Record {
    id: u64,
    name: String,
    active: bool,
    score: f64,
    tags: Vec<String>,
}

fn sample_document() -> Vec<u8> {
    let mut json = Vec::from(&b"{\"records\":["[..]);
    for i in 0..RECORD_COUNT {
        if i > 0 {
            json.push(b',');
        }
        json.extend_from_slice(
            format!(
                r#"{{"id":{i},"name":"record-{i}","active":{},"score":{}.5,"tags":["a","b","c"]}}"#,
                i % 2 == 0,
                i
            )
            .as_bytes(),
        );
    }
    json.extend_from_slice(b"]}");
    json
}

fn bench_index_only(c: &mut Criterion) {
    let json = sample_document();
    c.bench_function("index_build", |b| {
        b.iter(|| {
            let value: serde_json::Value = from_slice(black_box(&json)).unwrap();
            value
        })
    });
}

fn bench_typed_decode(c: &mut Criterion) {
    #[derive(Deserialize)]
    struct Doc {
        records: Vec<Record>,
    }
    let json = sample_document();
    c.bench_function("typed_decode", |b| {
        b.iter(|| {
            let doc: Doc = from_slice(black_box(&json)).unwrap();
            doc.records.len()
        })
    });
}

fn bench_single_key_lookup(c: &mut Criterion) {
    let mut obj = JsonObject::new();
    for i in 0..64i64 {
        obj.insert(&format!("key{i}"), i).unwrap();
    }
    let bytes = obj.as_bytes().to_vec();
    c.bench_function("key_lookup", |b| {
        let parsed = JsonObject::parse(bytes.clone()).unwrap();
        b.iter(|| parsed.get(black_box("key63")))
    });
}

criterion_group!(
    benches,
    bench_index_only,
    bench_typed_decode,
    bench_single_key_lookup
);
criterion_main!(benches);
