use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rastats::parse::parse_stats_file;
use serde_json::json;

fn stats_file(projects: usize) -> Vec<u8> {
    let records: Vec<_> = (0..projects)
        .map(|i| {
            if i % 10 == 9 {
                json!({"project_name": format!("/work/p{i}/"), "error": "metadata failed"})
            } else {
                json!({
                    "project_name": format!("/work/p{i}/"),
                    "roots": 3, "crates": 40, "modules": 200,
                    "declarations": 5000, "functions": 1800,
                    "expressions": 90_000 + i,
                    "unknown_types": 300, "partial_unknown_types": 150,
                    "type_mismatches": 12,
                    "database_loaded_time": "1.2s",
                    "item_collection_time": "480ms",
                    "inferenece_time": "14.5s",
                    "total_time": "16230ms"
                })
            }
        })
        .collect();
    serde_json::to_vec(&records).unwrap_or_default()
}

fn bench_aggregate(c: &mut Criterion) {
    let bytes = stats_file(200);
    let entries = parse_stats_file(&bytes).unwrap_or_default();

    c.bench_function("parse_stats_file_200", |b| {
        b.iter(|| parse_stats_file(black_box(&bytes)))
    });
    c.bench_function("aggregate_200", |b| {
        b.iter(|| rastats::aggregate(black_box(&entries)))
    });
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);
