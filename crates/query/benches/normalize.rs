use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use analytiq_query::{QueryOutput, normalize};
use serde_json::json;

fn table_payload(rows: usize) -> String {
    let rows: Vec<_> = (0..rows)
        .map(|i| json!([format!("region-{i}"), i * 100, i as f64 * 0.5]))
        .collect();
    serde_json::to_string(&json!({
        "responseType": "table",
        "headers": ["region", "units", "share"],
        "rows": rows,
    }))
    .unwrap()
}

fn bench_classify_and_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_and_normalize");

    for rows in [1usize, 100, 10_000] {
        let raw = table_payload(rows);
        group.throughput(Throughput::Bytes(raw.len() as u64));
        group.bench_with_input(BenchmarkId::new("table", rows), &raw, |b, raw| {
            b.iter(|| {
                let output = QueryOutput::parse(black_box(raw));
                normalize(output, "show me sales by region")
            });
        });
    }

    group.bench_function("degraded_text", |b| {
        let raw = "not json at all: the model rambled for a while instead";
        b.iter(|| {
            let output = QueryOutput::parse(black_box(raw));
            normalize(output, "show me sales by region")
        });
    });

    group.finish();
}

criterion_group!(benches, bench_classify_and_normalize);
criterion_main!(benches);
