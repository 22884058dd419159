use criterion::{black_box, criterion_group, criterion_main, Criterion};
use promscript::exporter::{parse_line, RecordSet};

fn script_output(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("host{}, disk{}, used_bytes, {}.5\n", i % 50, i % 7, i * 1024))
        .collect()
}

fn parse_benchmark(c: &mut Criterion) {
    c.bench_function("parse_line", |b| {
        b.iter(|| parse_line(black_box("hostA, cpu, load, 0.75")))
    });

    let output = script_output(10_000);
    c.bench_function("record_set_10k", |b| {
        b.iter(|| {
            black_box(&output)
                .lines()
                .map(parse_line)
                .collect::<Result<RecordSet, _>>()
        })
    });
}

criterion_group!(benches, parse_benchmark);
criterion_main!(benches);
