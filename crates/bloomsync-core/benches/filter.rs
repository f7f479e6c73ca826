use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use bloomsync_core::Reconciler;

fn make_file(lines: usize) -> Vec<String> {
    (0..lines)
        .map(|i| format!("line {} of the synchronized file\n", i % (lines / 4 + 1)))
        .collect()
}

fn bench_build_filter(c: &mut Criterion) {
    let rec = Reconciler::default();
    let mut group = c.benchmark_group("build_filter");

    for size in [100usize, 1_000, 10_000] {
        let file = make_file(size);
        let lines: Vec<&str> = file.iter().map(String::as_str).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &lines, |b, lines| {
            b.iter(|| rec.build_filter(black_box(lines)).unwrap())
        });
    }
    group.finish();
}

fn bench_compute_missing(c: &mut Criterion) {
    let rec = Reconciler::default();
    let mut group = c.benchmark_group("compute_missing");

    for size in [100usize, 1_000, 10_000] {
        let file = make_file(size);
        let lines: Vec<&str> = file.iter().map(String::as_str).collect();
        let filter = rec.build_filter(&lines).unwrap();
        let bytes = filter.as_bytes().to_vec();

        group.bench_with_input(BenchmarkId::from_parameter(size), &lines, |b, lines| {
            b.iter(|| rec.compute_missing(black_box(lines), &bytes, None).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_filter, bench_compute_missing);
criterion_main!(benches);
