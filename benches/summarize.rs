use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use diet_api_bench::metrics::{summarize, LatencySample};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn samples(count: usize) -> Vec<LatencySample> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| {
            let elapsed = rng.gen_range(1.0..250.0);
            if rng.gen_bool(0.02) {
                LatencySample::failure(elapsed)
            } else {
                LatencySample::success(elapsed)
            }
        })
        .collect()
}

fn bench_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize");
    for count in [1_000usize, 100_000] {
        let input = samples(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &input, |b, input| {
            b.iter(|| summarize("categories", black_box(input), 30.0))
        });
    }
    group.finish();
}

fn bench_run_log(c: &mut Criterion) {
    let mut log = String::new();
    for i in 0..10_000u32 {
        let time = format!("2026-01-01T09:{:02}:{:02}Z", (i / 60) % 60, i % 60);
        for (metric, value) in [("http_reqs", 1.0), ("http_req_duration", 12.5), ("http_req_failed", 0.0)] {
            log.push_str(&format!(
                r#"{{"type":"Point","metric":"{}","data":{{"time":"{}","value":{},"tags":{{"expected_response":"true"}}}}}}"#,
                metric, time, value
            ));
            log.push('\n');
        }
    }

    c.bench_function("parse_run_log_10k", |b| {
        b.iter(|| diet_api_bench::run_log::parse_run_log(black_box(log.as_bytes())))
    });
}

criterion_group!(benches, bench_summarize, bench_run_log);
criterion_main!(benches);
