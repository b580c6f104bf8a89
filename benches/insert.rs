use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hitterpatch::core::Engine;

/// Distinct backtraces of shared length, each capped with its own unique
/// terminator so no two strings collapse onto the same leaf.
fn random_backtraces(count: u64, depth: u64) -> Vec<Vec<u64>> {
    (0..count)
        .map(|i| {
            let mut trace: Vec<u64> = (0..depth).map(|d| (i * 7 + d * 13) % 101).collect();
            trace.push(1_000_000 + i);
            trace
        })
        .collect()
}

fn criterion_benchmark(c: &mut Criterion) {
    for &count in &[100u64, 1_000, 10_000] {
        let traces = random_backtraces(count, 16);

        c.bench_function(&format!("insert distinct {count}"), |b| {
            b.iter(|| {
                let mut engine = Engine::<u64>::create(0.01);
                for trace in black_box(&traces) {
                    engine.insert(0, trace, 1).unwrap();
                }
            })
        });
    }

    c.bench_function("insert with shared prefix growth", |b| {
        let traces = random_backtraces(2_000, 32);
        b.iter(|| {
            let mut engine = Engine::<u64>::create(0.01);
            let mut previous: &[u64] = &[];
            for trace in black_box(&traces) {
                let shared = previous
                    .iter()
                    .zip(trace.iter())
                    .take_while(|(a, b)| a == b)
                    .count();
                engine.insert(shared as u32, &trace[shared..], 1).unwrap();
                previous = trace;
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
