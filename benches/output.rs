use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hitterpatch::core::Engine;

fn filled_engine(count: u64, depth: u64) -> Engine<u64> {
    let mut engine = Engine::<u64>::create(0.01);
    for i in 0..count {
        let mut trace: Vec<u64> = (0..depth).map(|d| (i * 3 + d * 5) % 37).collect();
        trace.push(1_000_000 + i);
        engine.insert(0, &trace, 1).unwrap();
    }
    engine
}

fn criterion_benchmark(c: &mut Criterion) {
    for &count in &[1_000u64, 10_000] {
        let mut engine = filled_engine(count, 12);

        c.bench_function(&format!("output {count} inserts"), |b| {
            b.iter(|| black_box(engine.output(0.01)))
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
