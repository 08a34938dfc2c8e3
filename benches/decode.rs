use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use ky040::{Level, LevelPair, QuadratureDecoder};

/// Four samples per detent: rising clock, data follows, falling clock, data resets.
fn detent_samples(detents: usize) -> Vec<LevelPair> {
    let mut samples = Vec::with_capacity(detents * 4);
    for i in 0..detents {
        let data = Level::from(i % 2 == 0);
        samples.push(LevelPair::new(Level::High, data));
        samples.push(LevelPair::new(Level::High, Level::High));
        samples.push(LevelPair::new(Level::Low, Level::High));
        samples.push(LevelPair::new(Level::Low, Level::Low));
    }
    samples
}

fn bench_decoder_step(c: &mut Criterion) {
    let samples = detent_samples(1024);

    let mut group = c.benchmark_group("decoder");
    group.throughput(Throughput::Elements(samples.len() as u64));
    group.bench_function("step_1024_detents", |b| {
        b.iter(|| {
            let mut decoder = QuadratureDecoder::new(Level::Low);
            let mut net = 0i64;
            for levels in &samples {
                if let Some(action) = decoder.step(black_box(*levels)) {
                    net += action.delta();
                }
            }
            black_box(net)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_decoder_step);
criterion_main!(benches);
