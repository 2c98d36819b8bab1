//! Periodogram scan benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lib_dsp::periodogram::{periodogram, ScanConfig, TimeUnit};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn bench_periodogram(c: &mut Criterion) {
    let mut group = c.benchmark_group("periodogram");
    let mut rng = StdRng::seed_from_u64(7);

    for n in [100usize, 1000, 5000].iter() {
        let mut t: Vec<f64> = (0..*n).map(|_| rng.gen_range(0.0..100.0)).collect();
        t.sort_by(f64::total_cmp);
        let y: Vec<f64> = t.iter().map(|&t| (0.7 * t).sin() + rng.gen_range(-0.1..0.1)).collect();
        let config = ScanConfig::new(TimeUnit::Days, 0.5, Some(50.0), 2000);

        group.bench_with_input(BenchmarkId::new("gls", n), &(&t, &y), |b, (t, y)| {
            b.iter(|| periodogram(black_box(&config), black_box(t), black_box(y), None));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_periodogram);
criterion_main!(benches);
