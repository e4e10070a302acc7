use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use datamock_core::{presets, DataGenerator};

fn bench_generate_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_batch");

    for preset in presets::PRESET_NAMES {
        let schema = presets::schema(preset).expect("preset schema");
        let generator = DataGenerator::new(schema, 1_000_000, Some(42));

        for limit in [100u64, 1_000] {
            group.throughput(Throughput::Elements(limit));
            group.bench_with_input(BenchmarkId::new(preset, limit), &limit, |b, &limit| {
                b.iter(|| generator.generate_batch(black_box(500_000), black_box(limit)))
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_generate_batch);
criterion_main!(benches);
