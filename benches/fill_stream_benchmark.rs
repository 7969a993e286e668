use std::sync::Arc;

use bytestream::{fill_stream, MemoryStream, PartialStream, SeekOrigin, Stream};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;

fn generate_random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

fn fill_between_memory_streams(c: &mut Criterion) {
    let inputs = [
        ("fill_small", 1024),
        ("fill_medium", 65536),
        ("fill_large", 1048576),
    ];

    for (name, size) in inputs.iter() {
        let data = generate_random_data(*size);
        let src = MemoryStream::from_vec(data, false, false)
            .expect("source is not empty");
        let dst = MemoryStream::with_length(*size, true, false);
        let mut group = c.benchmark_group(name.to_string());
        group.measurement_time(std::time::Duration::from_secs(5));

        group.bench_function("fill_stream", |b| {
            b.iter(|| {
                src.set_position(SeekOrigin::Begin, 0);
                dst.set_position(SeekOrigin::Begin, 0);
                assert!(fill_stream(&src, &dst, black_box(*size as u64)));
            });
        });

        group.finish();
    }
}

fn fill_from_partial_window(c: &mut Criterion) {
    let size = 1048576;
    let base = Arc::new(
        MemoryStream::from_vec(generate_random_data(size * 2), false, false)
            .expect("source is not empty"),
    );
    let window = PartialStream::new(base, size as u64 / 2, size as u64)
        .expect("window fits base");
    let dst = MemoryStream::with_length(0, true, true);

    let mut group = c.benchmark_group("fill_partial");
    group.measurement_time(std::time::Duration::from_secs(5));
    group.bench_function("fill_stream", |b| {
        b.iter(|| {
            window.set_position(SeekOrigin::Begin, 0);
            dst.set_position(SeekOrigin::Begin, 0);
            assert!(fill_stream(&window, &dst, black_box(size as u64)));
        });
    });
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = fill_between_memory_streams, fill_from_partial_window
);
criterion_main!(benches);
