use criterion::{criterion_group, criterion_main, Criterion};
use imgtools_image::{Image, ImageSize};
use std::hint::black_box;

fn sample_image() -> Image<u8, 3> {
    Image::from_size_val(
        ImageSize {
            width: 1920,
            height: 1080,
        },
        127,
    )
    .unwrap()
}

fn bench_image(c: &mut Criterion) {
    let mut group = c.benchmark_group("Image");

    group.bench_function("cast_and_scale_f32", |b| {
        b.iter_batched(
            sample_image,
            |image| black_box(image).cast_and_scale(1.0f32 / 255.0f32).unwrap(),
            criterion::BatchSize::LargeInput,
        )
    });

    group.bench_function("split_channels", |b| {
        b.iter_batched(
            sample_image,
            |image| black_box(image).split_channels().unwrap(),
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_image);
criterion_main!(benches);
