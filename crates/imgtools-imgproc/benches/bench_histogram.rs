use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use imgtools_image::Image;
use imgtools_imgproc::enhance::{equalize_histogram, Clahe};
use imgtools_imgproc::histogram::compute_histogram;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_gray(width: usize, height: usize) -> Image<u8, 1> {
    let mut rng = StdRng::seed_from_u64(7);
    let data = (0..width * height).map(|_| rng.random()).collect();
    Image::new([width, height].into(), data).unwrap()
}

fn bench_histogram(c: &mut Criterion) {
    let mut group = c.benchmark_group("Histogram");

    for (width, height) in [(640, 480), (1920, 1080)].iter() {
        let image = random_gray(*width, *height);
        let parameter_string = format!("{}x{}", width, height);

        group.bench_with_input(
            BenchmarkId::new("compute_histogram", &parameter_string),
            &image,
            |b, src| {
                let mut hist = vec![0; 256];
                b.iter(|| {
                    hist.fill(0);
                    black_box(compute_histogram(src, &mut hist, 256))
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("equalize_histogram", &parameter_string),
            &image,
            |b, src| {
                let mut dst = Image::from_size_val(src.size(), 0).unwrap();
                b.iter(|| black_box(equalize_histogram(src, &mut dst)))
            },
        );

        group.bench_with_input(
            BenchmarkId::new("clahe_8x8", &parameter_string),
            &image,
            |b, src| {
                let clahe = Clahe::default();
                let mut dst = Image::from_size_val(src.size(), 0).unwrap();
                b.iter(|| black_box(clahe.apply_gray(src, &mut dst)))
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_histogram);
criterion_main!(benches);
