use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use imgtools_image::Image;
use imgtools_imgproc::frequency::{apply_fft_filter, compute_fft, create_gaussian_filter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn bench_frequency(c: &mut Criterion) {
    let mut group = c.benchmark_group("Frequency");
    let mut rng = StdRng::seed_from_u64(3);

    for (width, height) in [(256, 256), (512, 512), (640, 480)].iter() {
        let data = (0..width * height).map(|_| rng.random()).collect();
        let image = Image::<f32, 1>::new([*width, *height].into(), data).unwrap();
        let parameter_string = format!("{}x{}", width, height);

        group.bench_with_input(
            BenchmarkId::new("compute_fft", &parameter_string),
            &image,
            |b, src| b.iter(|| black_box(compute_fft(src))),
        );

        group.bench_with_input(
            BenchmarkId::new("gaussian_low_pass", &parameter_string),
            &image,
            |b, src| {
                let mask = create_gaussian_filter(src.size(), 30.0, false).unwrap();
                let mut dst = Image::from_size_val(src.size(), 0.0).unwrap();
                b.iter(|| black_box(apply_fft_filter(src, &mask, &mut dst)))
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_frequency);
criterion_main!(benches);
