use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};
use manga_page_core::prelude::*;

fn generate_frame(w: u32, h: u32) -> DynamicImage {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |_, _| {
        Rgb([rng.r#gen(), rng.r#gen(), rng.r#gen()])
    }))
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    for count in [4usize, 16, 64] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("generate_layout", count), &count, |b, &n| {
            b.iter(|| {
                let panels = generate_layout(2000, 2800, n, Some(42), 0.1, 10, 0.3);
                black_box(panels)
            });
        });
    }
    group.finish();
}

fn bench_stylize(c: &mut Criterion) {
    let mut group = c.benchmark_group("stylize");
    group.sample_size(10);
    let frame = generate_frame(320, 180);
    for style in Style::ALL {
        group.bench_with_input(BenchmarkId::new(style.name(), "320x180"), &frame, |b, f| {
            b.iter(|| black_box(stylize(style, f)));
        });
    }
    group.finish();
}

fn bench_compose(c: &mut Criterion) {
    let frames: Vec<DynamicImage> = (0..8).map(|_| generate_frame(320, 180)).collect();
    let panels = match generate_layout(1000, 1400, frames.len(), Some(7), 0.1, 10, 0.3) {
        Ok(p) => p,
        Err(e) => panic!("layout: {e}"),
    };
    c.bench_function("compose_8_panels", |b| {
        b.iter(|| black_box(compose(&frames, &panels, 1000, 1400, Rgb([255, 255, 255]))))
    });
}

criterion_group!(benches, bench_layout, bench_stylize, bench_compose);
criterion_main!(benches);
