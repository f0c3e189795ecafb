//! Benchmarks for the renderer crate - heatmap coloring and PNG encoding.
//!
//! Run with: cargo bench --package renderer --bench render_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use renderer::{create_png, create_png_auto, update_rgba, HeatmapSettings, HsvLut};
use test_utils::create_random_grid;

const SIZES: [(usize, usize); 3] = [(64, 64), (256, 256), (1024, 1024)];

fn bench_update_rgba(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_rgba");
    let lut = HsvLut::new(HeatmapSettings::default());

    for (width, height) in SIZES {
        let elevation = create_random_grid(width, height, 0.0, 3000.0, 7);
        let mut rgba = vec![0u8; width * height * 4];

        group.throughput(Throughput::Elements((width * height) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", width, height)),
            &elevation,
            |b, elevation| {
                b.iter(|| update_rgba(&lut, black_box(elevation), 0.0, 3000.0, &mut rgba));
            },
        );
    }

    group.finish();
}

fn bench_lut_rebuild(c: &mut Criterion) {
    let mut lut = HsvLut::default();
    let mut alpha = 0.0f32;

    c.bench_function("lut_rebuild", |b| {
        b.iter(|| {
            alpha = (alpha + 0.01) % 1.0;
            lut.validate(black_box(HeatmapSettings {
                alpha,
                ..Default::default()
            }))
        });
    });
}

fn bench_png_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("png_encoding");
    let lut = HsvLut::new(HeatmapSettings::default());

    for (width, height) in SIZES {
        let elevation = create_random_grid(width, height, 0.0, 3000.0, 11);
        let mut rgba = vec![0u8; width * height * 4];
        update_rgba(&lut, &elevation, 0.0, 3000.0, &mut rgba);

        group.throughput(Throughput::Bytes(rgba.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("rgba", format!("{}x{}", width, height)),
            &rgba,
            |b, rgba| b.iter(|| create_png(black_box(rgba), width, height)),
        );
        group.bench_with_input(
            BenchmarkId::new("auto", format!("{}x{}", width, height)),
            &rgba,
            |b, rgba| b.iter(|| create_png_auto(black_box(rgba), width, height)),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_update_rgba, bench_lut_rebuild, bench_png_encoding);
criterion_main!(benches);
