use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use surf_rs::core::FMatrix;
use surf_rs::features2d::{detect_and_describe, HessianPyramidConfig, PipelineConfig};
use surf_rs::imgproc::{BoundaryType, IntegralImage};

fn bench_integral_image(c: &mut Criterion) {
    let mut group = c.benchmark_group("IntegralImage::sum");
    let src = FMatrix::zeros(512, 512);

    for boundary in [
        BoundaryType::NoBoundary,
        BoundaryType::Zero,
        BoundaryType::Constant,
        BoundaryType::Periodic,
        BoundaryType::Mirror,
    ] {
        let ii = IntegralImage::integrate(&src, boundary).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(boundary), &boundary, |b, _| {
            b.iter(|| black_box(ii.sum(black_box(-10), black_box(-10), black_box(520), black_box(520))))
        });
    }

    group.finish();
}

fn bench_integration(c: &mut Criterion) {
    let mut group = c.benchmark_group("IntegralImage::integrate");
    for size in [128usize, 256, 512] {
        let src = FMatrix::zeros(size, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| IntegralImage::integrate(black_box(&src), BoundaryType::Constant).unwrap())
        });
    }
    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_and_describe");
    let mut src = FMatrix::zeros(256, 256);
    for y in 96..160 {
        for x in 96..160 {
            src.set(y, x, 220.0);
        }
    }
    let config = PipelineConfig {
        pyramid: HessianPyramidConfig {
            number_of_levels: 8,
            ..HessianPyramidConfig::default()
        },
        ..PipelineConfig::default()
    };

    group.bench_function("256x256 one blob", |b| {
        b.iter(|| black_box(detect_and_describe(black_box(&src), black_box(&config)).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_integral_image, bench_integration, bench_full_pipeline);
criterion_main!(benches);
