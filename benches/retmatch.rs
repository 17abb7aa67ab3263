use criterion::{criterion_group, criterion_main, Criterion};
use retmatch::{
    compare_images, detect_and_describe, CompareConfig, EngineConfig, GrayBuffer, KeypointParams,
    MatchStrategy, Pipeline, PipelineConfig, ProcessedImage, RawImage, SimilarityEngine,
};
use std::hint::black_box;

fn make_rgb(width: usize, height: usize, salt: usize) -> RawImage {
    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            let value = (((x * 13) ^ (y * 7) ^ (x * y) ^ (salt * 29)) & 0xFF) as u8;
            data.extend_from_slice(&[value, value / 2, value / 3]);
        }
    }
    RawImage::new(data, width, height, 3).unwrap()
}

fn bench_config() -> PipelineConfig {
    PipelineConfig {
        median_max_kernel: 7,
        ..PipelineConfig::default()
    }
}

fn bench_pipeline(c: &mut Criterion) {
    let raw = make_rgb(256, 256, 0);
    let pipeline = Pipeline::new(bench_config()).unwrap();

    c.bench_function("pipeline_process_256", |b| {
        b.iter(|| black_box(pipeline.process(&raw).unwrap()));
    });
}

fn bench_template(c: &mut Criterion) {
    let pipeline = Pipeline::new(bench_config()).unwrap();
    let scene = pipeline.process(&make_rgb(256, 256, 0)).unwrap();
    let engine = SimilarityEngine::new();

    c.bench_function("template_equal_dims_256", |b| {
        b.iter(|| black_box(engine.compare(&scene, &scene).unwrap()));
    });

    let full = scene.view();
    let mut patch = Vec::with_capacity(96 * 96);
    for y in 80..176 {
        patch.extend_from_slice(&full.row(y).unwrap()[64..160]);
    }
    let window = ProcessedImage::from_gray(GrayBuffer::new(patch, 96, 96).unwrap());

    c.bench_function("template_sliding_96_in_256", |b| {
        b.iter(|| black_box(engine.compare(&window, &scene).unwrap()));
    });
}

fn bench_keypoint(c: &mut Criterion) {
    let pipeline = Pipeline::new(bench_config()).unwrap();
    let processed = pipeline.process(&make_rgb(256, 256, 0)).unwrap();
    let params = KeypointParams::default();

    c.bench_function("keypoint_detect_256", |b| {
        b.iter(|| black_box(detect_and_describe(processed.view(), &params)));
    });

    let engine = SimilarityEngine::new().with_config(EngineConfig {
        strategy: MatchStrategy::Keypoint,
        ..EngineConfig::default()
    });

    c.bench_function("keypoint_compare_256", |b| {
        b.iter(|| black_box(engine.compare(&processed, &processed).unwrap()));
    });
}

fn bench_end_to_end(c: &mut Criterion) {
    let raw_a = make_rgb(256, 256, 0);
    let raw_b = make_rgb(256, 256, 1);

    let sequential = CompareConfig {
        pipeline: bench_config(),
        parallel: false,
        ..CompareConfig::default()
    };
    c.bench_function("compare_images_sequential_256", |b| {
        b.iter(|| black_box(compare_images(&raw_a, &raw_b, &sequential).unwrap()));
    });

    if cfg!(feature = "rayon") {
        let parallel = CompareConfig {
            parallel: true,
            ..sequential
        };
        c.bench_function("compare_images_parallel_256", |b| {
            b.iter(|| black_box(compare_images(&raw_a, &raw_b, &parallel).unwrap()));
        });
    }
}

criterion_group!(
    benches,
    bench_pipeline,
    bench_template,
    bench_keypoint,
    bench_end_to_end
);
criterion_main!(benches);
