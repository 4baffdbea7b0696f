use criterion::{black_box, criterion_group, criterion_main, Criterion};
use agrovision::artifact::InputShape;
use agrovision::model::layers::Activation;
use agrovision::model::ReconstructedModel;
use agrovision::preprocess::image_bytes_to_input;
use agrovision::{interpret, InferenceResult, ModelHandle, TargetSize};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use ndarray::Array4;
use std::io::Cursor;

fn bench_interpretation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Interpretation");
    group.sample_size(50);

    let mut scores = vec![0.01; 38];
    scores[21] = 0.6;
    let categorical = InferenceResult::new(scores);
    let binary = InferenceResult::new(vec![0.42]);

    group.bench_function("categorical", |b| b.iter(|| interpret(black_box(&categorical), None)));
    group.bench_function("binary", |b| b.iter(|| interpret(black_box(&binary), None)));

    group.finish();
}

fn bench_reconstructed_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("Reconstructed forward");
    group.sample_size(20);
    group.warm_up_time(std::time::Duration::from_secs(1));

    for size in [32usize, 64] {
        let shape = InputShape { height: size, width: size, channels: 3 };
        let model = ReconstructedModel::new(shape, 38, Activation::Softmax);
        let input = Array4::from_elem((1, size, size, 3), 0.5f32);
        group.bench_function(format!("{}x{}", size, size), |b| {
            b.iter(|| model.predict(black_box(&input)).unwrap())
        });
    }

    group.finish();
}

fn bench_preprocessing(c: &mut Criterion) {
    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 480, Rgb([40, 150, 60])))
        .write_to(&mut png, ImageOutputFormat::Png)
        .unwrap();
    let bytes = png.into_inner();

    c.bench_function("preprocess_640x480_to_224", |b| {
        b.iter(|| image_bytes_to_input(black_box(&bytes), TargetSize { width: 224, height: 224 }).unwrap())
    });
}

criterion_group!(benches, bench_interpretation, bench_reconstructed_forward, bench_preprocessing);
criterion_main!(benches);
