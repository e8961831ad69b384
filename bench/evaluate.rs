use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cv_costvol::{
    block_matching::{BlockMatching, Params},
    prelude::*,
    regression::{self, Squeeze}
};
use ndarray::{Array3, Array4};

const WIDTH: usize = 96;
const HEIGHT: usize = 32;
const MAX_DISPARITY: usize = 32;
const SHIFT: usize = 6;

fn texture(x: usize, y: usize, c: usize) -> f32 {
    ((x * 7919 + y * 104_729 + c * 1_299_709) % 251) as f32 / 251.0
}

fn shifted_sample() -> Sample {
    let left = Array4::from_shape_fn((1, 3, HEIGHT, WIDTH), |(_, c, y, x)| texture(x, y, c));
    let right = Array4::from_shape_fn((1, 3, HEIGHT, WIDTH), |(_, c, y, x)| texture(x + SHIFT, y, c));
    let gt = Array3::from_elem((1, HEIGHT, WIDTH), SHIFT as f32);

    Sample::new(StereoBatch::from_pair(left, right).unwrap(), gt)
}

fn evaluate_bench(c: &mut Criterion) {
    // Build profile
    let mut profile = Profile::new(Box::new(BlockMatching::new(Params {
        max_disparity: MAX_DISPARITY,
        correlation_window_size: (3, 3),
        peak_score: 100.0
    })))
    .unwrap();

    let sample = shifted_sample();

    // Benchmark the full evaluation of one batch
    c.bench_function("eval block matching 96x32", |b| {
        b.iter(|| profile.eval(black_box(&sample), Dataset::FlyingThings3D))
    });

    // Benchmark squeeze regression on its own
    let cost = CostVolume::new(Array4::from_shape_fn(
        (1, 192, 64, 256),
        |(_, d, y, x)| -((d as f32) - ((x + y) % 192) as f32).abs()
    ))
    .unwrap();
    let center = cost.argmax();

    c.bench_function("squeeze regression 192x64x256", |b| {
        b.iter(|| regression::squeeze_disparity(black_box(&cost), &center, Squeeze::default()))
    });
}

criterion_group!(benches, evaluate_bench);
criterion_main!(benches);
