use biquad_engine::{BiquadFilter, Realization};
use criterion::{criterion_group, criterion_main, Criterion};

const FRAMES: usize = 4096;

fn sin(freq: f32, channels: usize) -> Vec<f32> {
    (0..FRAMES * channels)
        .map(|x| (x as f32 * freq * 2.0 * std::f32::consts::PI / 48_000.0).sin())
        .collect()
}

// A 1 kHz peaking section at 48 kHz.
const PEAK: [f32; 5] = [1.0153, -1.9708, 0.9581, -1.9708, 0.9734];

pub fn bench_channels(c: &mut Criterion) {
    for &channels in &[1, 2, 8, 16, 24] {
        let input = sin(440.0, channels);
        let mut output = vec![0.0; input.len()];
        for &(name, realization) in &[
            ("df2t", Realization::DirectForm2Transposed),
            ("state-space", Realization::StateSpace),
        ] {
            let mut filter = BiquadFilter::builder(channels)
                .coefficients(&PEAK)
                .realization(realization)
                .build();
            c.bench_function(&format!("process {}/{}", name, channels), |b| {
                b.iter(|| filter.process(&mut output, &input, FRAMES))
            });
        }
    }
}

pub fn bench_shapes(c: &mut Criterion) {
    let channels = 8;
    let input = sin(440.0, channels);
    let mut output = vec![0.0; input.len()];
    for &(name, coefs) in &[
        ("scale", [0.5, 0.0, 0.0, 0.0, 0.0]),
        ("single-pole", [0.1, 0.0, 0.0, -0.9, 0.0]),
        ("full", PEAK),
    ] {
        let mut filter = BiquadFilter::builder(channels)
            .coefficients(&coefs)
            .realization(Realization::DirectForm2Transposed)
            .build();
        c.bench_function(&format!("shape {}/{}", name, channels), |b| {
            b.iter(|| filter.process(&mut output, &input, FRAMES))
        });
    }
}

pub fn bench_scalar(c: &mut Criterion) {
    let channels = 16;
    let input = sin(440.0, channels);
    let mut output = vec![0.0; input.len()];
    let mut filter = BiquadFilter::builder(channels)
        .coefficients(&PEAK)
        .optimized(false)
        .build();
    c.bench_function("process scalar/16", |b| {
        b.iter(|| filter.process(&mut output, &input, FRAMES))
    });
}

pub fn bench_cascade(c: &mut Criterion) {
    for &stages in &[4, 16] {
        let input = sin(440.0, 1);
        let mut buf = input.clone();
        let mut filter = BiquadFilter::with_coefficients(stages, &PEAK, true);
        c.bench_function(&format!("process_1d {}", stages), |b| {
            b.iter(|| {
                buf.copy_from_slice(&input);
                filter.process_1d(&mut buf, FRAMES);
            })
        });
    }
}

criterion_group!(
    benches,
    bench_channels,
    bench_shapes,
    bench_scalar,
    bench_cascade,
);
criterion_main!(benches);
