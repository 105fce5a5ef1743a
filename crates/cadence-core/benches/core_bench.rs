//! Criterion benchmarks for cadence-core filtering
//!
//! Run with: cargo bench -p cadence-core
#![allow(missing_docs)]

use cadence_core::{AnalysisStage, Filter, SampleBuffer};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 256, 512, 1024, 4096];

fn generate_test_signal(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5
        })
        .collect()
}

fn lowpass(block_size: usize) -> Filter {
    let mut filter = Filter::new(3, block_size).unwrap();
    filter.set_sample_rate(SAMPLE_RATE as u32);
    filter.set_lowpass(1000.0, 0.707).unwrap();
    filter
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("Filter");

    for &block_size in BLOCK_SIZES {
        let input = SampleBuffer::from_slice(&generate_test_signal(block_size));

        group.bench_with_input(
            BenchmarkId::new("in_place", block_size),
            &block_size,
            |b, _| {
                let mut filter = lowpass(block_size);
                let mut block = input.clone();
                b.iter(|| {
                    filter.process_in_place(black_box(&mut block));
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("out_of_place", block_size),
            &block_size,
            |b, _| {
                let mut filter = lowpass(block_size);
                b.iter(|| {
                    filter.process(black_box(&input));
                    black_box(filter.output());
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("forward_backward", block_size),
            &block_size,
            |b, _| {
                let mut filter = lowpass(block_size);
                let mut block = input.clone();
                b.iter(|| {
                    filter.process_forward_backward(black_box(&mut block), block_size);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_filter);
criterion_main!(benches);
