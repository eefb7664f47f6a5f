//! Benchmarks for the streaming analysis/shift/resynthesis loop
//!
//! Run with: cargo bench --bench phase_vocoder

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spectral_vocoder::spectrum::fft::{FftEngine, Normalization};
use spectral_vocoder::{PhaseVocoder, ShiftParams, VocoderConfig};

fn test_signal(len: usize) -> Vec<f64> {
    (0..len)
        .map(|n| {
            let t = n as f64 / 44100.0;
            (2.0 * std::f64::consts::PI * 440.0 * t).sin() * 0.5
        })
        .collect()
}

/// Benchmark the real FFT round trip at common window sizes
fn bench_real_fft(c: &mut Criterion) {
    let mut group = c.benchmark_group("real_fft");

    for &size in &[256usize, 1024, 4096] {
        let signal = test_signal(size);
        let mut fft = FftEngine::new(size, Normalization::Forward).unwrap();

        group.bench_with_input(BenchmarkId::new("forward_inverse", size), &size, |b, _| {
            b.iter(|| {
                let spectrum = fft.forward_real(black_box(&signal)).to_vec();
                black_box(fft.inverse_real(&spectrum)[0])
            })
        });
    }

    group.finish();
}

/// Benchmark one second of audio through the full pipeline
fn bench_vocoder(c: &mut Criterion) {
    let mut group = c.benchmark_group("phase_vocoder");
    let input = test_signal(44100);

    let cases = [
        ("identity", ShiftParams::default()),
        ("fifth_up", ShiftParams::semitones(7.0)),
        ("fifth_up_formants", ShiftParams::semitones(7.0).locked(true)),
    ];

    for (name, params) in cases {
        let mut vocoder = PhaseVocoder::new(VocoderConfig::default()).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| black_box(vocoder.process_buffer(black_box(&input), &params)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_real_fft, bench_vocoder);
criterion_main!(benches);
