//! Benchmarks for the engine's render path.
//!
//! Run with: cargo bench
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use velvet_dsp::context::RenderCtx;
use velvet_dsp::effects::{Effect, EffectsChain};
use velvet_dsp::synth::{build_engine, EngineConfig, VoiceSettings};

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

const SAMPLE_RATE: f32 = 48_000.0;

fn bench_voice(c: &mut Criterion) {
    let mut group = c.benchmark_group("voice");

    for &size in BLOCK_SIZES {
        let mut voice = VoiceSettings::default()
            .create_voice(440.0, 100, SAMPLE_RATE)
            .unwrap();
        voice.trigger(0.0);
        let mut buffer = vec![0.0f32; size];
        let ctx = RenderCtx::new(SAMPLE_RATE, 0.5);

        group.bench_with_input(BenchmarkId::new("render_add", size), &size, |b, _| {
            b.iter(|| {
                buffer.fill(0.0);
                voice.render_add(black_box(&mut buffer), black_box(&ctx));
            })
        });
    }
    group.finish();
}

fn bench_effects_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("effects");

    for &size in BLOCK_SIZES {
        let mut chain = EffectsChain::new(SAMPLE_RATE);
        let input: Vec<f32> = (0..size)
            .map(|n| (std::f32::consts::TAU * 220.0 * n as f32 / SAMPLE_RATE).sin() * 0.6)
            .collect();
        let mut buffer = input.clone();
        let ctx = RenderCtx::new(SAMPLE_RATE, 1.0);

        group.bench_with_input(BenchmarkId::new("chain", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                chain.render_block(black_box(&mut buffer), black_box(&ctx));
            })
        });
    }
    group.finish();
}

fn bench_full_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");

    for &size in BLOCK_SIZES {
        let (mut controller, mut manager) = build_engine(EngineConfig {
            sample_rate: SAMPLE_RATE,
            ..EngineConfig::default()
        });
        // An eight-note chord keeps the pool busy.
        for note in [48, 52, 55, 60, 64, 67, 72, 76] {
            controller.note_on(note, 100).unwrap();
        }
        let mut buffer = vec![0.0f32; size];
        manager.render_block(&mut buffer); // absorb the note-on commands

        group.bench_with_input(BenchmarkId::new("render_block", size), &size, |b, _| {
            b.iter(|| {
                manager.render_block(black_box(&mut buffer));
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_voice, bench_effects_chain, bench_full_engine);
criterion_main!(benches);
