//! Render Hot Path Benchmark
//!
//! Measures the real-time render step and the decode path feeding it.
//!
//! **Goal:** A 128-sample render at 16 kHz has an 8ms budget
//! **Target:** render well under 1% of that budget

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pcmstream_common::config::{BufferingConfig, PlaybackConfig};
use pcmstream_player::audio::{Packet, Payload, SampleBlock};
use pcmstream_player::buffering::BufferController;
use pcmstream_player::playback::{bridge, PlaybackRenderer};
use tokio::time::Instant;

const FRAME: usize = 128;

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");

    group.bench_function("render_128_steady", |b| {
        let config = PlaybackConfig::default();
        let (mut tx, rx) = bridge(config.block_queue_capacity);
        let (mut renderer, mut status) = PlaybackRenderer::new(&config, rx);
        let mut out = [0.0f32; FRAME];

        b.iter(|| {
            // Refill before the ring runs low so every render takes the playing path
            if renderer.buffered() < config.resume_threshold {
                let _ = tx.send(SampleBlock::new(0, 16_000, vec![0.25; 16_000]));
            }
            renderer.render(black_box(&mut out));
            while status.try_recv().is_some() {}
            black_box(&out);
        });
    });

    group.bench_function("render_128_silence", |b| {
        let config = PlaybackConfig::default();
        let (_tx, rx) = bridge(config.block_queue_capacity);
        let (mut renderer, _status) = PlaybackRenderer::new(&config, rx);
        let mut out = [0.0f32; FRAME];

        b.iter(|| {
            renderer.render(black_box(&mut out));
        });
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    // 20ms of 16 kHz PCM16
    let payload = Payload::Binary(vec![0x11; 640]);

    group.bench_function("controller_packet_640b", |b| {
        let mut controller = BufferController::new(BufferingConfig::default());
        let now = Instant::now();
        let mut sequence = 0u64;

        b.iter(|| {
            let packet = Packet::new(sequence, payload.clone());
            sequence += 1;
            black_box(controller.on_packet(black_box(&packet), now));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_render, bench_decode);
criterion_main!(benches);
