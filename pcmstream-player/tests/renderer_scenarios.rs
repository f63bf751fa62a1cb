//! Playback state machine scenarios
//!
//! Blocks are fed through the bridge exactly as the dispatcher does, and the
//! renderer is driven with fixed-size frames the way the device callback does.

use pcmstream_common::config::PlaybackConfig;
use pcmstream_common::events::{PlaybackStatus, StopReason};
use pcmstream_player::audio::SampleBlock;
use pcmstream_player::playback::{bridge, BlockSender, PlaybackPhase, PlaybackRenderer, StatusReceiver};

const FRAME: usize = 128;

fn setup(capacity: usize, startup: usize, resume: usize) -> (PlaybackRenderer, StatusReceiver, BlockSender) {
    let config = PlaybackConfig {
        ring_capacity: capacity,
        startup_threshold: startup,
        resume_threshold: resume,
        steady_threshold: 1,
        block_queue_capacity: 16,
        status_queue_capacity: 16,
    };
    let (tx, rx) = bridge(config.block_queue_capacity);
    let (renderer, status) = PlaybackRenderer::new(&config, rx);
    (renderer, status, tx)
}

fn write(tx: &mut BlockSender, samples: Vec<f32>) {
    tx.send(SampleBlock::new(0, 16_000, samples)).unwrap();
}

fn ramp(start: usize, len: usize) -> Vec<f32> {
    (start..start + len).map(|i| (i as f32 + 1.0) / 1000.0).collect()
}

#[test]
fn test_startup_threshold_399_then_401() {
    let (mut renderer, mut status, mut tx) = setup(1000, 400, 600);
    let mut out = [1.0f32; FRAME];

    write(&mut tx, ramp(0, 399));
    renderer.render(&mut out);
    assert!(out.iter().all(|&s| s == 0.0));
    assert_eq!(renderer.phase(), PlaybackPhase::NotPlaying);
    assert_eq!(renderer.buffered(), 399);
    assert!(status.try_recv().is_none());

    write(&mut tx, ramp(399, 2));
    renderer.render(&mut out);
    assert_eq!(renderer.phase(), PlaybackPhase::Playing);
    assert_eq!(out.to_vec(), ramp(0, FRAME));
    assert_eq!(renderer.buffered(), 401 - FRAME);
    assert_eq!(status.try_recv(), Some(PlaybackStatus::started(401)));
}

#[test]
fn test_underflow_at_count_50() {
    let (mut renderer, mut status, mut tx) = setup(1000, 400, 600);
    let mut out = [0.0f32; FRAME];

    write(&mut tx, ramp(0, 3 * FRAME + 50));
    for _ in 0..3 {
        renderer.render(&mut out);
    }
    assert_eq!(renderer.phase(), PlaybackPhase::Playing);
    assert_eq!(renderer.buffered(), 50);

    out.fill(0.5);
    renderer.render(&mut out);

    assert_eq!(renderer.phase(), PlaybackPhase::NotPlaying);
    assert!(renderer.just_underflowed());
    assert_eq!(out, [0.0; FRAME]);
    // Underflow keeps what was buffered
    assert_eq!(renderer.buffered(), 50);

    assert_eq!(status.try_recv(), Some(PlaybackStatus::started(3 * FRAME + 50)));
    let underflow = status.try_recv().unwrap();
    assert!(!underflow.playing);
    assert_eq!(underflow.reason, Some(StopReason::Underflow));
    assert_eq!(underflow.buffer_level, Some(50));
}

#[test]
fn test_resume_needs_more_than_startup() {
    let (mut renderer, _status, mut tx) = setup(1000, 400, 600);
    let mut out = [0.0f32; FRAME];

    write(&mut tx, ramp(0, 400));
    for _ in 0..4 {
        renderer.render(&mut out);
    }
    assert!(renderer.just_underflowed());
    assert_eq!(renderer.buffered(), 16);

    // Enough for a cold start, not for a resume
    write(&mut tx, ramp(0, 450));
    renderer.render(&mut out);
    assert_eq!(renderer.phase(), PlaybackPhase::NotPlaying);
    assert_eq!(out, [0.0; FRAME]);

    write(&mut tx, ramp(0, 134));
    renderer.render(&mut out);
    assert_eq!(renderer.phase(), PlaybackPhase::Playing);
    assert!(!renderer.just_underflowed());
}

#[test]
fn test_never_starts_below_applicable_threshold() {
    let (mut renderer, _status, mut tx) = setup(1000, 400, 600);
    let mut out = [0.0f32; FRAME];

    for step in 0..300 {
        let was_playing = renderer.phase() == PlaybackPhase::Playing;
        let required = renderer.required_threshold();
        let len = (step * 37) % 200;
        write(&mut tx, ramp(0, len));
        let available = (renderer.buffered() + len).min(1000);
        renderer.render(&mut out);

        if !was_playing && renderer.phase() == PlaybackPhase::Playing {
            assert!(available >= required, "started with {} < {}", available, required);
        }
        assert!(renderer.buffered() <= 1000);
    }
}

#[test]
fn test_samples_play_in_order_across_blocks() {
    let (mut renderer, _status, mut tx) = setup(1000, 400, 600);
    let mut played = Vec::new();
    let mut out = [0.0f32; FRAME];

    let mut next = 0;
    for len in [100, 250, 77, 300, 33] {
        write(&mut tx, ramp(next, len));
        next += len;
    }
    for _ in 0..(next / FRAME) {
        renderer.render(&mut out);
        played.extend_from_slice(&out);
    }

    assert_eq!(played, ramp(0, (next / FRAME) * FRAME));
}
