//! Real-time playback renderer
//!
//! [`PlaybackRenderer::render`] is the only entry point called from the audio
//! device thread. It drains the block bridge into the ring, runs the playback
//! state machine and fills the output slice. It never allocates, blocks, locks
//! or logs; status changes leave through a lock-free queue drained by the
//! playback monitor.
//!
//! Three thresholds drive the state machine:
//! - `startup_threshold`: samples required before the first start
//! - `resume_threshold`: samples required after an underflow (larger, so a
//!   stall rebuilds a bigger cushion than a cold start)
//! - `steady_threshold`: minimum kept while playing

use crate::playback::bridge::BlockReceiver;
use crate::playback::ring_buffer::{PlaybackLevel, PlaybackRing};
use pcmstream_common::config::PlaybackConfig;
use pcmstream_common::events::PlaybackStatus;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Renderer phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    NotPlaying,
    Playing,
}

/// Consumer side of the renderer's status queue
pub struct StatusReceiver {
    queue: HeapCons<PlaybackStatus>,
    dropped: Arc<AtomicU64>,
}

impl StatusReceiver {
    pub fn try_recv(&mut self) -> Option<PlaybackStatus> {
        self.queue.try_pop()
    }

    /// Statuses discarded because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Playback state machine over a [`PlaybackRing`]
pub struct PlaybackRenderer {
    ring: PlaybackRing,
    blocks: BlockReceiver,
    status: HeapProd<PlaybackStatus>,
    dropped_status: Arc<AtomicU64>,

    phase: PlaybackPhase,
    just_underflowed: bool,

    startup_threshold: usize,
    resume_threshold: usize,
    steady_threshold: usize,
}

impl PlaybackRenderer {
    /// Build a renderer fed by `blocks`
    ///
    /// All storage is allocated here.
    pub fn new(config: &PlaybackConfig, blocks: BlockReceiver) -> (Self, StatusReceiver) {
        let (status_tx, status_rx) =
            HeapRb::<PlaybackStatus>::new(config.status_queue_capacity.max(1)).split();
        let dropped = Arc::new(AtomicU64::new(0));

        let renderer = Self {
            ring: PlaybackRing::new(config.ring_capacity),
            blocks,
            status: status_tx,
            dropped_status: Arc::clone(&dropped),
            phase: PlaybackPhase::NotPlaying,
            just_underflowed: false,
            startup_threshold: config.startup_threshold,
            resume_threshold: config.resume_threshold,
            steady_threshold: config.steady_threshold,
        };

        let receiver = StatusReceiver {
            queue: status_rx,
            dropped,
        };

        (renderer, receiver)
    }

    /// Fill `out` with buffered audio or silence
    pub fn render(&mut self, out: &mut [f32]) {
        if self.blocks.take_reset() {
            self.apply_reset();
        }

        while let Some(block) = self.blocks.try_recv() {
            self.ring.write(&block.samples);
            self.blocks.recycle(block);
        }

        let count = self.ring.len();

        if self.phase == PlaybackPhase::NotPlaying {
            if count >= self.required_threshold() {
                self.phase = PlaybackPhase::Playing;
                self.just_underflowed = false;
                self.publish(PlaybackStatus::started(count));
            } else {
                out.fill(0.0);
                return;
            }
        }

        if count >= out.len().max(self.steady_threshold) {
            self.ring.read_into(out);
        } else {
            self.phase = PlaybackPhase::NotPlaying;
            self.just_underflowed = true;
            out.fill(0.0);
            self.publish(PlaybackStatus::underflow(count));
        }
    }

    /// Samples needed before leaving `NotPlaying`, or to keep playing
    pub fn required_threshold(&self) -> usize {
        match (self.phase, self.just_underflowed) {
            (PlaybackPhase::NotPlaying, true) => self.resume_threshold,
            (PlaybackPhase::NotPlaying, false) => self.startup_threshold,
            (PlaybackPhase::Playing, _) => self.steady_threshold,
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn just_underflowed(&self) -> bool {
        self.just_underflowed
    }

    /// Buffered samples in the ring
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    pub fn level(&self) -> PlaybackLevel {
        self.ring.level()
    }

    /// Samples lost to ring overwrites
    pub fn overwritten(&self) -> u64 {
        self.ring.overwritten()
    }

    fn apply_reset(&mut self) {
        while let Some(block) = self.blocks.try_recv() {
            self.blocks.recycle(block);
        }
        self.ring.clear();
        self.phase = PlaybackPhase::NotPlaying;
        self.just_underflowed = false;
        self.publish(PlaybackStatus::reset());
    }

    fn publish(&mut self, status: PlaybackStatus) {
        if self.status.try_push(status).is_err() {
            self.dropped_status.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::SampleBlock;
    use crate::playback::bridge::{bridge, BlockSender};
    use pcmstream_common::events::StopReason;

    fn config() -> PlaybackConfig {
        PlaybackConfig {
            ring_capacity: 64,
            startup_threshold: 8,
            resume_threshold: 16,
            steady_threshold: 2,
            block_queue_capacity: 8,
            status_queue_capacity: 2,
        }
    }

    fn setup() -> (PlaybackRenderer, StatusReceiver, BlockSender) {
        let (tx, rx) = bridge(8);
        let (renderer, status) = PlaybackRenderer::new(&config(), rx);
        (renderer, status, tx)
    }

    fn feed(tx: &mut BlockSender, len: usize) {
        tx.send(SampleBlock::new(0, 16_000, vec![0.5; len])).unwrap();
    }

    #[test]
    fn test_threshold_selection() {
        let (mut renderer, _status, mut tx) = setup();
        assert_eq!(renderer.required_threshold(), 8);

        feed(&mut tx, 8);
        let mut out = [0.0; 4];
        renderer.render(&mut out);
        assert_eq!(renderer.phase(), PlaybackPhase::Playing);
        assert_eq!(renderer.required_threshold(), 2);

        renderer.render(&mut out);
        renderer.render(&mut out);
        assert!(renderer.just_underflowed());
        assert_eq!(renderer.required_threshold(), 16);
    }

    #[test]
    fn test_steady_threshold_is_a_floor() {
        let (tx, rx) = bridge(8);
        let mut cfg = config();
        cfg.steady_threshold = 6;
        let (mut renderer, _status) = PlaybackRenderer::new(&cfg, rx);
        let mut tx = tx;

        feed(&mut tx, 9);
        let mut out = [0.0; 4];
        renderer.render(&mut out);
        assert_eq!(out, [0.5; 4]);

        // 5 left: enough for the request but below the steady floor
        renderer.render(&mut out);
        assert_eq!(out, [0.0; 4]);
        assert_eq!(renderer.phase(), PlaybackPhase::NotPlaying);
    }

    #[test]
    fn test_reset_returns_to_cold_start() {
        let (mut renderer, mut status, mut tx) = setup();
        let reset = tx.reset_handle();

        feed(&mut tx, 20);
        let mut out = [0.0; 4];
        renderer.render(&mut out);
        assert_eq!(status.try_recv(), Some(PlaybackStatus::started(20)));

        feed(&mut tx, 4);
        reset.request();
        renderer.render(&mut out);

        assert_eq!(out, [0.0; 4]);
        assert_eq!(renderer.buffered(), 0);
        assert_eq!(renderer.phase(), PlaybackPhase::NotPlaying);
        assert!(!renderer.just_underflowed());
        let s = status.try_recv().unwrap();
        assert_eq!(s.reason, Some(StopReason::Reset));
    }

    #[test]
    fn test_full_status_queue_counts_drops() {
        let (mut renderer, status, mut tx) = setup();
        let mut out = [0.0; 8];

        // started, underflow, then one more start that does not fit
        feed(&mut tx, 8);
        renderer.render(&mut out);
        renderer.render(&mut out);
        feed(&mut tx, 16);
        renderer.render(&mut out);

        assert_eq!(status.dropped(), 1);
    }
}
