//! Adaptive buffer controller
//!
//! Accumulates decoded PCM bytes and decides when to release a block toward
//! playback:
//!
//! - **Cold start**: hold until `startup_threshold_bytes` is reached, or until
//!   the startup idle flush fires.
//! - **Steady state**: release at `continuous_threshold_bytes`, or when the
//!   shorter continuous idle flush fires.
//! - **Overflow**: above `max_buffer_bytes` the oldest half is discarded.
//!
//! The controller is plain synchronous state. Time is passed in, and the idle
//! flush is a deadline the owning task sleeps on; arming and cancelling it is
//! a field assignment.

use crate::audio::pcm::{decode_payload, pcm16_to_f32, ByteAligner};
use crate::audio::types::{Packet, SampleBlock};
use crate::error::{Error, Result};
use pcmstream_common::config::BufferingConfig;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Messages produced by the buffering domain
#[derive(Debug)]
pub enum WorkerMessage {
    /// Human-readable status
    Log { message: String },
    /// Recoverable fault; buffering continues
    Error { message: String },
    /// The accumulation buffer was halved
    Overflow {
        discarded_bytes: usize,
        retained_bytes: usize,
    },
    /// A released block and its metadata
    Data {
        block: SampleBlock,
        sample_count: usize,
        duration_ms: f64,
    },
}

pub struct BufferController {
    config: BufferingConfig,
    accumulated: Vec<u8>,
    aligner: ByteAligner,
    has_started: bool,
    flush_deadline: Option<Instant>,
    next_block: u64,
}

impl BufferController {
    pub fn new(config: BufferingConfig) -> Self {
        let accumulated = Vec::with_capacity(config.startup_threshold_bytes);
        Self {
            config,
            accumulated,
            aligner: ByteAligner::new(),
            has_started: false,
            flush_deadline: None,
            next_block: 0,
        }
    }

    /// Handle one arriving packet
    pub fn on_packet(&mut self, packet: &Packet, now: Instant) -> Vec<WorkerMessage> {
        let bytes = match decode_payload(packet) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Dropping packet: {}", e);
                return vec![WorkerMessage::Error {
                    message: e.to_string(),
                }];
            }
        };

        trace!("Packet #{}: {} bytes", packet.sequence, bytes.len());
        self.accumulated.extend_from_slice(&bytes);

        let mut messages = Vec::new();
        if self.accumulated.len() > self.config.max_buffer_bytes {
            messages.push(self.trim_overflow());
        }

        let threshold = if self.has_started {
            self.config.continuous_threshold_bytes
        } else {
            self.config.startup_threshold_bytes
        };

        if self.accumulated.len() >= threshold {
            if !self.has_started {
                messages.push(WorkerMessage::Log {
                    message: format!(
                        "Startup threshold reached with {} bytes buffered",
                        self.accumulated.len()
                    ),
                });
                self.has_started = true;
            }
            self.release_into(&mut messages);
        } else {
            let idle = if self.has_started {
                self.config.continuous_flush()
            } else {
                self.config.startup_flush()
            };
            self.flush_deadline = Some(now + idle);
        }

        messages
    }

    /// Handle the idle flush deadline; does nothing before it is due
    pub fn on_flush_timer(&mut self, now: Instant) -> Vec<WorkerMessage> {
        match self.flush_deadline {
            Some(deadline) if deadline <= now => {}
            _ => return Vec::new(),
        }
        self.flush_deadline = None;

        let mut messages = Vec::new();
        if !self.has_started {
            messages.push(WorkerMessage::Log {
                message: format!(
                    "Startup flush after idle timeout with {} bytes buffered",
                    self.accumulated.len()
                ),
            });
            self.has_started = true;
        }
        self.release_into(&mut messages);
        messages
    }

    /// Release whatever is buffered now, regardless of thresholds
    pub fn flush(&mut self) -> Vec<WorkerMessage> {
        let mut messages = Vec::new();
        self.release_into(&mut messages);
        messages
    }

    /// Final release followed by a full reset
    pub fn finish(&mut self) -> Vec<WorkerMessage> {
        let messages = self.flush();
        self.reset();
        messages
    }

    /// Return to the initial state
    pub fn reset(&mut self) {
        self.accumulated.clear();
        self.aligner.clear();
        self.has_started = false;
        self.flush_deadline = None;
    }

    /// Require the startup threshold again before the next release
    pub fn reset_playback(&mut self) {
        debug!("Buffering returned to cold start");
        self.has_started = false;
    }

    pub fn flush_deadline(&self) -> Option<Instant> {
        self.flush_deadline
    }

    pub fn has_started(&self) -> bool {
        self.has_started
    }

    /// Bytes waiting for the next release
    pub fn buffered_bytes(&self) -> usize {
        self.accumulated.len()
    }

    /// Byte carried for the next sample, if any
    pub fn pending_byte(&self) -> Option<u8> {
        self.aligner.pending()
    }

    /// Drop the oldest half of the accumulation
    ///
    /// The discard is rounded up by one byte when needed so the retained
    /// bytes stay on a sample boundary; a carried byte belongs to the
    /// discarded part.
    fn trim_overflow(&mut self) -> WorkerMessage {
        let len = self.accumulated.len();
        let carried = usize::from(self.aligner.has_pending());
        let mut discard = len / 2;
        if (discard + carried) % 2 != 0 {
            discard += 1;
        }

        self.accumulated.drain(..discard);
        self.aligner.clear();

        let retained = self.accumulated.len();
        warn!(
            "Accumulation buffer overflow: discarded {} bytes, kept {}",
            discard + carried,
            retained
        );
        WorkerMessage::Overflow {
            discarded_bytes: discard + carried,
            retained_bytes: retained,
        }
    }

    fn release_into(&mut self, messages: &mut Vec<WorkerMessage>) {
        self.flush_deadline = None;
        match self.release() {
            Ok(Some(message)) => messages.push(message),
            Ok(None) => {}
            Err(e) => messages.push(self.reset_after_fault(e)),
        }
    }

    fn release(&mut self) -> Result<Option<WorkerMessage>> {
        if self.accumulated.is_empty() {
            return Ok(None);
        }

        let raw = std::mem::replace(
            &mut self.accumulated,
            Vec::with_capacity(self.config.continuous_threshold_bytes),
        );
        let aligned = self.aligner.align(raw);
        if aligned.is_empty() {
            return Ok(None);
        }

        let samples = convert_aligned(&aligned)?;
        let block = SampleBlock::new(self.next_block, self.config.sample_rate, samples);
        self.next_block += 1;

        let sample_count = block.sample_count();
        let duration_ms = block.duration_ms();
        trace!(
            "Releasing block #{}: {} samples ({:.1}ms)",
            block.sequence,
            sample_count,
            duration_ms
        );

        Ok(Some(WorkerMessage::Data {
            block,
            sample_count,
            duration_ms,
        }))
    }

    /// Contain an internal fault by dropping all partial state
    fn reset_after_fault(&mut self, error: Error) -> WorkerMessage {
        warn!("{}; clearing buffered bytes", error);
        self.accumulated.clear();
        self.aligner.clear();
        self.flush_deadline = None;
        WorkerMessage::Error {
            message: error.to_string(),
        }
    }
}

/// Convert bytes that must already be sample-aligned
fn convert_aligned(aligned: &[u8]) -> Result<Vec<f32>> {
    let samples = pcm16_to_f32(aligned);
    if aligned.len() % 2 != 0 || samples.len() * 2 != aligned.len() {
        return Err(Error::Buffering(format!(
            "{} aligned bytes produced {} samples",
            aligned.len(),
            samples.len()
        )));
    }
    Ok(samples)
}
