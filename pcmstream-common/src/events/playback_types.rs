//! Playback-related type definitions
//!
//! Status values published by the real-time renderer. These are plain `Copy`
//! values so they can cross the real-time boundary through a lock-free queue.

use serde::{Deserialize, Serialize};

/// Why playback stopped
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Buffered samples ran out mid-playback
    Underflow,
    /// Controller requested a playback reset
    Reset,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Underflow => write!(f, "underflow"),
            StopReason::Reset => write!(f, "reset"),
        }
    }
}

/// Playback status emitted by the render step
///
/// Advisory only: the renderer never waits for anyone to read it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaybackStatus {
    /// Whether the renderer is now producing buffered audio
    pub playing: bool,
    /// Set when `playing` is false
    pub reason: Option<StopReason>,
    /// Buffered samples at the time of the transition
    pub buffer_level: Option<usize>,
}

impl PlaybackStatus {
    pub fn started(buffer_level: usize) -> Self {
        Self {
            playing: true,
            reason: None,
            buffer_level: Some(buffer_level),
        }
    }

    pub fn underflow(buffer_level: usize) -> Self {
        Self {
            playing: false,
            reason: Some(StopReason::Underflow),
            buffer_level: Some(buffer_level),
        }
    }

    pub fn reset() -> Self {
        Self {
            playing: false,
            reason: Some(StopReason::Reset),
            buffer_level: None,
        }
    }
}
