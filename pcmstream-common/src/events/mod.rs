//! Event types for the PCM stream pipeline
//!
//! Provides the closed event enum shared by every pipeline component and the
//! EventBus that distributes it to observers.

mod playback_types;

pub use playback_types::{PlaybackStatus, StopReason};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Pipeline event types
///
/// Events are broadcast via EventBus for observability. None of them are on
/// the audio data path: dropping an event never affects playback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// Human-readable status from the buffering worker
    Log {
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Recoverable fault; the pipeline keeps running
    Error {
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A sample block was released toward playback
    BlockReleased {
        /// Release sequence number within the session
        sequence: u64,
        /// Samples in the block
        sample_count: usize,
        /// Block duration at the stream sample rate
        duration_ms: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The accumulation buffer exceeded its cap and was halved
    BufferOverflow {
        discarded_bytes: usize,
        retained_bytes: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Push connection established
    Connected {
        session_id: Uuid,
        url: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Push connection closed on request
    Disconnected {
        session_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Connection lost; a new attempt is scheduled
    Reconnecting {
        session_id: Uuid,
        attempt: u32,
        delay_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Reconnection abandoned until the next explicit connect
    ReconnectExhausted {
        session_id: Uuid,
        attempts: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Real-time renderer state change
    PlaybackStatus {
        playing: bool,
        reason: Option<StopReason>,
        buffer_level: Option<usize>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PipelineEvent {
    pub fn log(message: impl Into<String>) -> Self {
        PipelineEvent::Log {
            message: message.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        PipelineEvent::Error {
            message: message.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn playback_status(status: PlaybackStatus) -> Self {
        PipelineEvent::PlaybackStatus {
            playing: status.playing,
            reason: status.reason,
            buffer_level: status.buffer_level,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Get event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::Log { .. } => "Log",
            PipelineEvent::Error { .. } => "Error",
            PipelineEvent::BlockReleased { .. } => "BlockReleased",
            PipelineEvent::BufferOverflow { .. } => "BufferOverflow",
            PipelineEvent::Connected { .. } => "Connected",
            PipelineEvent::Disconnected { .. } => "Disconnected",
            PipelineEvent::Reconnecting { .. } => "Reconnecting",
            PipelineEvent::ReconnectExhausted { .. } => "ReconnectExhausted",
            PipelineEvent::PlaybackStatus { .. } => "PlaybackStatus",
        }
    }
}

/// Event distribution bus for pipeline observers
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use pcmstream_common::events::{EventBus, PipelineEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(PipelineEvent::log("buffering"));
/// assert!(matches!(rx.try_recv(), Ok(PipelineEvent::Log { .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PipelineEvent,
    ) -> Result<usize, broadcast::error::SendError<PipelineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
