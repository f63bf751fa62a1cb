//! Playback status monitor
//!
//! Drains the renderer's status queue off the real-time thread, logs each
//! transition and republishes it on the EventBus.

use crate::playback::renderer::StatusReceiver;
use pcmstream_common::events::{EventBus, PipelineEvent, PlaybackStatus};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default polling period for the status queue
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct PlaybackMonitor {
    status: StatusReceiver,
    events: EventBus,
    reported_drops: u64,
}

impl PlaybackMonitor {
    pub fn new(status: StatusReceiver, events: EventBus) -> Self {
        Self {
            status,
            events,
            reported_drops: 0,
        }
    }

    /// Forward every queued status; returns how many were handled
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Some(status) = self.status.try_recv() {
            log_status(&status);
            self.events.emit_lossy(PipelineEvent::playback_status(status));
            handled += 1;
        }

        let dropped = self.status.dropped();
        if dropped > self.reported_drops {
            warn!(
                "Playback status queue full: {} status updates dropped",
                dropped - self.reported_drops
            );
            self.reported_drops = dropped;
        }
        handled
    }

    /// Poll until cancelled, then drain once more
    pub fn spawn(mut self, poll_interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.drain();
                    }
                }
            }
            self.drain();
            debug!("Playback monitor stopped");
        })
    }
}

fn log_status(status: &PlaybackStatus) {
    match (status.playing, status.reason) {
        (true, _) => info!(
            "Playback started (buffered samples: {})",
            status.buffer_level.unwrap_or(0)
        ),
        (false, Some(reason)) => warn!(
            "Playback stopped: {} (buffered samples: {})",
            reason,
            status.buffer_level.unwrap_or(0)
        ),
        (false, None) => info!("Playback stopped"),
    }
}
