//! Stream receiver with reconnect and backoff
//!
//! Owns one logical session: opens the transport, forwards payloads in arrival
//! order and reconnects after failures with a linearly growing delay. After
//! `max_attempts` consecutive failures it gives up until the next explicit
//! connect. Any delivered packet resets the failure count.

use crate::audio::types::Packet;
use crate::network::transport::Transport;
use chrono::Utc;
use futures::StreamExt;
use pcmstream_common::config::ReceiverConfig;
use pcmstream_common::events::{EventBus, PipelineEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Why a receiver task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverExit {
    /// Disconnect requested
    Cancelled,
    /// Reconnect attempts used up
    Exhausted { attempts: u32 },
    /// Nobody is consuming packets anymore
    DownstreamClosed,
}

/// Delay before reconnect attempt `attempt` (1-based)
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt.max(1))
}

pub struct StreamReceiver {
    transport: Arc<dyn Transport>,
    config: ReceiverConfig,
    events: EventBus,
}

impl StreamReceiver {
    pub fn new(transport: Arc<dyn Transport>, config: ReceiverConfig, events: EventBus) -> Self {
        Self {
            transport,
            config,
            events,
        }
    }

    /// Run a session on its own task
    pub fn spawn(
        self,
        session_id: Uuid,
        url: String,
        packets: mpsc::UnboundedSender<Packet>,
        cancel: CancellationToken,
    ) -> JoinHandle<ReceiverExit> {
        tokio::spawn(async move { self.run(session_id, &url, packets, cancel).await })
    }

    pub async fn run(
        &self,
        session_id: Uuid,
        url: &str,
        packets: mpsc::UnboundedSender<Packet>,
        cancel: CancellationToken,
    ) -> ReceiverExit {
        let mut attempt: u32 = 0;
        let mut sequence: u64 = 0;

        let exit = 'session: loop {
            let opened = tokio::select! {
                _ = cancel.cancelled() => break 'session ReceiverExit::Cancelled,
                opened = self.transport.open(url) => opened,
            };

            match opened {
                Ok(mut stream) => {
                    info!("Connected to {}", url);
                    self.events.emit_lossy(PipelineEvent::Connected {
                        session_id,
                        url: url.to_string(),
                        timestamp: Utc::now(),
                    });

                    loop {
                        let item = tokio::select! {
                            _ = cancel.cancelled() => break 'session ReceiverExit::Cancelled,
                            item = stream.next() => item,
                        };
                        match item {
                            Some(Ok(payload)) => {
                                attempt = 0;
                                if packets.send(Packet::new(sequence, payload)).is_err() {
                                    break 'session ReceiverExit::DownstreamClosed;
                                }
                                sequence += 1;
                            }
                            Some(Err(e)) => {
                                warn!("Connection lost: {}", e);
                                break;
                            }
                            None => {
                                warn!("Event stream ended by server");
                                break;
                            }
                        }
                    }
                }
                Err(e) => warn!("Connection to {} failed: {}", url, e),
            }

            attempt += 1;
            if attempt >= self.config.max_attempts {
                error!(
                    "Giving up on {} after {} consecutive failures",
                    url, attempt
                );
                self.events.emit_lossy(PipelineEvent::ReconnectExhausted {
                    session_id,
                    attempts: attempt,
                    timestamp: Utc::now(),
                });
                break ReceiverExit::Exhausted { attempts: attempt };
            }

            let delay = backoff_delay(self.config.base_delay(), attempt);
            info!(
                "Reconnecting in {}ms (attempt {}/{})",
                delay.as_millis(),
                attempt,
                self.config.max_attempts
            );
            self.events.emit_lossy(PipelineEvent::Reconnecting {
                session_id,
                attempt,
                delay_ms: delay.as_millis() as u64,
                timestamp: Utc::now(),
            });

            tokio::select! {
                _ = cancel.cancelled() => break ReceiverExit::Cancelled,
                _ = tokio::time::sleep(delay) => {}
            }
        };

        if exit == ReceiverExit::Cancelled {
            info!("Disconnected from {}", url);
            self.events.emit_lossy(PipelineEvent::Disconnected {
                session_id,
                timestamp: Utc::now(),
            });
        }
        exit
    }
}
