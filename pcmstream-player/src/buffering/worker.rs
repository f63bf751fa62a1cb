//! Buffering worker and message dispatcher tasks
//!
//! The worker owns a [`BufferController`] and processes packets strictly in
//! arrival order on its own task. When the packet channel closes (the receiver
//! ended) it performs a final release, resets and exits.
//!
//! The dispatcher consumes worker messages: data blocks go into the playback
//! bridge, everything else becomes tracing output and pipeline events. A full
//! bridge holds the dispatcher back rather than losing the block.

use crate::audio::types::{Packet, SampleBlock};
use crate::buffering::controller::{BufferController, WorkerMessage};
use crate::playback::bridge::{BlockSender, BridgeError};
use chrono::Utc;
use pcmstream_common::events::{EventBus, PipelineEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, trace, warn};

/// Control commands for a running worker
#[derive(Debug)]
pub enum WorkerCommand {
    /// Release whatever is buffered after the packets already queued;
    /// acknowledged once the data message is sent
    Flush(oneshot::Sender<()>),
    /// Return to cold start
    ResetPlayback,
}

pub struct BufferingWorker {
    controller: BufferController,
    packets: mpsc::UnboundedReceiver<Packet>,
    commands: mpsc::UnboundedReceiver<WorkerCommand>,
    messages: mpsc::UnboundedSender<WorkerMessage>,
}

impl BufferingWorker {
    pub fn new(
        controller: BufferController,
        packets: mpsc::UnboundedReceiver<Packet>,
        commands: mpsc::UnboundedReceiver<WorkerCommand>,
        messages: mpsc::UnboundedSender<WorkerMessage>,
    ) -> Self {
        Self {
            controller,
            packets,
            commands,
            messages,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        debug!("Buffering worker started");
        let mut commands_open = true;

        loop {
            let deadline = self.controller.flush_deadline();

            tokio::select! {
                biased;

                packet = self.packets.recv() => match packet {
                    Some(packet) => {
                        let released = self.controller.on_packet(&packet, Instant::now());
                        self.forward(released);
                    }
                    None => break,
                },

                command = self.commands.recv(), if commands_open => match command {
                    Some(WorkerCommand::Flush(ack)) => {
                        let released = self.controller.flush();
                        self.forward(released);
                        let _ = ack.send(());
                    }
                    Some(WorkerCommand::ResetPlayback) => self.controller.reset_playback(),
                    None => commands_open = false,
                },

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    let released = self.controller.on_flush_timer(Instant::now());
                    self.forward(released);
                }
            }
        }

        let released = self.controller.finish();
        self.forward(released);
        debug!("Buffering worker stopped");
    }

    fn forward(&self, messages: Vec<WorkerMessage>) {
        for message in messages {
            if self.messages.send(message).is_err() {
                trace!("Dispatcher gone, discarding worker message");
            }
        }
    }
}

/// Poll interval while the playback queue is full
const FULL_QUEUE_RETRY: Duration = Duration::from_millis(5);

/// How long the renderer may take nothing before a block is given up
const FULL_QUEUE_STALL: Duration = Duration::from_secs(2);

/// Route worker messages until the worker exits
///
/// The sender stays locked for the life of the task. The lock is released
/// however the task ends, so the next session can take it over.
pub fn spawn_dispatcher(
    mut messages: mpsc::UnboundedReceiver<WorkerMessage>,
    blocks: Arc<Mutex<BlockSender>>,
    events: EventBus,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut blocks = blocks.lock_owned().await;
        while let Some(message) = messages.recv().await {
            dispatch(message, &mut *blocks, &events).await;
        }
        blocks.reclaim();
    })
}

async fn dispatch(message: WorkerMessage, blocks: &mut BlockSender, events: &EventBus) {
    match message {
        WorkerMessage::Log { message } => {
            info!("{}", message);
            events.emit_lossy(PipelineEvent::log(message));
        }
        WorkerMessage::Error { message } => {
            warn!("{}", message);
            events.emit_lossy(PipelineEvent::error(message));
        }
        WorkerMessage::Overflow {
            discarded_bytes,
            retained_bytes,
        } => {
            events.emit_lossy(PipelineEvent::BufferOverflow {
                discarded_bytes,
                retained_bytes,
                timestamp: Utc::now(),
            });
        }
        WorkerMessage::Data {
            block,
            sample_count,
            duration_ms,
        } => {
            let sequence = block.sequence;
            match deliver(block, blocks).await {
                Ok(()) => events.emit_lossy(PipelineEvent::BlockReleased {
                    sequence,
                    sample_count,
                    duration_ms,
                    timestamp: Utc::now(),
                }),
                Err(e) => {
                    warn!("{}", e);
                    events.emit_lossy(PipelineEvent::error(format!(
                        "Playback stalled, dropped block #{} ({} samples)",
                        sequence, sample_count
                    )));
                }
            }
        }
    }
}

/// Push a block, waiting for room while the renderer keeps consuming
///
/// Blocks stay in order: the next message is not taken until this one is
/// delivered. Gives up only when the queue has not drained at all for
/// [`FULL_QUEUE_STALL`].
async fn deliver(mut block: SampleBlock, blocks: &mut BlockSender) -> Result<(), BridgeError> {
    let mut last_pending = usize::MAX;
    let mut stalled_since = Instant::now();

    loop {
        match blocks.send(block) {
            Ok(()) => return Ok(()),
            Err(BridgeError::Full(returned)) => block = returned,
        }

        let pending = blocks.pending();
        if pending < last_pending {
            if last_pending == usize::MAX {
                trace!("Playback queue full, holding block #{}", block.sequence);
            }
            last_pending = pending;
            stalled_since = Instant::now();
        } else if stalled_since.elapsed() >= FULL_QUEUE_STALL {
            return Err(BridgeError::Full(block));
        }

        sleep(FULL_QUEUE_RETRY).await;
    }
}
