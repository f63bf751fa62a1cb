//! Pipeline controller
//!
//! A [`Pipeline`] owns everything for one player instance: the event bus, the
//! producer side of the playback bridge and, while connected, one session of
//! receiver, buffering worker and dispatcher tasks. The real-time side is the
//! [`PlaybackRenderer`] returned from [`Pipeline::new`], which the caller moves
//! onto the audio thread.
//!
//! ```text
//! Transport -> StreamReceiver -> BufferingWorker -> dispatcher -> bridge -> PlaybackRenderer
//!                (network)         (buffering)                            (real-time)
//! ```

use crate::buffering::{spawn_dispatcher, BufferController, BufferingWorker, WorkerCommand};
use crate::error::{Error, Result};
use crate::network::{ReceiverExit, StreamReceiver, Transport};
use crate::playback::bridge::{bridge, BlockSender, ResetHandle};
use crate::playback::monitor::{PlaybackMonitor, DEFAULT_POLL_INTERVAL};
use crate::playback::renderer::PlaybackRenderer;
use crate::playback::ring_buffer::PlaybackLevel;
use pcmstream_common::config::PipelineConfig;
use pcmstream_common::events::{EventBus, PipelineEvent};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Tasks of one connected session
struct Session {
    id: Uuid,
    cancel: CancellationToken,
    commands: mpsc::UnboundedSender<WorkerCommand>,
    receiver: JoinHandle<ReceiverExit>,
    worker: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

pub struct Pipeline {
    config: PipelineConfig,
    transport: Arc<dyn Transport>,
    events: EventBus,
    /// Locked by the session dispatcher while connected
    blocks: Arc<Mutex<BlockSender>>,
    reset: ResetHandle,
    level: PlaybackLevel,
    session: Option<Session>,
    monitor_cancel: CancellationToken,
}

impl Pipeline {
    /// Build a pipeline and its renderer
    ///
    /// Must be called within a Tokio runtime; the playback monitor task is
    /// started here.
    pub fn new(
        config: PipelineConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<(Self, PlaybackRenderer)> {
        config.validate()?;

        let events = EventBus::new(config.event_bus_capacity);
        let (blocks, block_rx) = bridge(config.playback.block_queue_capacity);
        let (renderer, status) = PlaybackRenderer::new(&config.playback, block_rx);

        let monitor_cancel = CancellationToken::new();
        PlaybackMonitor::new(status, events.clone())
            .spawn(DEFAULT_POLL_INTERVAL, monitor_cancel.clone());

        let pipeline = Self {
            reset: blocks.reset_handle(),
            level: renderer.level(),
            config,
            transport,
            events,
            blocks: Arc::new(Mutex::new(blocks)),
            session: None,
            monitor_cancel,
        };

        Ok((pipeline, renderer))
    }

    /// Start a session streaming from `url`
    ///
    /// Any previous session (including one whose reconnects were exhausted)
    /// is disconnected first.
    pub async fn connect(&mut self, url: &str) -> Result<Uuid> {
        self.disconnect().await?;

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let (packets_tx, packets_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (messages_tx, messages_rx) = mpsc::unbounded_channel();

        info!("Connecting session {} to {}", id, url);

        let dispatcher = spawn_dispatcher(messages_rx, Arc::clone(&self.blocks), self.events.clone());
        let worker = BufferingWorker::new(
            BufferController::new(self.config.buffering.clone()),
            packets_rx,
            commands_rx,
            messages_tx,
        )
        .spawn();
        let receiver = StreamReceiver::new(
            Arc::clone(&self.transport),
            self.config.receiver.clone(),
            self.events.clone(),
        )
        .spawn(id, url.to_string(), packets_tx, cancel.clone());

        self.session = Some(Session {
            id,
            cancel,
            commands: commands_tx,
            receiver,
            worker,
            dispatcher,
        });
        Ok(id)
    }

    /// Stop the current session
    ///
    /// Closes the connection, releases any buffered bytes as a final block
    /// and waits until that block is in the playback queue. Buffering state
    /// starts fresh on the next connect. Does nothing when not connected.
    ///
    /// Every session task is awaited before a failure is reported, so a task
    /// that panicked leaves the pipeline ready for the next connect.
    pub async fn disconnect(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        debug!("Disconnecting session {}", session.id);
        session.cancel.cancel();
        drop(session.commands);

        let exit = session.receiver.await;
        let worker = session.worker.await;
        let dispatcher = session.dispatcher.await;

        if let Err(e) = worker.as_ref().and(dispatcher.as_ref()) {
            warn!("Session {} task failed: {}", session.id, e);
        }
        debug!("Session {} ended: {:?}", session.id, exit?);
        worker?;
        dispatcher?;
        Ok(())
    }

    /// Return playback to a cold start without touching the connection
    ///
    /// The renderer drops what it has buffered and the buffering side waits
    /// for the startup threshold again.
    pub fn reset_playback(&self) {
        info!("Resetting playback");
        if let Some(session) = &self.session {
            let _ = session.commands.send(WorkerCommand::ResetPlayback);
        }
        self.reset.request();
    }

    /// Release buffered bytes now and wait until they are queued for playback
    pub async fn flush(&self) -> Result<()> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| Error::InvalidState("not connected".to_string()))?;

        let (ack_tx, ack_rx) = oneshot::channel();
        session
            .commands
            .send(WorkerCommand::Flush(ack_tx))
            .map_err(|_| Error::ChannelClosed("buffering worker"))?;
        ack_rx
            .await
            .map_err(|_| Error::ChannelClosed("buffering worker"))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Samples currently buffered in the renderer's ring
    pub fn playback_level(&self) -> usize {
        self.level.get()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Whether a session is running and still receiving or retrying
    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| !s.receiver.is_finished())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            session.cancel.cancel();
        }
        self.monitor_cancel.cancel();
    }
}
