//! Scripted transport for driving the receiver without a network
//!
//! Each `open` consumes the next scripted connection. An exhausted script
//! fails every further open.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use pcmstream_player::audio::Payload;
use pcmstream_player::network::{PayloadStream, Transport};
use pcmstream_player::{Error, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Behaviour of one scripted connection
#[derive(Debug, Clone)]
pub enum Connection {
    /// Opening fails
    Refused,
    /// Delivers the payloads, then the server closes the stream
    Deliver(Vec<Payload>),
    /// Delivers the payloads and stays open until cancelled
    DeliverAndHold(Vec<Payload>),
}

#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Connection>>,
    opens: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Connection>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            opens: AtomicUsize::new(0),
        })
    }

    /// Transport whose every open fails
    pub fn refusing() -> Arc<Self> {
        Self::new([])
    }

    pub fn push(&self, connection: Connection) {
        self.script.lock().unwrap().push_back(connection);
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, url: &str) -> Result<PayloadStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();

        match next.unwrap_or(Connection::Refused) {
            Connection::Refused => Err(Error::Transport(format!("connection to {} refused", url))),
            Connection::Deliver(payloads) => Ok(stream::iter(payloads.into_iter().map(Ok)).boxed()),
            Connection::DeliverAndHold(payloads) => Ok(stream::iter(payloads.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed()),
        }
    }
}
