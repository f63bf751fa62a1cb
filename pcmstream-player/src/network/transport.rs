//! Push transports
//!
//! A [`Transport`] opens one connection and yields packet payloads until the
//! connection fails or ends. Reconnection policy lives in the receiver, not
//! here.

use crate::audio::types::Payload;
use crate::error::{Error, Result};
use crate::network::sse::SseParser;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use pcmstream_common::config::ReceiverConfig;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tracing::{debug, trace};

/// Payloads from one open connection, in arrival order
pub type PayloadStream = BoxStream<'static, Result<Payload>>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a connection to `url`
    ///
    /// The returned stream ends (or yields an error) when the connection is
    /// lost.
    async fn open(&self, url: &str) -> Result<PayloadStream>;
}

/// Server-Sent Events over HTTP
///
/// Forwards the `data` of every event whose name matches the configured
/// audio event name as a text payload.
pub struct SseTransport {
    client: reqwest::Client,
    event_name: String,
}

impl SseTransport {
    pub fn new(config: &ReceiverConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            client,
            event_name: config.event_name.clone(),
        })
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn open(&self, url: &str) -> Result<PayloadStream> {
        debug!("Opening event stream: {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?
            .error_for_status()?;

        let mut body = response.bytes_stream();
        let event_name = self.event_name.clone();

        let stream = async_stream::stream! {
            let mut parser = SseParser::new();
            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(Error::Transport(format!("event stream read failed: {}", e)));
                        break;
                    }
                };
                for event in parser.feed(&chunk) {
                    if event.event == event_name {
                        yield Ok(Payload::Text(event.data));
                    } else {
                        trace!("Ignoring event '{}'", event.event);
                    }
                }
            }
        };

        Ok(stream.boxed())
    }
}
