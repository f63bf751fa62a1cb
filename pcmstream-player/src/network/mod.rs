//! Network ingestion: push transports and the reconnecting stream receiver

pub mod receiver;
pub mod sse;
pub mod transport;

pub use receiver::{backoff_delay, ReceiverExit, StreamReceiver};
pub use sse::{SseEvent, SseParser};
pub use transport::{PayloadStream, SseTransport, Transport};
