//! Error types for pcmstream-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the player pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(#[from] pcmstream_common::Error),

    /// Push connection could not be opened or was lost
    #[error("Transport error: {0}")]
    Transport(String),

    /// Packet payload is not a well-formed byte encoding
    #[error("Malformed packet #{sequence}: {reason}")]
    MalformedPacket { sequence: u64, reason: String },

    /// Unexpected fault inside the buffering domain
    #[error("Buffering fault: {0}")]
    Buffering(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// A pipeline task is no longer running
    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),

    /// A pipeline task panicked or was aborted
    #[error("Task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

/// Convenience Result type using the player Error
pub type Result<T> = std::result::Result<T, Error>;
