//! # PCM Stream Player Library
//!
//! Plays a push-delivered PCM16 audio stream with an adaptive jitter buffer.
//!
//! **Architecture:** three domains joined by channels and lock-free queues
//! - network: [`network::StreamReceiver`] over a [`network::Transport`] (SSE by default)
//! - buffering: [`buffering::BufferController`] run by a worker task
//! - real-time: [`playback::PlaybackRenderer`] driven by the cpal output callback
//!
//! [`pipeline::Pipeline`] wires the domains together and exposes the
//! control commands.

pub mod audio;
pub mod buffering;
pub mod error;
pub mod network;
pub mod pipeline;
pub mod playback;

pub use error::{Error, Result};
pub use pipeline::Pipeline;
