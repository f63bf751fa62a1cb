//! # PCM Stream Common Library
//!
//! Shared code for the PCM stream player crates including:
//! - Pipeline configuration (TOML bootstrap with built-in defaults)
//! - Event types (PipelineEvent enum) and the EventBus
//! - Error type
//! - Frequency-band analysis and the musical note table

pub mod config;
pub mod error;
pub mod events;
pub mod notes;
pub mod spectrum;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use events::{EventBus, PipelineEvent};
