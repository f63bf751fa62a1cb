//! Pipeline configuration
//!
//! All tunables of the stream pipeline live in one TOML document. Every key is
//! optional: missing keys fall back to built-in defaults defined in code.
//!
//! ```toml
//! event_bus_capacity = 256
//!
//! [receiver]
//! event_name = "audio"
//! base_delay_ms = 1000
//! max_attempts = 5
//!
//! [buffering]
//! sample_rate = 16000
//! startup_threshold_bytes = 48000
//! continuous_threshold_bytes = 4800
//!
//! [playback]
//! ring_capacity = 160000
//! startup_threshold = 2400
//! resume_threshold = 8000
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Byte thresholds in `[buffering]` count raw PCM16 bytes (two per sample);
//! sample thresholds in `[playback]` count decoded `f32` samples.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Complete configuration for one pipeline session
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Stream receiver and reconnection policy
    pub receiver: ReceiverConfig,

    /// Adaptive buffer controller thresholds and idle-flush timers
    pub buffering: BufferingConfig,

    /// Real-time ring buffer and state machine thresholds
    pub playback: PlaybackConfig,

    /// Logging configuration (binary only)
    pub logging: LoggingConfig,

    /// Capacity of the broadcast channel carrying pipeline events
    pub event_bus_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            receiver: ReceiverConfig::default(),
            buffering: BufferingConfig::default(),
            playback: PlaybackConfig::default(),
            logging: LoggingConfig::default(),
            event_bus_capacity: 256,
        }
    }
}

/// Stream receiver configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// SSE event name carrying audio payloads
    pub event_name: String,

    /// Base reconnect delay; attempt `n` waits `n × base_delay_ms`
    pub base_delay_ms: u64,

    /// Consecutive failed attempts before reconnection is abandoned
    pub max_attempts: u32,

    /// Timeout for establishing the HTTP connection
    pub connect_timeout_ms: u64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            event_name: "audio".to_string(),
            base_delay_ms: 1000,
            max_attempts: 5,
            connect_timeout_ms: 10_000,
        }
    }
}

impl ReceiverConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Adaptive buffer controller configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BufferingConfig {
    /// Stream sample rate in Hz (mono PCM16)
    pub sample_rate: u32,

    /// Bytes accumulated before the first release (cold start)
    pub startup_threshold_bytes: usize,

    /// Bytes accumulated before each release once releasing has started
    pub continuous_threshold_bytes: usize,

    /// Hard cap on the accumulation buffer; overflow keeps the newest half
    pub max_buffer_bytes: usize,

    /// Idle flush during cold start
    pub startup_flush_ms: u64,

    /// Idle flush once releasing has started
    pub continuous_flush_ms: u64,
}

impl Default for BufferingConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            // 1.5 s of PCM16 at 16 kHz
            startup_threshold_bytes: 48_000,
            // 150 ms
            continuous_threshold_bytes: 4_800,
            // 10 s
            max_buffer_bytes: 320_000,
            startup_flush_ms: 500,
            continuous_flush_ms: 20,
        }
    }
}

impl BufferingConfig {
    pub fn startup_flush(&self) -> Duration {
        Duration::from_millis(self.startup_flush_ms)
    }

    pub fn continuous_flush(&self) -> Duration {
        Duration::from_millis(self.continuous_flush_ms)
    }
}

/// Real-time playback configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Ring buffer capacity in samples
    pub ring_capacity: usize,

    /// Samples required before the very first start
    pub startup_threshold: usize,

    /// Samples required to resume after an underflow (must exceed startup)
    pub resume_threshold: usize,

    /// Minimum samples kept while playing
    pub steady_threshold: usize,

    /// Capacity of the block handoff queue (blocks, not samples)
    pub block_queue_capacity: usize,

    /// Capacity of the real-time status queue
    pub status_queue_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            // 10 s at 16 kHz
            ring_capacity: 160_000,
            startup_threshold: 2_400,
            resume_threshold: 8_000,
            steady_threshold: 128,
            block_queue_capacity: 64,
            status_queue_capacity: 64,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading pipeline configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        let r = &self.receiver;
        if r.max_attempts == 0 {
            return Err(Error::Config("receiver.max_attempts must be at least 1".into()));
        }
        if r.base_delay_ms == 0 {
            return Err(Error::Config("receiver.base_delay_ms must be positive".into()));
        }
        if r.event_name.trim().is_empty() {
            return Err(Error::Config("receiver.event_name must not be empty".into()));
        }

        let b = &self.buffering;
        if b.sample_rate == 0 {
            return Err(Error::Config("buffering.sample_rate must be positive".into()));
        }
        if b.continuous_threshold_bytes == 0 {
            return Err(Error::Config(
                "buffering.continuous_threshold_bytes must be positive".into(),
            ));
        }
        if b.continuous_threshold_bytes >= b.startup_threshold_bytes {
            return Err(Error::Config(format!(
                "buffering.continuous_threshold_bytes ({}) must be below startup_threshold_bytes ({})",
                b.continuous_threshold_bytes, b.startup_threshold_bytes
            )));
        }
        if b.max_buffer_bytes < b.startup_threshold_bytes {
            return Err(Error::Config(format!(
                "buffering.max_buffer_bytes ({}) must be at least startup_threshold_bytes ({})",
                b.max_buffer_bytes, b.startup_threshold_bytes
            )));
        }

        let p = &self.playback;
        if p.ring_capacity == 0 {
            return Err(Error::Config("playback.ring_capacity must be positive".into()));
        }
        if p.resume_threshold <= p.startup_threshold {
            return Err(Error::Config(format!(
                "playback.resume_threshold ({}) must exceed startup_threshold ({})",
                p.resume_threshold, p.startup_threshold
            )));
        }
        if p.steady_threshold >= p.startup_threshold {
            return Err(Error::Config(format!(
                "playback.steady_threshold ({}) must be below startup_threshold ({})",
                p.steady_threshold, p.startup_threshold
            )));
        }
        if p.resume_threshold > p.ring_capacity {
            return Err(Error::Config(format!(
                "playback.resume_threshold ({}) exceeds ring_capacity ({})",
                p.resume_threshold, p.ring_capacity
            )));
        }
        if p.block_queue_capacity == 0 || p.status_queue_capacity == 0 {
            return Err(Error::Config("playback queue capacities must be positive".into()));
        }

        if self.event_bus_capacity == 0 {
            return Err(Error::Config("event_bus_capacity must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert!(config.playback.resume_threshold > config.playback.startup_threshold);
        // Continuous threshold sits about an order of magnitude below startup
        assert_eq!(
            config.buffering.startup_threshold_bytes / config.buffering.continuous_threshold_bytes,
            10
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [playback]
            startup_threshold = 400
            resume_threshold = 600
            ring_capacity = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.playback.startup_threshold, 400);
        assert_eq!(config.playback.ring_capacity, 1000);
        assert_eq!(config.receiver.event_name, "audio");
        assert_eq!(config.buffering.sample_rate, 16_000);
    }

    #[test]
    fn test_resume_must_exceed_startup() {
        let err = PipelineConfig::from_toml_str(
            r#"
            [playback]
            startup_threshold = 500
            resume_threshold = 500
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_steady_must_be_below_startup() {
        let err = PipelineConfig::from_toml_str(
            r#"
            [playback]
            ring_capacity = 10000
            startup_threshold = 400
            resume_threshold = 600
            steady_threshold = 5000
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let mut config = PipelineConfig::default();
        config.playback.steady_threshold = config.playback.startup_threshold;
        assert!(config.validate().is_err());
        config.playback.steady_threshold = config.playback.startup_threshold - 1;
        config.validate().unwrap();
    }

    #[test]
    fn test_continuous_must_be_below_startup() {
        let mut config = PipelineConfig::default();
        config.buffering.continuous_threshold_bytes = config.buffering.startup_threshold_bytes;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = PipelineConfig::default();
        config.receiver.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let err = PipelineConfig::from_toml_str("[playback\nring_capacity = ").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_durations() {
        let config = PipelineConfig::default();
        assert_eq!(config.receiver.base_delay(), Duration::from_secs(1));
        assert_eq!(config.buffering.continuous_flush(), Duration::from_millis(20));
    }
}
