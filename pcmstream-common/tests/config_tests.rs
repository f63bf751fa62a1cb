//! Integration tests for configuration file loading
//!
//! Covers:
//! - Loading a complete TOML file from disk
//! - Missing keys falling back to built-in defaults
//! - Validation errors surfacing from `load`
//! - Missing files reported as I/O errors

use pcmstream_common::config::PipelineConfig;
use pcmstream_common::Error;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config_file() {
    let file = write_config(
        r#"
        event_bus_capacity = 32

        [receiver]
        event_name = "pcm"
        base_delay_ms = 250
        max_attempts = 8

        [buffering]
        sample_rate = 8000
        startup_threshold_bytes = 16000
        continuous_threshold_bytes = 1600
        max_buffer_bytes = 64000
        startup_flush_ms = 300
        continuous_flush_ms = 15

        [playback]
        ring_capacity = 1000
        startup_threshold = 400
        resume_threshold = 600
        steady_threshold = 64

        [logging]
        level = "debug"
        "#,
    );

    let config = PipelineConfig::load(file.path()).unwrap();

    assert_eq!(config.event_bus_capacity, 32);
    assert_eq!(config.receiver.event_name, "pcm");
    assert_eq!(config.receiver.max_attempts, 8);
    assert_eq!(config.buffering.sample_rate, 8000);
    assert_eq!(config.buffering.continuous_flush_ms, 15);
    assert_eq!(config.playback.resume_threshold, 600);
    assert_eq!(config.playback.steady_threshold, 64);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_empty_file_uses_defaults() {
    let file = write_config("");
    let config = PipelineConfig::load(file.path()).unwrap();
    let defaults = PipelineConfig::default();

    assert_eq!(config.receiver.base_delay_ms, defaults.receiver.base_delay_ms);
    assert_eq!(config.playback.ring_capacity, defaults.playback.ring_capacity);
    assert_eq!(
        config.buffering.startup_threshold_bytes,
        defaults.buffering.startup_threshold_bytes
    );
}

#[test]
fn test_invalid_thresholds_rejected_on_load() {
    let file = write_config(
        r#"
        [playback]
        startup_threshold = 800
        resume_threshold = 400
        "#,
    );

    match PipelineConfig::load(file.path()) {
        Err(Error::Config(msg)) => assert!(msg.contains("resume_threshold")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    assert!(matches!(PipelineConfig::load(&missing), Err(Error::Io(_))));
}
