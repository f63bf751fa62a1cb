//! Audio output using cpal
//!
//! Opens an output device and drives the playback renderer from the device's
//! real-time data callback.
//!
//! The renderer produces mono samples. For devices with more than one channel
//! the mono signal is duplicated across channels through a scratch buffer
//! allocated once, before the stream starts.

use crate::error::{Error, Result};
use crate::playback::PlaybackRenderer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Scratch buffer size in mono frames for channel fan-out
const SCRATCH_FRAMES: usize = 4096;

/// Audio output manager using cpal.
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    /// Stream error flag - set by the error callback
    error_flag: Arc<AtomicBool>,
    /// Count of stream errors reported by the device
    error_count: Arc<AtomicU32>,
}

impl AudioOutput {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open audio device for output.
    ///
    /// # Arguments
    /// - `device_name`: Optional device name (None = default device)
    /// - `sample_rate`: Stream sample rate the renderer produces
    ///
    /// If the requested device is not found the default device is used.
    pub fn new(device_name: Option<&str>, sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => {
                let mut devices = host
                    .output_devices()
                    .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

                match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                    Some(dev) => {
                        info!("Found requested audio device: {}", name);
                        dev
                    }
                    None => {
                        warn!("Requested device '{}' not found, falling back to default device", name);
                        host.default_output_device().ok_or_else(|| {
                            Error::AudioOutput(format!(
                                "Device '{}' not found and no default device available",
                                name
                            ))
                        })?
                    }
                }
            }
            None => host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?,
        };

        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using audio device: {}", name);

        let (config, sample_format) = Self::get_best_config(&device, sample_rate)?;

        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}",
            config.sample_rate.0, config.channels, sample_format
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
            error_flag: Arc::new(AtomicBool::new(false)),
            error_count: Arc::new(AtomicU32::new(0)),
        })
    }

    /// Pick a configuration running at `sample_rate`, preferring f32 and fewest channels.
    fn get_best_config(device: &Device, sample_rate: u32) -> Result<(StreamConfig, SampleFormat)> {
        let supported: Vec<_> = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?
            .filter(|c| {
                c.min_sample_rate().0 <= sample_rate
                    && c.max_sample_rate().0 >= sample_rate
                    && matches!(c.sample_format(), SampleFormat::F32 | SampleFormat::I16)
            })
            .collect();

        let best = supported
            .iter()
            .filter(|c| c.sample_format() == SampleFormat::F32)
            .min_by_key(|c| c.channels())
            .or_else(|| supported.iter().min_by_key(|c| c.channels()))
            .ok_or_else(|| {
                Error::AudioOutput(format!(
                    "Device supports no f32/i16 output configuration at {} Hz",
                    sample_rate
                ))
            })?;

        let sample_format = best.sample_format();
        let config = best.clone().with_sample_rate(cpal::SampleRate(sample_rate)).config();
        Ok((config, sample_format))
    }

    /// Start the stream, moving the renderer onto the audio thread.
    pub fn start(&mut self, renderer: PlaybackRenderer) -> Result<()> {
        info!("Starting audio stream");

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream_f32(renderer)?,
            SampleFormat::I16 => self.build_stream_i16(renderer)?,
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);
        info!("Audio stream started successfully");
        Ok(())
    }

    fn error_callback(&self) -> impl FnMut(cpal::StreamError) + Send + 'static {
        let error_flag = Arc::clone(&self.error_flag);
        let error_count = Arc::clone(&self.error_count);
        move |err| {
            error!("Audio stream error: {}", err);
            error_flag.store(true, Ordering::SeqCst);
            error_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn build_stream_f32(&self, mut renderer: PlaybackRenderer) -> Result<Stream> {
        let channels = self.config.channels as usize;
        let mut scratch = vec![0.0f32; SCRATCH_FRAMES];

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if channels == 1 {
                        renderer.render(data);
                        return;
                    }
                    for chunk in data.chunks_mut(SCRATCH_FRAMES * channels) {
                        let frames = chunk.len() / channels;
                        let mono = &mut scratch[..frames];
                        renderer.render(mono);
                        for (frame, &sample) in chunk.chunks_mut(channels).zip(mono.iter()) {
                            frame.fill(sample);
                        }
                    }
                },
                self.error_callback(),
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    fn build_stream_i16(&self, mut renderer: PlaybackRenderer) -> Result<Stream> {
        let channels = self.config.channels as usize;
        let mut scratch = vec![0.0f32; SCRATCH_FRAMES];

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    for chunk in data.chunks_mut(SCRATCH_FRAMES * channels) {
                        let frames = chunk.len() / channels;
                        let mono = &mut scratch[..frames];
                        renderer.render(mono);
                        for (frame, &sample) in chunk.chunks_mut(channels).zip(mono.iter()) {
                            frame.fill((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16);
                        }
                    }
                },
                self.error_callback(),
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    /// Stop audio playback and drop the stream (and the renderer with it).
    pub fn stop(&mut self) -> Result<()> {
        info!("Stopping audio stream");

        if let Some(stream) = self.stream.take() {
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
        }
        Ok(())
    }

    /// Output channel count of the opened configuration
    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Whether the device reported a stream error
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    /// Number of stream errors reported so far
    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::SeqCst)
    }
}
