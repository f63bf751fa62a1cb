//! Core audio data types
//!
//! Defines the packet and sample block structures that move through the
//! pipeline, from network payload to real-time playback.

/// Packet payload as delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Text envelope carrying base64-encoded PCM bytes (SSE `data:` field)
    Text(String),
    /// Raw PCM bytes
    Binary(Vec<u8>),
}

/// One packet in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Arrival order within the session, starting at 0
    pub sequence: u64,
    pub payload: Payload,
}

impl Packet {
    pub fn new(sequence: u64, payload: Payload) -> Self {
        Self { sequence, payload }
    }
}

/// Block of decoded mono samples released by the buffer controller
///
/// **Format:**
/// - Samples are f32 (floating point -1.0 to 1.0)
/// - Single channel
///
/// Blocks are moved, never cloned, on their way to the renderer.
#[derive(Debug, PartialEq)]
pub struct SampleBlock {
    /// Release order within the session
    pub sequence: u64,

    /// Stream sample rate in Hz
    pub sample_rate: u32,

    /// Decoded samples
    pub samples: Vec<f32>,
}

impl SampleBlock {
    pub fn new(sequence: u64, sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sequence,
            sample_rate,
            samples,
        }
    }

    /// Number of samples in the block
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Get duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_duration() {
        let block = SampleBlock::new(0, 16_000, vec![0.0; 8_000]);
        assert_eq!(block.sample_count(), 8_000);
        assert_eq!(block.duration_ms(), 500.0);
    }

    #[test]
    fn test_zero_rate_duration() {
        let block = SampleBlock::new(0, 0, vec![0.0; 10]);
        assert_eq!(block.duration_ms(), 0.0);
    }
}
