//! PCM16 payload decoding and byte alignment
//!
//! The wire format is signed 16-bit little-endian mono PCM. Packet boundaries
//! do not respect sample boundaries, so an odd trailing byte is carried into
//! the next conversion instead of being dropped.

use crate::audio::types::{Packet, Payload};
use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Scale factor mapping i16 onto [-1.0, 1.0)
pub const PCM16_SCALE: f32 = 32768.0;

/// Decode a packet payload into raw PCM bytes
///
/// Text payloads are standard base64; ASCII whitespace anywhere in the text
/// is ignored. Binary payloads pass through unchanged.
pub fn decode_payload(packet: &Packet) -> Result<Vec<u8>> {
    match &packet.payload {
        Payload::Binary(bytes) => Ok(bytes.clone()),
        Payload::Text(text) => {
            let decoded = if text.bytes().any(|b| b.is_ascii_whitespace()) {
                let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                STANDARD.decode(compact)
            } else {
                STANDARD.decode(text)
            };
            decoded.map_err(|e| Error::MalformedPacket {
                sequence: packet.sequence,
                reason: e.to_string(),
            })
        }
    }
}

/// Keeps at most one unpaired byte between conversions
#[derive(Debug, Default)]
pub struct ByteAligner {
    carry: Option<u8>,
}

impl ByteAligner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend any carried byte, then move a trailing odd byte into the carry
    ///
    /// The returned buffer always has even length.
    pub fn align(&mut self, mut bytes: Vec<u8>) -> Vec<u8> {
        if let Some(carried) = self.carry.take() {
            bytes.insert(0, carried);
        }
        if bytes.len() % 2 != 0 {
            self.carry = bytes.pop();
        }
        bytes
    }

    /// Byte waiting for its pair, if any
    pub fn pending(&self) -> Option<u8> {
        self.carry
    }

    pub fn has_pending(&self) -> bool {
        self.carry.is_some()
    }

    /// Drop the carried byte
    pub fn clear(&mut self) {
        self.carry = None;
    }
}

/// Convert even-length PCM16 LE bytes into normalized samples
///
/// A trailing odd byte, if present, is ignored; callers align first.
pub fn pcm16_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / PCM16_SCALE)
        .collect()
}
