//! PCM16 test data

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use pcmstream_player::audio::Payload;

/// Deterministic pseudo-random bytes (LCG), so failures reproduce
pub fn pcm_bytes(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect()
}

/// Split `bytes` into payload chunks of the given lengths (cycled)
pub fn chunk_by(bytes: &[u8], lengths: &[usize]) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    let mut offset = 0;
    for &len in lengths.iter().cycle() {
        if offset >= bytes.len() {
            break;
        }
        let end = (offset + len.max(1)).min(bytes.len());
        chunks.push(bytes[offset..end].to_vec());
        offset = end;
    }
    chunks
}

/// Base64 text payload as delivered in an SSE `data:` field
pub fn text_payload(bytes: &[u8]) -> Payload {
    Payload::Text(STANDARD.encode(bytes))
}

/// Reference conversion of a complete byte stream
pub fn expected_samples(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect()
}
