//! Audio data types, PCM decoding, and device output

pub mod output;
pub mod pcm;
pub mod types;

pub use output::AudioOutput;
pub use pcm::{decode_payload, pcm16_to_f32, ByteAligner};
pub use types::{Packet, Payload, SampleBlock};
