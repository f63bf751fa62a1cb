//! Real-time playback: block handoff, sample ring and renderer

pub mod bridge;
pub mod monitor;
pub mod renderer;
pub mod ring_buffer;

pub use bridge::{bridge, BlockReceiver, BlockSender, BridgeError, ResetHandle};
pub use monitor::PlaybackMonitor;
pub use renderer::{PlaybackPhase, PlaybackRenderer, StatusReceiver};
pub use ring_buffer::{PlaybackLevel, PlaybackRing};
