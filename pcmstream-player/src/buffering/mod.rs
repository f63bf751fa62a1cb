//! Decode and buffering domain
//!
//! Turns packets into sample blocks under the adaptive release policy.

pub mod controller;
pub mod worker;

pub use controller::{BufferController, WorkerMessage};
pub use worker::{spawn_dispatcher, BufferingWorker, WorkerCommand};
