//! Fixed-capacity sample ring owned by the real-time renderer
//!
//! Storage is allocated once at construction. Writes never fail: when a write
//! would exceed capacity the oldest unread samples are overwritten. The live
//! sample count is mirrored into an atomic so other threads can observe the
//! buffer level without touching the ring.

use ringbuf::{traits::*, HeapRb};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Read-only view of the ring's live sample count
#[derive(Debug, Clone)]
pub struct PlaybackLevel(Arc<AtomicUsize>);

impl PlaybackLevel {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}

/// Circular f32 buffer backed by a local (unsplit) `HeapRb`
///
/// Invariants: `len() <= capacity()` and
/// `(write_index - read_index) mod 2*capacity == len()`.
pub struct PlaybackRing {
    buffer: HeapRb<f32>,
    overwritten: u64,
    level: Arc<AtomicUsize>,
}

impl PlaybackRing {
    /// `capacity` must be non-zero (enforced by config validation)
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: HeapRb::new(capacity.max(1)),
            overwritten: 0,
            level: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity().get()
    }

    pub fn len(&self) -> usize {
        self.buffer.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Total samples lost to overwrites since construction
    pub fn overwritten(&self) -> u64 {
        self.overwritten
    }

    pub fn level(&self) -> PlaybackLevel {
        PlaybackLevel(Arc::clone(&self.level))
    }

    /// Append samples; returns how many unread samples were overwritten
    pub fn write(&mut self, samples: &[f32]) -> usize {
        let lost = (self.len() + samples.len()).saturating_sub(self.capacity());
        self.buffer.push_slice_overwrite(samples);

        self.overwritten += lost as u64;
        self.publish();
        lost
    }

    /// Copy up to `out.len()` samples in order; returns how many were read
    pub fn read_into(&mut self, out: &mut [f32]) -> usize {
        let n = self.buffer.pop_slice(out);
        self.publish();
        n
    }

    /// Discard everything buffered
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.publish();
    }

    fn publish(&self) {
        self.level.store(self.len(), Ordering::Release);
    }

    #[cfg(test)]
    fn indices_consistent(&self) -> bool {
        let modulus = 2 * self.capacity();
        let span = (modulus + self.buffer.write_index() - self.buffer.read_index()) % modulus;
        span == self.len() && self.len() <= self.capacity() && self.level.load(Ordering::Acquire) == self.len()
    }
}
