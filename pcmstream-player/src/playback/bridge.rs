//! Lock-free block handoff into the real-time domain
//!
//! A released [`SampleBlock`] is moved (never copied) through a
//! single-producer single-consumer queue to the renderer. Spent blocks travel
//! back through a second queue so their storage is freed on the non-real-time
//! side.
//!
//! Sizing the return queue: `send` empties it before every push. From the
//! moment it was last seen empty, the blocks that can reach it are the ones
//! still in the block queue (at most `capacity`), the one the renderer holds
//! between pop and recycle, and the single block pushed by that `send`. A
//! return queue of `capacity + RECYCLE_SLACK` therefore never rejects a
//! block, so nothing is freed on the real-time thread.

use crate::audio::types::SampleBlock;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Return-queue headroom over the block queue capacity
const RECYCLE_SLACK: usize = 2;

/// Handoff failure; the block is handed back to the caller
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("block queue full, block #{} not delivered", .0.sequence)]
    Full(SampleBlock),
}

/// Create a connected sender/receiver pair holding up to `capacity` blocks
pub fn bridge(capacity: usize) -> (BlockSender, BlockReceiver) {
    let (blocks_tx, blocks_rx) = HeapRb::<SampleBlock>::new(capacity).split();
    let (recycle_tx, recycle_rx) = HeapRb::<SampleBlock>::new(capacity + RECYCLE_SLACK).split();
    let reset = Arc::new(AtomicBool::new(false));

    (
        BlockSender {
            blocks: blocks_tx,
            recycled: recycle_rx,
            reset: ResetHandle(Arc::clone(&reset)),
        },
        BlockReceiver {
            blocks: blocks_rx,
            recycle: recycle_tx,
            reset,
        },
    )
}

/// Requests a playback reset from any thread
#[derive(Debug, Clone)]
pub struct ResetHandle(Arc<AtomicBool>);

impl ResetHandle {
    /// Ask the renderer to clear its ring and return to a cold start
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Producer half, owned by the buffering side
pub struct BlockSender {
    blocks: HeapProd<SampleBlock>,
    recycled: HeapCons<SampleBlock>,
    reset: ResetHandle,
}

impl BlockSender {
    /// Move a block toward the renderer without blocking
    pub fn send(&mut self, block: SampleBlock) -> Result<(), BridgeError> {
        self.reclaim();
        self.blocks.try_push(block).map_err(BridgeError::Full)
    }

    /// Drop blocks the renderer has finished with; returns how many
    pub fn reclaim(&mut self) -> usize {
        let mut reclaimed = 0;
        while let Some(block) = self.recycled.try_pop() {
            trace!("Reclaimed block #{}", block.sequence);
            reclaimed += 1;
        }
        reclaimed
    }

    /// Blocks queued and not yet taken by the renderer
    pub fn pending(&self) -> usize {
        self.blocks.occupied_len()
    }

    pub fn reset_handle(&self) -> ResetHandle {
        self.reset.clone()
    }
}

/// Consumer half, owned by the renderer
///
/// Every method is lock-free and allocation-free.
pub struct BlockReceiver {
    blocks: HeapCons<SampleBlock>,
    recycle: HeapProd<SampleBlock>,
    reset: Arc<AtomicBool>,
}

impl BlockReceiver {
    pub fn try_recv(&mut self) -> Option<SampleBlock> {
        self.blocks.try_pop()
    }

    /// Return a consumed block so the sender frees it
    pub fn recycle(&mut self, block: SampleBlock) {
        // Sized so this cannot fail; see the module docs
        let _ = self.recycle.try_push(block);
    }

    /// Consume a pending reset request
    pub fn take_reset(&self) -> bool {
        self.reset.swap(false, Ordering::AcqRel)
    }
}
