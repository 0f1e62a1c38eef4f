//! FIFO work queues feeding the push workers.
//!
//! Each push service owns exactly one queue and one worker. The worker peeks
//! the head, attempts the push, and removes the item only after success or a
//! permanent/unexpected failure, so a durable queue delivers at-least-once
//! across process restarts.

mod file;
mod memory;

pub use file::FileQueue;
pub use memory::MemoryQueue;

use crate::error::Result;

/// FIFO queue contract shared by the in-memory and durable implementations.
///
/// Implementations synchronize internally; the single worker per queue is the
/// only consumer, but producers may enqueue from any thread.
pub trait WorkQueue<T>: Send + Sync {
    /// Appends an item at the tail.
    fn enqueue(&self, item: T) -> Result<()>;

    /// Returns the head item without removing it.
    fn peek(&self) -> Result<Option<T>>;

    /// Removes the head item after it was processed (successfully or
    /// definitively failed).
    fn remove(&self) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discards all queued items.
    fn clear(&self) -> Result<()>;
}
