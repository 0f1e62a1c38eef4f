//! Concurrency primitives shared by the push workers.

mod retry;
mod wait;

pub use retry::BackoffPolicy;
pub use wait::{BreakableWait, WaitOutcome};
