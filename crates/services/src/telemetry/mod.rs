//! Usage telemetry: a durable local event queue flushed in batches, and
//! per-page time tracking on top of it.

mod queue;
mod tracker;

pub use queue::{
    DEFAULT_FLUSH_INTERVAL, DEFAULT_FLUSH_THRESHOLD, EventQueue, FlushOutcome, QUEUE_STORAGE_KEY,
    QueueConfig,
};
pub use tracker::{PageTimeTracker, TeardownReason};
