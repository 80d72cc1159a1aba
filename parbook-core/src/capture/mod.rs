//! Offline-tolerant score capture.
//!
//! Entered scores go to a durable local buffer first and reach the
//! server through a per-cell sync queue, so connectivity loss during a
//! round never loses an entry.

mod buffer;
mod queue;
mod session;
mod store;

pub use buffer::{HoleScore, ScoreBuffer, ScoreField};
pub use queue::SyncQueue;
pub use session::{CaptureSession, FlushOutcome, ScoreSink};
pub use store::{DurableStore, FileStore, MemoryStore, StoreError};
