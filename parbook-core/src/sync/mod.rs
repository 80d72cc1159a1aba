//! Sync module for the Parbook score server.
//!
//! Score state is owned by the server; clients push queued mutations
//! and pull snapshots over a small REST surface:
//!
//! 1. `GET /health` - reachability probe (no auth)
//! 2. `GET /api/scores?event_id=` - snapshot for an event
//! 3. `PUT /api/scores` - upsert one record
//! 4. `POST /api/scores` - upsert a batch (queue flush)
//! 5. `GET /api/events`, `/api/season`, `/api/rankings/annual` - reads

mod client;
mod error;

pub use client::{check_server, BatchOutcome, ScoreUpsert, SyncClient};
pub use error::SyncError;
