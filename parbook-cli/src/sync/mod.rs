//! Networking glue for the CLI: a blocking sink adapter over the async
//! sync client, plus queue-flush helpers shared by the `sync` command
//! and auto-sync.

mod auto_sync;
mod http_sink;

pub use auto_sync::try_auto_sync;
pub use http_sink::{HttpScoreSink, OfflineSink};

use parbook_core::capture::{FileStore, SyncQueue};
use parbook_core::sync::{ScoreUpsert, SyncClient, SyncError};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;

/// Per-event totals from flushing the offline queues.
#[derive(Debug, Default)]
pub struct FlushTotals {
    pub delivered: usize,
    pub retained: usize,
}

/// Builds a sync client from config, or fails with `NotConfigured`.
pub fn client_from_config(config: &Config) -> Result<SyncClient, SyncError> {
    match (&config.sync.server_url, &config.sync.api_key) {
        (Some(url), Some(key)) => SyncClient::new(url.clone(), key.clone()),
        _ => Err(SyncError::NotConfigured),
    }
}

/// Flushes every event's offline queue found in the capture directory.
///
/// Delivered mutations are acknowledged one by one, so a connection
/// drop mid-flush loses nothing: whatever was not acknowledged is
/// still queued for the next run.
pub async fn flush_all_pending(config: &Config) -> Result<FlushTotals, SyncError> {
    let client = client_from_config(config)?;
    let store = FileStore::new(config.data_dir.value.clone());

    let mut totals = FlushTotals::default();
    for key in store.keys_with_prefix("pending-") {
        let Some(event_id) = key
            .strip_prefix("pending-")
            .and_then(|s| Uuid::parse_str(s).ok())
        else {
            continue;
        };

        let mut queue = SyncQueue::open(event_id, Arc::new(store.clone()));
        for mutation in queue.snapshot() {
            match client.upsert_score(&ScoreUpsert::from(&mutation)).await {
                Ok(_) => {
                    queue
                        .acknowledge(mutation.cell())
                        .map_err(|e| SyncError::HttpError(e.to_string()))?;
                    totals.delivered += 1;
                }
                Err(_) => totals.retained += 1,
            }
        }
    }
    Ok(totals)
}
