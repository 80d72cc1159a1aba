//! Blocking [`ScoreSink`] over the async sync client.

use parbook_core::capture::ScoreSink;
use parbook_core::models::PendingScoreMutation;
use parbook_core::sync::{ScoreUpsert, SyncClient, SyncError};

/// Delivers committed scores over HTTP from synchronous capture code.
pub struct HttpScoreSink {
    client: SyncClient,
    rt: tokio::runtime::Runtime,
}

impl HttpScoreSink {
    pub fn new(client: SyncClient) -> Result<Self, SyncError> {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| SyncError::HttpError(e.to_string()))?;
        Ok(Self { client, rt })
    }

    /// Checks server reachability before a session starts.
    pub fn check_server(&self) -> bool {
        self.rt
            .block_on(parbook_core::sync::check_server(self.client.server_url()))
    }

    pub fn client(&self) -> &SyncClient {
        &self.client
    }

    /// Runs an async call against this sink's runtime.
    pub fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.rt.block_on(fut)
    }
}

impl ScoreSink for HttpScoreSink {
    fn upsert(&mut self, mutation: &PendingScoreMutation) -> Result<(), SyncError> {
        self.rt
            .block_on(self.client.upsert_score(&ScoreUpsert::from(mutation)))
            .map(|_| ())
    }
}

/// Sink used when sync is not configured: every delivery fails, so all
/// commits land in the offline queue.
pub struct OfflineSink;

impl ScoreSink for OfflineSink {
    fn upsert(&mut self, _mutation: &PendingScoreMutation) -> Result<(), SyncError> {
        Err(SyncError::NotConfigured)
    }
}
