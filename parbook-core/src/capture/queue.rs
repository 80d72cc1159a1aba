//! The sync queue: durable mapping of score writes that have not yet
//! been acknowledged by the server.
//!
//! Keyed by scorecard cell, not append-only: a new mutation for a cell
//! replaces the old one, bounding the queue to 18 x participant-count
//! entries per event. Contents are persisted on every change, which is
//! what makes arbitrary connectivity loss survivable.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use super::store::{DurableStore, StoreError};
use crate::models::{CellKey, PendingScoreMutation};

pub struct SyncQueue {
    event_id: Uuid,
    pending: HashMap<CellKey, PendingScoreMutation>,
    store: Arc<dyn DurableStore>,
}

impl SyncQueue {
    /// Opens the queue for an event, restoring mutations queued in an
    /// earlier session.
    pub fn open(event_id: Uuid, store: Arc<dyn DurableStore>) -> Self {
        let pending = store
            .get(&storage_key(event_id))
            .ok()
            .flatten()
            .and_then(|json| serde_json::from_str::<Vec<PendingScoreMutation>>(&json).ok())
            .map(|stored| stored.into_iter().map(|m| (m.cell(), m)).collect())
            .unwrap_or_default();
        Self {
            event_id,
            pending,
            store,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queues a mutation, replacing any older one for the same cell.
    pub fn enqueue(&mut self, mutation: PendingScoreMutation) -> Result<(), StoreError> {
        self.pending.insert(mutation.cell(), mutation);
        self.persist()
    }

    /// Removes an acknowledged mutation.
    pub fn acknowledge(&mut self, cell: CellKey) -> Result<(), StoreError> {
        if self.pending.remove(&cell).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    /// Snapshot of queued mutations in (player, hole) order. Entries
    /// stay queued until explicitly acknowledged, so a failed delivery
    /// needs no undo step.
    pub fn snapshot(&self) -> Vec<PendingScoreMutation> {
        let mut mutations: Vec<PendingScoreMutation> = self.pending.values().cloned().collect();
        mutations.sort_by_key(|m| m.cell());
        mutations
    }

    fn persist(&self) -> Result<(), StoreError> {
        let key = storage_key(self.event_id);
        if self.pending.is_empty() {
            return self.store.remove(&key);
        }
        let json = serde_json::to_string(&self.snapshot()).expect("queue serialize");
        self.store.put(&key, &json)
    }
}

fn storage_key(event_id: Uuid) -> String {
    format!("pending-{}", event_id)
}
