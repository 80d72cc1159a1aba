//! The local score buffer: single source of truth for on-screen
//! values during a capture session, independent of connectivity.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::store::{DurableStore, StoreError};
use crate::models::{CellKey, PendingScoreMutation, ScoreRecord};

/// Strokes and putts for one scorecard cell. Zero strokes means the
/// cell is unset: it is never a valid entered value, and a cell with
/// only putts recorded is not committable yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoleScore {
    pub strokes: u32,
    pub putts: u32,
}

impl HoleScore {
    pub fn is_set(&self) -> bool {
        self.strokes > 0
    }
}

/// Which field of a cell an adjustment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreField {
    Strokes,
    Putts,
}

/// Durable per-event buffer of scorecard cells.
///
/// Every write is persisted through the store port before it is
/// considered committed, so an app restart cannot lose an entry.
pub struct ScoreBuffer {
    event_id: Uuid,
    cells: HashMap<CellKey, HoleScore>,
    store: Arc<dyn DurableStore>,
}

impl ScoreBuffer {
    /// Opens the buffer for an event, restoring any cells previously
    /// persisted on this device.
    pub fn open(event_id: Uuid, store: Arc<dyn DurableStore>) -> Self {
        let cells = store
            .get(&storage_key(event_id))
            .ok()
            .flatten()
            .and_then(|json| serde_json::from_str::<Vec<StoredCell>>(&json).ok())
            .map(|stored| {
                stored
                    .into_iter()
                    .map(|c| ((c.player_id, c.hole_number), c.score))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            event_id,
            cells,
            store,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    /// Current value of a cell; default `{0, 0}` when unset.
    pub fn get(&self, player_id: Uuid, hole_number: u8) -> HoleScore {
        self.cells
            .get(&(player_id, hole_number))
            .copied()
            .unwrap_or_default()
    }

    /// Applies a delta to a cell, clamping strokes to at least 1 and
    /// putts to at least 0, then persists the whole buffer.
    pub fn adjust(
        &mut self,
        player_id: Uuid,
        hole_number: u8,
        field: ScoreField,
        delta: i32,
    ) -> Result<HoleScore, StoreError> {
        let mut score = self.get(player_id, hole_number);
        match field {
            ScoreField::Strokes => {
                score.strokes = (score.strokes as i32 + delta).max(1) as u32;
            }
            ScoreField::Putts => {
                score.putts = (score.putts as i32 + delta).max(0) as u32;
            }
        }
        self.cells.insert((player_id, hole_number), score);
        self.persist()?;
        Ok(score)
    }

    /// Seeds the buffer from the last known server snapshot, then
    /// overlays still-pending local mutations. Pending wins: it is
    /// more recent intent the server has not acknowledged yet.
    pub fn seed(
        &mut self,
        snapshot: &[ScoreRecord],
        pending: &[PendingScoreMutation],
    ) -> Result<(), StoreError> {
        for record in snapshot {
            self.cells.insert(
                record.cell(),
                HoleScore {
                    strokes: record.strokes,
                    putts: record.putts,
                },
            );
        }
        for mutation in pending {
            self.cells.insert(
                mutation.cell(),
                HoleScore {
                    strokes: mutation.strokes,
                    putts: mutation.putts,
                },
            );
        }
        self.persist()
    }

    /// All set cells, in (player, hole) order.
    pub fn cells(&self) -> Vec<(CellKey, HoleScore)> {
        let mut cells: Vec<(CellKey, HoleScore)> = self
            .cells
            .iter()
            .filter(|(_, s)| s.is_set())
            .map(|(&k, &s)| (k, s))
            .collect();
        cells.sort_by_key(|&(k, _)| k);
        cells
    }

    fn persist(&self) -> Result<(), StoreError> {
        let stored: Vec<StoredCell> = {
            let mut cells: Vec<_> = self.cells.iter().collect();
            cells.sort_by_key(|(&k, _)| k);
            cells
                .into_iter()
                .map(|(&(player_id, hole_number), &score)| StoredCell {
                    player_id,
                    hole_number,
                    score,
                })
                .collect()
        };
        let json = serde_json::to_string(&stored).expect("buffer cells serialize");
        self.store.put(&storage_key(self.event_id), &json)
    }
}

fn storage_key(event_id: Uuid) -> String {
    format!("scores-{}", event_id)
}

#[derive(Serialize, Deserialize)]
struct StoredCell {
    player_id: Uuid,
    hole_number: u8,
    #[serde(flatten)]
    score: HoleScore,
}
