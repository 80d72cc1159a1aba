use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-player season figures produced by the event finalization
/// service. Read-only input here; the annual ranking consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonStat {
    pub player_id: Uuid,
    pub year: i32,
    pub total_points: i64,
    pub participation_count: u32,
    pub initial_handicap: i32,
    pub current_handicap: i32,
}
