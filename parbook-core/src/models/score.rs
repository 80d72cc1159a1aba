use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one scorecard cell within an event: (player, hole).
pub type CellKey = (Uuid, u8);

/// A stored per-hole score for one player at one event.
///
/// Unique per (event, player, hole). `strokes == 0` means the hole has
/// not been entered yet; once entered, strokes is at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub event_id: Uuid,
    pub player_id: Uuid,
    pub hole_number: u8,
    pub strokes: u32,
    pub putts: u32,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn cell(&self) -> CellKey {
        (self.player_id, self.hole_number)
    }
}

/// A score write that has not yet been acknowledged by the server.
///
/// Lives only on the capture device; for a given cell only the latest
/// mutation is retained, and it is destroyed once acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingScoreMutation {
    pub event_id: Uuid,
    pub player_id: Uuid,
    pub hole_number: u8,
    pub strokes: u32,
    pub putts: u32,
    pub updated_by: Option<Uuid>,
    pub queued_at: DateTime<Utc>,
}

impl PendingScoreMutation {
    pub fn cell(&self) -> CellKey {
        (self.player_id, self.hole_number)
    }
}

/// Label for a hole score relative to par.
///
/// `None` when the hole is unset. Two or more under par collapses to
/// "eagle"; more than two over par becomes a numeric "+N".
pub fn par_diff_label(strokes: u32, par: u8) -> Option<String> {
    if strokes == 0 {
        return None;
    }
    let diff = strokes as i32 - par as i32;
    let label = match diff {
        d if d <= -2 => "eagle".to_string(),
        -1 => "birdie".to_string(),
        0 => "par".to_string(),
        1 => "bogey".to_string(),
        2 => "double bogey".to_string(),
        d => format!("+{}", d),
    };
    Some(label)
}
