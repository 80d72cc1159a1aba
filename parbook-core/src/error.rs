//! Boundary validation for incoming writes.
//!
//! Malformed writes are rejected here before they can reach the queue
//! or the pure scoring engines; those engines only ever see validated
//! domain types.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("hole number {0} is out of range (1-18)")]
    HoleOutOfRange(u8),
    #[error("strokes must be at least 1 once entered")]
    StrokesUnset,
    #[error("invalid par {par} on hole {hole} (must be 3, 4, or 5)")]
    InvalidPar { hole: u8, par: u8 },
    #[error("a course must have exactly 18 holes, got {0}")]
    WrongHoleCount(usize),
    #[error("unknown event: {0}")]
    UnknownEvent(Uuid),
    #[error("unknown player: {0}")]
    UnknownPlayer(Uuid),
}

/// Checks a score write before it is accepted anywhere (queue or
/// server). Strokes of zero are never a valid entered value.
pub fn validate_score_write(hole_number: u8, strokes: u32) -> Result<(), ValidationError> {
    if !(1..=18).contains(&hole_number) {
        return Err(ValidationError::HoleOutOfRange(hole_number));
    }
    if strokes == 0 {
        return Err(ValidationError::StrokesUnset);
    }
    Ok(())
}
