//! The penalty rule engine.
//!
//! The society's money rules lived in three separately maintained
//! copies (event detail, CSV export, season totals) and had started to
//! drift; this module is now the only implementation.
//!
//! Two rules, evaluated per hole and summed, in yen:
//!
//! 1. Three-putt or worse: `(putts - 2) * 100` for every putt past two.
//! 2. Par-3 green miss: a flat 100 when par is 3 and the tee shot did
//!    not reach the green, i.e. `strokes - putts >= 2`. The drifted
//!    `strokes >= 2` form found in older copies is rejected: it charged
//!    a one-on, one-putt birdie, and it made an all-par round with
//!    clean putting cost money.
//!
//! Unentered holes (strokes == 0) contribute nothing, so the function
//! is total over any subset of 0-18 holes and works for in-progress
//! rounds.

use crate::models::{Course, ScoreRecord};

/// Charge per putt beyond two on a single hole.
pub const THREE_PUTT_UNIT: i64 = 100;

/// Flat charge for failing to reach a par-3 green off the tee.
pub const PAR3_MISS_CHARGE: i64 = 100;

/// Penalty for a single hole.
pub fn hole_penalty(strokes: u32, putts: u32, par: u8) -> i64 {
    if strokes == 0 {
        return 0;
    }
    let mut penalty = 0;
    if putts > 2 {
        penalty += (putts as i64 - 2) * THREE_PUTT_UNIT;
    }
    if par == 3 && strokes as i64 - putts as i64 >= 2 {
        penalty += PAR3_MISS_CHARGE;
    }
    penalty
}

/// Total penalty for a player's hole records at one event.
///
/// Records for holes the course does not know about earn no par-3
/// charge (there is no par to judge against) but still pay for putts.
pub fn round_penalty(records: &[ScoreRecord], course: &Course) -> i64 {
    records
        .iter()
        .map(|r| {
            let par = course.par_for(r.hole_number).unwrap_or(4);
            hole_penalty(r.strokes, r.putts, par)
        })
        .sum()
}
