//! Parbook Core Library
//!
//! Shared types and scoring logic for Parbook applications.

pub mod capture;
pub mod error;
pub mod models;
pub mod penalty;
pub mod ranking;
pub mod season;
pub mod sync;

pub use capture::{
    CaptureSession, DurableStore, FileStore, FlushOutcome, HoleScore, MemoryStore, ScoreBuffer,
    ScoreField, ScoreSink, StoreError, SyncQueue,
};
pub use error::{validate_score_write, ValidationError};
pub use models::{
    demo_pars, par_diff_label, scoring_members, CellKey, Course, Event, EventDetail, EventGroup,
    EventStatus, EventType, GroupMember, Hole, Participant, PendingScoreMutation, Player, Role,
    ScoreRecord, SeasonStat, HOLE_COUNT,
};
pub use penalty::{hole_penalty, round_penalty};
pub use ranking::{annual_ranking, standing_order, RankedEntry, SeasonStanding};
pub use season::{aggregate_season, EventScore, PlayerSeason, SeasonEvent, SeasonSummary};
pub use sync::{check_server, BatchOutcome, ScoreUpsert, SyncClient, SyncError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
