pub mod course;
pub mod event;
pub mod player;
pub mod score;
pub mod season;

pub use course::{demo_pars, Course, Hole, HOLE_COUNT};
pub use event::{
    scoring_members, Event, EventDetail, EventGroup, EventStatus, EventType, GroupMember,
    Participant,
};
pub use player::{Player, Role};
pub use score::{par_diff_label, CellKey, PendingScoreMutation, ScoreRecord};
pub use season::SeasonStat;
