mod config_cmd;
mod event;
mod ranking;
mod score;
mod season;
mod sync_cmd;

pub use config_cmd::ConfigCommand;
pub use event::{EventCommand, EventSubcommand};
pub use ranking::RankingCommand;
pub use score::{ScoreCommand, ScoreSubcommand};
pub use season::SeasonCommand;
pub use sync_cmd::SyncCommand;
