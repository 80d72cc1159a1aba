//! Score entry and scorecard commands.
//!
//! `score set` drives a capture session: the value goes to the durable
//! local buffer first, then to the server when it is reachable, and
//! into the offline queue when it is not.

use chrono::Utc;
use clap::{Args, Subcommand};
use std::sync::Arc;
use uuid::Uuid;

use parbook_core::capture::{
    CaptureSession, FileStore, ScoreBuffer, ScoreField, ScoreSink, SyncQueue,
};
use parbook_core::error::validate_score_write;
use parbook_core::models::{scoring_members, Course, Player, ScoreRecord};
use parbook_core::penalty::round_penalty;

use crate::config::Config;
use crate::db::{init_db, EventRepository};
use crate::sync::{client_from_config, HttpScoreSink, OfflineSink};

#[derive(Debug, Args)]
pub struct ScoreCommand {
    #[command(subcommand)]
    pub command: ScoreSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ScoreSubcommand {
    /// Enter or correct a score for one hole
    Set {
        /// Event id
        event_id: Uuid,
        /// Hole number (1-18)
        #[arg(long)]
        hole: u8,
        /// Player to score for (default: configured player_id)
        #[arg(long)]
        player: Option<Uuid>,
        /// Strokes taken
        #[arg(long)]
        strokes: u32,
        /// Putts taken
        #[arg(long, default_value_t = 0)]
        putts: u32,
    },

    /// Show the scorecard for an event
    Card {
        /// Event id
        event_id: Uuid,
    },

    /// Show queued (not yet delivered) scores for an event
    Pending {
        /// Event id
        event_id: Uuid,
    },
}

impl ScoreCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ScoreSubcommand::Set {
                event_id,
                hole,
                player,
                strokes,
                putts,
            } => self.set(config, *event_id, *hole, *player, *strokes, *putts),
            ScoreSubcommand::Card { event_id } => self.card(config, *event_id),
            ScoreSubcommand::Pending { event_id } => self.pending(config, *event_id),
        }
    }

    fn set(
        &self,
        config: &Config,
        event_id: Uuid,
        hole: u8,
        player: Option<Uuid>,
        strokes: u32,
        putts: u32,
    ) -> Result<(), Box<dyn std::error::Error>> {
        // Reject malformed writes before any session state is touched.
        validate_score_write(hole, strokes)?;

        let scorer = config
            .player_id
            .value
            .ok_or("player_id is not configured. Set it in config.yaml or PARBOOK_PLAYER_ID.")?;
        let target = player.unwrap_or(scorer);

        let (course, roster) = load_event_context(config, event_id, Some(scorer))?;
        if !roster.iter().any(|p| p.id == target) {
            return Err(format!("Player {} is not in your scoring group.", target).into());
        }

        let store = Arc::new(FileStore::new(config.data_dir.value.clone()));

        // Online when sync is configured and the server answers.
        let (sink, online): (Box<dyn ScoreSink>, bool) = match client_from_config(config) {
            Ok(client) => {
                let sink = HttpScoreSink::new(client)?;
                let online = sink.check_server();
                (Box::new(sink), online)
            }
            Err(_) => (Box::new(OfflineSink), false),
        };

        let mut session =
            CaptureSession::open(event_id, course, roster, scorer, store, sink, online);
        session.select_player(target)?;
        session.goto_hole(hole)?;

        // The buffer works in deltas; translate the absolute values.
        let current = session.current_score();
        session.adjust(ScoreField::Strokes, strokes as i32 - current.strokes as i32)?;
        session.adjust(ScoreField::Putts, putts as i32 - current.putts as i32)?;

        let entered = session.current_score();
        let label = session.label();
        session.commit_current()?;

        print!(
            "Hole {}: {} stroke(s), {} putt(s)",
            hole, entered.strokes, entered.putts
        );
        if let Some(label) = label {
            print!(" ({})", label);
        }
        println!();

        let pending = session.pending_count();
        if pending > 0 {
            println!("{} score(s) queued for sync.", pending);
        }
        Ok(())
    }

    fn card(&self, config: &Config, event_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
        let (course, roster) = load_event_context(config, event_id, None)?;
        let store = Arc::new(FileStore::new(config.data_dir.value.clone()));
        let buffer = ScoreBuffer::open(event_id, store);

        // Par header
        print!("{:<16}", "hole");
        for hole in &course.holes {
            print!("{:>3}", hole.hole_number);
        }
        println!("  OUT  IN TOT  PEN");
        print!("{:<16}", "par");
        for hole in &course.holes {
            print!("{:>3}", hole.par);
        }
        println!(
            "  {:>3} {:>3} {:>3}",
            course.out_par(),
            course.in_par(),
            course.total_par()
        );

        for player in &roster {
            let mut records = Vec::new();
            print!("{:<16}", truncate(&player.name, 15));
            let mut out = 0u32;
            let mut inn = 0u32;
            for hole in &course.holes {
                let score = buffer.get(player.id, hole.hole_number);
                if score.is_set() {
                    print!("{:>3}", score.strokes);
                    if hole.hole_number <= 9 {
                        out += score.strokes;
                    } else {
                        inn += score.strokes;
                    }
                    records.push(ScoreRecord {
                        event_id,
                        player_id: player.id,
                        hole_number: hole.hole_number,
                        strokes: score.strokes,
                        putts: score.putts,
                        updated_by: None,
                        updated_at: Utc::now(),
                    });
                } else {
                    print!("{:>3}", "-");
                }
            }
            let penalty = round_penalty(&records, &course);
            println!("  {:>3} {:>3} {:>3}  {:>3}", out, inn, out + inn, penalty);
        }
        Ok(())
    }

    fn pending(&self, config: &Config, event_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
        let store = Arc::new(FileStore::new(config.data_dir.value.clone()));
        let queue = SyncQueue::open(event_id, store);

        if queue.is_empty() {
            println!("No queued scores for this event.");
            return Ok(());
        }

        println!("{} queued score(s):", queue.len());
        for mutation in queue.snapshot() {
            println!(
                "  player {}  hole {:>2}  {} stroke(s), {} putt(s)  queued {}",
                mutation.player_id,
                mutation.hole_number,
                mutation.strokes,
                mutation.putts,
                mutation.queued_at.format("%Y-%m-%d %H:%M")
            );
        }
        Ok(())
    }
}

/// Loads the course and roster for an event from the local cache,
/// refreshing from the server first when it is reachable.
///
/// With a scorer given and a live event payload available, the roster
/// narrows to the scorer's own group; the cached fallback has no group
/// assignments and returns every participant.
fn load_event_context(
    config: &Config,
    event_id: Uuid,
    scorer: Option<Uuid>,
) -> Result<(Course, Vec<Player>), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let pool = init_db(Some(config.database_path.value.clone())).await?;
        let repo = EventRepository::new(pool);

        if let Ok(client) = client_from_config(config) {
            if let Ok(detail) = client.event_detail(event_id).await {
                repo.cache_detail(&detail).await?;
                if let Some(scorer) = scorer {
                    let members = scoring_members(&detail, scorer);
                    if !members.is_empty() {
                        return Ok((detail.course, members));
                    }
                }
            }
        }

        let Some(event) = repo.get_event(event_id).await? else {
            return Err(format!(
                "Event {} not found in cache. Run 'parbook event show {}' while online first.",
                event_id, event_id
            )
            .into());
        };
        let Some(course) = repo.get_course(event.course_id).await? else {
            return Err("Course for this event is not cached yet.".into());
        };
        let roster = repo.participants(event_id).await?;
        if roster.is_empty() {
            return Err("No participants cached for this event.".into());
        }
        Ok((course, roster))
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max - 1).collect::<String>() + "…"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigSource, ConfigValue, SyncConfig};
    use tempfile::tempdir;

    fn config(dir: &std::path::Path) -> Config {
        Config {
            database_path: ConfigValue::new(dir.join("parbook.db"), ConfigSource::Default),
            data_dir: ConfigValue::new(dir.join("capture"), ConfigSource::Default),
            player_id: ConfigValue::new(Some(Uuid::new_v4()), ConfigSource::Default),
            config_file: None,
            sync: SyncConfig::default(),
        }
    }

    fn set_command(hole: u8, strokes: u32) -> ScoreCommand {
        ScoreCommand {
            command: ScoreSubcommand::Set {
                event_id: Uuid::new_v4(),
                hole,
                player: None,
                strokes,
                putts: 2,
            },
        }
    }

    #[test]
    fn test_set_rejects_out_of_range_hole() {
        let temp_dir = tempdir().unwrap();
        let config = config(temp_dir.path());

        let err = set_command(25, 4).run(&config).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        // Rejected up front: no capture state was written anywhere.
        assert!(!temp_dir.path().join("capture").exists());
        assert!(!temp_dir.path().join("parbook.db").exists());
    }

    #[test]
    fn test_set_rejects_zero_strokes() {
        let temp_dir = tempdir().unwrap();
        let config = config(temp_dir.path());
        assert!(set_command(3, 0).run(&config).is_err());
    }
}
