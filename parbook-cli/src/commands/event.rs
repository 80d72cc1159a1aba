//! Event listing and detail commands.

use chrono::{Datelike, Utc};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::config::Config;
use crate::db::{init_db, EventRepository};
use crate::sync::client_from_config;

#[derive(Debug, Args)]
pub struct EventCommand {
    #[command(subcommand)]
    pub command: EventSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum EventSubcommand {
    /// List events for a calendar year
    List {
        /// Year to list (default: current year)
        #[arg(long, short)]
        year: Option<i32>,
    },

    /// Show one event: course, roster, and groups
    Show {
        /// Event id
        event_id: Uuid,
    },
}

impl EventCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let rt = tokio::runtime::Runtime::new()?;
        match &self.command {
            EventSubcommand::List { year } => {
                let year = year.unwrap_or_else(|| Utc::now().year());
                rt.block_on(self.list(config, year))
            }
            EventSubcommand::Show { event_id } => rt.block_on(self.show(config, *event_id)),
        }
    }

    async fn list(&self, config: &Config, year: i32) -> Result<(), Box<dyn std::error::Error>> {
        let pool = init_db(Some(config.database_path.value.clone())).await?;
        let repo = EventRepository::new(pool);

        // Refresh the cache when the server is reachable; otherwise
        // list whatever was cached last time.
        if let Ok(client) = client_from_config(config) {
            if let Ok(events) = client.events(year).await {
                for event in &events {
                    repo.upsert_event(event).await?;
                }
            }
        }

        let events = repo.list_by_year(year).await?;
        if events.is_empty() {
            println!("No events for {}.", year);
            return Ok(());
        }

        println!("Events in {}", year);
        println!();
        for event in events {
            println!(
                "  {}  {:<24} {:<8} {:<12} {}",
                event.event_date,
                event.name,
                event.event_type.to_string(),
                event.status.to_string(),
                event.id
            );
        }
        Ok(())
    }

    async fn show(
        &self,
        config: &Config,
        event_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let pool = init_db(Some(config.database_path.value.clone())).await?;
        let repo = EventRepository::new(pool);

        // Prefer the live detail; fall back to the cache offline.
        if let Ok(client) = client_from_config(config) {
            if let Ok(detail) = client.event_detail(event_id).await {
                repo.cache_detail(&detail).await?;
            }
        }

        let Some(event) = repo.get_event(event_id).await? else {
            return Err(format!("Event {} not found in cache. Run while online to fetch it.", event_id).into());
        };

        println!("{} ({})", event.name, event.event_date);
        println!("  type:      {}", event.event_type);
        println!("  status:    {}", event.status);
        println!("  finalized: {}", if event.is_finalized { "yes" } else { "no" });

        if let Some(course) = repo.get_course(event.course_id).await? {
            println!(
                "  course:    {} (par {} = {} out / {} in)",
                course.name,
                course.total_par(),
                course.out_par(),
                course.in_par()
            );
        }

        let roster = repo.participants(event_id).await?;
        if !roster.is_empty() {
            println!();
            println!("Participants:");
            for player in roster {
                println!("  {:<24} {}  {}", player.name, player.role, player.id);
            }
        }
        Ok(())
    }
}
