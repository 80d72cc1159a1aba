//! Season summary command.

use chrono::{Datelike, Utc};
use clap::Args;

use crate::config::Config;
use crate::sync::client_from_config;

#[derive(Debug, Args)]
pub struct SeasonCommand {
    /// Year to summarize (default: current year)
    #[arg(long, short)]
    pub year: Option<i32>,
}

impl SeasonCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let year = self.year.unwrap_or_else(|| Utc::now().year());
        let client = client_from_config(config)?;

        let rt = tokio::runtime::Runtime::new()?;
        let summary = rt.block_on(client.season(year))?;

        println!("Season {}", summary.year);
        println!();

        if summary.events.is_empty() {
            println!("No completed rounds yet.");
            return Ok(());
        }

        println!("Events:");
        for event in &summary.events {
            println!("  {}  {}", event.event_date, event.name);
        }
        println!();

        println!("Standings (average score, 18-hole rounds only):");
        for (i, player) in summary.rankings.iter().enumerate() {
            let avg = player
                .avg_score
                .map(|a| format!("{:.1}", a))
                .unwrap_or_else(|| "-".to_string());
            let best = player
                .best_score
                .map(|b| b.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:>2}. {:<24} rounds {:>2}  best {:>3}  avg {:>5}",
                i + 1,
                player.name,
                player.event_count,
                best,
                avg
            );
        }

        let charged: Vec<_> = summary
            .penalties
            .iter()
            .filter(|p| p.total_penalty > 0)
            .collect();
        if !charged.is_empty() {
            println!();
            println!("Penalty pot:");
            for player in charged {
                println!("  {:<24} {:>6}", player.name, player.total_penalty);
            }
        }
        Ok(())
    }
}
