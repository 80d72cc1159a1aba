//! Annual points ranking command.

use chrono::{Datelike, Utc};
use clap::Args;

use crate::config::Config;
use crate::sync::client_from_config;

#[derive(Debug, Args)]
pub struct RankingCommand {
    /// Year to rank (default: current year)
    #[arg(long, short)]
    pub year: Option<i32>,
}

impl RankingCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let year = self.year.unwrap_or_else(|| Utc::now().year());
        let client = client_from_config(config)?;

        let rt = tokio::runtime::Runtime::new()?;
        let ranking = rt.block_on(client.annual_ranking(year))?;

        if ranking.is_empty() {
            println!("No standings for {} yet.", year);
            return Ok(());
        }

        println!("Annual ranking {}", year);
        println!();
        for entry in ranking {
            println!(
                "  {:>2}. {:<24} {:>4} pts  {:>2} event(s)  hcp {:>3}",
                entry.rank,
                entry.player_name,
                entry.total_points,
                entry.participation_count,
                entry.current_handicap
            );
        }
        Ok(())
    }
}
