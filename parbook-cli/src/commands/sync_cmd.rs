//! Sync CLI commands for flushing queued scores to the server.

use clap::{Args, Subcommand};

use parbook_core::check_server;

use crate::config::Config;
use crate::sync::flush_all_pending;

/// Sync queued scores with the server
#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration and server status
    Status,
}

impl SyncCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let rt = tokio::runtime::Runtime::new()?;

        match &self.command {
            None => rt.block_on(self.sync(config)),
            Some(SyncSubcommand::Status) => rt.block_on(self.status(config)),
        }
    }

    async fn sync(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        println!("Flushing queued scores...");
        let totals = flush_all_pending(config).await?;

        if totals.delivered == 0 && totals.retained == 0 {
            println!("Nothing to sync.");
        } else {
            println!("  ✓ delivered {}", totals.delivered);
            if totals.retained > 0 {
                println!("  ✗ still queued {}", totals.retained);
            }
        }
        Ok(())
    }

    async fn status(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        if !config.sync.is_configured() {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  sync:");
            println!("    server_url: \"http://localhost:8080\"");
            println!("    api_key: \"your-key\"");
            println!();
            println!("Or set environment variables:");
            println!("  PARBOOK_SYNC_URL, PARBOOK_SYNC_API_KEY");
            return Ok(());
        }

        let server_url = config.sync.server_url.as_ref().unwrap();

        println!("Server:    {}", server_url);
        println!(
            "Auto-sync: {}",
            if config.sync.auto_sync {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!();

        print!("Server status: ");
        if check_server(server_url).await {
            println!("✓ reachable");
        } else {
            println!("✗ unreachable");
        }
        Ok(())
    }
}
