use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod db;
mod sync;

use commands::{
    ConfigCommand, EventCommand, EventSubcommand, RankingCommand, ScoreCommand, ScoreSubcommand,
    SeasonCommand, SyncCommand,
};
use config::Config;
use sync::try_auto_sync;

#[derive(Parser)]
#[command(name = "parbook")]
#[command(version)]
#[command(about = "Score keeping for a golf society", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse society events
    Event(EventCommand),

    /// Enter scores and view scorecards
    Score(ScoreCommand),

    /// Show a season summary
    Season(SeasonCommand),

    /// Show the annual points ranking
    Ranking(RankingCommand),

    /// Manage configuration
    Config(ConfigCommand),

    /// Sync queued scores with the server
    Sync(SyncCommand),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Quiet by default; RUST_LOG surfaces the sync diagnostics.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parbook=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = Config::load(cli.config)?;

    // Auto-sync BEFORE read commands
    if is_read_command(&cli.command) {
        try_auto_sync(&config);
    }

    // Execute the command
    let result = execute_command(&cli.command, &config);

    // Auto-sync AFTER write commands (only if command succeeded)
    if result.is_ok() && is_write_command(&cli.command) {
        try_auto_sync(&config);
    }

    result
}

fn execute_command(
    command: &Option<Commands>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Some(Commands::Event(cmd)) => cmd.run(config),
        Some(Commands::Score(cmd)) => cmd.run(config),
        Some(Commands::Season(cmd)) => cmd.run(config),
        Some(Commands::Ranking(cmd)) => cmd.run(config),
        Some(Commands::Config(cmd)) => cmd.run(config),
        Some(Commands::Sync(cmd)) => cmd.run(config),
        None => {
            println!("Use --help to see available commands");
            Ok(())
        }
    }
}

/// Returns true if the command is a read operation that should sync before execution.
fn is_read_command(cmd: &Option<Commands>) -> bool {
    matches!(
        cmd,
        Some(Commands::Event(e)) if matches!(e.command,
            EventSubcommand::List { .. } | EventSubcommand::Show { .. })
    ) || matches!(cmd, Some(Commands::Season(_)))
        || matches!(cmd, Some(Commands::Ranking(_)))
        || matches!(
            cmd,
            Some(Commands::Score(s)) if matches!(s.command, ScoreSubcommand::Card { .. })
        )
}

/// Returns true if the command is a write operation that should sync after execution.
fn is_write_command(cmd: &Option<Commands>) -> bool {
    matches!(
        cmd,
        Some(Commands::Score(s)) if matches!(s.command, ScoreSubcommand::Set { .. })
    )
}
