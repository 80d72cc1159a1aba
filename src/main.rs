//! Parbook Score Server
//!
//! The canonical score store for a golf society. Capture clients push
//! scorecard cells here when online and flush their queued writes after
//! a reconnect; season summaries and the annual ranking are served from
//! the same store.
//!
//! # Configuration
//!
//! Environment variables:
//! - `PARBOOK_SERVER_PORT`: Port to listen on (default: 8080)
//! - `PARBOOK_SERVER_DB`: Path to the SQLite database (default: ~/.local/share/parbook-server/parbook.db)
//! - `PARBOOK_SERVER_CONFIG`: Path to config file (default: ~/.config/parbook-server/config.yaml)
//!
//! # Config File Format
//!
//! ```yaml
//! api_keys:
//!   - key: "your-secret-key-here"
//!     player_id: "00000000-0000-0000-0000-000000000000"
//!     role: "player"
//! ```
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint (no auth required)
//! - `GET /api/scores?event_id=`: Scores for an event
//! - `PUT /api/scores`: Upsert one scorecard cell
//! - `POST /api/scores`: Upsert a batch of cells
//! - `GET /api/penalty?event_id=&player_id=`: Penalty total for a round
//! - `GET /api/events?year=`: Events for a year
//! - `GET /api/events/{id}`: Full event payload
//! - `GET /api/season?year=`: Season summary
//! - `GET /api/rankings/annual?year=`: Annual points ranking

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;

use server::{app, ApiKeyStore, AppState, ServerStorage};

#[derive(Parser)]
#[command(name = "parbook-server")]
#[command(version)]
#[command(about = "Score server for a golf society", long_about = None)]
struct Cli {
    /// Insert demo data (course, players, events) on startup
    #[arg(long)]
    seed: bool,
}

/// Server configuration
#[derive(Debug, Clone)]
struct Config {
    /// Port to listen on
    port: u16,
    /// Path to the SQLite database
    db_path: PathBuf,
    /// Path to config file
    config_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let port = std::env::var("PARBOOK_SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let db_path = std::env::var("PARBOOK_SERVER_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("parbook-server")
                    .join("parbook.db")
            });

        let config_path = std::env::var("PARBOOK_SERVER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("parbook-server")
                    .join("config.yaml")
            });

        Self {
            port,
            db_path,
            config_path,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parbook_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    tracing::info!("Database: {}", config.db_path.display());
    tracing::info!("Config file: {}", config.config_path.display());

    let storage = match ServerStorage::open(config.db_path).await {
        Ok(storage) => storage,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    if cli.seed {
        if let Err(e) = storage.seed_demo().await {
            tracing::error!("Failed to seed demo data: {}", e);
            std::process::exit(1);
        }
    }

    // Load API keys
    let api_keys = Arc::new(ApiKeyStore::load(&config.config_path));

    let state = AppState { storage, api_keys };
    let app = app(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
