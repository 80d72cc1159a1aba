//! Auto-sync functionality for CLI commands.
//!
//! Flushes queued score mutations before read operations and after
//! write operations when `auto_sync` is enabled in the configuration.

use parbook_core::check_server;

use crate::config::Config;
use crate::sync::flush_all_pending;

/// Performs auto-sync if enabled and server is reachable.
///
/// This function:
/// 1. Checks if auto_sync is enabled in config
/// 2. Checks if sync is configured (server_url and api_key present)
/// 3. Checks if the server is reachable
/// 4. Flushes any queued score mutations
///
/// Any errors are logged and swallowed to provide graceful
/// degradation - the CLI should work offline when the server is
/// unavailable.
pub fn try_auto_sync(config: &Config) {
    if !config.sync.auto_sync || !config.sync.is_configured() {
        return;
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::warn!("Auto-sync: failed to start runtime: {}", e);
            return;
        }
    };

    rt.block_on(async {
        let url = match config.sync.server_url.as_ref() {
            Some(url) => url,
            None => return,
        };

        // Check server reachability first (fast fail)
        if !check_server(url).await {
            tracing::debug!("Auto-sync: server unreachable, skipping");
            return;
        }

        match flush_all_pending(config).await {
            Ok(totals) if totals.delivered > 0 => {
                tracing::info!("Auto-sync: delivered {} queued score(s)", totals.delivered);
            }
            Ok(totals) if totals.retained > 0 => {
                tracing::debug!("Auto-sync: {} score(s) still queued", totals.retained);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Auto-sync: {}", e);
            }
        }
    });
}
