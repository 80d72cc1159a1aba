//! Sync error types.

/// Errors that can occur while talking to the sync server.
///
/// All of these are treated as transient by the capture session: the
/// affected mutation stays queued and is retried on the next trigger.
#[derive(Debug)]
pub enum SyncError {
    /// Sync is not configured
    NotConfigured,
    /// Failed to reach the server
    ConnectionError(String),
    /// HTTP-level error
    HttpError(String),
    /// Server rejected the request
    ServerError(u16, String),
    /// Response body could not be decoded
    DecodeError(String),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::NotConfigured => {
                write!(f, "Sync not configured. Add server_url to config.")
            }
            SyncError::ConnectionError(e) => write!(f, "Connection error: {}", e),
            SyncError::HttpError(e) => write!(f, "HTTP error: {}", e),
            SyncError::ServerError(status, body) => {
                write!(f, "Server returned status {}: {}", status, body)
            }
            SyncError::DecodeError(e) => write!(f, "Failed to decode response: {}", e),
        }
    }
}

impl std::error::Error for SyncError {}
