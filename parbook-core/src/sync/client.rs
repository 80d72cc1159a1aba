//! HTTP sync client for the Parbook score server.
//!
//! All score state lives on the server as plain JSON resources; the
//! client pushes queued mutations and pulls snapshots over REST. Every
//! request carries the caller's API key as a bearer token.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::SyncError;
use crate::models::{Event, EventDetail, PendingScoreMutation, ScoreRecord};
use crate::ranking::RankedEntry;
use crate::season::SeasonSummary;

/// Timeout for individual HTTP requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Body for a score upsert. The server keys records by
/// (event, player, hole), so resending the same body is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreUpsert {
    pub event_id: Uuid,
    pub player_id: Uuid,
    pub hole_number: u8,
    pub strokes: u32,
    pub putts: u32,
    pub updated_by: Option<Uuid>,
}

impl From<&PendingScoreMutation> for ScoreUpsert {
    fn from(m: &PendingScoreMutation) -> Self {
        Self {
            event_id: m.event_id,
            player_id: m.player_id,
            hole_number: m.hole_number,
            strokes: m.strokes,
            putts: m.putts,
            updated_by: m.updated_by,
        }
    }
}

/// Result of a batch upsert.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchOutcome {
    pub upserted: usize,
}

/// Checks whether the server is reachable. Used to decide between
/// direct delivery and the offline queue.
pub async fn check_server(server_url: &str) -> bool {
    let url = format!("{}/health", normalize_base(server_url));
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
    {
        Ok(client) => client,
        Err(_) => return false,
    };
    match client.get(&url).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

/// Sync client for the Parbook score server.
#[derive(Debug, Clone)]
pub struct SyncClient {
    server_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl SyncClient {
    /// Creates a new sync client with explicit parameters.
    pub fn new(server_url: String, api_key: String) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SyncError::HttpError(e.to_string()))?;
        Ok(Self {
            server_url,
            api_key,
            client,
        })
    }

    /// Returns the server URL.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Returns the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// All score records for an event.
    pub async fn read_scores(&self, event_id: Uuid) -> Result<Vec<ScoreRecord>, SyncError> {
        let url = format!(
            "{}?event_id={}",
            self.build_http_url("/api/scores"),
            event_id
        );
        self.get_json(&url).await
    }

    /// Upserts a single score record.
    pub async fn upsert_score(&self, upsert: &ScoreUpsert) -> Result<ScoreRecord, SyncError> {
        let url = self.build_http_url("/api/scores");
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.api_key)
            .json(upsert)
            .send()
            .await
            .map_err(connection_or_http)?;
        decode_json(response).await
    }

    /// Upserts a batch of score records in one request. Used when
    /// flushing the offline queue after a reconnect.
    pub async fn upsert_scores(&self, upserts: &[ScoreUpsert]) -> Result<BatchOutcome, SyncError> {
        let url = self.build_http_url("/api/scores");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(upserts)
            .send()
            .await
            .map_err(connection_or_http)?;
        decode_json(response).await
    }

    /// Events for a calendar year, date ascending.
    pub async fn events(&self, year: i32) -> Result<Vec<Event>, SyncError> {
        let url = format!("{}?year={}", self.build_http_url("/api/events"), year);
        self.get_json(&url).await
    }

    /// Full detail for one event: course, participants, groups, scores.
    pub async fn event_detail(&self, event_id: Uuid) -> Result<EventDetail, SyncError> {
        let url = self.build_http_url(&format!("/api/events/{}", event_id));
        self.get_json(&url).await
    }

    /// Season summary for a calendar year.
    pub async fn season(&self, year: i32) -> Result<SeasonSummary, SyncError> {
        let url = format!("{}?year={}", self.build_http_url("/api/season"), year);
        self.get_json(&url).await
    }

    /// Annual points ranking for a calendar year.
    pub async fn annual_ranking(&self, year: i32) -> Result<Vec<RankedEntry>, SyncError> {
        let url = format!(
            "{}?year={}",
            self.build_http_url("/api/rankings/annual"),
            year
        );
        self.get_json(&url).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, SyncError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(connection_or_http)?;
        decode_json(response).await
    }

    /// Builds an HTTP URL for a given path.
    fn build_http_url(&self, path: &str) -> String {
        format!("{}{}", normalize_base(&self.server_url), path)
    }
}

/// Defaults a bare host to http and strips any trailing slash.
fn normalize_base(server_url: &str) -> String {
    let base = if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
        format!("http://{}", server_url)
    } else {
        server_url.to_string()
    };
    base.trim_end_matches('/').to_string()
}

fn connection_or_http(e: reqwest::Error) -> SyncError {
    if e.is_connect() || e.is_timeout() {
        SyncError::ConnectionError(e.to_string())
    } else {
        SyncError::HttpError(e.to_string())
    }
}

async fn decode_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, SyncError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SyncError::ServerError(status.as_u16(), body));
    }
    response
        .json()
        .await
        .map_err(|e| SyncError::DecodeError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_url() {
        let client =
            SyncClient::new("http://localhost:8080".to_string(), "test-key".to_string()).unwrap();
        assert_eq!(
            client.build_http_url("/api/scores"),
            "http://localhost:8080/api/scores"
        );

        let client =
            SyncClient::new("http://localhost:8080/".to_string(), "test-key".to_string()).unwrap();
        assert_eq!(client.build_http_url("/health"), "http://localhost:8080/health");

        let client = SyncClient::new(
            "https://scores.example.com".to_string(),
            "test-key".to_string(),
        )
        .unwrap();
        assert_eq!(
            client.build_http_url("/api/season"),
            "https://scores.example.com/api/season"
        );

        let client = SyncClient::new("localhost:8080".to_string(), "test-key".to_string()).unwrap();
        assert_eq!(client.build_http_url("/health"), "http://localhost:8080/health");
    }

    #[test]
    fn test_client_accessors() {
        let client =
            SyncClient::new("http://localhost:8080".to_string(), "my-key".to_string()).unwrap();
        assert_eq!(client.server_url(), "http://localhost:8080");
        assert_eq!(client.api_key(), "my-key");
    }

    #[test]
    fn test_upsert_from_mutation() {
        let mutation = PendingScoreMutation {
            event_id: Uuid::new_v4(),
            player_id: Uuid::new_v4(),
            hole_number: 12,
            strokes: 4,
            putts: 2,
            updated_by: Some(Uuid::new_v4()),
            queued_at: chrono::Utc::now(),
        };
        let upsert = ScoreUpsert::from(&mutation);
        assert_eq!(upsert.event_id, mutation.event_id);
        assert_eq!(upsert.hole_number, 12);
        assert_eq!(upsert.strokes, 4);
        assert_eq!(upsert.updated_by, mutation.updated_by);
    }
}
