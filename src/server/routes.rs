//! HTTP surface of the score server.
//!
//! All `/api` routes require a Bearer API key; `/health` is public so
//! capture clients can probe reachability before deciding to flush.

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use parbook_core::error::ValidationError;
use parbook_core::models::Role;
use parbook_core::penalty::round_penalty;
use parbook_core::ranking::annual_ranking;
use parbook_core::season::aggregate_season;
use parbook_core::sync::ScoreUpsert;

use super::storage::{ServerStorage, ServerStorageError};

// ============================================================================
// Authentication
// ============================================================================

/// API key entry in config
#[derive(Debug, Clone, Deserialize)]
struct ApiKeyEntry {
    key: String,
    player_id: String,
    #[serde(default)]
    role: Option<String>,
}

/// Config file structure
#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    api_keys: Vec<ApiKeyEntry>,
}

/// Authenticated player info, added to request extensions after auth
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub player_id: Uuid,
    pub role: Role,
}

/// API key store - maps key -> AuthUser
#[derive(Debug, Clone, Default)]
pub struct ApiKeyStore {
    keys: HashMap<String, AuthUser>,
}

impl ApiKeyStore {
    /// Load API keys from config file
    pub fn load(config_path: &PathBuf) -> Self {
        let keys = match std::fs::read_to_string(config_path) {
            Ok(contents) => match serde_yaml::from_str::<ConfigFile>(&contents) {
                Ok(config) => {
                    let mut map = HashMap::new();
                    for entry in config.api_keys {
                        let Ok(player_id) = Uuid::parse_str(&entry.player_id) else {
                            tracing::warn!(
                                "Skipping API key with invalid player_id: {}",
                                entry.player_id
                            );
                            continue;
                        };
                        let role = entry
                            .role
                            .as_deref()
                            .and_then(|r| r.parse().ok())
                            .unwrap_or(Role::Player);
                        map.insert(entry.key, AuthUser { player_id, role });
                    }
                    tracing::info!("Loaded {} API key(s)", map.len());
                    map
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}", e);
                    HashMap::new()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}",
                    config_path.display(),
                    e
                );
                tracing::warn!("No API keys loaded - all authenticated requests will fail");
                HashMap::new()
            }
        };

        Self { keys }
    }

    /// Validate an API key and return the associated player
    fn validate(&self, key: &str) -> Option<AuthUser> {
        self.keys.get(key).cloned()
    }

    #[cfg(test)]
    fn with_key(key: &str, user: AuthUser) -> Self {
        let mut keys = HashMap::new();
        keys.insert(key.to_string(), user);
        Self { keys }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub storage: ServerStorage,
    pub api_keys: Arc<ApiKeyStore>,
}

/// Auth error response
#[derive(Serialize)]
struct AuthError {
    error: &'static str,
    message: &'static str,
}

/// Authentication middleware
async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let api_key = match auth_header {
        Some(h) if h.starts_with("Bearer ") => &h[7..],
        Some(_) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(AuthError {
                    error: "invalid_auth",
                    message: "Authorization header must use Bearer scheme",
                }),
            )
                .into_response();
        }
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(AuthError {
                    error: "missing_auth",
                    message: "Authorization header required",
                }),
            )
                .into_response();
        }
    };

    match state.api_keys.validate(api_key) {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(AuthError {
                error: "invalid_key",
                message: "Invalid API key",
            }),
        )
            .into_response(),
    }
}

// ============================================================================
// Error mapping
// ============================================================================

#[derive(Serialize)]
struct ApiError {
    error: &'static str,
    message: String,
}

fn error_response(err: ServerStorageError) -> Response {
    match err {
        ServerStorageError::Invalid(
            e @ (ValidationError::UnknownEvent(_) | ValidationError::UnknownPlayer(_)),
        ) => (
            StatusCode::NOT_FOUND,
            Json(ApiError {
                error: "not_found",
                message: e.to_string(),
            }),
        )
            .into_response(),
        ServerStorageError::Invalid(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiError {
                error: "invalid_score",
                message: e.to_string(),
            }),
        )
            .into_response(),
        ServerStorageError::DbError(e) => {
            tracing::error!("Database error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError {
                    error: "internal",
                    message: "internal server error".to_string(),
                }),
            )
                .into_response()
        }
    }
}

fn not_found(message: String) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError {
            error: "not_found",
            message,
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
struct ScoresQuery {
    event_id: Uuid,
    player_id: Option<Uuid>,
}

/// Scores for an event, optionally narrowed to one player
async fn get_scores(State(state): State<AppState>, Query(q): Query<ScoresQuery>) -> Response {
    match state.storage.scores_for_event(q.event_id).await {
        Ok(mut scores) => {
            if let Some(player_id) = q.player_id {
                scores.retain(|s| s.player_id == player_id);
            }
            Json(scores).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Upsert a single scorecard cell. The scorer recorded on the cell
/// defaults to the authenticated player.
async fn put_score(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(mut upsert): Json<ScoreUpsert>,
) -> Response {
    if upsert.updated_by.is_none() {
        upsert.updated_by = Some(user.player_id);
    }
    match state.storage.upsert_score(&upsert).await {
        Ok(record) => Json(record).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Serialize)]
struct BatchResponse {
    upserted: usize,
}

/// Upsert a batch of cells, as sent by a queue flush after a reconnect.
/// Cells are applied in order; the first failure aborts the batch.
async fn post_scores(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(upserts): Json<Vec<ScoreUpsert>>,
) -> Response {
    let mut upserted = 0;
    for mut upsert in upserts {
        if upsert.updated_by.is_none() {
            upsert.updated_by = Some(user.player_id);
        }
        if let Err(e) = state.storage.upsert_score(&upsert).await {
            return error_response(e);
        }
        upserted += 1;
    }
    Json(BatchResponse { upserted }).into_response()
}

#[derive(Deserialize)]
struct PenaltyQuery {
    event_id: Uuid,
    player_id: Uuid,
}

#[derive(Serialize)]
struct PenaltyResponse {
    penalty: i64,
}

/// Penalty total for one player's round at one event
async fn get_penalty(State(state): State<AppState>, Query(q): Query<PenaltyQuery>) -> Response {
    let event = match state.storage.event(q.event_id).await {
        Ok(Some(event)) => event,
        Ok(None) => return not_found(format!("unknown event: {}", q.event_id)),
        Err(e) => return error_response(e),
    };
    let course = match state.storage.course(event.course_id).await {
        Ok(Some(course)) => course,
        Ok(None) => return not_found(format!("unknown course: {}", event.course_id)),
        Err(e) => return error_response(e),
    };
    match state.storage.scores_for_event(q.event_id).await {
        Ok(mut scores) => {
            scores.retain(|s| s.player_id == q.player_id);
            Json(PenaltyResponse {
                penalty: round_penalty(&scores, &course),
            })
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
struct YearQuery {
    year: Option<i32>,
}

impl YearQuery {
    fn year(&self) -> i32 {
        self.year.unwrap_or_else(|| Utc::now().year())
    }
}

/// List events for a year
async fn get_events(State(state): State<AppState>, Query(q): Query<YearQuery>) -> Response {
    match state.storage.events_by_year(q.year()).await {
        Ok(events) => Json(events).into_response(),
        Err(e) => error_response(e),
    }
}

/// Full event payload for the capture client
async fn get_event_detail(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.storage.event_detail(id).await {
        Ok(Some(detail)) => Json(detail).into_response(),
        Ok(None) => not_found(format!("unknown event: {}", id)),
        Err(e) => error_response(e),
    }
}

/// Season summary, aggregated from live scores
async fn get_season(State(state): State<AppState>, Query(q): Query<YearQuery>) -> Response {
    let year = q.year();
    match state.storage.season_inputs(year).await {
        Ok((events, scores, players)) => {
            Json(aggregate_season(year, &events, &scores, &players)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Annual points ranking with tie-breaks applied
async fn get_rankings(State(state): State<AppState>, Query(q): Query<YearQuery>) -> Response {
    match state.storage.standings(q.year()).await {
        Ok(standings) => Json(annual_ranking(standings)).into_response(),
        Err(e) => error_response(e),
    }
}

// ============================================================================
// Router
// ============================================================================

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    // Public routes (no auth)
    let public_routes = Router::new().route("/health", get(health));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/scores", get(get_scores).put(put_score).post(post_scores))
        .route("/api/penalty", get(get_penalty))
        .route("/api/events", get(get_events))
        .route("/api/events/{id}", get(get_event_detail))
        .route("/api/season", get(get_season))
        .route("/api/rankings/annual", get(get_rankings))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use chrono::NaiveDate;
    use parbook_core::models::{demo_pars, Course, Event, EventType, Player, ScoreRecord};
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestServer {
        app: Router,
        event: Event,
        player: Player,
        _temp_dir: TempDir,
    }

    const TEST_KEY: &str = "test-key";

    async fn setup() -> TestServer {
        let temp_dir = TempDir::new().unwrap();
        let storage = ServerStorage::open(temp_dir.path().join("server.db"))
            .await
            .unwrap();

        let course = Course::new("Test Golf Club", demo_pars()).unwrap();
        storage.insert_course(&course).await.unwrap();
        let event = Event::new(
            "June Monthly",
            NaiveDate::from_ymd_opt(2026, 6, 14).unwrap(),
            course.id,
            EventType::Monthly,
        );
        storage.insert_event(&event).await.unwrap();
        let player = Player::new("Alice", Role::Player);
        storage.insert_player(&player).await.unwrap();
        storage.add_participant(event.id, player.id).await.unwrap();

        let api_keys = Arc::new(ApiKeyStore::with_key(
            TEST_KEY,
            AuthUser {
                player_id: player.id,
                role: Role::Player,
            },
        ));
        let app = app(AppState { storage, api_keys });

        TestServer {
            app,
            event,
            player,
            _temp_dir: temp_dir,
        }
    }

    fn authed(method: &str, uri: &str, body: Option<serde_json::Value>) -> HttpRequest<Body> {
        let builder = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", TEST_KEY));
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_requires_no_auth() {
        let server = setup().await;
        let response = server
            .app
            .oneshot(
                HttpRequest::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_rejects_missing_key() {
        let server = setup().await;
        let response = server
            .app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/events?year=2026")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_api_rejects_bad_key() {
        let server = setup().await;
        let response = server
            .app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/events?year=2026")
                    .header(header::AUTHORIZATION, "Bearer wrong-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_put_score_fills_scorer_from_auth() {
        let server = setup().await;
        let body = serde_json::json!({
            "event_id": server.event.id,
            "player_id": server.player.id,
            "hole_number": 7,
            "strokes": 5,
            "putts": 2,
            "updated_by": null,
        });
        let response = server
            .app
            .oneshot(authed("PUT", "/api/scores", Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let record: ScoreRecord = serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(record.updated_by, Some(server.player.id));
        assert_eq!(record.strokes, 5);
    }

    #[tokio::test]
    async fn test_put_score_invalid_hole_is_unprocessable() {
        let server = setup().await;
        let body = serde_json::json!({
            "event_id": server.event.id,
            "player_id": server.player.id,
            "hole_number": 19,
            "strokes": 5,
            "putts": 2,
            "updated_by": null,
        });
        let response = server
            .app
            .oneshot(authed("PUT", "/api/scores", Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_put_score_unknown_event_is_not_found() {
        let server = setup().await;
        let body = serde_json::json!({
            "event_id": Uuid::new_v4(),
            "player_id": server.player.id,
            "hole_number": 1,
            "strokes": 4,
            "putts": 2,
            "updated_by": null,
        });
        let response = server
            .app
            .oneshot(authed("PUT", "/api/scores", Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_batch_upsert_counts_cells() {
        let server = setup().await;
        let cells: Vec<serde_json::Value> = (1..=18u8)
            .map(|hole| {
                serde_json::json!({
                    "event_id": server.event.id,
                    "player_id": server.player.id,
                    "hole_number": hole,
                    "strokes": 4,
                    "putts": 2,
                    "updated_by": null,
                })
            })
            .collect();
        let response = server
            .app
            .clone()
            .oneshot(authed("POST", "/api/scores", Some(serde_json::json!(cells))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["upserted"], 18);

        let uri = format!("/api/scores?event_id={}", server.event.id);
        let response = server
            .app
            .oneshot(authed("GET", &uri, None))
            .await
            .unwrap();
        let scores: Vec<ScoreRecord> =
            serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(scores.len(), 18);
    }

    #[tokio::test]
    async fn test_penalty_endpoint() {
        let server = setup().await;
        // Hole 3 is a par 3; two strokes and no putts is a missed green.
        let body = serde_json::json!({
            "event_id": server.event.id,
            "player_id": server.player.id,
            "hole_number": 3,
            "strokes": 2,
            "putts": 0,
            "updated_by": null,
        });
        server
            .app
            .clone()
            .oneshot(authed("PUT", "/api/scores", Some(body)))
            .await
            .unwrap();

        let uri = format!(
            "/api/penalty?event_id={}&player_id={}",
            server.event.id, server.player.id
        );
        let response = server
            .app
            .oneshot(authed("GET", &uri, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["penalty"], 100);
    }

    #[tokio::test]
    async fn test_event_detail_roundtrip() {
        let server = setup().await;
        let uri = format!("/api/events/{}", server.event.id);
        let response = server
            .app
            .oneshot(authed("GET", &uri, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let detail = json_body(response).await;
        assert_eq!(detail["event"]["name"], "June Monthly");
        assert_eq!(detail["participants"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_event_detail_is_not_found() {
        let server = setup().await;
        let uri = format!("/api/events/{}", Uuid::new_v4());
        let response = server
            .app
            .oneshot(authed("GET", &uri, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_season_endpoint_aggregates_scores() {
        let server = setup().await;

        let cells: Vec<serde_json::Value> = (1..=18u8)
            .map(|hole| {
                serde_json::json!({
                    "event_id": server.event.id,
                    "player_id": server.player.id,
                    "hole_number": hole,
                    "strokes": 5,
                    "putts": 2,
                    "updated_by": null,
                })
            })
            .collect();
        server
            .app
            .clone()
            .oneshot(authed("POST", "/api/scores", Some(serde_json::json!(cells))))
            .await
            .unwrap();

        let response = server
            .app
            .oneshot(authed("GET", "/api/season?year=2026", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let summary = json_body(response).await;
        assert_eq!(summary["year"], 2026);
        assert_eq!(summary["events"].as_array().unwrap().len(), 1);
        // 18 holes at 5 strokes
        assert_eq!(summary["rankings"][0]["best_score"], 90);
    }

    #[tokio::test]
    async fn test_rankings_endpoint_orders_by_points() {
        let server = setup().await;
        let response = server
            .app
            .oneshot(authed("GET", "/api/rankings/annual?year=2026", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
