// ingest-service-rs/src/lib.rs
// HTTP ingest boundary for pilot study telemetry.
//
// Accepts feedback submissions from the tutoring frontend, validates
// them, attributes them to a session token and hands them to the
// capture pipeline. Sampling is invisible to clients: an admitted and a
// sampled-out submission answer with the same acknowledgement.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

use pilot_ledger::{hash_ip, UsageRecorder, MAX_FEEDBACK_MESSAGE_CHARS};
use telemetry_types::{new_session_token, SESSION_ID_HEADER};

mod error;

pub use error::{ErrorResponse, IngestError};

pub static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

/// Feedback submissions are small; anything bigger than this is not a
/// legitimate client.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Service settings resolved from the environment at startup.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub port: u16,
    /// Origins allowed to call cross-origin. Empty keeps CORS off.
    pub allowed_origins: Vec<String>,
    /// Reported by `GET /version`.
    pub version: String,
}

impl IngestConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5050);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map(|raw| split_origins(&raw))
            .unwrap_or_default();

        let version = std::env::var("VERSION").unwrap_or_else(|_| "1.0.0".to_string());

        Self {
            port,
            allowed_origins,
            version,
        }
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recorder: Arc<UsageRecorder>,
    pub version: String,
}

/// Feedback submission body (JSON). Every field is optional on the
/// wire; missing fields fall back to neutral defaults.
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(rename = "type")]
    pub feedback_type: Option<String>,
    pub message: Option<String>,
    pub rating: Option<i64>,
    pub page: Option<String>,
    /// Client-side submission time, carried into the event payload only.
    pub timestamp: Option<String>,
}

/// Acknowledgement body for accepted feedback
#[derive(Debug, Serialize)]
pub struct FeedbackAck {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub time: String,
    pub uptime_seconds: i64,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
}

/// POST /feedback - Validate and capture a feedback submission
pub async fn submit_feedback_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            log::warn!("Rejected unreadable feedback body: {}", rejection.body_text());
            return IngestError::InvalidBody(rejection.body_text())
                .to_response()
                .into_response();
        }
    };

    let session_id = session_id_from_headers(&headers);

    let message = request.message.unwrap_or_default();
    if message.chars().count() > MAX_FEEDBACK_MESSAGE_CHARS {
        return IngestError::MessageTooLong.to_response().into_response();
    }

    let rating = match request.rating {
        None => None,
        Some(value) if (1..=5).contains(&value) => Some(value as u8),
        Some(value) => {
            log::warn!("Rejected feedback with out-of-range rating {}", value);
            return IngestError::InvalidRating.to_response().into_response();
        }
    };

    let feedback_type = request.feedback_type.unwrap_or_else(|| "general".to_string());
    let page = request.page.unwrap_or_else(|| "unknown".to_string());

    // The raw peer address is reduced to its digest here and goes no
    // further.
    let ip_hash = Some(hash_ip(&addr.ip().to_string()));

    match state.recorder.feedback(
        &session_id,
        ip_hash,
        &feedback_type,
        &message,
        rating,
        &page,
        request.timestamp.as_deref(),
    ) {
        Ok(outcome) => {
            log::info!(
                "Feedback received: type={}, session={}, outcome={:?}",
                feedback_type,
                session_id,
                outcome
            );
            (
                StatusCode::OK,
                Json(FeedbackAck {
                    status: "success".to_string(),
                    message: "Thank you for your feedback!".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            log::error!("Failed to persist feedback: {}", e);
            IngestError::Persistence(e).to_response().into_response()
        }
    }
}

/// GET /health - Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        time: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        uptime_seconds: START_TIME.elapsed().as_secs() as i64,
    })
}

/// GET /version - Deployed service version
pub async fn version_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(VersionResponse {
        version: state.version.clone(),
    })
}

/// GET / - Root endpoint
pub async fn root_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "Pilot Telemetry Ingest",
        "version": state.version,
        "endpoints": [
            "GET /health",
            "GET /version",
            "POST /feedback"
        ]
    }))
}

/// Build the router with its middleware stack.
pub fn app(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    let router = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/feedback", post(submit_feedback_handler))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state);

    match cors_layer(allowed_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// Narrow CORS layer over the configured origin list, or none at all.
///
/// Cross-origin browsers are only expected when a frontend origin list
/// is configured; everything else stays same-origin.
pub fn cors_layer(allowed_origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring unparseable origin in ALLOWED_ORIGINS: {origin:?}");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([CONTENT_TYPE, HeaderName::from_static("x-session-id")]),
    )
}

fn session_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .unwrap_or_else(new_session_token)
}
