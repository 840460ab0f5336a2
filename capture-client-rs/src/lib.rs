//! # Capture Client - Feedback Submission for the Pilot Study
//!
//! Thin HTTP client used by frontends and scripts to hand feedback to
//! the telemetry ingest service. One client holds one session token for
//! its whole lifetime (the browser-session analogue), attaches it to
//! every submission and awaits the outcome so callers can tell the user
//! whether their feedback arrived.
//!
//! Submissions are never retried automatically: a rejection means the
//! input must change, a server failure is the user's call to resubmit.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use telemetry_types::{new_session_token, SESSION_ID_HEADER};

/// Configuration for the capture client
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Base URL of the ingest service.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl CaptureConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("CAPTURE_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:5050".to_string());

        let timeout_secs = std::env::var("CAPTURE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Self {
            base_url,
            timeout_secs,
        }
    }
}

/// One feedback submission as sent over the wire.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackSubmission {
    #[serde(rename = "type")]
    pub feedback_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    pub page: String,
    /// Client clock at submission time; informational only on the server.
    pub timestamp: String,
}

impl FeedbackSubmission {
    pub fn new(
        feedback_type: impl Into<String>,
        message: impl Into<String>,
        page: impl Into<String>,
    ) -> Self {
        Self {
            feedback_type: feedback_type.into(),
            message: message.into(),
            rating: None,
            page: page.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }
}

/// Feedback submission client
pub struct CaptureClient {
    config: CaptureConfig,
    http_client: reqwest::Client,
    session_token: String,
}

impl CaptureClient {
    pub fn new(config: CaptureConfig) -> Result<Self, CaptureError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            http_client,
            session_token: new_session_token(),
        })
    }

    pub fn new_default() -> Result<Self, CaptureError> {
        Self::new(CaptureConfig::from_env())
    }

    /// Session token attached to every submission from this client.
    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    /// Submit feedback and await the service's verdict.
    ///
    /// 4xx answers come back as `Rejected` (the submission itself is the
    /// problem), 5xx as `Server` (the service is), transport failures as
    /// `Http`. No retry happens in any case.
    pub async fn submit_feedback(
        &self,
        submission: &FeedbackSubmission,
    ) -> Result<(), CaptureError> {
        let url = format!("{}/feedback", self.config.base_url.trim_end_matches('/'));

        let response = self
            .http_client
            .post(&url)
            .header(SESSION_ID_HEADER, &self.session_token)
            .json(submission)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            log::debug!(
                "feedback submission acknowledged for session {}",
                self.session_token
            );
            return Ok(());
        }

        let detail = error_detail(&response.text().await.unwrap_or_default());
        if status.is_client_error() {
            Err(CaptureError::Rejected {
                status: status.as_u16(),
                detail,
            })
        } else {
            Err(CaptureError::Server {
                status: status.as_u16(),
                detail,
            })
        }
    }
}

/// Pull the `error` field out of a failure body, falling back to the
/// raw text when the body is not the expected JSON shape.
fn error_detail(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.trim().to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The service refused the submission; resubmitting the same content
    /// will not help.
    #[error("feedback rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    /// The service failed; the user may choose to resubmit.
    #[error("ingest service error ({status}): {detail}")]
    Server { status: u16, detail: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
