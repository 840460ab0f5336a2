//! # Telemetry Types - Pilot Study Event Schema
//!
//! Shared data model for the pilot telemetry pipeline: the JSONL record
//! shape written by the ingest side and read back by the analyzer, plus
//! the environment-driven subsystem configuration.
//!
//! Every persisted record is one `PilotEvent` serialized to a single
//! line. The `event_type` / `data` pair is an adjacently tagged enum so
//! each event type carries exactly its declared field set; unrecognized
//! keys inside `data` are dropped at deserialization.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod config;

pub use config::{ConfigError, TelemetryConfig};

/// All pilot events are recorded against this placeholder identity.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Header carrying the client's session token on ingest requests.
pub const SESSION_ID_HEADER: &str = "X-Session-ID";

/// Prefix and suffix of one day's partition file, `pilot_data_<YYYYMMDD>.jsonl`.
pub const PARTITION_FILE_PREFIX: &str = "pilot_data_";
pub const PARTITION_FILE_SUFFIX: &str = ".jsonl";

/// A single anonymized usage event, one JSONL line on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PilotEvent {
    /// Assigned by the persistence path at write time, never by clients.
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
    pub user_id: String,
    pub session_id: String,
    /// Fixed-width digest of the requester address; absent outside request context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_hash: Option<i64>,
}

impl PilotEvent {
    /// Build an event stamped with the current time and the anonymous identity.
    pub fn new(kind: EventKind, session_id: impl Into<String>, ip_hash: Option<i64>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            user_id: ANONYMOUS_USER.to_string(),
            session_id: session_id.into(),
            ip_hash,
        }
    }
}

/// Event vocabulary with the per-type payload schema.
///
/// Serializes as `"event_type": "<tag>", "data": { ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "data", rename_all = "snake_case")]
pub enum EventKind {
    PageVisit(PageVisitData),
    RoleplayTurn(RoleplayTurnData),
    MatchingAttempt(MatchingAttemptData),
    UserFeedback(UserFeedbackData),
}

impl EventKind {
    /// Wire name of the event type tag.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::PageVisit(_) => "page_visit",
            EventKind::RoleplayTurn(_) => "roleplay_turn",
            EventKind::MatchingAttempt(_) => "matching_attempt",
            EventKind::UserFeedback(_) => "user_feedback",
        }
    }
}

/// Payload of a `page_visit` event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageVisitData {
    pub page: String,
    /// Capped at 200 characters before persistence.
    pub user_agent: String,
}

/// Payload of a `roleplay_turn` event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleplayTurnData {
    pub unit_id: String,
    /// Character count of the raw message, measured before truncation.
    pub message_length: usize,
    pub has_student_name: bool,
    /// Capped at 100 characters before persistence.
    pub user_message: String,
}

/// Payload of a `matching_attempt` event. Only scalar aggregates are
/// kept; the attempted pairs themselves are never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingAttemptData {
    pub unit_id: String,
    pub num_pairs: usize,
}

/// Payload of a `user_feedback` event. The HTTP boundary accepts the
/// category under the wire key `type`; on disk it is `feedback_type`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserFeedbackData {
    pub feedback_type: String,
    /// Capped at 1000 characters before persistence.
    pub message: String,
    pub rating: Option<u8>,
    pub page: String,
    /// Character count of the raw message, measured before truncation.
    pub message_length: usize,
    /// Client-reported submission time, carried verbatim and never trusted
    /// for partitioning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<String>,
}

/// Short opaque session token, the browser-session analogue.
pub fn new_session_token() -> String {
    let mut token = Uuid::new_v4().to_string();
    token.truncate(8);
    token
}

/// File name of the partition holding events for the given UTC day.
pub fn partition_file_name(date: NaiveDate) -> String {
    format!(
        "{}{}{}",
        PARTITION_FILE_PREFIX,
        date.format("%Y%m%d"),
        PARTITION_FILE_SUFFIX
    )
}

/// Parse the UTC day out of a partition file name, if it is one.
pub fn partition_file_date(name: &str) -> Option<NaiveDate> {
    let stamp = name
        .strip_prefix(PARTITION_FILE_PREFIX)?
        .strip_suffix(PARTITION_FILE_SUFFIX)?;
    NaiveDate::parse_from_str(stamp, "%Y%m%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tagged_payload() {
        let event = PilotEvent::new(
            EventKind::PageVisit(PageVisitData {
                page: "/roleplay".to_string(),
                user_agent: "Mozilla/5.0".to_string(),
            }),
            "ab12cd34",
            Some(42),
        );

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event_type"], "page_visit");
        assert_eq!(value["data"]["page"], "/roleplay");
        assert_eq!(value["data"]["user_agent"], "Mozilla/5.0");
        assert_eq!(value["user_id"], "anonymous");
        assert_eq!(value["session_id"], "ab12cd34");
        assert_eq!(value["ip_hash"], 42);
    }

    #[test]
    fn test_absent_ip_hash_is_omitted() {
        let event = PilotEvent::new(
            EventKind::MatchingAttempt(MatchingAttemptData {
                unit_id: "unit_3".to_string(),
                num_pairs: 6,
            }),
            "ab12cd34",
            None,
        );

        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("ip_hash").is_none());
    }

    #[test]
    fn test_event_line_round_trips() {
        let event = PilotEvent::new(
            EventKind::UserFeedback(UserFeedbackData {
                feedback_type: "bug".to_string(),
                message: "The matching grid froze".to_string(),
                rating: Some(4),
                page: "/matching".to_string(),
                message_length: 22,
                client_timestamp: Some("2026-08-20T10:00:00Z".to_string()),
            }),
            "ab12cd34",
            Some(-7),
        );

        let line = serde_json::to_string(&event).unwrap();
        let parsed: PilotEvent = serde_json::from_str(&line).unwrap();

        assert_eq!(parsed.kind.name(), "user_feedback");
        assert_eq!(parsed.session_id, event.session_id);
        assert_eq!(parsed.ip_hash, Some(-7));
        match parsed.kind {
            EventKind::UserFeedback(data) => {
                assert_eq!(data.feedback_type, "bug");
                assert_eq!(data.rating, Some(4));
                assert_eq!(data.message_length, 22);
            }
            other => panic!("unexpected kind: {}", other.name()),
        }
    }

    #[test]
    fn test_unknown_payload_keys_are_dropped() {
        let line = r#"{"timestamp":"2026-08-20T10:00:00Z","event_type":"roleplay_turn","data":{"unit_id":"unit_1","message_length":12,"has_student_name":true,"user_message":"hola","debug_blob":{"nested":true}},"user_id":"anonymous","session_id":"ab12cd34"}"#;
        let parsed: PilotEvent = serde_json::from_str(line).unwrap();
        match parsed.kind {
            EventKind::RoleplayTurn(data) => {
                assert_eq!(data.unit_id, "unit_1");
                assert!(data.has_student_name);
            }
            other => panic!("unexpected kind: {}", other.name()),
        }
    }

    #[test]
    fn test_unknown_event_type_fails_to_parse() {
        let line = r#"{"timestamp":"2026-08-20T10:00:00Z","event_type":"telepathy","data":{},"user_id":"anonymous","session_id":"ab12cd34"}"#;
        assert!(serde_json::from_str::<PilotEvent>(line).is_err());
    }

    #[test]
    fn test_feedback_persists_under_the_feedback_type_key() {
        let event = PilotEvent::new(
            EventKind::UserFeedback(UserFeedbackData {
                feedback_type: "bug".to_string(),
                message: "The grid froze".to_string(),
                rating: Some(4),
                page: "/matching".to_string(),
                message_length: 14,
                client_timestamp: None,
            }),
            "ab12cd34",
            None,
        );

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["data"]["feedback_type"], "bug");
        assert!(value["data"].get("type").is_none());
    }

    #[test]
    fn test_session_tokens_are_short_and_distinct() {
        let first = new_session_token();
        let second = new_session_token();
        assert_eq!(first.len(), 8);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_partition_file_name_round_trip() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 20).unwrap();
        let name = partition_file_name(date);
        assert_eq!(name, "pilot_data_20260820.jsonl");
        assert_eq!(partition_file_date(&name), Some(date));
    }

    #[test]
    fn test_partition_file_date_rejects_other_files() {
        assert!(partition_file_date("notes.txt").is_none());
        assert!(partition_file_date("pilot_data_2026082.jsonl").is_none());
        assert!(partition_file_date("pilot_data_20261340.jsonl").is_none());
        assert!(partition_file_date("pilot_data_20260820.json").is_none());
    }
}
