// pilot-ledger-rs/src/privacy.rs
// Privacy filtering between instrumentation and the on-disk ledger.
//
// Free-text fields are hard-capped, requester addresses are reduced to a
// fixed-width digest before they are ever stored, and dynamically shaped
// submissions pass through the per-type field allow-list. The raw
// address never appears in a persisted record or a log line.

use serde_json::Value;
use sha2::{Digest, Sha256};
use telemetry_types::EventKind;

/// Cap for auto-captured message content (roleplay previews).
pub const MAX_MESSAGE_PREVIEW_CHARS: usize = 100;
/// Cap for user agent strings on page visits.
pub const MAX_USER_AGENT_CHARS: usize = 200;
/// Cap for user-authored feedback messages.
pub const MAX_FEEDBACK_MESSAGE_CHARS: usize = 1000;

/// Truncate to at most `max_chars` characters, never splitting a
/// character. Counts characters rather than bytes so multi-byte text is
/// capped the same way short ASCII is.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

/// Reduce a requester address to a non-reversible fixed-width integer.
///
/// SHA-256 of the textual address, folded to its first eight bytes. The
/// caller is expected to drop the raw address immediately afterwards.
pub fn hash_ip(addr: &str) -> i64 {
    let digest = Sha256::digest(addr.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(prefix)
}

/// Apply the per-type truncation caps to a payload in place.
///
/// Typed construction already caps these fields; running the pass again
/// on every persist guarantees the caps hold no matter how the payload
/// was built.
pub fn enforce_limits(kind: &mut EventKind) {
    match kind {
        EventKind::PageVisit(data) => {
            cap(&mut data.user_agent, MAX_USER_AGENT_CHARS);
        }
        EventKind::RoleplayTurn(data) => {
            cap(&mut data.user_message, MAX_MESSAGE_PREVIEW_CHARS);
        }
        EventKind::MatchingAttempt(_) => {}
        EventKind::UserFeedback(data) => {
            cap(&mut data.message, MAX_FEEDBACK_MESSAGE_CHARS);
        }
    }
}

/// Validate a dynamically shaped submission against the event vocabulary
/// and field allow-lists, then apply the truncation caps.
///
/// Unknown `event_type` values and malformed field shapes are errors for
/// the caller to drop; unknown keys inside `data` are silently discarded.
pub fn sanitize_raw(event_type: &str, data: Value) -> Result<EventKind, serde_json::Error> {
    let tagged = serde_json::json!({
        "event_type": event_type,
        "data": data,
    });
    let mut kind: EventKind = serde_json::from_value(tagged)?;
    enforce_limits(&mut kind);
    Ok(kind)
}

fn cap(value: &mut String, max_chars: usize) {
    if value.chars().count() > max_chars {
        *value = truncate_chars(value, max_chars);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_types::{RoleplayTurnData, UserFeedbackData};

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let text = "ä".repeat(150);
        let capped = truncate_chars(&text, 100);
        assert_eq!(capped.chars().count(), 100);
        assert_eq!(capped, "ä".repeat(100));

        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 100), "");
    }

    #[test]
    fn test_hash_ip_is_stable_and_discriminating() {
        let first = hash_ip("203.0.113.7");
        assert_eq!(first, hash_ip("203.0.113.7"));
        assert_ne!(first, hash_ip("203.0.113.8"));
    }

    #[test]
    fn test_enforce_limits_caps_each_text_field() {
        let mut kind = EventKind::UserFeedback(UserFeedbackData {
            feedback_type: "general".to_string(),
            message: "x".repeat(1500),
            rating: None,
            page: "/".to_string(),
            message_length: 1500,
            client_timestamp: None,
        });
        enforce_limits(&mut kind);
        match kind {
            EventKind::UserFeedback(data) => {
                assert_eq!(data.message.chars().count(), MAX_FEEDBACK_MESSAGE_CHARS);
                assert_eq!(data.message_length, 1500);
            }
            other => panic!("unexpected kind: {}", other.name()),
        }

        let mut kind = EventKind::RoleplayTurn(RoleplayTurnData {
            unit_id: "unit_2".to_string(),
            message_length: 240,
            has_student_name: false,
            user_message: "y".repeat(240),
        });
        enforce_limits(&mut kind);
        match kind {
            EventKind::RoleplayTurn(data) => {
                assert_eq!(data.user_message.chars().count(), MAX_MESSAGE_PREVIEW_CHARS);
            }
            other => panic!("unexpected kind: {}", other.name()),
        }
    }

    #[test]
    fn test_sanitize_raw_accepts_known_shapes() {
        let data = serde_json::json!({
            "page": "/roleplay",
            "user_agent": "Mozilla/5.0",
        });
        let kind = sanitize_raw("page_visit", data).unwrap();
        assert_eq!(kind.name(), "page_visit");
    }

    #[test]
    fn test_sanitize_raw_drops_unknown_keys() {
        let data = serde_json::json!({
            "unit_id": "unit_4",
            "num_pairs": 8,
            "pairs_preview": [["der Hund", "the dog"]],
            "raw_ip": "203.0.113.7",
        });
        let kind = sanitize_raw("matching_attempt", data).unwrap();
        match kind {
            EventKind::MatchingAttempt(data) => {
                assert_eq!(data.unit_id, "unit_4");
                assert_eq!(data.num_pairs, 8);
            }
            other => panic!("unexpected kind: {}", other.name()),
        }
    }

    #[test]
    fn test_sanitize_raw_accepts_the_feedback_type_key() {
        let data = serde_json::json!({
            "feedback_type": "bug",
            "message": "The grid froze",
            "rating": 4,
            "page": "/matching",
            "message_length": 14,
        });
        let kind = sanitize_raw("user_feedback", data).unwrap();
        match kind {
            EventKind::UserFeedback(data) => {
                assert_eq!(data.feedback_type, "bug");
                assert_eq!(data.rating, Some(4));
            }
            other => panic!("unexpected kind: {}", other.name()),
        }
    }

    #[test]
    fn test_sanitize_raw_rejects_unknown_event_types() {
        assert!(sanitize_raw("telepathy", serde_json::json!({})).is_err());
    }

    #[test]
    fn test_sanitize_raw_rejects_malformed_fields() {
        let data = serde_json::json!({ "unit_id": "unit_4", "num_pairs": "many" });
        assert!(sanitize_raw("matching_attempt", data).is_err());
    }

    #[test]
    fn test_sanitize_raw_defaults_missing_fields() {
        let kind = sanitize_raw("page_visit", serde_json::json!({ "page": "/" })).unwrap();
        match kind {
            EventKind::PageVisit(data) => assert_eq!(data.user_agent, ""),
            other => panic!("unexpected kind: {}", other.name()),
        }
    }
}
