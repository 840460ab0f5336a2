// pilot-ledger-rs/src/recorder.rs
// Recording facade wiring configuration, sampling, privacy filtering
// and the partition writer into one call per instrumentation site.

use serde_json::Value;
use telemetry_types::{
    EventKind, MatchingAttemptData, PageVisitData, PilotEvent, RoleplayTurnData, TelemetryConfig,
    UserFeedbackData,
};

use crate::privacy::{
    self, MAX_FEEDBACK_MESSAGE_CHARS, MAX_MESSAGE_PREVIEW_CHARS, MAX_USER_AGENT_CHARS,
};
use crate::sampler::Sampler;
use crate::writer::EventWriter;
use crate::TelemetryError;

/// What happened to one submitted event.
///
/// Instrumentation sites get a definite answer instead of a silent
/// side effect; only `Persisted` means a line reached disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Written to the current day's partition.
    Persisted,
    /// Admitted nothing because the subsystem is switched off.
    Disabled,
    /// Dropped by the sampling draw.
    SampledOut,
    /// Dropped because the submission failed schema validation.
    Rejected,
}

/// In-process recording API for pilot usage events.
pub struct UsageRecorder {
    config: TelemetryConfig,
    sampler: Sampler,
    writer: EventWriter,
}

impl UsageRecorder {
    pub fn new(config: TelemetryConfig) -> Result<Self, TelemetryError> {
        let sampler = Sampler::new(config.sample_rate)?;
        let writer = EventWriter::new(config.data_dir.clone());
        Ok(Self {
            config,
            sampler,
            writer,
        })
    }

    /// Construct from environment configuration. Fails fast on an
    /// invalid sampling rate so misconfiguration surfaces at startup.
    pub fn from_env() -> Result<Self, TelemetryError> {
        let config = TelemetryConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn writer(&self) -> &EventWriter {
        &self.writer
    }

    /// Run a typed payload through the capture pipeline.
    ///
    /// Checks the master switch, draws one sampling decision, applies
    /// the privacy caps and appends. Sampling losses are reported as an
    /// outcome, not an error; only I/O and serialization failures are
    /// `Err`.
    pub fn record(
        &self,
        session_id: &str,
        ip_hash: Option<i64>,
        kind: EventKind,
    ) -> Result<RecordOutcome, TelemetryError> {
        if !self.config.enabled {
            return Ok(RecordOutcome::Disabled);
        }
        if !self.sampler.admit() {
            log::debug!("sampled out {} event", kind.name());
            return Ok(RecordOutcome::SampledOut);
        }

        let mut kind = kind;
        privacy::enforce_limits(&mut kind);

        let event = PilotEvent::new(kind, session_id, ip_hash);
        self.writer.append(&event)?;
        log::debug!(
            "recorded {} event for session {}",
            event.kind.name(),
            event.session_id
        );
        Ok(RecordOutcome::Persisted)
    }

    /// Run a dynamically shaped submission through the capture pipeline.
    ///
    /// Submissions that fail the vocabulary or field allow-list are
    /// dropped with a warning and reported as `Rejected`.
    pub fn record_raw(
        &self,
        session_id: &str,
        ip_hash: Option<i64>,
        event_type: &str,
        data: Value,
    ) -> Result<RecordOutcome, TelemetryError> {
        if !self.config.enabled {
            return Ok(RecordOutcome::Disabled);
        }
        match privacy::sanitize_raw(event_type, data) {
            Ok(kind) => self.record(session_id, ip_hash, kind),
            Err(e) => {
                log::warn!("dropping {event_type:?} event with unrecognized shape: {e}");
                Ok(RecordOutcome::Rejected)
            }
        }
    }

    /// Record a page visit. The user agent is capped before persistence.
    pub fn page_visit(
        &self,
        session_id: &str,
        ip_hash: Option<i64>,
        page: &str,
        user_agent: &str,
    ) -> Result<RecordOutcome, TelemetryError> {
        let data = PageVisitData {
            page: page.to_string(),
            user_agent: privacy::truncate_chars(user_agent, MAX_USER_AGENT_CHARS),
        };
        self.record(session_id, ip_hash, EventKind::PageVisit(data))
    }

    /// Record one turn of a roleplay conversation. Only a capped preview
    /// of the message is kept; its full length is recorded separately.
    pub fn roleplay_turn(
        &self,
        session_id: &str,
        ip_hash: Option<i64>,
        unit_id: &str,
        user_message: &str,
        has_student_name: bool,
    ) -> Result<RecordOutcome, TelemetryError> {
        let data = RoleplayTurnData {
            unit_id: unit_id.to_string(),
            message_length: user_message.chars().count(),
            has_student_name,
            user_message: privacy::truncate_chars(user_message, MAX_MESSAGE_PREVIEW_CHARS),
        };
        self.record(session_id, ip_hash, EventKind::RoleplayTurn(data))
    }

    /// Record a matching exercise attempt.
    pub fn matching_attempt(
        &self,
        session_id: &str,
        ip_hash: Option<i64>,
        unit_id: &str,
        num_pairs: usize,
    ) -> Result<RecordOutcome, TelemetryError> {
        let data = MatchingAttemptData {
            unit_id: unit_id.to_string(),
            num_pairs,
        };
        self.record(session_id, ip_hash, EventKind::MatchingAttempt(data))
    }

    /// Record a user feedback submission. The message is capped at 1000
    /// characters; the pre-truncation length is kept alongside it.
    #[allow(clippy::too_many_arguments)]
    pub fn feedback(
        &self,
        session_id: &str,
        ip_hash: Option<i64>,
        feedback_type: &str,
        message: &str,
        rating: Option<u8>,
        page: &str,
        client_timestamp: Option<&str>,
    ) -> Result<RecordOutcome, TelemetryError> {
        let data = UserFeedbackData {
            feedback_type: feedback_type.to_string(),
            message: privacy::truncate_chars(message, MAX_FEEDBACK_MESSAGE_CHARS),
            rating,
            page: page.to_string(),
            message_length: message.chars().count(),
            client_timestamp: client_timestamp.map(str::to_string),
        };
        self.record(session_id, ip_hash, EventKind::UserFeedback(data))
    }
}
