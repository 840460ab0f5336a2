// pilot-ledger-rs/src/lib.rs
// Capture-and-persist pipeline for pilot study usage telemetry.
//
// This crate provides the in-process recording API with strong
// invariants suitable for instrumentation call sites:
//
// - Append-only, date-partitioned JSONL on disk
// - Configurable sampling decided independently per event
// - Privacy filtering (truncation, address hashing, field allow-lists)
//   applied before anything reaches the filesystem
// - Public API:
//     * UsageRecorder::record / record_raw
//     * UsageRecorder::page_visit / roleplay_turn / matching_attempt / feedback

mod privacy;
mod recorder;
mod sampler;
mod writer;

pub use privacy::{
    hash_ip, truncate_chars, MAX_FEEDBACK_MESSAGE_CHARS, MAX_MESSAGE_PREVIEW_CHARS,
    MAX_USER_AGENT_CHARS,
};
pub use recorder::{RecordOutcome, UsageRecorder};
pub use sampler::Sampler;
pub use writer::EventWriter;

/// Errors produced by the capture pipeline.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] telemetry_types::ConfigError),
}
