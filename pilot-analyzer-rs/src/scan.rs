// pilot-analyzer-rs/src/scan.rs
// Partition discovery and lenient line-by-line loading.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use telemetry_types::partition_file_date;

use crate::{AnalyzerError, DateFilter};

/// One event line read back leniently.
///
/// Deliberately looser than the capture-side schema: the vocabulary may
/// have grown since a partition was written, so `event_type` stays a
/// plain string and `data` an untyped map. Only the three fields every
/// record must carry are required.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageRecord {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub session_id: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl UsageRecord {
    /// Scalar string field out of `data`, if present.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Scalar integer field out of `data`, if present.
    pub fn data_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(Value::as_i64)
    }

    /// Scalar boolean field out of `data`, defaulting to false.
    pub fn data_bool(&self, key: &str) -> bool {
        self.data
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Everything one scan produced: records in partition order, plus the
/// tally of lines that could not be used.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub records: Vec<UsageRecord>,
    pub parse_errors: usize,
    pub partitions_read: usize,
}

/// Read every in-range partition under `dir`, oldest day first.
///
/// Line order inside a partition is preserved. Blank lines are ignored;
/// a line that is not valid JSON or lacks a required field is counted
/// as a parse error and skipped (a truncated trailing line from a crash
/// or a concurrent append lands here); a partition file that cannot be
/// read at all is tallied once and skipped. Files in the directory that
/// are not partition files are ignored entirely. Only a missing
/// directory is an error.
pub fn load_partitions(dir: &Path, filter: &DateFilter) -> Result<ScanOutcome, AnalyzerError> {
    if !dir.is_dir() {
        return Err(AnalyzerError::MissingDirectory(dir.to_path_buf()));
    }

    let mut partitions: Vec<(NaiveDate, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(date) = partition_file_date(&name.to_string_lossy()) else {
            continue;
        };
        if filter.includes(date) {
            partitions.push((date, entry.path()));
        }
    }
    partitions.sort();

    let mut outcome = ScanOutcome::default();
    for (_, path) in partitions {
        // One unreadable partition costs its own lines, never the run;
        // the remaining files still contribute.
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!("skipping unreadable partition {}: {e}", path.display());
                outcome.parse_errors += 1;
                continue;
            }
        };
        outcome.partitions_read += 1;
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<UsageRecord>(line) {
                Ok(record) => outcome.records.push(record),
                Err(e) => {
                    log::warn!("skipping malformed line in {}: {e}", path.display());
                    outcome.parse_errors += 1;
                }
            }
        }
    }
    Ok(outcome)
}
