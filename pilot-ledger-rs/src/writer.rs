// pilot-ledger-rs/src/writer.rs
// Append-only writer over date-partitioned JSONL files.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use telemetry_types::{partition_file_name, PilotEvent};

use crate::TelemetryError;

/// Single writer over the analytics directory.
///
/// All appends in a process funnel through one instance; the internal
/// mutex is held only for the duration of a single line write, so
/// concurrent events land as whole, non-interleaved lines. Partition
/// rollover is re-checked on every append against the event's own UTC
/// date, and the directory and day file are created lazily on first use.
pub struct EventWriter {
    data_dir: PathBuf,
    inner: Mutex<WriterInner>,
}

struct WriterInner {
    date: NaiveDate,
    file: Option<File>,
}

impl EventWriter {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            inner: Mutex::new(WriterInner {
                date: Utc::now().date_naive(),
                file: None,
            }),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the partition file for the given UTC day.
    pub fn partition_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir.join(partition_file_name(date))
    }

    /// Serialize the event and append it as one line to its partition.
    ///
    /// Failures are reported to the caller and never panic; a failed
    /// write drops the cached handle so the next append reopens cleanly.
    pub fn append(&self, event: &PilotEvent) -> Result<(), TelemetryError> {
        let mut line = serde_json::to_string(event)?.into_bytes();
        line.push(b'\n');

        let date = event.timestamp.date_naive();
        let mut inner = self.inner.lock().unwrap();

        if inner.file.is_none() || inner.date != date {
            fs::create_dir_all(&self.data_dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.partition_path(date))?;
            inner.date = date;
            inner.file = Some(file);
        }

        if let Some(file) = inner.file.as_mut() {
            // One write_all for the whole line keeps concurrent appends
            // from interleaving.
            if let Err(e) = file.write_all(&line).and_then(|_| file.flush()) {
                inner.file = None;
                return Err(e.into());
            }
        }

        Ok(())
    }
}
