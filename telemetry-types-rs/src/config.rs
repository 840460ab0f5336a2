// telemetry-types-rs/src/config.rs
// Environment-driven configuration for the pilot telemetry subsystem

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Capture-side settings, resolved once at process startup.
///
/// Instrumented code never re-reads the environment per event; a process
/// sees one sampling decision basis for its whole lifetime.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Master switch. When off, the recorder drops everything without
    /// touching the filesystem.
    pub enabled: bool,
    /// Fraction of admitted events, within `[0.0, 1.0]`.
    pub sample_rate: f64,
    /// Directory holding the date-partitioned JSONL files.
    pub data_dir: PathBuf,
}

impl TelemetryConfig {
    /// Validating constructor; rejects sample rates outside `[0.0, 1.0]`.
    pub fn new(
        enabled: bool,
        sample_rate: f64,
        data_dir: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&sample_rate) {
            return Err(ConfigError::InvalidValue(format!(
                "ANALYTICS_SAMPLE_RATE must be within [0.0, 1.0], got {sample_rate}"
            )));
        }

        Ok(Self {
            enabled,
            sample_rate,
            data_dir: data_dir.into(),
        })
    }

    /// Read configuration from the environment.
    ///
    /// `ENABLE_ANALYTICS` defaults to on, `ANALYTICS_SAMPLE_RATE` to 1.0
    /// and `ANALYTICS_DIR` to `analytics`. A sample rate that does not
    /// parse or falls outside `[0.0, 1.0]` is a startup error rather than
    /// a silently substituted default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let enabled = std::env::var("ENABLE_ANALYTICS")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(true);

        let sample_rate = match std::env::var("ANALYTICS_SAMPLE_RATE") {
            Ok(raw) => raw.trim().parse::<f64>().map_err(|_| {
                ConfigError::InvalidValue(format!(
                    "ANALYTICS_SAMPLE_RATE must be a number within [0.0, 1.0], got {raw:?}"
                ))
            })?,
            Err(_) => 1.0,
        };

        let data_dir = std::env::var("ANALYTICS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("analytics"));

        Self::new(enabled, sample_rate, data_dir)
    }
}
