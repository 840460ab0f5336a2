// pilot-analyzer-rs/src/lib.rs
// Offline aggregation over date-partitioned pilot telemetry files.
//
// Reads the JSONL partitions the capture side appends, reconstructs
// session and event statistics and renders a summary report. Built to
// survive imperfect data: a malformed line is tallied and skipped, a
// requested day without a partition contributes zero events, and the
// same partition set always yields the same report bytes.

mod range;
mod report;
mod scan;

pub use range::DateFilter;
pub use report::{
    EngagementStats, FeedbackStats, MatchingStats, NumericStats, PilotReport, RoleplayStats,
    SummaryStats,
};
pub use scan::{load_partitions, ScanOutcome, UsageRecord};

use std::path::PathBuf;

/// Failures that prevent any analysis at all. Everything less severe
/// is tolerated and tallied instead.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("Analytics directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Invalid date argument: {0}")]
    InvalidDateArg(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// End-to-end over the real capture pipeline: what the recorder writes,
// the analyzer reads back.
#[cfg(test)]
mod pipeline_tests {
    use super::*;
    use pilot_ledger::UsageRecorder;
    use telemetry_types::TelemetryConfig;

    fn recorder(dir: &std::path::Path) -> UsageRecorder {
        let config = TelemetryConfig::new(true, 1.0, dir).unwrap();
        UsageRecorder::new(config).unwrap()
    }

    #[test]
    fn test_recorded_events_aggregate_into_the_report() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = recorder(dir.path());

        recorder
            .page_visit("ab12cd34", None, "/roleplay", "Mozilla/5.0")
            .unwrap();
        recorder
            .roleplay_turn("ab12cd34", None, "unit_1", "Guten Morgen, Frau Weber!", false)
            .unwrap();
        recorder
            .roleplay_turn("ef56ab78", None, "unit_1", "Ich heiße Anna.", true)
            .unwrap();
        recorder
            .matching_attempt("ef56ab78", None, "unit_2", 8)
            .unwrap();
        recorder
            .feedback(
                "ab12cd34",
                None,
                "feature",
                "More listening exercises please",
                Some(5),
                "/",
                None,
            )
            .unwrap();

        let scan = load_partitions(dir.path(), &DateFilter::All).unwrap();
        assert_eq!(scan.parse_errors, 0);

        let report = PilotReport::build(&scan);
        assert_eq!(report.summary.total_events, 5);
        assert_eq!(report.summary.unique_sessions, 2);

        let roleplay = report.roleplay.unwrap();
        assert_eq!(roleplay.total_turns, 2);
        assert_eq!(roleplay.turns_with_student_name, 1);

        let matching = report.matching.unwrap();
        assert_eq!(matching.total_attempts, 1);
        assert_eq!(matching.pairs_per_attempt.unwrap().max, 8);

        let feedback = report.feedback.unwrap();
        assert_eq!(feedback.rating_average, Some(5.0));
        assert_eq!(
            feedback.sample_messages,
            vec!["More listening exercises please".to_string()]
        );
    }

    #[test]
    fn test_report_is_stable_over_an_unchanged_partition_set() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = recorder(dir.path());
        for i in 0..10 {
            recorder
                .roleplay_turn(&format!("{i:08x}"), None, "unit_3", "Hallo!", false)
                .unwrap();
        }

        let first = PilotReport::build(&load_partitions(dir.path(), &DateFilter::All).unwrap());
        let second = PilotReport::build(&load_partitions(dir.path(), &DateFilter::All).unwrap());
        assert_eq!(first, second);
        assert_eq!(first.render(), second.render());
    }

    #[test]
    fn test_corrupted_trailing_line_only_costs_one_record() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let recorder = recorder(dir.path());
        for i in 0..5 {
            recorder
                .page_visit(&format!("{i:08x}"), None, "/", "curl/8.0")
                .unwrap();
        }

        // Simulate a crash mid-write of the last line.
        let partition = std::fs::read_dir(dir.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(partition)
            .unwrap();
        write!(file, "{{\"timestamp\":\"2026-08-2").unwrap();

        let scan = load_partitions(dir.path(), &DateFilter::All).unwrap();
        assert_eq!(scan.records.len(), 5);
        assert_eq!(scan.parse_errors, 1);
        assert_eq!(PilotReport::build(&scan).summary.total_events, 5);
    }
}
