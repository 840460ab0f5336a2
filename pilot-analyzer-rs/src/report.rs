// pilot-analyzer-rs/src/report.rs
// Aggregation into a report value, and its text rendering.
//
// Building and rendering are separate so tests can assert on the
// numbers directly and on the rendered bytes for idempotence. All
// orderings are fully determined (count descending, then name
// ascending; day ties resolved toward the earliest day), so the same
// partition set always renders the same report.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write;

use chrono::NaiveDate;

use crate::scan::{ScanOutcome, UsageRecord};

/// Average/min/max over one numeric payload field.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericStats {
    pub average: f64,
    pub min: i64,
    pub max: i64,
}

impl NumericStats {
    fn over(values: &[i64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        Some(Self {
            average: values.iter().sum::<i64>() as f64 / values.len() as f64,
            min: *values.iter().min().unwrap(),
            max: *values.iter().max().unwrap(),
        })
    }
}

/// Headline numbers over the whole scan.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    /// First and last day carrying events, when any exist.
    pub data_period: Option<(NaiveDate, NaiveDate)>,
    pub total_events: usize,
    pub unique_sessions: usize,
    /// Busiest day and its event count; earliest day wins a tie.
    pub most_active_day: Option<(NaiveDate, usize)>,
    pub parse_errors: usize,
}

/// Session-level usage patterns.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementStats {
    pub total_sessions: usize,
    pub average_events_per_session: f64,
    pub max_events_in_session: usize,
    /// Event type to count, busiest first.
    pub event_distribution: Vec<(String, usize)>,
}

/// Roleplay interaction patterns; absent when no turns were recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleplayStats {
    pub total_turns: usize,
    pub unit_turns: Vec<(String, usize)>,
    pub message_lengths: Option<NumericStats>,
    pub turns_with_student_name: usize,
}

/// Matching activity patterns; absent when no attempts were recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingStats {
    pub total_attempts: usize,
    pub unit_attempts: Vec<(String, usize)>,
    pub pairs_per_attempt: Option<NumericStats>,
}

/// Feedback submissions; absent when none were recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackStats {
    pub total_submissions: usize,
    pub type_distribution: Vec<(String, usize)>,
    pub rating_average: Option<f64>,
    /// Counts for ratings 1 through 5, in order.
    pub rating_distribution: [usize; 5],
    /// Up to the first three messages in partition order, capped to 100
    /// characters for display.
    pub sample_messages: Vec<String>,
}

/// The full analysis result for one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct PilotReport {
    pub summary: SummaryStats,
    pub engagement: EngagementStats,
    pub roleplay: Option<RoleplayStats>,
    pub matching: Option<MatchingStats>,
    pub feedback: Option<FeedbackStats>,
}

impl PilotReport {
    /// Aggregate one scan into report statistics.
    pub fn build(scan: &ScanOutcome) -> Self {
        Self {
            summary: summarize(scan),
            engagement: engagement(&scan.records),
            roleplay: roleplay(&scan.records),
            matching: matching(&scan.records),
            feedback: feedback(&scan.records),
        }
    }

    /// Render the human-readable report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(50);

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "PILOT STUDY SUMMARY REPORT");
        let _ = writeln!(out, "{rule}");
        match self.summary.data_period {
            Some((first, last)) => {
                let _ = writeln!(out, "Data period: {first} to {last}");
            }
            None => {
                let _ = writeln!(out, "No data available for analysis.");
            }
        }
        let _ = writeln!(out, "Total events: {}", self.summary.total_events);
        let _ = writeln!(out, "Unique sessions: {}", self.summary.unique_sessions);
        if let Some((day, count)) = self.summary.most_active_day {
            let _ = writeln!(out, "Most active day: {day} ({count} events)");
        }
        let _ = writeln!(out, "Parse errors: {}", self.summary.parse_errors);

        let _ = writeln!(out, "\n=== USER ENGAGEMENT ANALYSIS ===");
        let _ = writeln!(out, "Total sessions: {}", self.engagement.total_sessions);
        let _ = writeln!(
            out,
            "Average events per session: {:.1}",
            self.engagement.average_events_per_session
        );
        let _ = writeln!(
            out,
            "Max events in a session: {}",
            self.engagement.max_events_in_session
        );
        if !self.engagement.event_distribution.is_empty() {
            let _ = writeln!(out, "\nEvent distribution:");
            for (event_type, count) in &self.engagement.event_distribution {
                let _ = writeln!(out, "  {event_type}: {count}");
            }
        }

        let _ = writeln!(out, "\n=== ROLEPLAY ANALYSIS ===");
        match &self.roleplay {
            None => {
                let _ = writeln!(out, "No roleplay interactions found.");
            }
            Some(stats) => {
                let _ = writeln!(out, "Unit usage:");
                for (unit, count) in &stats.unit_turns {
                    let _ = writeln!(out, "  {unit}: {count} turns");
                }
                if let Some(lengths) = &stats.message_lengths {
                    let _ = writeln!(out, "\nMessage length stats:");
                    let _ = writeln!(out, "  Average: {:.1} characters", lengths.average);
                    let _ = writeln!(out, "  Min: {} characters", lengths.min);
                    let _ = writeln!(out, "  Max: {} characters", lengths.max);
                }
                let ratio =
                    stats.turns_with_student_name as f64 / stats.total_turns as f64 * 100.0;
                let _ = writeln!(
                    out,
                    "\nStudent name usage: {}/{} ({ratio:.1}%)",
                    stats.turns_with_student_name, stats.total_turns
                );
            }
        }

        let _ = writeln!(out, "\n=== MATCHING ACTIVITY ANALYSIS ===");
        match &self.matching {
            None => {
                let _ = writeln!(out, "No matching attempts found.");
            }
            Some(stats) => {
                let _ = writeln!(out, "Unit usage:");
                for (unit, count) in &stats.unit_attempts {
                    let _ = writeln!(out, "  {unit}: {count} attempts");
                }
                if let Some(pairs) = &stats.pairs_per_attempt {
                    let _ = writeln!(out, "\nPairs per attempt:");
                    let _ = writeln!(out, "  Average: {:.1}", pairs.average);
                    let _ = writeln!(out, "  Min: {}", pairs.min);
                    let _ = writeln!(out, "  Max: {}", pairs.max);
                }
            }
        }

        let _ = writeln!(out, "\n=== USER FEEDBACK ANALYSIS ===");
        match &self.feedback {
            None => {
                let _ = writeln!(out, "No user feedback found.");
            }
            Some(stats) => {
                let _ = writeln!(
                    out,
                    "Total feedback submissions: {}",
                    stats.total_submissions
                );
                let _ = writeln!(out, "\nFeedback types:");
                for (fb_type, count) in &stats.type_distribution {
                    let _ = writeln!(out, "  {fb_type}: {count}");
                }
                if let Some(average) = stats.rating_average {
                    let _ = writeln!(out, "\nRatings (1-5 scale):");
                    let _ = writeln!(out, "  Average: {average:.1}");
                    let _ = write!(out, "  Distribution:");
                    for (i, count) in stats.rating_distribution.iter().enumerate() {
                        let _ = write!(out, " {}:{}", i + 1, count);
                    }
                    let _ = writeln!(out);
                }
                if !stats.sample_messages.is_empty() {
                    let _ = writeln!(out, "\nSample feedback:");
                    for (i, message) in stats.sample_messages.iter().enumerate() {
                        let _ = writeln!(out, "  {}. {message}", i + 1);
                    }
                }
            }
        }

        out
    }
}

fn summarize(scan: &ScanOutcome) -> SummaryStats {
    let mut daily_counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut sessions: HashSet<&str> = HashSet::new();
    for record in &scan.records {
        *daily_counts.entry(record.timestamp.date_naive()).or_default() += 1;
        sessions.insert(&record.session_id);
    }

    let data_period = daily_counts.keys().next().copied().zip(
        daily_counts.keys().next_back().copied(),
    );

    // Strictly-greater comparison over the date-ordered map leaves the
    // earliest day holding a tie.
    let mut most_active_day: Option<(NaiveDate, usize)> = None;
    for (day, count) in &daily_counts {
        if most_active_day.map_or(true, |(_, best)| *count > best) {
            most_active_day = Some((*day, *count));
        }
    }

    SummaryStats {
        data_period,
        total_events: scan.records.len(),
        unique_sessions: sessions.len(),
        most_active_day,
        parse_errors: scan.parse_errors,
    }
}

fn engagement(records: &[UsageRecord]) -> EngagementStats {
    let mut per_session: HashMap<&str, usize> = HashMap::new();
    let mut per_type: HashMap<&str, usize> = HashMap::new();
    for record in records {
        *per_session.entry(&record.session_id).or_default() += 1;
        *per_type.entry(&record.event_type).or_default() += 1;
    }

    let total_sessions = per_session.len();
    let average_events_per_session = if total_sessions == 0 {
        0.0
    } else {
        records.len() as f64 / total_sessions as f64
    };

    EngagementStats {
        total_sessions,
        average_events_per_session,
        max_events_in_session: per_session.values().copied().max().unwrap_or(0),
        event_distribution: sorted_counts(per_type),
    }
}

fn roleplay(records: &[UsageRecord]) -> Option<RoleplayStats> {
    let turns: Vec<&UsageRecord> = records
        .iter()
        .filter(|r| r.event_type == "roleplay_turn")
        .collect();
    if turns.is_empty() {
        return None;
    }

    let mut unit_turns: HashMap<&str, usize> = HashMap::new();
    let mut lengths = Vec::new();
    let mut with_name = 0;
    for turn in &turns {
        *unit_turns
            .entry(turn.data_str("unit_id").unwrap_or("unknown"))
            .or_default() += 1;
        lengths.push(turn.data_i64("message_length").unwrap_or(0));
        if turn.data_bool("has_student_name") {
            with_name += 1;
        }
    }

    Some(RoleplayStats {
        total_turns: turns.len(),
        unit_turns: sorted_counts(unit_turns),
        message_lengths: NumericStats::over(&lengths),
        turns_with_student_name: with_name,
    })
}

fn matching(records: &[UsageRecord]) -> Option<MatchingStats> {
    let attempts: Vec<&UsageRecord> = records
        .iter()
        .filter(|r| r.event_type == "matching_attempt")
        .collect();
    if attempts.is_empty() {
        return None;
    }

    let mut unit_attempts: HashMap<&str, usize> = HashMap::new();
    let mut pairs = Vec::new();
    for attempt in &attempts {
        *unit_attempts
            .entry(attempt.data_str("unit_id").unwrap_or("unknown"))
            .or_default() += 1;
        pairs.push(attempt.data_i64("num_pairs").unwrap_or(0));
    }

    Some(MatchingStats {
        total_attempts: attempts.len(),
        unit_attempts: sorted_counts(unit_attempts),
        pairs_per_attempt: NumericStats::over(&pairs),
    })
}

fn feedback(records: &[UsageRecord]) -> Option<FeedbackStats> {
    let submissions: Vec<&UsageRecord> = records
        .iter()
        .filter(|r| r.event_type == "user_feedback")
        .collect();
    if submissions.is_empty() {
        return None;
    }

    let mut types: HashMap<&str, usize> = HashMap::new();
    let mut ratings = Vec::new();
    let mut distribution = [0usize; 5];
    for submission in &submissions {
        *types
            .entry(submission.data_str("feedback_type").unwrap_or("general"))
            .or_default() += 1;
        if let Some(rating) = submission.data_i64("rating") {
            if (1..=5).contains(&rating) {
                ratings.push(rating);
                distribution[rating as usize - 1] += 1;
            }
        }
    }

    let rating_average = if ratings.is_empty() {
        None
    } else {
        Some(ratings.iter().sum::<i64>() as f64 / ratings.len() as f64)
    };

    let sample_messages = submissions
        .iter()
        .filter_map(|s| s.data_str("message"))
        .filter(|m| !m.is_empty())
        .take(3)
        .map(display_truncate)
        .collect();

    Some(FeedbackStats {
        total_submissions: submissions.len(),
        type_distribution: sorted_counts(types),
        rating_average,
        rating_distribution: distribution,
        sample_messages,
    })
}

/// Count descending, name ascending. Both keys fix the order fully, so
/// rendering never depends on hash iteration.
fn sorted_counts(map: HashMap<&str, usize>) -> Vec<(String, usize)> {
    let mut pairs: Vec<(String, usize)> = map
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    pairs
}

fn display_truncate(message: &str) -> String {
    if message.chars().count() > 100 {
        let capped: String = message.chars().take(100).collect();
        format!("{capped}...")
    } else {
        message.to_string()
    }
}
