// pilot-analyzer-rs/src/range.rs
// Date filter parsed from the CLI argument.

use chrono::NaiveDate;

use crate::AnalyzerError;

/// Which partition days an analysis run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    /// Every partition present in the directory.
    All,
    /// One UTC day.
    Single(NaiveDate),
    /// An inclusive span of UTC days.
    Range(NaiveDate, NaiveDate),
}

impl DateFilter {
    /// Parse `YYYYMMDD` or `YYYYMMDD-YYYYMMDD`.
    ///
    /// A date that does not parse, or a range whose start falls after
    /// its end, is a startup error; nothing about the argument is
    /// repaired silently.
    pub fn parse(arg: &str) -> Result<Self, AnalyzerError> {
        let arg = arg.trim();
        match arg.split_once('-') {
            Some((start, end)) => {
                let start = parse_day(start)?;
                let end = parse_day(end)?;
                if start > end {
                    return Err(AnalyzerError::InvalidDateArg(format!(
                        "range start {start} falls after end {end}"
                    )));
                }
                Ok(Self::Range(start, end))
            }
            None => Ok(Self::Single(parse_day(arg)?)),
        }
    }

    /// Whether a partition for the given day is in scope.
    pub fn includes(&self, date: NaiveDate) -> bool {
        match self {
            Self::All => true,
            Self::Single(day) => *day == date,
            Self::Range(start, end) => (*start..=*end).contains(&date),
        }
    }
}

fn parse_day(raw: &str) -> Result<NaiveDate, AnalyzerError> {
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map_err(|_| AnalyzerError::InvalidDateArg(format!("expected YYYYMMDD, got {raw:?}")))
}
