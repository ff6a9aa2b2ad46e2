//! Filter Specification
//! DSA id set, inclusive date range and allowed match statuses.

use crate::data::{normalize_identifier, parse_timestamp, MatchResult, MatchStatus};
use crate::stats::SummaryRow;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("Invalid date '{0}'")]
    InvalidDate(String),
}

/// Inclusive range of dates. Open ends are stored as the extreme dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Bounds given in reverse are swapped.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// `None` when both ends are open.
    pub fn from_bounds(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<Self> {
        match (start, end) {
            (None, None) => None,
            (start, end) => Some(Self::new(
                start.unwrap_or(NaiveDate::MIN),
                end.unwrap_or(NaiveDate::MAX),
            )),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start == NaiveDate::MIN, self.end == NaiveDate::MAX) {
            (true, true) => write!(f, "any date"),
            (true, false) => write!(f, "until {}", self.end),
            (false, true) => write!(f, "from {}", self.start),
            (false, false) => write!(f, "{} to {}", self.start, self.end),
        }
    }
}

/// Empty sets and an absent range admit everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub dsa_ids: BTreeSet<String>,
    pub date_range: Option<DateRange>,
    pub statuses: BTreeSet<MatchStatus>,
}

fn parse_date(raw: &str) -> Result<Option<NaiveDate>, FilterError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    parse_timestamp(raw)
        .map(|ts| Some(ts.date()))
        .ok_or_else(|| FilterError::InvalidDate(raw.to_string()))
}

impl FilterSpec {
    /// Build a filter from raw control values. DSA ids are comma separated
    /// (semicolons and line breaks also work) and normalized like loaded
    /// identifiers.
    pub fn from_inputs(
        dsa_text: &str,
        from: &str,
        to: &str,
        statuses: impl IntoIterator<Item = MatchStatus>,
        mobile_length: usize,
    ) -> Result<Self, FilterError> {
        let dsa_ids = dsa_text
            .split(|c: char| c == ',' || c == ';' || c == '\n')
            .map(|id| normalize_identifier(id, mobile_length))
            .filter(|id| !id.is_empty())
            .collect();

        Ok(Self {
            dsa_ids,
            date_range: DateRange::from_bounds(parse_date(from)?, parse_date(to)?),
            statuses: statuses.into_iter().collect(),
        })
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.dsa_ids.is_empty() && self.date_range.is_none() && self.statuses.is_empty()
    }

    pub fn allows_dsa(&self, dsa_id: &str) -> bool {
        self.dsa_ids.is_empty() || self.dsa_ids.contains(dsa_id)
    }

    fn allows_status(&self, status: MatchStatus) -> bool {
        self.statuses.is_empty() || self.statuses.contains(&status)
    }

    fn allows_date(&self, date: Option<NaiveDate>) -> bool {
        match (&self.date_range, date) {
            (None, _) => true,
            (Some(range), Some(date)) => range.contains(date),
            (Some(_), None) => false,
        }
    }

    pub fn matches_result(&self, result: &MatchResult) -> bool {
        self.allows_dsa(&result.dsa_id)
            && self.allows_status(result.status)
            && self.allows_date(result.activity_date())
    }

    /// Bucketed rows are tested on their period start; unbucketed rows on
    /// their last activity.
    pub fn matches_summary(&self, row: &SummaryRow) -> bool {
        self.allows_dsa(&row.dsa_id)
            && self.allows_status(row.status)
            && self.allows_date(row.period.or(row.last_activity))
    }

    pub fn apply_results(&self, results: &[MatchResult]) -> Vec<MatchResult> {
        results
            .iter()
            .filter(|r| self.matches_result(r))
            .cloned()
            .collect()
    }

    pub fn apply_summary(&self, rows: &[SummaryRow]) -> Vec<SummaryRow> {
        rows.iter()
            .filter(|r| self.matches_summary(r))
            .cloned()
            .collect()
    }
}
