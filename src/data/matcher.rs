//! Record Matcher
//! Outer-joins the four record sets on DSA identifier.

use crate::data::record::{Category, DsaRecord, PerCategory};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// How many of the four categories hold a record for a DSA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchStatus {
    /// All four categories
    FullMatch,
    /// Two or three categories
    PartialMatch,
    /// A single category
    Unmatched,
}

impl MatchStatus {
    pub const ALL: [MatchStatus; 3] = [
        MatchStatus::FullMatch,
        MatchStatus::PartialMatch,
        MatchStatus::Unmatched,
    ];

    pub fn from_present_count(present: usize) -> Self {
        match present {
            n if n >= 4 => MatchStatus::FullMatch,
            2 | 3 => MatchStatus::PartialMatch,
            _ => MatchStatus::Unmatched,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MatchStatus::FullMatch => "Full Match",
            MatchStatus::PartialMatch => "Partial Match",
            MatchStatus::Unmatched => "Unmatched",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "full" | "fullmatch" => Ok(MatchStatus::FullMatch),
            "partial" | "partialmatch" => Ok(MatchStatus::PartialMatch),
            "unmatched" | "none" => Ok(MatchStatus::Unmatched),
            _ => Err(format!("unknown match status '{}'", s.trim())),
        }
    }
}

/// Every input row seen for one DSA in one category, duplicates included.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CategoryTally {
    pub rows: usize,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub dsa_id: String,
    /// Retained record per category (most recent wins)
    pub records: PerCategory<Option<DsaRecord>>,
    pub tallies: PerCategory<CategoryTally>,
    /// The same tallies split by each row's own date; undated rows key on `None`.
    pub daily: BTreeMap<Option<NaiveDate>, PerCategory<CategoryTally>>,
    pub status: MatchStatus,
}

impl MatchResult {
    pub fn record(&self, category: Category) -> Option<&DsaRecord> {
        self.records[category].as_ref()
    }

    pub fn has(&self, category: Category) -> bool {
        self.records[category].is_some()
    }

    pub fn present_count(&self) -> usize {
        self.records.0.iter().filter(|r| r.is_some()).count()
    }

    /// Rows discarded by the tie-break for this DSA.
    pub fn duplicates(&self) -> usize {
        self.tallies
            .iter()
            .map(|(category, tally)| tally.rows.saturating_sub(usize::from(self.has(category))))
            .sum()
    }

    /// Date of the most recent retained record.
    pub fn activity_date(&self) -> Option<NaiveDate> {
        self.records
            .0
            .iter()
            .flatten()
            .filter_map(|r| r.timestamp)
            .max()
            .map(|ts| ts.date())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    /// One result per distinct DSA identifier, ascending by identifier.
    pub results: Vec<MatchResult>,
    /// Discarded duplicate rows per category.
    pub duplicates: PerCategory<usize>,
}

impl MatchOutcome {
    pub fn total_duplicates(&self) -> usize {
        self.duplicates.0.iter().sum()
    }

    pub fn status_count(&self, status: MatchStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

#[derive(Default)]
struct Slot {
    records: PerCategory<Option<DsaRecord>>,
    tallies: PerCategory<CategoryTally>,
    daily: BTreeMap<Option<NaiveDate>, PerCategory<CategoryTally>>,
}

pub struct Matcher;

impl Matcher {
    /// Outer join keyed on DSA identifier.
    ///
    /// When a category holds several rows for one identifier, the most
    /// recent timestamp wins (a missing timestamp is older than any other);
    /// equal timestamps keep the earlier row. Each discarded row counts as
    /// one duplicate.
    pub fn match_records(inputs: &PerCategory<&[DsaRecord]>) -> MatchOutcome {
        let mut slots: BTreeMap<String, Slot> = BTreeMap::new();
        let mut duplicates: PerCategory<usize> = PerCategory::default();

        for (category, records) in inputs.iter() {
            for record in records.iter() {
                let slot = slots.entry(record.dsa_id.clone()).or_default();

                let amount = record.amount.unwrap_or(0.0);
                for tally in [
                    &mut slot.tallies[category],
                    &mut slot.daily.entry(record.date()).or_default()[category],
                ] {
                    tally.rows += 1;
                    tally.amount += amount;
                }

                let kept = &mut slot.records[category];
                match kept {
                    None => *kept = Some(record.clone()),
                    Some(existing) => {
                        if record.timestamp > existing.timestamp {
                            *existing = record.clone();
                        }
                        duplicates[category] += 1;
                    }
                }
            }
        }

        let results: Vec<MatchResult> = slots
            .into_iter()
            .map(|(dsa_id, slot)| {
                let present = slot.records.0.iter().filter(|r| r.is_some()).count();
                MatchResult {
                    dsa_id,
                    records: slot.records,
                    tallies: slot.tallies,
                    daily: slot.daily,
                    status: MatchStatus::from_present_count(present),
                }
            })
            .collect();

        let outcome = MatchOutcome { results, duplicates };
        info!(
            dsas = outcome.results.len(),
            full = outcome.status_count(MatchStatus::FullMatch),
            partial = outcome.status_count(MatchStatus::PartialMatch),
            unmatched = outcome.status_count(MatchStatus::Unmatched),
            duplicates = outcome.total_duplicates(),
            "matched records"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use std::collections::BTreeSet;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn rec(id: &str, category: Category, row: usize) -> DsaRecord {
        DsaRecord::new(id, category, row)
    }

    fn run(
        onboarding: &[DsaRecord],
        deposit: &[DsaRecord],
        ticket: &[DsaRecord],
        scan: &[DsaRecord],
    ) -> MatchOutcome {
        Matcher::match_records(&PerCategory([onboarding, deposit, ticket, scan]))
    }

    #[test]
    fn partial_and_unmatched_scenario() {
        let onboarding = vec![
            rec("A1", Category::Onboarding, 0),
            rec("A2", Category::Onboarding, 1),
        ];
        let deposit = vec![rec("A1", Category::Deposit, 0)];
        let ticket = vec![rec("A1", Category::Ticket, 0)];

        let outcome = run(&onboarding, &deposit, &ticket, &[]);

        assert_eq!(outcome.results.len(), 2);
        let a1 = &outcome.results[0];
        assert_eq!(a1.dsa_id, "A1");
        assert_eq!(a1.present_count(), 3);
        assert_eq!(a1.status, MatchStatus::PartialMatch);
        assert!(!a1.has(Category::Scan));

        let a2 = &outcome.results[1];
        assert_eq!(a2.dsa_id, "A2");
        assert_eq!(a2.status, MatchStatus::Unmatched);
        assert_eq!(outcome.status_count(MatchStatus::FullMatch), 0);
        assert_eq!(outcome.total_duplicates(), 0);
    }

    #[test]
    fn full_match_requires_all_four() {
        let outcome = run(
            &[rec("B7", Category::Onboarding, 0)],
            &[rec("B7", Category::Deposit, 0)],
            &[rec("B7", Category::Ticket, 0)],
            &[rec("B7", Category::Scan, 0)],
        );
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].status, MatchStatus::FullMatch);
    }

    #[test]
    fn most_recent_duplicate_wins() {
        let deposit = vec![
            rec("A1", Category::Deposit, 0)
                .with_timestamp(ts("2024-01-01 09:00:00"))
                .with_amount(10.0),
            rec("A1", Category::Deposit, 1)
                .with_timestamp(ts("2024-01-02 09:00:00"))
                .with_amount(20.0),
        ];
        let outcome = run(&[], &deposit, &[], &[]);

        let a1 = &outcome.results[0];
        assert_eq!(a1.record(Category::Deposit).unwrap().row_index, 1);
        assert_eq!(outcome.duplicates[Category::Deposit], 1);
        assert_eq!(outcome.total_duplicates(), 1);
        assert_eq!(a1.duplicates(), 1);
        assert_eq!(a1.tallies[Category::Deposit].rows, 2);
        assert_eq!(a1.tallies[Category::Deposit].amount, 30.0);
    }

    #[test]
    fn daily_tallies_split_rows_by_their_own_date() {
        let deposit = vec![
            rec("A1", Category::Deposit, 0)
                .with_timestamp(ts("2024-01-01 09:00:00"))
                .with_amount(10.0),
            rec("A1", Category::Deposit, 1)
                .with_timestamp(ts("2024-01-01 17:30:00"))
                .with_amount(5.0),
            rec("A1", Category::Deposit, 2).with_amount(1.0),
        ];
        let outcome = run(&[], &deposit, &[], &[]);

        let daily = &outcome.results[0].daily;
        assert_eq!(daily.len(), 2);
        let jan_1 = daily[&NaiveDate::from_ymd_opt(2024, 1, 1)][Category::Deposit];
        assert_eq!(jan_1, CategoryTally { rows: 2, amount: 15.0 });
        assert_eq!(daily[&None][Category::Deposit].rows, 1);
    }

    #[test]
    fn equal_or_missing_timestamps_keep_first_row() {
        let same = ts("2024-01-01 09:00:00");
        let ticket = vec![
            rec("A1", Category::Ticket, 0).with_timestamp(same),
            rec("A1", Category::Ticket, 1).with_timestamp(same),
            rec("A1", Category::Ticket, 2),
        ];
        let scan = vec![rec("Z9", Category::Scan, 0), rec("Z9", Category::Scan, 1)];
        let outcome = run(&[], &[], &ticket, &scan);

        assert_eq!(
            outcome.results[0].record(Category::Ticket).unwrap().row_index,
            0
        );
        assert_eq!(outcome.results[1].record(Category::Scan).unwrap().row_index, 0);
        assert_eq!(outcome.duplicates[Category::Ticket], 2);
        assert_eq!(outcome.duplicates[Category::Scan], 1);
    }

    #[test]
    fn later_timestamp_beats_missing_timestamp() {
        let scan = vec![
            rec("A1", Category::Scan, 0),
            rec("A1", Category::Scan, 1).with_timestamp(ts("2023-05-05 00:00:00")),
        ];
        let outcome = run(&[], &[], &[], &scan);
        assert_eq!(outcome.results[0].record(Category::Scan).unwrap().row_index, 1);
    }

    #[test]
    fn one_result_per_distinct_identifier() {
        let onboarding: Vec<DsaRecord> = ["A", "B", "C", "A"]
            .iter()
            .enumerate()
            .map(|(i, id)| rec(id, Category::Onboarding, i))
            .collect();
        let deposit: Vec<DsaRecord> = ["C", "D"]
            .iter()
            .enumerate()
            .map(|(i, id)| rec(id, Category::Deposit, i))
            .collect();
        let scan = vec![rec("E", Category::Scan, 0)];

        let outcome = run(&onboarding, &deposit, &[], &scan);
        let distinct: BTreeSet<&str> = onboarding
            .iter()
            .chain(&deposit)
            .chain(&scan)
            .map(|r| r.dsa_id.as_str())
            .collect();
        assert_eq!(outcome.results.len(), distinct.len());

        let ids: Vec<&str> = outcome.results.iter().map(|r| r.dsa_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn empty_inputs_produce_no_results() {
        let outcome = run(&[], &[], &[], &[]);
        assert!(outcome.results.is_empty());
    }

    #[test]
    fn activity_date_is_latest_retained_timestamp() {
        let outcome = run(
            &[rec("A1", Category::Onboarding, 0).with_timestamp(ts("2024-02-01 00:00:00"))],
            &[rec("A1", Category::Deposit, 0).with_timestamp(ts("2024-03-10 12:00:00"))],
            &[],
            &[],
        );
        assert_eq!(
            outcome.results[0].activity_date(),
            NaiveDate::from_ymd_opt(2024, 3, 10)
        );
    }

    #[test]
    fn status_parses_from_cli_spellings() {
        assert_eq!("full".parse::<MatchStatus>(), Ok(MatchStatus::FullMatch));
        assert_eq!("Partial Match".parse::<MatchStatus>(), Ok(MatchStatus::PartialMatch));
        assert_eq!("unmatched".parse::<MatchStatus>(), Ok(MatchStatus::Unmatched));
        assert!("maybe".parse::<MatchStatus>().is_err());
    }
}
