//! Summary Aggregator Module
//! Per-DSA (optionally per-period) rollups and overall match metrics.

use crate::data::{Category, CategoryTally, MatchResult, MatchStatus, PerCategory};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Date bucketing for summary rows and the trend chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodBucket {
    #[default]
    None,
    Day,
    Week,
    Month,
}

impl PeriodBucket {
    pub const ALL: [PeriodBucket; 4] = [
        PeriodBucket::None,
        PeriodBucket::Day,
        PeriodBucket::Week,
        PeriodBucket::Month,
    ];

    /// First day of the bucket containing `date`. Weeks start on Monday.
    pub fn start_of(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            PeriodBucket::None => None,
            PeriodBucket::Day => Some(date),
            PeriodBucket::Week => {
                Some(date - Duration::days(i64::from(date.weekday().num_days_from_monday())))
            }
            PeriodBucket::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PeriodBucket::None => "None",
            PeriodBucket::Day => "Day",
            PeriodBucket::Week => "Week",
            PeriodBucket::Month => "Month",
        }
    }
}

impl fmt::Display for PeriodBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PeriodBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(PeriodBucket::None),
            "day" | "daily" => Ok(PeriodBucket::Day),
            "week" | "weekly" => Ok(PeriodBucket::Week),
            "month" | "monthly" => Ok(PeriodBucket::Month),
            other => Err(format!("unknown bucket '{}'", other)),
        }
    }
}

/// Aggregate metrics for one DSA, or one DSA within one period.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub dsa_id: String,
    /// Bucket start; `None` when unbucketed or the DSA has no dated record.
    pub period: Option<NaiveDate>,
    /// Input rows per category, duplicates included.
    pub counts: PerCategory<usize>,
    /// Match results folded into this row.
    pub total_records: usize,
    /// Folded results classified FullMatch.
    pub full_match: usize,
    pub status: MatchStatus,
    pub last_activity: Option<NaiveDate>,
    pub deposit_amount: f64,
    pub ticket_amount: f64,
    pub scan_amount: f64,
}

impl SummaryRow {
    pub fn match_rate(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            self.full_match as f64 / self.total_records as f64
        }
    }

    pub fn total_rows(&self) -> usize {
        self.counts.0.iter().sum()
    }
}

/// Overall metrics for a set of match results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overview {
    pub total_dsas: usize,
    pub full_match: usize,
    pub partial_match: usize,
    pub unmatched: usize,
    /// FullMatch / total, 0 when empty
    pub match_rate: f64,
    pub duplicates: usize,
    pub total_deposit_amount: f64,
    /// Mean deposit amount over DSAs with at least one deposit
    pub mean_deposit_per_dsa: f64,
    pub median_deposit_per_dsa: f64,
    pub deposit_std_dev: f64,
}

impl Overview {
    pub fn status_count(&self, status: MatchStatus) -> usize {
        match status {
            MatchStatus::FullMatch => self.full_match,
            MatchStatus::PartialMatch => self.partial_match,
            MatchStatus::Unmatched => self.unmatched,
        }
    }
}

/// Retained records per category within one period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodCounts {
    pub period: NaiveDate,
    pub counts: PerCategory<usize>,
}

/// Computes summaries from match results. Pure and deterministic.
pub struct Aggregator;

impl Aggregator {
    /// One row per DSA, or per DSA and period when bucketed. Each input row
    /// lands in the period of its own date, so a DSA gets a row for every
    /// period it was active in. Undated rows share a `None` period.
    pub fn summarize(results: &[MatchResult], bucket: PeriodBucket) -> Vec<SummaryRow> {
        let mut rows: BTreeMap<(String, Option<NaiveDate>), SummaryRow> = BTreeMap::new();

        for result in results {
            // period -> (tallies, latest dated row)
            let mut periods: BTreeMap<Option<NaiveDate>, (PerCategory<CategoryTally>, Option<NaiveDate>)> =
                BTreeMap::new();
            if bucket == PeriodBucket::None {
                periods.insert(None, (result.tallies.clone(), result.activity_date()));
            } else {
                for (day, tallies) in &result.daily {
                    let (sum, last) = periods
                        .entry(day.and_then(|d| bucket.start_of(d)))
                        .or_default();
                    for (category, tally) in tallies.iter() {
                        sum[category].rows += tally.rows;
                        sum[category].amount += tally.amount;
                    }
                    *last = (*last).max(*day);
                }
            }

            for (period, (tallies, last_activity)) in periods {
                let row = rows
                    .entry((result.dsa_id.clone(), period))
                    .or_insert_with(|| SummaryRow {
                        dsa_id: result.dsa_id.clone(),
                        period,
                        counts: PerCategory::default(),
                        total_records: 0,
                        full_match: 0,
                        status: result.status,
                        last_activity,
                        deposit_amount: 0.0,
                        ticket_amount: 0.0,
                        scan_amount: 0.0,
                    });

                for (category, tally) in tallies.iter() {
                    row.counts[category] += tally.rows;
                }
                row.total_records += 1;
                if result.status == MatchStatus::FullMatch {
                    row.full_match += 1;
                }
                row.last_activity = row.last_activity.max(last_activity);
                row.deposit_amount += tallies[Category::Deposit].amount;
                row.ticket_amount += tallies[Category::Ticket].amount;
                row.scan_amount += tallies[Category::Scan].amount;
            }
        }

        debug!(rows = rows.len(), %bucket, "summarized match results");
        rows.into_values().collect()
    }

    pub fn overview(results: &[MatchResult]) -> Overview {
        let total_dsas = results.len();
        let count = |status| results.iter().filter(|r| r.status == status).count();
        let full_match = count(MatchStatus::FullMatch);

        let deposits: Vec<f64> = results
            .iter()
            .map(|r| r.tallies[Category::Deposit])
            .filter(|t| t.rows > 0)
            .map(|t| t.amount)
            .collect();

        let (mean, median, std_dev) = match deposits.len() {
            0 => (0.0, 0.0, 0.0),
            1 => (deposits[0], deposits[0], 0.0),
            _ => (
                deposits.iter().mean(),
                Data::new(deposits.clone()).median(),
                deposits.iter().std_dev(),
            ),
        };

        Overview {
            total_dsas,
            full_match,
            partial_match: count(MatchStatus::PartialMatch),
            unmatched: count(MatchStatus::Unmatched),
            match_rate: if total_dsas == 0 {
                0.0
            } else {
                full_match as f64 / total_dsas as f64
            },
            duplicates: results.iter().map(MatchResult::duplicates).sum(),
            total_deposit_amount: deposits.iter().sum(),
            mean_deposit_per_dsa: mean,
            median_deposit_per_dsa: median,
            deposit_std_dev: std_dev,
        }
    }

    /// Number of results per status, in status order.
    pub fn status_distribution(results: &[MatchResult]) -> Vec<(MatchStatus, usize)> {
        MatchStatus::ALL
            .iter()
            .map(|&status| (status, results.iter().filter(|r| r.status == status).count()))
            .collect()
    }

    /// Retained records per category bucketed by each record's own date.
    /// Unbucketed requests fall back to daily buckets.
    pub fn counts_over_time(results: &[MatchResult], bucket: PeriodBucket) -> Vec<PeriodCounts> {
        let bucket = if bucket == PeriodBucket::None {
            PeriodBucket::Day
        } else {
            bucket
        };

        let mut periods: BTreeMap<NaiveDate, PerCategory<usize>> = BTreeMap::new();
        for result in results {
            for record in result.records.0.iter().flatten() {
                if let Some(period) = record.date().and_then(|d| bucket.start_of(d)) {
                    periods.entry(period).or_default()[record.category] += 1;
                }
            }
        }

        periods
            .into_iter()
            .map(|(period, counts)| PeriodCounts { period, counts })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DsaRecord, Matcher};

    fn inputs<'a>(
        onboarding: &'a [DsaRecord],
        deposit: &'a [DsaRecord],
        ticket: &'a [DsaRecord],
        scan: &'a [DsaRecord],
    ) -> PerCategory<&'a [DsaRecord]> {
        PerCategory([onboarding, deposit, ticket, scan])
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dated(id: &str, category: Category, row: usize, day: NaiveDate) -> DsaRecord {
        DsaRecord::new(id, category, row).with_timestamp(day.and_hms_opt(9, 0, 0).unwrap())
    }

    fn scenario() -> Vec<MatchResult> {
        let onboarding = vec![
            DsaRecord::new("A1", Category::Onboarding, 0),
            DsaRecord::new("A2", Category::Onboarding, 1),
        ];
        let deposit = vec![DsaRecord::new("A1", Category::Deposit, 0).with_amount(150.0)];
        let ticket = vec![DsaRecord::new("A1", Category::Ticket, 0).with_amount(20.0)];
        Matcher::match_records(&inputs(&onboarding[..], &deposit[..], &ticket[..], &[]))
            .results
    }

    #[test]
    fn scenario_match_rate_is_zero() {
        let results = scenario();
        let overview = Aggregator::overview(&results);

        assert_eq!(overview.total_dsas, 2);
        assert_eq!(overview.full_match, 0);
        assert_eq!(overview.partial_match, 1);
        assert_eq!(overview.unmatched, 1);
        assert_eq!(overview.match_rate, 0.0);
        assert_eq!(overview.total_deposit_amount, 150.0);
        assert_eq!(overview.mean_deposit_per_dsa, 150.0);
    }

    #[test]
    fn per_dsa_rows_carry_counts_and_rollups() {
        let rows = Aggregator::summarize(&scenario(), PeriodBucket::None);

        assert_eq!(rows.len(), 2);
        let a1 = &rows[0];
        assert_eq!(a1.dsa_id, "A1");
        assert_eq!(a1.counts.0, [1, 1, 1, 0]);
        assert_eq!(a1.total_records, 1);
        assert_eq!(a1.full_match, 0);
        assert_eq!(a1.status, MatchStatus::PartialMatch);
        assert_eq!(a1.deposit_amount, 150.0);
        assert_eq!(a1.ticket_amount, 20.0);
        assert_eq!(a1.period, None);

        for row in &rows {
            assert!(row.full_match <= row.total_records);
        }
    }

    #[test]
    fn duplicates_are_counted_in_rows_not_records() {
        let deposit = vec![
            DsaRecord::new("A1", Category::Deposit, 0).with_amount(10.0),
            DsaRecord::new("A1", Category::Deposit, 1).with_amount(15.0),
        ];
        let results =
            Matcher::match_records(&inputs(&[], &deposit[..], &[], &[])).results;
        let rows = Aggregator::summarize(&results, PeriodBucket::None);

        assert_eq!(rows[0].counts[Category::Deposit], 2);
        assert_eq!(rows[0].total_rows(), 2);
        assert_eq!(rows[0].deposit_amount, 25.0);
        assert_eq!(Aggregator::overview(&results).duplicates, 1);
    }

    #[test]
    fn monthly_buckets_split_activity_by_row_date() {
        let onboarding = vec![dated("A1", Category::Onboarding, 0, date(2024, 2, 10))];
        let deposit: Vec<DsaRecord> = (1..=5)
            .map(|day| dated("A1", Category::Deposit, day as usize, date(2024, 1, day)).with_amount(10.0))
            .collect();
        let results =
            Matcher::match_records(&inputs(&onboarding[..], &deposit[..], &[], &[])).results;

        let rows = Aggregator::summarize(&results, PeriodBucket::Month);
        assert_eq!(rows.len(), 2);

        let jan = &rows[0];
        assert_eq!(jan.period, Some(date(2024, 1, 1)));
        assert_eq!(jan.counts.0, [0, 5, 0, 0]);
        assert_eq!(jan.deposit_amount, 50.0);
        assert_eq!(jan.last_activity, Some(date(2024, 1, 5)));

        let feb = &rows[1];
        assert_eq!(feb.period, Some(date(2024, 2, 1)));
        assert_eq!(feb.counts.0, [1, 0, 0, 0]);
        assert_eq!(feb.deposit_amount, 0.0);

        // Both rows belong to the same partially matched DSA
        assert!(rows.iter().all(|r| r.status == MatchStatus::PartialMatch));
        assert_eq!(rows.iter().map(SummaryRow::total_rows).sum::<usize>(), 6);
    }

    #[test]
    fn undated_rows_share_the_empty_period() {
        let onboarding = vec![
            dated("B2", Category::Onboarding, 0, date(2024, 2, 3)),
            DsaRecord::new("C3", Category::Onboarding, 1),
        ];
        let deposit = vec![DsaRecord::new("B2", Category::Deposit, 0).with_amount(7.0)];
        let results =
            Matcher::match_records(&inputs(&onboarding[..], &deposit[..], &[], &[])).results;

        let rows = Aggregator::summarize(&results, PeriodBucket::Week);
        let periods: Vec<(&str, Option<NaiveDate>)> =
            rows.iter().map(|r| (r.dsa_id.as_str(), r.period)).collect();
        assert_eq!(
            periods,
            vec![
                ("B2", None),
                ("B2", Some(date(2024, 1, 29))),
                ("C3", None),
            ]
        );
        assert_eq!(rows[0].deposit_amount, 7.0);
    }

    #[test]
    fn bucket_boundaries() {
        // 2024-03-14 is a Thursday
        let d = date(2024, 3, 14);
        assert_eq!(PeriodBucket::None.start_of(d), None);
        assert_eq!(PeriodBucket::Day.start_of(d), Some(d));
        assert_eq!(PeriodBucket::Week.start_of(d), Some(date(2024, 3, 11)));
        assert_eq!(PeriodBucket::Month.start_of(d), Some(date(2024, 3, 1)));
        assert_eq!("weekly".parse::<PeriodBucket>(), Ok(PeriodBucket::Week));
    }

    #[test]
    fn counts_over_time_buckets_each_record() {
        let onboarding = vec![dated("A1", Category::Onboarding, 0, date(2024, 1, 20))];
        let deposit = vec![
            dated("A1", Category::Deposit, 0, date(2024, 2, 14)),
            dated("B2", Category::Deposit, 1, date(2024, 2, 20)),
        ];
        let results =
            Matcher::match_records(&inputs(&onboarding[..], &deposit[..], &[], &[]))
                .results;

        let timeline = Aggregator::counts_over_time(&results, PeriodBucket::Month);
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].period, date(2024, 1, 1));
        assert_eq!(timeline[0].counts[Category::Onboarding], 1);
        assert_eq!(timeline[1].counts[Category::Deposit], 2);

        let daily = Aggregator::counts_over_time(&results, PeriodBucket::None);
        assert_eq!(daily.len(), 3);
    }

    #[test]
    fn deposit_statistics_over_depositing_dsas() {
        let deposit = vec![
            DsaRecord::new("A", Category::Deposit, 0).with_amount(10.0),
            DsaRecord::new("B", Category::Deposit, 1).with_amount(20.0),
            DsaRecord::new("C", Category::Deposit, 2).with_amount(60.0),
        ];
        let onboarding = vec![DsaRecord::new("D", Category::Onboarding, 0)];
        let results =
            Matcher::match_records(&inputs(&onboarding[..], &deposit[..], &[], &[]))
                .results;

        let overview = Aggregator::overview(&results);
        assert_eq!(overview.total_dsas, 4);
        assert!((overview.mean_deposit_per_dsa - 30.0).abs() < 1e-9);
        assert!((overview.median_deposit_per_dsa - 20.0).abs() < 1e-9);
        assert!(overview.deposit_std_dev > 0.0);
        assert_eq!(overview.total_deposit_amount, 90.0);
    }

    #[test]
    fn empty_input_yields_zeroed_overview() {
        let overview = Aggregator::overview(&[]);
        assert_eq!(overview, Overview::default());
        assert!(Aggregator::summarize(&[], PeriodBucket::Week).is_empty());
        assert_eq!(
            Aggregator::status_distribution(&[]),
            vec![
                (MatchStatus::FullMatch, 0),
                (MatchStatus::PartialMatch, 0),
                (MatchStatus::Unmatched, 0),
            ]
        );
    }
}
