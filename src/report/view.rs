//! Report View
//! The filtered slice of a report, shaped for the grids, charts and exports.

use crate::data::{Category, MatchResult, MatchStatus};
use crate::pipeline::Report;
use crate::report::filter::FilterSpec;
use crate::report::table::{Cell, Table};
use crate::stats::{
    Aggregator, AttributionReport, Overview, PeriodBucket, PeriodCounts, QualifiedReport,
    SummaryRow,
};
use std::fmt;
use tracing::debug;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The tables a view can produce. Sheet names double as CSV table names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReportKind {
    #[default]
    MatchResults,
    DsaSummary,
    QualifiedCustomers,
    Conversion,
    DepositAttribution,
    NotOnboarded,
}

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        ReportKind::MatchResults,
        ReportKind::DsaSummary,
        ReportKind::QualifiedCustomers,
        ReportKind::Conversion,
        ReportKind::DepositAttribution,
        ReportKind::NotOnboarded,
    ];

    pub fn sheet_name(self) -> &'static str {
        match self {
            ReportKind::MatchResults => "Match_Results",
            ReportKind::DsaSummary => "DSA_Summary",
            ReportKind::QualifiedCustomers => "Qualified_Customers",
            ReportKind::Conversion => "DSA_Conversion",
            ReportKind::DepositAttribution => "Deposit_Attribution",
            ReportKind::NotOnboarded => "Not_Onboarded",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ReportKind::MatchResults => "Match Results",
            ReportKind::DsaSummary => "DSA Summary",
            ReportKind::QualifiedCustomers => "Qualified Customers",
            ReportKind::Conversion => "Conversion",
            ReportKind::DepositAttribution => "Deposit Attribution",
            ReportKind::NotOnboarded => "Not Onboarded",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl std::str::FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        ReportKind::ALL
            .into_iter()
            .find(|kind| {
                let name: String = kind
                    .sheet_name()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect();
                name.to_ascii_lowercase() == key
            })
            .ok_or_else(|| format!("unknown report '{}'", s))
    }
}

/// Filtered results plus everything derived from them.
#[derive(Debug, Clone)]
pub struct ReportView {
    pub results: Vec<MatchResult>,
    pub summary: Vec<SummaryRow>,
    /// Overview of the filtered results
    pub overview: Overview,
    pub status_distribution: Vec<(MatchStatus, usize)>,
    pub timeline: Vec<PeriodCounts>,
    pub qualified: QualifiedReport,
    pub attribution: AttributionReport,
    pub bucket: PeriodBucket,
    pub precision: usize,
}

impl ReportView {
    pub fn build(report: &Report, filter: &FilterSpec, precision: usize) -> Self {
        let results = filter.apply_results(&report.outcome.results);
        let summary = filter.apply_summary(&report.summary);
        let allows = |dsa: &str| filter.allows_dsa(dsa);

        debug!(
            results = results.len(),
            summary_rows = summary.len(),
            "built filtered view"
        );

        Self {
            overview: Aggregator::overview(&results),
            status_distribution: Aggregator::status_distribution(&results),
            timeline: Aggregator::counts_over_time(&results, report.bucket),
            qualified: report.qualified.filtered(allows),
            attribution: report.attribution.filtered(allows),
            results,
            summary,
            bucket: report.bucket,
            precision,
        }
    }

    /// Nothing survived the filter.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty() && self.summary.is_empty()
    }

    /// Qualified customers per DSA, for the bar chart.
    pub fn customers_per_dsa(&self) -> Vec<(String, usize)> {
        self.qualified
            .per_dsa
            .iter()
            .map(|d| (d.dsa_id.clone(), d.customers))
            .collect()
    }

    pub fn commission_due(&self) -> f64 {
        self.qualified.total_payment() + self.attribution.total_payment()
    }

    pub fn table(&self, kind: ReportKind) -> Table {
        match kind {
            ReportKind::MatchResults => self.match_table(),
            ReportKind::DsaSummary => self.summary_table(),
            ReportKind::QualifiedCustomers => self.qualified_table(),
            ReportKind::Conversion => self.conversion_table(),
            ReportKind::DepositAttribution => self.attribution_table(),
            ReportKind::NotOnboarded => self.not_onboarded_table(),
        }
    }

    pub fn tables(&self) -> Vec<Table> {
        ReportKind::ALL.iter().map(|&kind| self.table(kind)).collect()
    }

    fn match_table(&self) -> Table {
        let mut table = Table::new(
            ReportKind::MatchResults.sheet_name(),
            &[
                "DSA ID",
                "Status",
                "Categories",
                "Onboarding",
                "Deposit",
                "Ticket",
                "Scan",
                "Deposit Amount",
                "Duplicates",
                "Last Activity",
            ],
        );
        for result in &self.results {
            let mut row = vec![
                Cell::text(&result.dsa_id),
                Cell::text(result.status.label()),
                Cell::count(result.present_count()),
            ];
            // Retained record per category: its timestamp, or a bare marker
            row.extend(Category::ALL.iter().map(|&category| match result.record(category) {
                Some(record) => Cell::text(
                    record
                        .timestamp
                        .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
                        .unwrap_or_else(|| "Yes".to_string()),
                ),
                None => Cell::Empty,
            }));
            row.push(Cell::Float(result.tallies[Category::Deposit].amount));
            row.push(Cell::count(result.duplicates()));
            row.push(Cell::opt_text(result.activity_date().map(|d| d.to_string())));
            table.push(row);
        }
        table
    }

    fn summary_table(&self) -> Table {
        let mut table = Table::new(
            ReportKind::DsaSummary.sheet_name(),
            &[
                "DSA ID",
                "Period",
                "Onboarding",
                "Deposit",
                "Ticket",
                "Scan",
                "Total Records",
                "Full Match",
                "Match Rate %",
                "Status",
                "Deposit Amount",
                "Ticket Amount",
                "Scan Amount",
                "Last Activity",
            ],
        );
        for row in &self.summary {
            let mut cells = vec![
                Cell::text(&row.dsa_id),
                Cell::opt_text(row.period.map(|d| d.to_string())),
            ];
            cells.extend(row.counts.0.iter().map(|&n| Cell::count(n)));
            cells.extend([
                Cell::count(row.total_records),
                Cell::count(row.full_match),
                Cell::Float(row.match_rate() * 100.0),
                Cell::text(row.status.label()),
                Cell::Float(row.deposit_amount),
                Cell::Float(row.ticket_amount),
                Cell::Float(row.scan_amount),
                Cell::opt_text(row.last_activity.map(|d| d.to_string())),
            ]);
            table.push(cells);
        }
        table
    }

    /// Summary columns are filled on the first row of each DSA only.
    fn qualified_table(&self) -> Table {
        let mut table = Table::new(
            ReportKind::QualifiedCustomers.sheet_name(),
            &[
                "DSA ID",
                "Customer",
                "Full Name",
                "Deposited",
                "Bought Ticket",
                "Did Scan",
                "Ticket Amount",
                "Scan Amount",
                "Customer Count",
                "Deposit Count",
                "Ticket Count",
                "Scan Count",
                "Payment",
            ],
        );
        let mut previous: Option<&str> = None;
        for customer in &self.qualified.customers {
            let mut row = vec![
                Cell::text(&customer.dsa_id),
                Cell::text(&customer.customer_id),
                Cell::text(customer.customer_name.as_deref().unwrap_or("Unknown")),
                Cell::count(usize::from(customer.deposited)),
                Cell::count(usize::from(customer.bought_ticket)),
                Cell::count(usize::from(customer.did_scan)),
                Cell::Float(customer.ticket_amount),
                Cell::Float(customer.scan_amount),
            ];
            if previous != Some(customer.dsa_id.as_str()) {
                if let Some(dsa) = self
                    .qualified
                    .per_dsa
                    .iter()
                    .find(|d| d.dsa_id == customer.dsa_id)
                {
                    row.extend([
                        Cell::count(dsa.customers),
                        Cell::count(dsa.deposits),
                        Cell::count(dsa.tickets),
                        Cell::count(dsa.scans),
                        Cell::Float(dsa.payment),
                    ]);
                }
            }
            previous = Some(customer.dsa_id.as_str());
            table.push(row);
        }
        table
    }

    fn conversion_table(&self) -> Table {
        let mut table = Table::new(
            ReportKind::Conversion.sheet_name(),
            &[
                "DSA ID",
                "Customers",
                "Deposited",
                "Bought Ticket",
                "Did Scan",
                "Ticket Amount",
                "Scan Amount",
                "Ticket Conversion %",
                "Scan Conversion %",
                "Deposit Conversion %",
            ],
        );
        for dsa in &self.qualified.conversion {
            table.push(vec![
                Cell::text(&dsa.dsa_id),
                Cell::count(dsa.customers),
                Cell::count(dsa.deposited),
                Cell::count(dsa.bought_ticket),
                Cell::count(dsa.did_scan),
                Cell::Float(dsa.ticket_amount),
                Cell::Float(dsa.scan_amount),
                Cell::Float(dsa.ticket_rate),
                Cell::Float(dsa.scan_rate),
                Cell::Float(dsa.deposit_rate),
            ]);
        }
        table
    }

    /// Summary columns are filled on the first row of each DSA only.
    fn attribution_table(&self) -> Table {
        let mut table = Table::new(
            ReportKind::DepositAttribution.sheet_name(),
            &[
                "DSA ID",
                "Customer",
                "Full Name",
                "Deposits",
                "Tickets",
                "Scans",
                "Onboarded By",
                "Match Status",
                "Customer Count",
                "Deposit Count",
                "Ticket Count",
                "Scan Count",
                "Payment",
            ],
        );
        let mut previous: Option<&str> = None;
        for customer in &self.attribution.customers {
            let mut row = vec![
                Cell::text(&customer.dsa_id),
                Cell::text(&customer.customer_id),
                Cell::text(customer.customer_name.as_deref().unwrap_or("Unknown")),
                Cell::count(customer.deposits),
                Cell::count(customer.tickets),
                Cell::count(customer.scans),
                Cell::text(customer.onboarded_by.as_deref().unwrap_or("NOT ONBOARDED")),
                Cell::text(customer.status.label()),
            ];
            if previous != Some(customer.dsa_id.as_str()) {
                if let Some(dsa) = self
                    .attribution
                    .per_dsa
                    .iter()
                    .find(|d| d.dsa_id == customer.dsa_id)
                {
                    row.extend([
                        Cell::count(dsa.customers),
                        Cell::count(dsa.deposits),
                        Cell::count(dsa.tickets),
                        Cell::count(dsa.scans),
                        Cell::Float(dsa.payment),
                    ]);
                }
            }
            previous = Some(customer.dsa_id.as_str());
            table.push(row);
        }
        table
    }

    /// Transacting customers missing from the onboarding file. No DSA is
    /// paid for them, so the payment column stays blank.
    fn not_onboarded_table(&self) -> Table {
        let mut table = Table::new(
            ReportKind::NotOnboarded.sheet_name(),
            &[
                "DSA ID",
                "Customer",
                "Full Name",
                "Deposited",
                "Bought Ticket",
                "Did Scan",
                "Ticket Amount",
                "Scan Amount",
                "Payment (should be empty)",
            ],
        );
        for customer in &self.qualified.not_onboarded {
            table.push(vec![
                Cell::text(&customer.dsa_id),
                Cell::text(&customer.customer_id),
                Cell::text(customer.customer_name.as_deref().unwrap_or("Unknown")),
                Cell::count(usize::from(customer.deposited)),
                Cell::count(usize::from(customer.bought_ticket)),
                Cell::count(usize::from(customer.did_scan)),
                Cell::Float(customer.ticket_amount),
                Cell::Float(customer.scan_amount),
                Cell::Empty,
            ]);
        }
        table
    }
}
