//! Headless report command
//! Loads the four exports, runs the pipeline and writes the requested outputs.

use crate::charts::StaticChartRenderer;
use crate::config::DashboardConfig;
use crate::data::{Category, MatchStatus};
use crate::export::{write_csv_path, WorkbookWriter};
use crate::pipeline::Session;
use crate::report::{FilterSpec, ReportKind, ReportView};
use crate::stats::PeriodBucket;
use anyhow::{bail, Context};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

const CHART_SIZE: (u32, u32) = (900, 540);

#[derive(Args, Debug, Default)]
pub struct ReportArgs {
    /// Onboarding export
    #[arg(long, value_name = "CSV")]
    pub onboarding: Option<PathBuf>,

    /// Deposit export
    #[arg(long, value_name = "CSV")]
    pub deposit: Option<PathBuf>,

    /// Ticket export
    #[arg(long, value_name = "CSV")]
    pub ticket: Option<PathBuf>,

    /// Scan export
    #[arg(long, value_name = "CSV")]
    pub scan: Option<PathBuf>,

    /// DSA ids to keep, comma separated
    #[arg(long, value_name = "IDS")]
    pub dsa: Option<String>,

    /// First date to keep (inclusive)
    #[arg(long, value_name = "DATE")]
    pub from: Option<String>,

    /// Last date to keep (inclusive)
    #[arg(long, value_name = "DATE")]
    pub to: Option<String>,

    /// Match statuses to keep: full, partial, unmatched
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub status: Vec<MatchStatus>,

    /// Period bucket for the summary (none, day, week, month)
    #[arg(long)]
    pub bucket: Option<PeriodBucket>,

    /// Write every report to this workbook
    #[arg(long, value_name = "OUT")]
    pub xlsx: Option<PathBuf>,

    /// Write one report as CSV
    #[arg(long, value_name = "OUT")]
    pub csv: Option<PathBuf>,

    /// Report written by --csv
    #[arg(long, value_name = "REPORT", default_value = "match_results")]
    pub csv_table: ReportKind,

    /// Write the status distribution chart as PNG
    #[arg(long, value_name = "OUT")]
    pub chart: Option<PathBuf>,
}

impl ReportArgs {
    fn input(&self, category: Category) -> Option<&PathBuf> {
        match category {
            Category::Onboarding => self.onboarding.as_ref(),
            Category::Deposit => self.deposit.as_ref(),
            Category::Ticket => self.ticket.as_ref(),
            Category::Scan => self.scan.as_ref(),
        }
    }
}

pub fn run_report(args: ReportArgs, config: DashboardConfig) -> anyhow::Result<()> {
    let filter = FilterSpec::from_inputs(
        args.dsa.as_deref().unwrap_or_default(),
        args.from.as_deref().unwrap_or_default(),
        args.to.as_deref().unwrap_or_default(),
        args.status.iter().copied(),
        config.mobile_length,
    )
    .context("Invalid filter")?;
    let bucket = args.bucket.unwrap_or(config.bucket);

    let mut session = Session::new(config);
    for category in Category::ALL {
        if let Some(path) = args.input(category) {
            session
                .load_path(path, category)
                .with_context(|| format!("Failed to load {} file {}", category, path.display()))?;
        }
    }
    if !session.has_data() {
        bail!("No input files given; pass at least one of --onboarding, --deposit, --ticket, --scan");
    }

    session.process(bucket);
    let view = session
        .view(&filter)
        .context("Report was not produced")?;

    print_overview(&view);
    if view.is_empty() {
        println!("No data matches the current filters.");
    }

    if let Some(path) = &args.xlsx {
        WorkbookWriter::write(&view.tables(), view.precision, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Workbook: {}", path.display());
    }
    if let Some(path) = &args.csv {
        write_csv_path(&view.table(args.csv_table), view.precision, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("CSV ({}): {}", args.csv_table, path.display());
    }
    if let Some(path) = &args.chart {
        StaticChartRenderer::write_status_distribution(
            &view.status_distribution,
            CHART_SIZE.0,
            CHART_SIZE.1,
            path,
        )
        .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Chart: {}", path.display());
    }

    info!(dsas = view.overview.total_dsas, "report finished");
    Ok(())
}

fn print_overview(view: &ReportView) {
    for line in overview_lines(view) {
        println!("{}", line);
    }
}

fn overview_lines(view: &ReportView) -> Vec<String> {
    let o = &view.overview;
    let p = view.precision;
    let mut lines = vec![format!("Total DSAs:          {}", o.total_dsas)];
    for status in MatchStatus::ALL {
        lines.push(format!("{:<20} {}", format!("{}:", status.label()), o.status_count(status)));
    }
    lines.extend([
        format!("Match rate:          {:.*}%", p, o.match_rate * 100.0),
        format!("Duplicate rows:      {}", o.duplicates),
        format!("Deposit amount:      {:.*}", p, o.total_deposit_amount),
        format!("Mean deposit/DSA:    {:.*}", p, o.mean_deposit_per_dsa),
        format!("Median deposit/DSA:  {:.*}", p, o.median_deposit_per_dsa),
        format!("Deposit std dev:     {:.*}", p, o.deposit_std_dev),
        format!("Qualified customers: {}", view.qualified.customers.len()),
        format!("Not onboarded:       {}", view.qualified.not_onboarded.len()),
        format!("Attributed active:   {}", view.attribution.customers.len()),
        format!("Commission due:      {:.*}", p, view.commission_due()),
    ]);
    lines
}
