//! Report Pipeline
//! Loader → Matcher → Aggregator, plus the per-session state that reruns it.

use crate::config::DashboardConfig;
use crate::data::{
    Category, DataLoader, DsaRecord, LoadedDataset, LoaderError, MatchOutcome, Matcher,
    PerCategory,
};
use crate::report::{FilterSpec, ReportView};
use crate::stats::{
    deposit_attribution, qualified_customers, Aggregator, AttributionReport, PeriodBucket,
    QualifiedReport, SummaryRow,
};
use std::path::Path;
use tracing::{info, warn};

/// Everything computed from one set of loaded files, before filtering.
#[derive(Debug, Clone)]
pub struct Report {
    pub outcome: MatchOutcome,
    pub summary: Vec<SummaryRow>,
    pub bucket: PeriodBucket,
    pub qualified: QualifiedReport,
    pub attribution: AttributionReport,
}

pub fn run_pipeline(
    inputs: &PerCategory<&[DsaRecord]>,
    config: &DashboardConfig,
    bucket: PeriodBucket,
) -> Report {
    let outcome = Matcher::match_records(inputs);
    let summary = Aggregator::summarize(&outcome.results, bucket);

    Report {
        qualified: qualified_customers(inputs, config.qualified_rate),
        attribution: deposit_attribution(
            inputs,
            &config.credit_type,
            &config.debit_type,
            config.attribution_rate,
        ),
        outcome,
        summary,
        bucket,
    }
}

/// One user's loaded files and latest report. Loading or clearing a file
/// discards the report.
pub struct Session {
    config: DashboardConfig,
    loader: DataLoader,
    datasets: PerCategory<Option<LoadedDataset>>,
    report: Option<Report>,
}

impl Session {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            loader: DataLoader::new(&config),
            config,
            datasets: PerCategory::default(),
            report: None,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn load_path(&mut self, path: &Path, category: Category) -> Result<&LoadedDataset, LoaderError> {
        let dataset = self.loader.load_path(path, category)?;
        Ok(self.install(dataset))
    }

    pub fn load_bytes(&mut self, bytes: Vec<u8>, category: Category) -> Result<&LoadedDataset, LoaderError> {
        let dataset = self.loader.load_bytes(bytes, category)?;
        Ok(self.install(dataset))
    }

    fn install(&mut self, dataset: LoadedDataset) -> &LoadedDataset {
        info!(category = %dataset.category, "{}", dataset.describe());
        self.report = None;
        let category = dataset.category;
        self.datasets[category].insert(dataset)
    }

    #[cfg(test)]
    pub fn dataset(&self, category: Category) -> Option<&LoadedDataset> {
        self.datasets[category].as_ref()
    }

    pub fn has_data(&self) -> bool {
        self.datasets.0.iter().any(Option::is_some)
    }

    /// Categories without a loaded file. They are processed as empty.
    pub fn missing_categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|&c| self.datasets[c].is_none())
            .collect()
    }

    pub fn clear(&mut self) {
        self.datasets = PerCategory::default();
        self.report = None;
    }

    /// Rerun matching and aggregation over the loaded files.
    pub fn process(&mut self, bucket: PeriodBucket) -> &Report {
        let missing = self.missing_categories();
        if !missing.is_empty() {
            warn!(?missing, "processing without every category loaded");
        }

        let records: PerCategory<&[DsaRecord]> = PerCategory::from_fn(|c| {
            self.datasets[c]
                .as_ref()
                .map(|d| d.records.as_slice())
                .unwrap_or_default()
        });
        let report = run_pipeline(&records, &self.config, bucket);
        self.report.insert(report)
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    /// Filtered view of the latest report.
    pub fn view(&self, filter: &FilterSpec) -> Option<ReportView> {
        self.report
            .as_ref()
            .map(|report| ReportView::build(report, filter, self.config.display_precision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MatchStatus;
    use std::io::Write;

    const ONBOARDING: &str = "Customer Referrer Mobile,Mobile,Full Name,Created At\n\
        7000001,3000001,Awa Jallow,2024-03-01 10:00:00\n\
        7000002,3000002,Lamin Ceesay,2024-03-02 11:00:00\n";
    const DEPOSIT: &str = "Created By,User Identifier,Full Name,Amount,Transaction Type,Created At\n\
        7000001,3000001,Awa Jallow,\"1,000\",CR,2024-03-03 09:00:00\n\
        7000001,3000001,Awa Jallow,500,CR,2024-03-04 09:00:00\n";
    const TICKET: &str = "Created By,User Identifier,Amount,Transaction Type,Created At\n\
        7000001,3000001,50,DR,2024-03-05 09:00:00\n";

    fn loaded_session() -> Session {
        let mut session = Session::new(DashboardConfig::default());
        session
            .load_bytes(ONBOARDING.as_bytes().to_vec(), Category::Onboarding)
            .unwrap();
        session
            .load_bytes(DEPOSIT.as_bytes().to_vec(), Category::Deposit)
            .unwrap();
        session
            .load_bytes(TICKET.as_bytes().to_vec(), Category::Ticket)
            .unwrap();
        session
    }

    #[test]
    fn process_runs_the_whole_pipeline() {
        let mut session = loaded_session();
        assert_eq!(session.missing_categories(), vec![Category::Scan]);

        let report = session.process(PeriodBucket::None);
        assert_eq!(report.outcome.results.len(), 2);
        assert_eq!(report.outcome.duplicates[Category::Deposit], 1);
        assert_eq!(report.outcome.status_count(MatchStatus::PartialMatch), 1);
        assert_eq!(report.outcome.status_count(MatchStatus::Unmatched), 1);
        assert_eq!(report.summary[0].deposit_amount, 1500.0);

        assert_eq!(report.qualified.customers.len(), 1);
        assert_eq!(report.qualified.total_payment(), 40.0);
        assert_eq!(report.attribution.customers.len(), 1);
        assert_eq!(report.attribution.total_payment(), 25.0);
    }

    #[test]
    fn loading_discards_the_report() {
        let mut session = loaded_session();
        session.process(PeriodBucket::Week);
        assert!(session.report().is_some());

        session
            .load_bytes(TICKET.as_bytes().to_vec(), Category::Scan)
            .unwrap();
        assert!(session.report().is_none());
        assert!(session.view(&FilterSpec::default()).is_none());
    }

    #[test]
    fn rejected_file_keeps_previous_data() {
        let mut session = loaded_session();
        let err = session
            .load_bytes(b"Name,Amount\nx,1\n".to_vec(), Category::Deposit)
            .unwrap_err();
        assert!(matches!(err, LoaderError::MissingColumn { .. }));
        assert_eq!(session.dataset(Category::Deposit).unwrap().records.len(), 2);
    }

    #[test]
    fn load_path_records_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ONBOARDING.as_bytes()).unwrap();

        let mut session = Session::new(DashboardConfig::default());
        let dataset = session.load_path(file.path(), Category::Onboarding).unwrap();
        assert_eq!(dataset.records.len(), 2);
        assert_eq!(dataset.source.as_deref(), Some(file.path()));
    }

    #[test]
    fn clear_resets_everything() {
        let mut session = loaded_session();
        session.process(PeriodBucket::None);
        session.clear();

        assert!(!session.has_data());
        assert!(session.report().is_none());
        assert_eq!(session.missing_categories().len(), 4);
        assert!(session.process(PeriodBucket::None).outcome.results.is_empty());
    }

    #[test]
    fn view_applies_filter() {
        let mut session = loaded_session();
        session.process(PeriodBucket::None);

        let filter = FilterSpec {
            statuses: [MatchStatus::Unmatched].into_iter().collect(),
            ..FilterSpec::default()
        };
        let view = session.view(&filter).unwrap();
        assert_eq!(view.results.len(), 1);
        assert_eq!(view.results[0].dsa_id, "7000002");
        assert_eq!(view.overview.total_dsas, 1);
        assert_eq!(view.overview.match_rate, 0.0);
    }
}
