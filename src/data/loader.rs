//! CSV Data Loader Module
//! Parses one uploaded CSV per category into typed records using Polars.
//!
//! All columns are read as text so identifiers such as mobile numbers keep
//! their leading zeros; typed fields are parsed per row afterwards.

use crate::config::{ColumnAliases, DashboardConfig, SchemaConfig};
use crate::data::record::{Category, DsaRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("{category} file is missing required column '{column}'")]
    MissingColumn { category: Category, column: String },
}

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub category: Category,
    pub source: Option<PathBuf>,
    pub columns: Vec<String>,
    /// Valid records in input order.
    pub records: Vec<DsaRecord>,
    pub total_rows: usize,
    /// Rows dropped because the DSA identifier was empty.
    pub dropped_empty_id: usize,
}

impl LoadedDataset {
    /// Short status line for the UI / CLI.
    pub fn describe(&self) -> String {
        let name = self
            .source
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.category.name().to_string());
        if self.dropped_empty_id > 0 {
            format!(
                "{}: {} rows ({} dropped: empty DSA id)",
                name,
                self.records.len(),
                self.dropped_empty_id
            )
        } else {
            format!("{}: {} rows", name, self.records.len())
        }
    }
}

/// Source columns resolved from the configured aliases.
struct ResolvedColumns {
    dsa_id: String,
    customer_id: Option<String>,
    customer_name: Option<String>,
    amount: Option<String>,
    transaction_type: Option<String>,
    timestamp: Option<String>,
    entity_name: Option<String>,
}

/// Handles CSV file loading with Polars.
pub struct DataLoader {
    schema: SchemaConfig,
    mobile_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(&DashboardConfig::default())
    }
}

impl DataLoader {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            schema: config.columns.clone(),
            mobile_length: config.mobile_length,
        }
    }

    /// Load a CSV file from disk.
    pub fn load_path(&self, path: &Path, category: Category) -> Result<LoadedDataset, LoaderError> {
        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;

        let mut dataset = self.from_dataframe(&df, category)?;
        dataset.source = Some(path.to_path_buf());
        Ok(dataset)
    }

    /// Load CSV content already held in memory (e.g. an upload).
    pub fn load_bytes(&self, bytes: Vec<u8>, category: Category) -> Result<LoadedDataset, LoaderError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_ignore_errors(true)
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;

        self.from_dataframe(&df, category)
    }

    /// Convert a text DataFrame into validated records.
    pub fn from_dataframe(&self, df: &DataFrame, category: Category) -> Result<LoadedDataset, LoaderError> {
        let columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let resolved = Self::resolve_columns(&columns, self.schema.for_category(category), category)?;

        let dsa_ids = text_column(df, &resolved.dsa_id)?;
        let customer_ids = optional_text_column(df, resolved.customer_id.as_deref())?;
        let names = optional_text_column(df, resolved.customer_name.as_deref())?;
        let amounts = optional_text_column(df, resolved.amount.as_deref())?;
        let kinds = optional_text_column(df, resolved.transaction_type.as_deref())?;
        let stamps = optional_text_column(df, resolved.timestamp.as_deref())?;
        let entities = optional_text_column(df, resolved.entity_name.as_deref())?;

        let total_rows = df.height();
        let mut records = Vec::with_capacity(total_rows);
        let mut dropped_empty_id = 0;

        for (row, raw_id) in dsa_ids.iter().enumerate() {
            let dsa_id = raw_id
                .as_deref()
                .map(|v| normalize_identifier(v, self.mobile_length))
                .unwrap_or_default();
            if dsa_id.is_empty() {
                dropped_empty_id += 1;
                debug!(%category, row, "dropping row with empty DSA identifier");
                continue;
            }

            let cell = |values: &Option<Vec<Option<String>>>| -> Option<String> {
                values
                    .as_ref()
                    .and_then(|v| v[row].as_deref())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
            };

            records.push(DsaRecord {
                dsa_id,
                category,
                timestamp: cell(&stamps).as_deref().and_then(parse_timestamp),
                customer_id: cell(&customer_ids)
                    .map(|v| normalize_identifier(&v, self.mobile_length))
                    .filter(|v| !v.is_empty()),
                customer_name: cell(&names),
                amount: cell(&amounts).as_deref().and_then(parse_amount),
                transaction_type: cell(&kinds),
                entity_name: cell(&entities),
                row_index: row,
            });
        }

        if dropped_empty_id > 0 {
            warn!(%category, dropped_empty_id, "rows without DSA identifier were dropped");
        }
        info!(%category, rows = records.len(), total_rows, "loaded CSV");

        Ok(LoadedDataset {
            category,
            source: None,
            columns,
            records,
            total_rows,
            dropped_empty_id,
        })
    }

    fn resolve_columns(
        columns: &[String],
        aliases: &ColumnAliases,
        category: Category,
    ) -> Result<ResolvedColumns, LoaderError> {
        let dsa_id = find_column(columns, &aliases.dsa_id).ok_or_else(|| LoaderError::MissingColumn {
            category,
            column: aliases
                .dsa_id
                .first()
                .cloned()
                .unwrap_or_else(|| "DSA ID".to_string()),
        })?;

        Ok(ResolvedColumns {
            dsa_id,
            customer_id: find_column(columns, &aliases.customer_id),
            customer_name: find_column(columns, &aliases.customer_name),
            amount: find_column(columns, &aliases.amount),
            transaction_type: find_column(columns, &aliases.transaction_type),
            timestamp: find_column(columns, &aliases.timestamp),
            entity_name: find_column(columns, &aliases.entity_name),
        })
    }
}

/// First alias present among the headers. Exact (trimmed) matches take
/// precedence over case-insensitive ones. Returns the header as it appears
/// in the file.
fn find_column(columns: &[String], aliases: &[String]) -> Option<String> {
    aliases
        .iter()
        .find_map(|alias| columns.iter().find(|c| c.trim() == alias.trim()))
        .or_else(|| {
            aliases.iter().find_map(|alias| {
                columns
                    .iter()
                    .find(|c| c.trim().eq_ignore_ascii_case(alias.trim()))
            })
        })
        .cloned()
}

fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, LoaderError> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let values = series.str()?;
    Ok(values.into_iter().map(|v| v.map(|s| s.to_string())).collect())
}

fn optional_text_column(
    df: &DataFrame,
    name: Option<&str>,
) -> Result<Option<Vec<Option<String>>>, LoaderError> {
    name.map(|n| text_column(df, n)).transpose()
}

/// Canonical form of an identifier.
///
/// Values made only of digits and phone punctuation are reduced to their
/// digits, keeping the last `mobile_length` digits (local mobile number).
/// Anything else is only trimmed.
pub fn normalize_identifier(raw: &str, mobile_length: usize) -> String {
    let mut trimmed = raw.trim();
    // Spreadsheet exports sometimes turn numbers into floats
    if let Some(stripped) = trimmed.strip_suffix(".0") {
        if !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit()) {
            trimmed = stripped;
        }
    }

    let phone_like = trimmed.chars().any(|c| c.is_ascii_digit())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | '.' | ' '));
    if !phone_like {
        return trimmed.to_string();
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if mobile_length > 0 && digits.len() > mobile_length {
        digits[digits.len() - mobile_length..].to_string()
    } else {
        digits
    }
}

/// Parse an amount, ignoring thousands separators.
pub fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parse a timestamp in any of the accepted layouts. Plain dates map to
/// midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn load(csv: &str, category: Category) -> Result<LoadedDataset, LoaderError> {
        DataLoader::default().load_bytes(csv.as_bytes().to_vec(), category)
    }

    #[test]
    fn loads_onboarding_with_default_aliases() {
        let csv = "Customer Referrer Mobile,Mobile,Full Name,Created At\n\
                   2207001234,+220 300 1111,Awa Jallow,2024-03-01 10:00:00\n\
                   7001234,3002222,Lamin Ceesay,2024-03-02\n";
        let dataset = load(csv, Category::Onboarding).unwrap();

        assert_eq!(dataset.total_rows, 2);
        assert_eq!(dataset.dropped_empty_id, 0);
        assert_eq!(dataset.records.len(), 2);

        let first = &dataset.records[0];
        assert_eq!(first.dsa_id, "7001234");
        assert_eq!(first.customer_id.as_deref(), Some("3001111"));
        assert_eq!(first.customer_name.as_deref(), Some("Awa Jallow"));
        assert_eq!(
            first.timestamp,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(10, 0, 0)
        );
        assert_eq!(dataset.records[1].row_index, 1);
        assert_eq!(
            dataset.records[1].date(),
            NaiveDate::from_ymd_opt(2024, 3, 2)
        );
    }

    #[test]
    fn identifiers_keep_leading_zeros() {
        let csv = "Created By,Amount\n0012345,10\n";
        let dataset = load(csv, Category::Deposit).unwrap();
        assert_eq!(dataset.records[0].dsa_id, "0012345");
    }

    #[test]
    fn missing_identifier_column_rejects_file() {
        let csv = "Mobile,Full Name\n3001111,Awa\n";
        let err = load(csv, Category::Onboarding).unwrap_err();
        match err {
            LoaderError::MissingColumn { category, column } => {
                assert_eq!(category, Category::Onboarding);
                assert_eq!(column, "Customer Referrer Mobile");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_identifiers_are_dropped_and_counted() {
        let csv = "Created By,User Identifier,Amount,Transaction Type\n\
                   A1,3001111,\"1,250.50\",CR\n\
                   ,3002222,10,CR\n\
                   \"   \",3003333,10,CR\n\
                   A2,3004444,oops,DR\n";
        let dataset = load(csv, Category::Deposit).unwrap();

        assert_eq!(dataset.total_rows, 4);
        assert_eq!(dataset.dropped_empty_id, 2);
        let ids: Vec<&str> = dataset.records.iter().map(|r| r.dsa_id.as_str()).collect();
        assert_eq!(ids, vec!["A1", "A2"]);
        assert_eq!(dataset.records[0].amount, Some(1250.5));
        assert_eq!(dataset.records[0].transaction_type.as_deref(), Some("CR"));
        assert_eq!(dataset.records[1].amount, None);
        assert_eq!(dataset.records[1].row_index, 3);
        assert!(dataset.describe().contains("2 dropped"));
    }

    #[test]
    fn ticket_entity_column_is_read() {
        let csv = "Created By,User Identifier,Amount,Entity Name\n\
                   A1,3001111,5,Customer\n\
                   A1,3002222,5,Agent\n";
        let dataset = load(csv, Category::Ticket).unwrap();
        assert_eq!(dataset.records[0].entity_name.as_deref(), Some("Customer"));
        assert!(dataset.records[0].is_customer_entity());
        assert!(!dataset.records[1].is_customer_entity());
    }

    #[test]
    fn headers_match_after_trimming_and_case_folding() {
        let csv = " created by ,AMOUNT\nA1,5\n";
        let dataset = load(csv, Category::Scan).unwrap();
        assert_eq!(dataset.records[0].dsa_id, "A1");
        assert_eq!(dataset.records[0].amount, Some(5.0));
    }

    #[test]
    fn load_path_records_source() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Created By,Amount").unwrap();
        writeln!(file, "A1,10").unwrap();
        writeln!(file, "A2,20").unwrap();

        let dataset = DataLoader::default()
            .load_path(file.path(), Category::Ticket)
            .unwrap();
        assert_eq!(dataset.records.len(), 2);
        assert_eq!(dataset.source.as_deref(), Some(file.path()));
        assert_eq!(dataset.columns, vec!["Created By", "Amount"]);
    }

    #[test]
    fn normalizes_phone_like_identifiers_only() {
        assert_eq!(normalize_identifier(" 2207001234 ", 7), "7001234");
        assert_eq!(normalize_identifier("(220) 700-1234", 7), "7001234");
        assert_eq!(normalize_identifier("7001234.0", 7), "7001234");
        assert_eq!(normalize_identifier("12345", 7), "12345");
        assert_eq!(normalize_identifier("A1", 7), "A1");
        assert_eq!(normalize_identifier("DSA-007", 7), "DSA-007");
        assert_eq!(normalize_identifier("2207001234", 0), "2207001234");
        assert_eq!(normalize_identifier("   ", 7), "");
    }

    #[test]
    fn parses_timestamps_in_accepted_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-01-05 08:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-05T08:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-05T08:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("05/01/2024 08:30"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-01-05"),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }
}
