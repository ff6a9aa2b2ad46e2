//! Dashboard Configuration
//! Column aliases per source file, payout rates and display settings.
//!
//! Every field has a default, so a config file only needs the keys it
//! overrides.

use crate::data::Category;
use crate::stats::PeriodBucket;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Environment variable holding the config file path.
pub const CONFIG_ENV: &str = "DSA_DASHBOARD_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Accepted header names for each logical field. The first alias present in
/// a file wins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnAliases {
    pub dsa_id: Vec<String>,
    pub customer_id: Vec<String>,
    pub customer_name: Vec<String>,
    pub amount: Vec<String>,
    pub transaction_type: Vec<String>,
    pub timestamp: Vec<String>,
    /// Who a ticket was sold to; only `customer` rows count as customer tickets
    pub entity_name: Vec<String>,
}

impl ColumnAliases {
    /// Onboarding export: the referrer is the DSA, `Mobile` the customer.
    pub fn onboarding() -> Self {
        Self {
            dsa_id: names(&["Customer Referrer Mobile", "dsa_mobile", "DSA Mobile", "DSA ID"]),
            customer_id: names(&["Mobile", "customer_mobile", "Customer Mobile"]),
            customer_name: names(&["Full Name", "full_name", "Name"]),
            amount: Vec::new(),
            transaction_type: Vec::new(),
            timestamp: names(&["Created At", "Registration Date", "Date", "created_at"]),
            entity_name: Vec::new(),
        }
    }

    /// Deposit, ticket and scan exports share one layout.
    pub fn transactions() -> Self {
        Self {
            dsa_id: names(&["Created By", "dsa_mobile", "Agent Mobile", "DSA ID"]),
            customer_id: names(&[
                "User Identifier",
                "customer_mobile",
                "Customer Mobile",
                "Mobile",
            ]),
            customer_name: names(&["Full Name", "full_name", "Name"]),
            amount: names(&["Amount", "amount"]),
            transaction_type: names(&["Transaction Type", "transaction_type"]),
            timestamp: names(&["Created At", "Transaction Date", "Date", "created_at"]),
            entity_name: names(&["Entity Name", "entity_name"]),
        }
    }
}

/// One alias section as written in a config file. Keys left out keep the
/// section's built-in aliases.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AliasOverrides {
    dsa_id: Option<Vec<String>>,
    customer_id: Option<Vec<String>>,
    customer_name: Option<Vec<String>>,
    amount: Option<Vec<String>>,
    transaction_type: Option<Vec<String>>,
    timestamp: Option<Vec<String>>,
    entity_name: Option<Vec<String>>,
}

impl AliasOverrides {
    fn apply(self, base: ColumnAliases) -> ColumnAliases {
        ColumnAliases {
            dsa_id: self.dsa_id.unwrap_or(base.dsa_id),
            customer_id: self.customer_id.unwrap_or(base.customer_id),
            customer_name: self.customer_name.unwrap_or(base.customer_name),
            amount: self.amount.unwrap_or(base.amount),
            transaction_type: self.transaction_type.unwrap_or(base.transaction_type),
            timestamp: self.timestamp.unwrap_or(base.timestamp),
            entity_name: self.entity_name.unwrap_or(base.entity_name),
        }
    }
}

fn onboarding_aliases<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ColumnAliases, D::Error> {
    Ok(AliasOverrides::deserialize(deserializer)?.apply(ColumnAliases::onboarding()))
}

fn transaction_aliases<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ColumnAliases, D::Error> {
    Ok(AliasOverrides::deserialize(deserializer)?.apply(ColumnAliases::transactions()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    #[serde(deserialize_with = "onboarding_aliases")]
    pub onboarding: ColumnAliases,
    #[serde(deserialize_with = "transaction_aliases")]
    pub deposit: ColumnAliases,
    #[serde(deserialize_with = "transaction_aliases")]
    pub ticket: ColumnAliases,
    #[serde(deserialize_with = "transaction_aliases")]
    pub scan: ColumnAliases,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            onboarding: ColumnAliases::onboarding(),
            deposit: ColumnAliases::transactions(),
            ticket: ColumnAliases::transactions(),
            scan: ColumnAliases::transactions(),
        }
    }
}

impl SchemaConfig {
    pub fn for_category(&self, category: Category) -> &ColumnAliases {
        match category {
            Category::Onboarding => &self.onboarding,
            Category::Deposit => &self.deposit,
            Category::Ticket => &self.ticket,
            Category::Scan => &self.scan,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub columns: SchemaConfig,
    /// Phone-like identifiers longer than this keep only their last N digits.
    /// Zero disables truncation.
    pub mobile_length: usize,
    /// Payment per qualified customer.
    pub qualified_rate: f64,
    /// Payment per active attributed customer.
    pub attribution_rate: f64,
    pub credit_type: String,
    pub debit_type: String,
    /// Decimal places kept for floats in tables and exports.
    pub display_precision: usize,
    pub bucket: PeriodBucket,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            columns: SchemaConfig::default(),
            mobile_length: 7,
            qualified_rate: 40.0,
            attribution_rate: 25.0,
            credit_type: "CR".to_string(),
            debit_type: "DR".to_string(),
            display_precision: 2,
            bucket: PeriodBucket::None,
        }
    }
}

impl DashboardConfig {
    /// Read a JSON config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load from an explicit path, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: DashboardConfig = serde_json::from_str(
            r#"{ "qualified_rate": 50, "columns": { "scan": { "dsa_id": ["Agent"] } } }"#,
        )
        .unwrap();

        assert_eq!(config.qualified_rate, 50.0);
        assert_eq!(config.attribution_rate, 25.0);
        assert_eq!(config.mobile_length, 7);
        assert_eq!(config.columns.scan.dsa_id, vec!["Agent".to_string()]);
        // Untouched fields of an overridden section keep that section's aliases
        assert_eq!(config.columns.scan.amount, ColumnAliases::transactions().amount);
        assert_eq!(config.columns.onboarding, ColumnAliases::onboarding());
    }

    #[test]
    fn onboarding_override_keeps_onboarding_aliases() {
        let config: DashboardConfig = serde_json::from_str(
            r#"{ "columns": { "onboarding": { "dsa_id": ["Referrer"] } } }"#,
        )
        .unwrap();

        let onboarding = &config.columns.onboarding;
        assert_eq!(onboarding.dsa_id, vec!["Referrer".to_string()]);
        assert!(onboarding.timestamp.contains(&"Registration Date".to_string()));
        assert_eq!(onboarding.customer_id, ColumnAliases::onboarding().customer_id);
        assert!(onboarding.amount.is_empty());
        assert_eq!(config.columns.ticket, ColumnAliases::transactions());
    }

    #[test]
    fn load_reads_file_and_defaults_without_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "display_precision": 3, "bucket": "month" }}"#).unwrap();

        let config = DashboardConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.display_precision, 3);
        assert_eq!(config.bucket, PeriodBucket::Month);

        assert_eq!(DashboardConfig::load(None).unwrap(), DashboardConfig::default());
    }

    #[test]
    fn missing_or_malformed_file_is_an_error() {
        let missing = DashboardConfig::from_path(Path::new("/nonexistent/dsa.json"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            DashboardConfig::from_path(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn schema_lookup_by_category() {
        let schema = SchemaConfig::default();
        assert_eq!(
            schema.for_category(Category::Onboarding).dsa_id[0],
            "Customer Referrer Mobile"
        );
        assert_eq!(schema.for_category(Category::Deposit).dsa_id[0], "Created By");
    }
}
