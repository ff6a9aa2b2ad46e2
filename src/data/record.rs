//! Record Types
//! Typed rows produced by the loader, keyed by DSA identifier.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// Source file category. The declaration order is the order used by every
/// per-category array in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Onboarding,
    Deposit,
    Ticket,
    Scan,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Onboarding,
        Category::Deposit,
        Category::Ticket,
        Category::Scan,
    ];

    pub fn index(self) -> usize {
        match self {
            Category::Onboarding => 0,
            Category::Deposit => 1,
            Category::Ticket => 2,
            Category::Scan => 3,
        }
    }

    /// Human-readable name for display
    pub fn name(self) -> &'static str {
        match self {
            Category::Onboarding => "Onboarding",
            Category::Deposit => "Deposit",
            Category::Ticket => "Ticket",
            Category::Scan => "Scan",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onboarding" => Ok(Category::Onboarding),
            "deposit" => Ok(Category::Deposit),
            "ticket" => Ok(Category::Ticket),
            "scan" | "scantosend" => Ok(Category::Scan),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}

/// One value per category, indexable by [`Category`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerCategory<T>(pub [T; 4]);

impl<T> PerCategory<T> {
    pub fn from_fn(mut f: impl FnMut(Category) -> T) -> Self {
        PerCategory(Category::ALL.map(&mut f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &T)> {
        Category::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T> Index<Category> for PerCategory<T> {
    type Output = T;

    fn index(&self, category: Category) -> &T {
        &self.0[category.index()]
    }
}

impl<T> IndexMut<Category> for PerCategory<T> {
    fn index_mut(&mut self, category: Category) -> &mut T {
        &mut self.0[category.index()]
    }
}

/// A single validated row from one of the four source files.
#[derive(Debug, Clone, PartialEq)]
pub struct DsaRecord {
    pub dsa_id: String,
    pub category: Category,
    pub timestamp: Option<NaiveDateTime>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub amount: Option<f64>,
    pub transaction_type: Option<String>,
    /// Ticket buyer kind (`customer`, `agent`, ...) when the export has it
    pub entity_name: Option<String>,
    /// 0-based data row in the source file
    pub row_index: usize,
}

impl DsaRecord {
    pub fn new(dsa_id: impl Into<String>, category: Category, row_index: usize) -> Self {
        Self {
            dsa_id: dsa_id.into(),
            category,
            timestamp: None,
            customer_id: None,
            customer_name: None,
            amount: None,
            transaction_type: None,
            entity_name: None,
            row_index,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.timestamp.map(|ts| ts.date())
    }

    /// True unless an entity column names someone other than a customer.
    pub fn is_customer_entity(&self) -> bool {
        self.entity_name
            .as_deref()
            .map_or(true, |e| e.trim().eq_ignore_ascii_case("customer"))
    }

    /// Case-insensitive comparison against a transaction type code (e.g. "CR").
    pub fn is_transaction_type(&self, code: &str) -> bool {
        self.transaction_type
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case(code.trim()))
    }
}

#[cfg(test)]
impl DsaRecord {
    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_transaction_type(mut self, kind: impl Into<String>) -> Self {
        self.transaction_type = Some(kind.into());
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity_name = Some(entity.into());
        self
    }
}
