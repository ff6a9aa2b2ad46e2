//! Data module - CSV loading and record matching

mod loader;
mod matcher;
mod record;

pub use loader::{normalize_identifier, parse_timestamp, DataLoader, LoadedDataset, LoaderError};
pub use matcher::{CategoryTally, MatchOutcome, MatchResult, MatchStatus, Matcher};
pub use record::{Category, DsaRecord, PerCategory};
