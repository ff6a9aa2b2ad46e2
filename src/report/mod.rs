//! Report module - Filtering and the tabular view of a report

mod filter;
mod table;
mod view;

pub use filter::{FilterError, FilterSpec};
pub use table::{Cell, Table};
pub use view::{ReportKind, ReportView};
