//! Stats module - Summary aggregation and commission reports

mod aggregator;
mod commission;

pub use aggregator::{Aggregator, Overview, PeriodBucket, PeriodCounts, SummaryRow};
pub use commission::{
    deposit_attribution, qualified_customers, AttributionReport, QualifiedReport,
};
