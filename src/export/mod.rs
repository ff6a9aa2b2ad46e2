//! Export module - Workbook, CSV and chart image output

mod delimited;
mod workbook;

pub use delimited::write_csv_path;
pub use workbook::WorkbookWriter;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to build workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("Failed to write CSV: {0}")]
    Polars(#[from] PolarsError),
    #[error("Failed to render chart: {0}")]
    Chart(String),
}
