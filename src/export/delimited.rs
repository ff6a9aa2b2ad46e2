//! CSV Export
//! One report table as UTF-8 CSV, written through a Polars DataFrame.

use crate::export::ExportError;
use crate::report::{Cell, Table};
use polars::prelude::*;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Text columns, one per header. Empty cells become nulls and floats are
/// rendered at `precision` decimals.
pub fn table_to_dataframe(table: &Table, precision: usize) -> PolarsResult<DataFrame> {
    let columns: Vec<Column> = table
        .headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let values: Vec<Option<String>> = table
                .rows
                .iter()
                .map(|row| match row.get(idx) {
                    None | Some(Cell::Empty) => None,
                    Some(cell) => Some(cell.display(precision)),
                })
                .collect();
            Column::new(header.as_str().into(), values)
        })
        .collect();

    DataFrame::new(columns)
}

pub fn write_csv<W: Write>(table: &Table, precision: usize, writer: W) -> Result<(), ExportError> {
    let mut df = table_to_dataframe(table, precision)?;
    CsvWriter::new(writer).include_header(true).finish(&mut df)?;
    Ok(())
}

pub fn write_csv_path(table: &Table, precision: usize, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path)?;
    write_csv(table, precision, file)?;
    info!(path = %path.display(), table = %table.name, rows = table.len(), "wrote CSV");
    Ok(())
}
