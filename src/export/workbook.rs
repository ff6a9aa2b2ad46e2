//! XLSX Workbook Writer
//! Writes report tables as an Excel workbook, one sheet per table.
//!
//! Headers are bold and frozen. Numbers are numeric cells rounded to the
//! display precision; text stays text so ids keep their leading zeros.

use crate::export::ExportError;
use crate::report::{Cell, Table};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// Excel's limit on sheet name length
const MAX_SHEET_NAME: usize = 31;

/// XLSX generator for report tables
pub struct WorkbookWriter;

impl WorkbookWriter {
    /// Write the workbook to `output_path`.
    pub fn write(tables: &[Table], precision: usize, output_path: &Path) -> Result<(), ExportError> {
        let mut workbook = Self::build(tables, precision)?;
        workbook.save(output_path)?;
        info!(path = %output_path.display(), sheets = tables.len(), "wrote workbook");
        Ok(())
    }

    /// Build the workbook in memory.
    pub fn to_bytes(tables: &[Table], precision: usize) -> Result<Vec<u8>, ExportError> {
        let mut workbook = Self::build(tables, precision)?;
        Ok(workbook.save_to_buffer()?)
    }

    fn build(tables: &[Table], precision: usize) -> Result<Workbook, ExportError> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();
        let number_format = Format::new().set_num_format(number_pattern(precision));

        for (table, name) in tables.iter().zip(Self::sheet_names(tables)) {
            let worksheet = workbook.add_worksheet().set_name(&name)?;
            Self::write_sheet(worksheet, table, precision, &header_format, &number_format)?;
        }
        Ok(workbook)
    }

    fn write_sheet(
        worksheet: &mut Worksheet,
        table: &Table,
        precision: usize,
        header_format: &Format,
        number_format: &Format,
    ) -> Result<(), ExportError> {
        for (col, header) in table.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, header, header_format)?;
        }
        // Header row stays visible while scrolling
        worksheet.set_freeze_panes(1, 0)?;

        for (idx, row) in table.rows.iter().enumerate() {
            let r = (idx + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                let c = col as u16;
                match (cell, cell.rounded(precision)) {
                    (Cell::Empty, _) => {}
                    (Cell::Float(_), Some(value)) if value.is_finite() => {
                        worksheet.write_number_with_format(r, c, value, number_format)?;
                    }
                    (Cell::Int(_), Some(value)) => {
                        worksheet.write_number(r, c, value)?;
                    }
                    _ => {
                        worksheet.write_string(r, c, cell.display(precision))?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Valid, unique sheet names derived from the table names.
    fn sheet_names(tables: &[Table]) -> Vec<String> {
        let mut used: BTreeSet<String> = BTreeSet::new();
        tables
            .iter()
            .enumerate()
            .map(|(idx, table)| {
                let cleaned: String = table
                    .name
                    .chars()
                    .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
                    .take(MAX_SHEET_NAME)
                    .collect();
                let cleaned = cleaned.trim_matches('\'').to_string();
                let base = if cleaned.trim().is_empty() {
                    format!("Sheet{}", idx + 1)
                } else {
                    cleaned
                };

                let mut name = base.clone();
                let mut n = 2;
                while used.contains(&name.to_lowercase()) {
                    let suffix = format!(" ({})", n);
                    let keep = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
                    name = base.chars().take(keep).collect::<String>() + &suffix;
                    n += 1;
                }
                used.insert(name.to_lowercase());
                name
            })
            .collect()
    }
}

/// Excel number format showing `precision` decimals.
fn number_pattern(precision: usize) -> String {
    if precision == 0 {
        "0".to_string()
    } else {
        format!("0.{}", "0".repeat(precision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Data, Reader, Xlsx};
    use std::io::Cursor;

    fn sample_tables() -> Vec<Table> {
        let mut matches = Table::new("Match_Results", &["DSA ID", "Status", "Deposit Amount", "Duplicates"]);
        matches.push(vec![
            Cell::text("0701234"),
            Cell::text("Partial Match"),
            Cell::Float(1234.5678),
            Cell::count(3),
        ]);
        matches.push(vec![Cell::text("A&B <x>"), Cell::text("Unmatched"), Cell::Empty, Cell::count(0)]);

        let summary = Table::new("DSA_Summary", &["DSA ID", "Full Match"]);
        vec![matches, summary]
    }

    fn reload(bytes: Vec<u8>) -> Xlsx<Cursor<Vec<u8>>> {
        Xlsx::new(Cursor::new(bytes)).unwrap()
    }

    fn rows(workbook: &mut Xlsx<Cursor<Vec<u8>>>, sheet: &str) -> Vec<Vec<Data>> {
        workbook
            .worksheet_range(sheet)
            .unwrap()
            .rows()
            .map(|row| row.to_vec())
            .collect()
    }

    #[test]
    fn workbook_has_one_sheet_per_table() {
        let bytes = WorkbookWriter::to_bytes(&sample_tables(), 2).unwrap();
        let workbook = reload(bytes);
        assert_eq!(workbook.sheet_names(), vec!["Match_Results", "DSA_Summary"]);
    }

    #[test]
    fn reload_reproduces_rows_and_key_column() {
        let tables = sample_tables();
        let mut workbook = reload(WorkbookWriter::to_bytes(&tables, 2).unwrap());
        let sheet = rows(&mut workbook, "Match_Results");

        assert_eq!(sheet.len(), tables[0].len() + 1);
        let keys: Vec<&Data> = sheet.iter().map(|row| &row[0]).collect();
        assert_eq!(
            keys,
            vec![
                &Data::String("DSA ID".to_string()),
                &Data::String("0701234".to_string()),
                &Data::String("A&B <x>".to_string()),
            ]
        );
        // Numbers are rounded to the display precision; empty cells stay empty
        assert_eq!(sheet[1][2], Data::Float(1234.57));
        assert_eq!(sheet[1][3], Data::Float(3.0));
        assert_eq!(sheet[2][2], Data::Empty);

        let empty = rows(&mut workbook, "DSA_Summary");
        assert_eq!(empty.len(), 1);
    }

    #[test]
    fn write_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        WorkbookWriter::write(&sample_tables(), 2, &path).unwrap();

        let mut workbook: Xlsx<_> = calamine::open_workbook(&path).unwrap();
        assert_eq!(workbook.worksheet_range("DSA_Summary").unwrap().height(), 1);
    }

    #[test]
    fn sheet_names_are_valid_and_unique() {
        let tables = vec![
            Table::new("Deposit/Attribution: a very long report name", &["A"]),
            Table::new("Deposit/Attribution: a very long report name", &["A"]),
            Table::new("[]", &["A"]),
        ];
        let names = WorkbookWriter::sheet_names(&tables);

        assert_eq!(names[0], "DepositAttribution a very long ");
        assert_eq!(names[0].chars().count(), 31);
        assert_eq!(names[1], "DepositAttribution a very l (2)");
        assert_eq!(names[2], "Sheet3");

        // The writer accepts every derived name
        assert!(WorkbookWriter::to_bytes(&tables, 2).is_ok());
    }

    #[test]
    fn number_patterns_follow_precision() {
        assert_eq!(number_pattern(0), "0");
        assert_eq!(number_pattern(2), "0.00");
    }
}
