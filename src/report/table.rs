//! Report Tables
//! Typed cells shared by the on-screen grids and every exporter.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn count(value: usize) -> Self {
        Cell::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }

    pub fn opt_text(value: Option<impl Into<String>>) -> Self {
        value.map_or(Cell::Empty, |v| Cell::Text(v.into()))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Cell::Int(_) | Cell::Float(_))
    }

    /// Float rounded to `precision` decimals, for numeric export cells.
    pub fn rounded(&self, precision: usize) -> Option<f64> {
        let scale = 10f64.powi(i32::try_from(precision).unwrap_or(i32::MAX));
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) if scale.is_finite() => Some((v * scale).round() / scale),
            Cell::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Text rendering with floats at the given precision.
    pub fn display(&self, precision: usize) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Int(v) => v.to_string(),
            Cell::Float(v) => format!("{:.*}", precision, v),
            Cell::Empty => String::new(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display(2))
    }
}

/// Named grid of cells. Every row has one cell per header.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            name: name.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    #[cfg(test)]
    pub fn column(&self, header: &str) -> Option<Vec<&Cell>> {
        let index = self.column_index(header)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }
}
