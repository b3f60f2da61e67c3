//! Report cells and tables.

use serde::Serialize;

use crate::extract::numeric::format_decimal;

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Render for display, numbers in decimal-comma notation.
    pub fn display(&self, decimals: usize) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_decimal(*n, decimals),
            Cell::Empty => String::new(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Empty, Cell::Number)
    }
}

impl From<Option<&str>> for Cell {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Cell::Empty, Cell::text)
    }
}

/// A named table: one sheet of the workbook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padded or truncated to the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column by header.
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Cell at a row and header.
    pub fn cell(&self, row: usize, header: &str) -> Option<&Cell> {
        let column = self.column(header)?;
        self.rows.get(row)?.get(column)
    }

    /// Rows rendered for display.
    pub fn display_rows(&self, decimals: usize) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|c| c.display(decimals)).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Number(1234.5).display(2), "1.234,50");
        assert_eq!(Cell::text("P1").display(2), "P1");
        assert_eq!(Cell::Empty.display(2), "");
        assert_eq!(Cell::from(None::<f64>), Cell::Empty);
        assert_eq!(Cell::from(Some("x")), Cell::text("x"));
    }

    #[test]
    fn test_push_row_pads() {
        let mut table = Table::new("T", vec!["A".into(), "B".into(), "C".into()]);
        table.push_row(vec![Cell::text("a")]);

        assert_eq!(table.row_count(), 1);
        assert_eq!(table.rows[0], vec![Cell::text("a"), Cell::Empty, Cell::Empty]);
        assert_eq!(table.cell(0, "A"), Some(&Cell::text("a")));
        assert_eq!(table.cell(0, "Z"), None);
        assert_eq!(table.display_rows(2), vec![vec!["a", "", ""]]);
    }
}
