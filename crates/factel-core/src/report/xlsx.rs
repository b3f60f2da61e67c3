//! XLSX export with rust_xlsxwriter and read-back with calamine.

use std::collections::HashSet;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use super::{Cell, Report, Result, Table};

/// Maximum sheet name length accepted by Excel.
const MAX_SHEET_NAME: usize = 31;

const NUMBER_FORMAT: &str = "#,##0.00";

/// Excel-safe sheet name: forbidden characters replaced, at most 31 characters.
pub fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .take(MAX_SHEET_NAME)
        .collect();

    let cleaned = cleaned.trim_matches('\'').trim();
    if cleaned.is_empty() {
        "Hoja".to_string()
    } else {
        cleaned.to_string()
    }
}

fn unique_sheet_name(name: &str, used: &mut HashSet<String>) -> String {
    let base = sheet_name(name);
    let mut candidate = base.clone();
    let mut n = 2;
    while !used.insert(candidate.to_lowercase()) {
        let suffix = format!(" ({})", n);
        let stem: String = base
            .chars()
            .take(MAX_SHEET_NAME - suffix.chars().count())
            .collect();
        candidate = format!("{}{}", stem.trim_end(), suffix);
        n += 1;
    }
    candidate
}

/// Workbook with one sheet per table.
pub(super) fn workbook(report: &Report) -> std::result::Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let number_format = Format::new().set_num_format(NUMBER_FORMAT);
    let mut used = HashSet::new();

    for table in &report.tables {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(unique_sheet_name(&table.name, &mut used))?;

        for (col, header) in table.headers.iter().enumerate() {
            let col = col as u16;
            worksheet.write_string_with_format(0, col, header, &header_format)?;

            let width = table
                .rows
                .iter()
                .filter_map(|row| row.get(col as usize))
                .map(|cell| cell.display(2).chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(10);
            worksheet.set_column_width(col, (width + 2).min(60) as f64)?;
        }

        for (index, row) in table.rows.iter().enumerate() {
            let row_num = index as u32 + 1;
            for (col, cell) in row.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Text(s) => {
                        worksheet.write_string(row_num, col, s)?;
                    }
                    Cell::Number(n) => {
                        worksheet.write_number_with_format(row_num, col, *n, &number_format)?;
                    }
                    Cell::Empty => {}
                }
            }
        }

        worksheet.set_freeze_panes(1, 0)?;
    }

    Ok(workbook)
}

/// Read a workbook written by [`Report::write_xlsx`].
pub fn read_xlsx(path: &Path) -> Result<Report> {
    let data = std::fs::read(path)?;
    read_xlsx_buffer(&data)
}

/// Read a workbook from memory; the first row of each sheet is its header.
pub fn read_xlsx_buffer(data: &[u8]) -> Result<Report> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(data))?;
    read_workbook(&mut workbook)
}

fn read_workbook<RS: Read + Seek>(workbook: &mut Xlsx<RS>) -> Result<Report> {
    let mut tables = Vec::new();

    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let mut rows = range.rows();

        let headers: Vec<String> = match rows.next() {
            Some(row) => row.iter().map(|d| d.to_string()).collect(),
            None => Vec::new(),
        };
        let mut table = Table::new(name, headers);
        for row in rows {
            table.push_row(row.iter().map(cell_from_data).collect());
        }
        tables.push(table);
    }

    Ok(Report { tables })
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        other => Cell::Text(other.to_string()),
    }
}
