//! Report output in the supported formats.

use std::fs;
use std::path::Path;

use console::style;

use factel_core::report::sheet_name;
use factel_core::{Invoice, Report, Table};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// XLSX workbook, one sheet per table
    Xlsx,
    /// CSV, one table per file or all tables concatenated
    Csv,
    /// JSON invoices
    Json,
    /// Plain text tables
    Text,
}

impl OutputFormat {
    /// Explicit format, else guessed from the output extension, else `fallback`.
    pub fn resolve(explicit: Option<Self>, output: Option<&Path>, fallback: Self) -> Self {
        if let Some(format) = explicit {
            return format;
        }
        let extension = output
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        match extension.as_deref() {
            Some("xlsx") => OutputFormat::Xlsx,
            Some("csv") => OutputFormat::Csv,
            Some("json") => OutputFormat::Json,
            Some("txt") => OutputFormat::Text,
            _ => fallback,
        }
    }
}

/// Write the report, or the invoices for JSON, to `output` or stdout.
///
/// `stem` names the per-table files when CSV goes to a directory.
pub fn write_output(
    report: &Report,
    invoices: &[Invoice],
    format: OutputFormat,
    output: Option<&Path>,
    stem: &str,
    decimals: usize,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Xlsx => {
            let Some(path) = output else {
                anyhow::bail!("XLSX output requires --output <FILE>");
            };
            report.write_xlsx(path)?;
            print_written(path);
        }
        OutputFormat::Csv => match output {
            Some(dir) if dir.is_dir() => {
                for table in &report.tables {
                    let sheet = sheet_name(&table.name).replace(' ', "_");
                    let path = dir.join(format!("{}-{}.csv", stem, sheet));
                    fs::write(&path, format_table_csv(table, decimals)?)?;
                    print_written(&path);
                }
            }
            _ => {
                let mut content = String::new();
                for table in &report.tables {
                    content.push_str(&format!("# {}\n", table.name));
                    content.push_str(&format_table_csv(table, decimals)?);
                    content.push('\n');
                }
                emit(&content, output)?;
            }
        },
        OutputFormat::Json => {
            emit(&serde_json::to_string_pretty(invoices)?, output)?;
        }
        OutputFormat::Text => {
            let content = report
                .tables
                .iter()
                .map(|t| format_table_text(t, decimals))
                .collect::<Vec<_>>()
                .join("\n");
            emit(&content, output)?;
        }
    }

    Ok(())
}

fn emit(content: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            print_written(path);
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn print_written(path: &Path) {
    println!("{} Output written to {}", style("✓").green(), path.display());
}

/// Table as CSV with decimal-comma numbers.
pub fn format_table_csv(table: &Table, decimals: usize) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(&table.headers)?;
    for row in table.display_rows(decimals) {
        wtr.write_record(&row)?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

/// Table as aligned plain text.
pub fn format_table_text(table: &Table, decimals: usize) -> String {
    let rows = table.display_rows(decimals);
    let widths: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut output = String::new();
    output.push_str(&format!("{}\n", table.name));
    output.push_str(&text_line(&table.headers, &widths));
    output.push('\n');
    output.push_str(&"-".repeat(widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1)));
    output.push('\n');
    for row in &rows {
        output.push_str(&text_line(row, &widths));
        output.push('\n');
    }
    output
}

fn text_line(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use factel_core::Cell;
    use pretty_assertions::assert_eq;

    fn table() -> Table {
        let mut table = Table::new("Potencia", vec!["Periodo".into(), "Importe".into()]);
        table.push_row(vec![Cell::text("P1"), Cell::Number(1234.5)]);
        table.push_row(vec![Cell::text("TOTAL"), Cell::Empty]);
        table
    }

    #[test]
    fn test_resolve_format() {
        let xlsx = Path::new("out.XLSX");
        assert_eq!(
            OutputFormat::resolve(None, Some(xlsx), OutputFormat::Text),
            OutputFormat::Xlsx
        );
        assert_eq!(
            OutputFormat::resolve(Some(OutputFormat::Json), Some(xlsx), OutputFormat::Text),
            OutputFormat::Json
        );
        assert_eq!(
            OutputFormat::resolve(None, None, OutputFormat::Text),
            OutputFormat::Text
        );
    }

    #[test]
    fn test_format_table_csv() {
        let csv = format_table_csv(&table(), 2).unwrap();
        assert_eq!(csv, "Periodo,Importe\nP1,\"1.234,50\"\nTOTAL,\n");
    }

    #[test]
    fn test_format_table_text() {
        let text = format_table_text(&table(), 2);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Potencia");
        assert_eq!(lines[1], "Periodo | Importe");
        assert_eq!(lines[3], "P1      | 1.234,50");
        assert_eq!(lines[4], "TOTAL   |");
    }
}
