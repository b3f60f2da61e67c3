//! Multi-table invoice reports.

mod table;
mod xlsx;

pub use table::{Cell, Table};
pub use xlsx::{read_xlsx, read_xlsx_buffer, sheet_name};

use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;

use crate::aggregate::{Totals, TotalsRow};
use crate::error::ReportError;
use crate::models::config::ReportConfig;
use crate::models::invoice::{Column, FieldKind, Invoice};

/// Name of the one-row-per-invoice summary table.
pub const SUMMARY_TABLE: &str = "Resumen Facturas";

/// Name of the per-file totals table.
pub const FILE_TOTALS_TABLE: &str = "Totales por Archivo";

pub const FILE_HEADER: &str = "Archivo";
pub const TEMPLATE_HEADER: &str = "Plantilla";
pub const PERIOD_START_HEADER: &str = "Periodo desde";
pub const PERIOD_END_HEADER: &str = "Periodo hasta";
pub const PERIOD_HEADER: &str = "Periodo";
pub const NOTES_HEADER: &str = "Observaciones";
pub const INVOICE_TOTAL_HEADER: &str = "Total Factura (€)";

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Ordered tables, exported as one workbook with one sheet per table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub tables: Vec<Table>,
}

impl Report {
    /// Table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Serialize the report as an XLSX workbook.
    pub fn to_xlsx_buffer(&self) -> Result<Vec<u8>> {
        Ok(xlsx::workbook(self)?.save_to_buffer()?)
    }

    /// Write the report as an XLSX workbook.
    pub fn write_xlsx(&self, path: &Path) -> Result<()> {
        let buffer = self.to_xlsx_buffer()?;
        std::fs::write(path, buffer)?;
        debug!("Wrote {} sheets to {}", self.tables.len(), path.display());
        Ok(())
    }
}

/// Section of the report: name and the union of its column layouts.
struct SectionLayout {
    name: String,
    columns: Vec<Column>,
}

/// Builds reports from extracted invoices.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    sort_by_period: bool,
    grand_total: bool,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::from_config(&ReportConfig::default())
    }
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            sort_by_period: config.sort_by_period,
            grand_total: config.grand_total,
        }
    }

    /// Order invoices by billing-period start date.
    pub fn with_sort_by_period(mut self, sort: bool) -> Self {
        self.sort_by_period = sort;
        self
    }

    /// Append a global TOTAL row to every detail table.
    pub fn with_grand_total(mut self, grand_total: bool) -> Self {
        self.grand_total = grand_total;
        self
    }

    /// Build the summary, per-section and per-file totals tables.
    pub fn build(&self, invoices: &[Invoice]) -> Report {
        let mut ordered: Vec<&Invoice> = invoices.iter().collect();
        if self.sort_by_period {
            // stable: undated invoices keep input order, last
            ordered.sort_by_key(|i| {
                (
                    i.billing_period.is_none(),
                    i.billing_period.map(|p| p.start),
                )
            });
        }

        let sections = section_layouts(&ordered);

        let mut tables = Vec::with_capacity(sections.len() + 2);
        tables.push(summary_table(&ordered));
        for section in &sections {
            tables.push(self.section_table(section, &ordered));
        }
        tables.push(file_totals_table(&sections, &ordered));

        debug!(
            "Built report with {} tables from {} invoices",
            tables.len(),
            invoices.len()
        );
        Report { tables }
    }

    fn section_table(&self, section: &SectionLayout, invoices: &[&Invoice]) -> Table {
        let mut headers = vec![
            FILE_HEADER.to_string(),
            PERIOD_START_HEADER.to_string(),
            PERIOD_END_HEADER.to_string(),
            PERIOD_HEADER.to_string(),
        ];
        headers.extend(section.columns.iter().map(|c| c.label().to_string()));
        headers.push(NOTES_HEADER.to_string());
        let mut table = Table::new(section.name.clone(), headers);

        let mut has_rows = false;
        for invoice in invoices {
            let Some(extracted) = invoice.section(&section.name).filter(|t| !t.rows.is_empty()) else {
                continue;
            };
            has_rows = true;

            let start = invoice.period_start_label();
            let end = invoice.period_end_label();
            for row in &extracted.rows {
                let mut cells = vec![
                    Cell::text(&invoice.source),
                    Cell::text(&start),
                    Cell::text(&end),
                    Cell::text(row.period.to_string()),
                ];
                cells.extend(section.columns.iter().map(|c| Cell::from(row.get(*c))));
                table.push_row(cells);
            }

            let totals = TotalsRow::for_invoice(invoice, extracted);
            table.push_row(totals_cells(&totals, &section.columns, Cell::text(&invoice.source)));
        }

        if self.grand_total && has_rows {
            let totals =
                TotalsRow::grand(&section.name, &section.columns, invoices.iter().copied());
            table.push_row(totals_cells(&totals, &section.columns, Cell::Empty));
        }

        table
    }
}

fn section_layouts(invoices: &[&Invoice]) -> Vec<SectionLayout> {
    let mut layouts: Vec<SectionLayout> = Vec::new();

    for section in invoices.iter().flat_map(|i| i.sections.iter()) {
        let layout = match layouts.iter_mut().position(|l| l.name == section.name) {
            Some(index) => &mut layouts[index],
            None => {
                layouts.push(SectionLayout {
                    name: section.name.clone(),
                    columns: Vec::new(),
                });
                let last = layouts.len() - 1;
                &mut layouts[last]
            }
        };
        for column in &section.columns {
            if !layout.columns.contains(column) {
                layout.columns.push(*column);
            }
        }
    }

    layouts
}

fn summary_table(invoices: &[&Invoice]) -> Table {
    let kinds: BTreeSet<FieldKind> = invoices.iter().flat_map(|i| i.fields.kinds()).collect();

    let mut headers = vec![FILE_HEADER.to_string(), TEMPLATE_HEADER.to_string()];
    headers.extend(kinds.iter().map(|k| k.label().to_string()));
    let mut table = Table::new(SUMMARY_TABLE, headers);

    for invoice in invoices {
        let mut cells = vec![Cell::text(&invoice.source), Cell::text(&invoice.template)];
        cells.extend(kinds.iter().map(|k| Cell::from(invoice.fields.get(*k))));
        table.push_row(cells);
    }

    table
}

fn totals_cells(totals: &TotalsRow, columns: &[Column], file: Cell) -> Vec<Cell> {
    let mut cells = vec![file, Cell::Empty, Cell::Empty, Cell::text(&totals.label)];
    cells.extend(columns.iter().map(|c| Cell::from(totals.totals.get(*c))));
    cells.push(Cell::from(totals.note.as_deref()));
    cells
}

fn file_totals_table(sections: &[SectionLayout], invoices: &[&Invoice]) -> Table {
    let mut headers = vec![FILE_HEADER.to_string(), INVOICE_TOTAL_HEADER.to_string()];
    for section in sections {
        for column in section.columns.iter().filter(|c| c.is_summable()) {
            headers.push(format!("Total {} · {}", section.name, column.label()));
        }
    }
    let mut table = Table::new(FILE_TOTALS_TABLE, headers);

    for invoice in invoices {
        let mut cells = vec![
            Cell::text(&invoice.source),
            Cell::from(invoice.total_amount),
        ];
        for section in sections {
            let totals = match invoice.section(&section.name) {
                Some(extracted) => Totals::over(&section.columns, &extracted.rows),
                None => Totals::over(&section.columns, std::iter::empty()),
            };
            for column in section.columns.iter().filter(|c| c.is_summable()) {
                cells.push(Cell::Number(totals.get(*column).unwrap_or(0.0)));
            }
        }
        table.push_row(cells);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::template::TemplateRegistry;
    use crate::invoice::{InvoiceParser, TemplateInvoiceParser};
    use pretty_assertions::assert_eq;

    const ENERO: &str = "Periodo facturación: 01/01/2024 al 31/01/2024 Término de potencia \
        Potencia Máxima Importe Potencia P1 100,00 kWh 10,00 kVArh 15,000 kW 12,500 kW 50,00 € \
        P2 80,00 kWh 5,00 kVArh 15,000 kW 9,000 kW 25,50 € Total Factura 123,45 €";

    const DICIEMBRE: &str = "Periodo facturación: 01/12/2023 al 31/12/2023 Término de potencia \
        Potencia Máxima Importe Potencia P1 90,00 kWh 0,00 kVArh 15,000 kW 14,000 kW 40,00 € \
        Total Factura 99,00 €";

    pub(crate) fn invoices() -> Vec<Invoice> {
        let parser = TemplateInvoiceParser::new(TemplateRegistry::builtin().unwrap());
        vec![
            parser.parse("enero.pdf", ENERO).unwrap().invoice,
            parser.parse("diciembre.pdf", DICIEMBRE).unwrap().invoice,
        ]
    }

    #[test]
    fn test_report_tables() {
        let report = ReportBuilder::new().build(&invoices());
        let names: Vec<_> = report.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec![SUMMARY_TABLE, "Potencia", FILE_TOTALS_TABLE]);
    }

    #[test]
    fn test_summary_table() {
        let report = ReportBuilder::new().with_sort_by_period(false).build(&invoices());
        let summary = report.table(SUMMARY_TABLE).unwrap();

        assert_eq!(summary.row_count(), 2);
        assert_eq!(
            summary.cell(0, "Periodo de Facturación"),
            Some(&Cell::text("01/01/2024 al 31/01/2024"))
        );
        assert_eq!(summary.cell(0, "Total Factura"), Some(&Cell::text("123,45")));
        assert_eq!(summary.cell(0, TEMPLATE_HEADER), Some(&Cell::text("endesa-potencia")));
        assert_eq!(summary.cell(0, "Nº Factura"), Some(&Cell::Empty));
    }

    #[test]
    fn test_section_totals() {
        let report = ReportBuilder::new().build(&invoices());
        let power = report.table("Potencia").unwrap();
        let amount = Column::PowerAmount.label();

        // diciembre: 1 row + TOTAL, enero: 2 rows + TOTAL, grand TOTAL
        assert_eq!(power.row_count(), 6);
        assert_eq!(power.cell(0, FILE_HEADER), Some(&Cell::text("diciembre.pdf")));

        assert_eq!(power.cell(4, PERIOD_HEADER), Some(&Cell::text("TOTAL")));
        assert_eq!(power.cell(4, FILE_HEADER), Some(&Cell::text("enero.pdf")));
        assert_eq!(power.cell(4, amount), Some(&Cell::Number(75.5)));
        assert_eq!(
            power.cell(4, NOTES_HEADER),
            Some(&Cell::text("TOTAL FACTURA: 123,45"))
        );
        assert_eq!(power.cell(4, Column::MaxPower.label()), Some(&Cell::Empty));

        assert_eq!(power.cell(5, amount), Some(&Cell::Number(115.5)));
        assert_eq!(power.cell(5, FILE_HEADER), Some(&Cell::Empty));
    }

    #[test]
    fn test_without_grand_total() {
        let report = ReportBuilder::new().with_grand_total(false).build(&invoices());
        assert_eq!(report.table("Potencia").unwrap().row_count(), 5);
    }

    #[test]
    fn test_file_totals_table() {
        let report = ReportBuilder::new().with_sort_by_period(false).build(&invoices());
        let totals = report.table(FILE_TOTALS_TABLE).unwrap();
        let header = format!("Total Potencia · {}", Column::PowerAmount.label());

        assert_eq!(totals.row_count(), 2);
        assert_eq!(totals.cell(0, &header), Some(&Cell::Number(75.5)));
        assert_eq!(totals.cell(0, INVOICE_TOTAL_HEADER), Some(&Cell::Number(123.45)));
        assert_eq!(totals.cell(1, &header), Some(&Cell::Number(40.0)));
        assert!(totals.column(&format!("Total Potencia · {}", Column::MaxPower.label())).is_none());
    }

    #[test]
    fn test_empty_report() {
        let report = ReportBuilder::new().build(&[]);
        assert_eq!(report.tables.len(), 2);
        assert!(report.tables.iter().all(|t| t.rows.is_empty()));
    }
}
