//! Totals over period rows.
//!
//! Totals are a separate type from [`PeriodRow`], so a totals row can never
//! be aggregated again.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::extract::numeric::format_decimal;
use crate::models::invoice::{Column, Invoice, PeriodRow, SectionTable};

/// Label of every totals row.
pub const TOTAL_LABEL: &str = "TOTAL";

/// Note of the global totals row.
pub const GRAND_TOTAL_NOTE: &str = "TOTAL GENERAL";

/// Sums of the summable columns of a layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Totals(BTreeMap<Column, f64>);

impl Totals {
    /// Sum every summable column over the rows; missing values count as 0.
    pub fn over<'a, I>(columns: &[Column], rows: I) -> Self
    where
        I: IntoIterator<Item = &'a PeriodRow>,
    {
        let mut sums: BTreeMap<Column, f64> = columns
            .iter()
            .filter(|c| c.is_summable())
            .map(|c| (*c, 0.0))
            .collect();

        for row in rows {
            for (column, sum) in sums.iter_mut() {
                *sum += row.get(*column).unwrap_or(0.0);
            }
        }

        Self(sums)
    }

    /// Sum of a column; `None` for columns that are not summed.
    pub fn get(&self, column: Column) -> Option<f64> {
        self.0.get(&column).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Column, f64)> + '_ {
        self.0.iter().map(|(c, v)| (*c, *v))
    }
}

/// A TOTAL row of a detail table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsRow {
    pub label: String,
    /// Source file the totals cover; `None` for the global total.
    pub source: Option<String>,
    /// Explanatory note, such as the invoice total.
    pub note: Option<String>,
    pub totals: Totals,
}

impl TotalsRow {
    /// Per-file totals of one section of an invoice.
    pub fn for_invoice(invoice: &Invoice, section: &SectionTable) -> Self {
        Self {
            label: TOTAL_LABEL.to_string(),
            source: Some(invoice.source.clone()),
            note: invoice
                .total_amount
                .map(|total| format!("TOTAL FACTURA: {}", format_decimal(total, 2))),
            totals: Totals::over(&section.columns, &section.rows),
        }
    }

    /// Global totals of one section over every invoice.
    pub fn grand<'a, I>(section: &str, columns: &[Column], invoices: I) -> Self
    where
        I: IntoIterator<Item = &'a Invoice>,
    {
        let rows = invoices
            .into_iter()
            .filter_map(|invoice| invoice.section(section))
            .flat_map(|table| table.rows.iter());

        Self {
            label: TOTAL_LABEL.to_string(),
            source: None,
            note: Some(GRAND_TOTAL_NOTE.to_string()),
            totals: Totals::over(columns, rows),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::{HeaderFields, TariffPeriod};
    use pretty_assertions::assert_eq;

    fn row(period: u8, amount: f64, cos_phi: f64) -> PeriodRow {
        let mut row = PeriodRow::new(TariffPeriod::new(period).unwrap());
        row.values.insert(Column::PowerAmount, amount);
        row.values.insert(Column::CosPhi, cos_phi);
        row
    }

    fn invoice(source: &str, rows: Vec<PeriodRow>, total: Option<f64>) -> Invoice {
        Invoice {
            source: source.to_string(),
            template: "endesa-potencia".to_string(),
            fields: HeaderFields::new(),
            billing_period: None,
            total_amount: total,
            sections: vec![SectionTable {
                name: "Potencia".to_string(),
                columns: vec![Column::PowerAmount, Column::CosPhi],
                found: true,
                rows,
            }],
            warnings: Vec::new(),
            raw_text: String::new(),
            normalized_text: String::new(),
        }
    }

    #[test]
    fn test_totals_sum_summable_columns() {
        let rows = vec![row(1, 50.0, 0.9), row(2, 25.5, 0.8)];
        let totals = Totals::over(&[Column::PowerAmount, Column::CosPhi], &rows);

        assert_eq!(totals.get(Column::PowerAmount), Some(75.5));
        assert_eq!(totals.get(Column::CosPhi), None);
        assert_eq!(totals.get(Column::ActiveEnergy), None);
    }

    #[test]
    fn test_totals_idempotent() {
        let rows = vec![row(1, 10.1, 1.0), row(2, 20.2, 1.0), row(3, 30.3, 1.0)];
        let columns = [Column::PowerAmount];
        assert_eq!(Totals::over(&columns, &rows), Totals::over(&columns, &rows));
    }

    #[test]
    fn test_totals_empty() {
        let totals = Totals::over(&[Column::PowerAmount], &Vec::<PeriodRow>::new());
        assert_eq!(totals.get(Column::PowerAmount), Some(0.0));
    }

    #[test]
    fn test_invoice_totals_row() {
        let inv = invoice("enero.pdf", vec![row(1, 50.0, 1.0), row(2, 25.5, 1.0)], Some(1234.5));
        let totals = TotalsRow::for_invoice(&inv, &inv.sections[0]);

        assert_eq!(totals.label, "TOTAL");
        assert_eq!(totals.source.as_deref(), Some("enero.pdf"));
        assert_eq!(totals.note.as_deref(), Some("TOTAL FACTURA: 1.234,50"));
        assert_eq!(totals.totals.get(Column::PowerAmount), Some(75.5));
    }

    #[test]
    fn test_grand_total_equals_sum_of_files() {
        let invoices = vec![
            invoice("enero.pdf", vec![row(1, 50.0, 1.0), row(2, 25.5, 1.0)], None),
            invoice("febrero.pdf", vec![row(1, 40.0, 1.0)], None),
        ];
        let columns = [Column::PowerAmount, Column::CosPhi];

        let grand = TotalsRow::grand("Potencia", &columns, &invoices);
        let per_file: f64 = invoices
            .iter()
            .map(|i| {
                TotalsRow::for_invoice(i, &i.sections[0])
                    .totals
                    .get(Column::PowerAmount)
                    .unwrap()
            })
            .sum();

        assert_eq!(grand.source, None);
        assert_eq!(grand.totals.get(Column::PowerAmount), Some(115.5));
        assert_eq!(grand.totals.get(Column::PowerAmount), Some(per_file));
        assert_eq!(grand.totals.get(Column::CosPhi), None);
    }
}
