//! Built-in templates for the invoice layouts seen so far.
//!
//! Patterns run against whitespace-normalized text, so free-text values
//! are bounded by the label that follows them rather than by line ends.

use super::template::{FieldSpec, SectionSpec, TemplateSpec};
use crate::models::invoice::{Column, FieldKind};

/// European number token: digits with `.` thousands and `,` decimals.
const NUM: &str = r"([\d.,]+)";

/// Invoice total such as `1.234,56`.
const AMOUNT: &str = r"(\d[\d.]*(?:,\d+)?)";

fn field(kind: FieldKind, pattern: impl Into<String>) -> FieldSpec {
    FieldSpec {
        kind,
        pattern: pattern.into(),
    }
}

fn section(
    name: &str,
    start: Option<&str>,
    end: Option<&str>,
    row: impl Into<String>,
    columns: Vec<Column>,
) -> SectionSpec {
    SectionSpec {
        name: name.to_string(),
        start: start.map(str::to_string),
        end: end.map(str::to_string),
        row: row.into(),
        columns,
    }
}

/// Row pattern `P<d>` followed by `n` whitespace-separated numbers.
fn numbers_row(prefix: &str, n: usize) -> String {
    let mut pattern = prefix.to_string();
    for _ in 0..n {
        pattern.push_str(r"\s+");
        pattern.push_str(NUM);
    }
    pattern
}

/// All built-in templates, in detection tie-break order.
pub fn builtin_specs() -> Vec<TemplateSpec> {
    vec![endesa_periodos(), endesa_potencia(), secciones()]
}

/// Endesa bill with one combined energy and power table per period.
fn endesa_periodos() -> TemplateSpec {
    TemplateSpec {
        name: "endesa-periodos".to_string(),
        description: "Endesa bill with a combined energy/reactive/power table (Periodo 1-6)"
            .to_string(),
        markers: vec![
            "Factura nº:".to_string(),
            "Periodo facturación:".to_string(),
            "Razón Social:".to_string(),
            "Dir.Suministro:".to_string(),
            "Modalidad de Contrato:".to_string(),
        ],
        fields: vec![
            field(FieldKind::InvoiceNumber, r"Factura nº:\s*([A-Z0-9]+)"),
            field(FieldKind::IssueDate, r"Fecha Factura:\s*([\d/]+)"),
            field(
                FieldKind::BillingPeriod,
                r"Periodo facturación:\s*([\d/]+\s+al\s+[\d/]+)",
            ),
            field(FieldKind::TotalAmount, format!(r"Total Factura:?\s*{}", AMOUNT)),
            field(
                FieldKind::Customer,
                r"Razón Social:\s*(.+?)(?:\s+(?:NIF/CIF:|Dir\.Fiscal:|Dir\.Suministro:|CUPS:)|$)",
            ),
            field(FieldKind::TaxId, r"NIF/CIF:\s*([A-Z0-9]+)"),
            field(
                FieldKind::FiscalAddress,
                r"Dir\.Fiscal:\s*(.+?)(?:\s+(?:Dir\.Suministro:|CUPS:|Contrato nº:)|$)",
            ),
            field(
                FieldKind::SupplyAddress,
                r"Dir\.Suministro:\s*(.+?)(?:\s+(?:CUPS:|Contrato nº:|Modalidad de Contrato:)|$)",
            ),
            field(FieldKind::Cups, r"CUPS:\s*([A-Z0-9]+)"),
            field(FieldKind::ContractNumber, r"Contrato nº:\s*([0-9]+)"),
            field(
                FieldKind::ContractMode,
                r"Modalidad de Contrato:\s*(.+?)(?:\s+(?:Fecha|Periodo|CUPS:|Contrato nº:|Total|Razón Social:)|$)",
            ),
            field(FieldKind::PaymentDueDate, r"antes del\s*([\d/]+)"),
        ],
        sections: vec![section(
            "Energía y Potencia",
            None,
            None,
            numbers_row(r"Periodo\s+([1-6])(?:\s+Capacitiva)?", 11),
            vec![
                Column::ActiveEnergy,
                Column::ReactiveEnergy,
                Column::ReactiveExcess,
                Column::CosPhi,
                Column::ReactiveAmount,
                Column::ContractedPower,
                Column::MaxPower,
                Column::Kp,
                Column::Te,
                Column::PowerExcess,
                Column::PowerAmount,
            ],
        )],
    }
}

/// Bill with a per-period power table and an overall total.
fn endesa_potencia() -> TemplateSpec {
    TemplateSpec {
        name: "endesa-potencia".to_string(),
        description: "Bill with a per-period power table (P1-P6) and invoice total".to_string(),
        markers: vec![
            "Término de potencia".to_string(),
            "Potencia Máxima".to_string(),
            "Importe Potencia".to_string(),
        ],
        fields: vec![
            field(FieldKind::InvoiceNumber, r"Nº (?:de )?[Ff]actura:?\s*([A-Z0-9/\-]+)"),
            field(
                FieldKind::IssueDate,
                r"Fecha (?:de )?(?:emisión|factura):?\s*(\d{2}/\d{2}/\d{4})",
            ),
            field(
                FieldKind::BillingPeriod,
                r"Periodo (?:de )?facturación:?\s*(\d{2}/\d{2}/\d{4}\s+al\s+\d{2}/\d{2}/\d{4})",
            ),
            field(FieldKind::TotalAmount, format!(r"Total Factura:?\s*{}", AMOUNT)),
            field(FieldKind::Cups, r"CUPS:?\s*(ES[A-Z0-9]{16,20})"),
        ],
        sections: vec![section(
            "Potencia",
            Some("Término de potencia"),
            Some("Total Factura"),
            format!(
                r"P([1-6])\s+{n}\s*(?:kWh)?\s+{n}\s*(?:kVArh)?\s+{n}\s*(?:kW)?\s+{n}\s*(?:kW)?\s+{n}",
                n = NUM
            ),
            vec![
                Column::ActiveEnergy,
                Column::ReactiveEnergy,
                Column::ContractedPower,
                Column::MaxPower,
                Column::PowerAmount,
            ],
        )],
    }
}

/// Bill split into active energy, inductive reactive energy and power excess sections.
fn secciones() -> TemplateSpec {
    TemplateSpec {
        name: "secciones".to_string(),
        description: "Bill with separate active, reactive and power-excess sections".to_string(),
        markers: vec![
            "ENERGÍA ACTIVA kWh".to_string(),
            "ENERGÍA REACTIVA INDUCTIVA".to_string(),
            "EXCESOS DE POTENCIA".to_string(),
            "Factura Nº".to_string(),
            "Emisión".to_string(),
        ],
        fields: vec![
            field(FieldKind::InvoiceNumber, r"Factura Nº\s*([\w\-]+)"),
            field(FieldKind::IssueDate, r"Emisión\s*(\d{2}-\d{2}-\d{4})"),
            field(FieldKind::PeriodStart, r"Periodo\s*(\d{2}-\d{2}-\d{4})\s*>"),
            field(FieldKind::PeriodEnd, r">\s*(\d{2}-\d{2}-\d{4})"),
            field(FieldKind::TotalAmount, format!(r"Total\s*\(€\)\s*{}", AMOUNT)),
            field(
                FieldKind::Customer,
                r"Cliente\s+([A-ZÁÉÍÓÚÑ .,\d]+?)(?:\s+(?:Suministro:|CUPS|Contrato|Factura|Emisión|Periodo)|$)",
            ),
            field(FieldKind::SupplyAddress, r"Suministro:\s*(.+?),\s*\d{5}"),
            field(FieldKind::Cups, r"CUPS\s*([A-Z0-9]+)"),
            field(FieldKind::ContractNumber, r"Contrato\s*(\d+)"),
        ],
        sections: vec![
            // P1 1.18.1 7275,00 7275,00 1,00 0,00 0,00: meter code, readings, consumption last
            section(
                "Energía Activa",
                Some("ENERGÍA ACTIVA kWh"),
                Some("ENERGÍA REACTIVA"),
                format!(r"P([1-6])\s+\d+(?:\.\d+)+\s+(?:[\d.,]+\s+){{4}}{}", NUM),
                vec![Column::ActiveEnergy],
            ),
            section(
                "Energía Reactiva Inductiva",
                Some("ENERGÍA REACTIVA INDUCTIVA kWh"),
                Some("EXCESOS DE POTENCIA"),
                numbers_row("P([1-6])", 3),
                vec![Column::ReactiveEnergy, Column::CosPhi, Column::ReactiveAmount],
            ),
            section(
                "Excesos Potencia",
                Some("EXCESOS DE POTENCIA"),
                Some("INFORMACIÓN DE SU PRODUCTO"),
                numbers_row("P([1-6])", 3),
                vec![
                    Column::ContractedPower,
                    Column::MaxPower,
                    Column::PowerExcessAmount,
                ],
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::template::InvoiceTemplate;
    use crate::extract::{extract_fields, NumericPolicy};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_names_unique() {
        let specs = builtin_specs();
        let mut names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), specs.len());
    }

    #[test]
    fn test_endesa_periodos_row() {
        let template = InvoiceTemplate::compile(&endesa_periodos()).unwrap();
        let text = "Periodo 1 1.200,00 300,00 0,00 0,97 0,00 15,000 12,400 1,00 1,00 0,00 45,10 \
                    Periodo 6 Capacitiva 2.000,00 10,00 0,00 1,00 0,00 15,000 9,000 1,00 1,00 0,00 30,00";
        let mut warnings = Vec::new();
        let table =
            template.sections()[0].extract_table(text, NumericPolicy::Zero, &mut warnings);

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get(Column::ActiveEnergy), Some(1200.0));
        assert_eq!(table.rows[0].get(Column::PowerAmount), Some(45.1));
        assert_eq!(table.rows[1].period.number(), 6);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_endesa_periodos_fields() {
        let template = InvoiceTemplate::compile(&endesa_periodos()).unwrap();
        let text = "Factura nº: F25100479 Fecha Factura: 05/02/2025 \
                    Periodo facturación: 01/01/2025 al 31/01/2025 \
                    Razón Social: INDUSTRIAS EJEMPLO SL NIF/CIF: B12345678 \
                    Dir.Fiscal: C/ Mayor 1, 28001 Madrid Dir.Suministro: Polígono Sur 4, 41001 Sevilla \
                    CUPS: ES0031405123456789AB Contrato nº: 123456789 \
                    Modalidad de Contrato: Precio fijo Total Factura 2.345,67 € antes del 20/02/2025";
        let fields = extract_fields(template.fields(), text);

        assert_eq!(fields.get(FieldKind::InvoiceNumber), Some("F25100479"));
        assert_eq!(fields.get(FieldKind::Customer), Some("INDUSTRIAS EJEMPLO SL"));
        assert_eq!(fields.get(FieldKind::FiscalAddress), Some("C/ Mayor 1, 28001 Madrid"));
        assert_eq!(
            fields.get(FieldKind::SupplyAddress),
            Some("Polígono Sur 4, 41001 Sevilla")
        );
        assert_eq!(fields.get(FieldKind::ContractMode), Some("Precio fijo"));
        assert_eq!(fields.get(FieldKind::TotalAmount), Some("2.345,67"));
        assert_eq!(fields.get(FieldKind::PaymentDueDate), Some("20/02/2025"));
    }

    #[test]
    fn test_secciones_active_energy_takes_last_number() {
        let template = InvoiceTemplate::compile(&secciones()).unwrap();
        let text = "ENERGÍA ACTIVA kWh Periodo Código Anterior Actual P1 1.18.1 7275,00 7285,00 1,00 0,00 10,00 \
                    P2 1.18.2 100,00 150,00 1,00 0,00 50,00 ENERGÍA REACTIVA INDUCTIVA kWh";
        let mut warnings = Vec::new();
        let table =
            template.sections()[0].extract_table(text, NumericPolicy::Zero, &mut warnings);

        let values: Vec<f64> = table
            .rows
            .iter()
            .filter_map(|r| r.get(Column::ActiveEnergy))
            .collect();
        assert_eq!(values, vec![10.0, 50.0]);
    }
}
