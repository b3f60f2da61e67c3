//! Invoice data models for Spanish electricity bills.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

/// Scalar header field of an invoice.
///
/// Declaration order is the column order of the summary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    InvoiceNumber,
    IssueDate,
    BillingPeriod,
    PeriodStart,
    PeriodEnd,
    TotalAmount,
    Customer,
    TaxId,
    FiscalAddress,
    SupplyAddress,
    Cups,
    ContractNumber,
    ContractMode,
    PaymentDueDate,
}

impl FieldKind {
    /// Column label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            FieldKind::InvoiceNumber => "Nº Factura",
            FieldKind::IssueDate => "Fecha Factura",
            FieldKind::BillingPeriod => "Periodo de Facturación",
            FieldKind::PeriodStart => "Periodo desde",
            FieldKind::PeriodEnd => "Periodo hasta",
            FieldKind::TotalAmount => "Total Factura",
            FieldKind::Customer => "Cliente",
            FieldKind::TaxId => "NIF/CIF",
            FieldKind::FiscalAddress => "Dirección Fiscal",
            FieldKind::SupplyAddress => "Dirección Suministro",
            FieldKind::Cups => "CUPS",
            FieldKind::ContractNumber => "Contrato Nº",
            FieldKind::ContractMode => "Modalidad de Contrato",
            FieldKind::PaymentDueDate => "Fecha Límite de Pago",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Numeric column of a tariff-period row.
///
/// Declaration order is the column order of the detail tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    /// Active energy consumed (kWh).
    ActiveEnergy,
    /// Reactive energy (kVArh).
    ReactiveEnergy,
    /// Reactive energy above the free allowance (kVArh).
    ReactiveExcess,
    /// Power factor.
    CosPhi,
    /// Amount billed for reactive energy (€).
    ReactiveAmount,
    /// Contracted power (kW).
    ContractedPower,
    /// Maximum registered power (kW).
    MaxPower,
    /// Kp coefficient of the excess formula.
    Kp,
    /// Te coefficient of the excess formula.
    Te,
    /// Power demanded above the contracted power (kW).
    PowerExcess,
    /// Amount billed for power (€).
    PowerAmount,
    /// Amount billed for power excesses (€).
    PowerExcessAmount,
}

impl Column {
    /// Column label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Column::ActiveEnergy => "Energía Activa (kWh)",
            Column::ReactiveEnergy => "Energía Reactiva (kVArh)",
            Column::ReactiveExcess => "Exceso Reactiva (kVArh)",
            Column::CosPhi => "Cos φ",
            Column::ReactiveAmount => "Importe Reactiva (€)",
            Column::ContractedPower => "Potencia Contratada (kW)",
            Column::MaxPower => "Potencia Máxima (kW)",
            Column::Kp => "Kp",
            Column::Te => "Te",
            Column::PowerExcess => "Excesos Potencia (kW)",
            Column::PowerAmount => "Importe Potencia (€)",
            Column::PowerExcessAmount => "Importe Excesos (€)",
        }
    }

    /// Whether summing this column over periods is meaningful.
    ///
    /// Ratios, coefficients and power levels are excluded.
    pub fn is_summable(self) -> bool {
        !matches!(
            self,
            Column::CosPhi | Column::Kp | Column::Te | Column::ContractedPower | Column::MaxPower
        )
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tariff period P1-P6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TariffPeriod(u8);

impl TariffPeriod {
    /// Create a tariff period from its number (1-6).
    pub fn new(number: u8) -> Option<Self> {
        (1..=6).contains(&number).then_some(Self(number))
    }

    /// Parse the period digit captured from invoice text.
    pub fn from_digit(digit: &str) -> Option<Self> {
        digit.trim().parse::<u8>().ok().and_then(Self::new)
    }

    /// Period number (1-6).
    pub fn number(self) -> u8 {
        self.0
    }
}

impl fmt::Display for TariffPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl Serialize for TariffPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One tariff period of one section of an invoice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodRow {
    /// Tariff period.
    pub period: TariffPeriod,
    /// Parsed numeric values, one per column of the section layout.
    pub values: BTreeMap<Column, f64>,
}

impl PeriodRow {
    pub fn new(period: TariffPeriod) -> Self {
        Self {
            period,
            values: BTreeMap::new(),
        }
    }

    /// Value of a column, if the section layout has it.
    pub fn get(&self, column: Column) -> Option<f64> {
        self.values.get(&column).copied()
    }
}

/// Period rows extracted from one section of an invoice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionTable {
    /// Section name, also the report sheet name.
    pub name: String,
    /// Column layout of the section.
    pub columns: Vec<Column>,
    /// Whether the section start marker was found.
    pub found: bool,
    /// Rows in source-text order, one per tariff period.
    pub rows: Vec<PeriodRow>,
}

/// Extracted header fields; every field of the template is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct HeaderFields(BTreeMap<FieldKind, Option<String>>);

impl HeaderFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a field value; `None` marks the field as absent.
    pub fn insert(&mut self, kind: FieldKind, value: Option<String>) {
        self.0.insert(kind, value);
    }

    /// Extracted value of a field, if present in the text.
    pub fn get(&self, kind: FieldKind) -> Option<&str> {
        self.0.get(&kind).and_then(|v| v.as_deref())
    }

    /// Whether the template declares this field.
    pub fn contains(&self, kind: FieldKind) -> bool {
        self.0.contains_key(&kind)
    }

    /// Field kinds declared by the template, in column order.
    pub fn kinds(&self) -> impl Iterator<Item = FieldKind> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKind, Option<&str>)> {
        self.0.iter().map(|(k, v)| (*k, v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Billing period covered by an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BillingPeriod {
    /// Parse a day-first date (`dd/mm/yyyy`, `dd-mm-yyyy` or `dd.mm.yyyy`).
    pub fn parse_date(s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    }

    /// Parse a combined period such as `01/01/2024 al 31/01/2024` or
    /// `01-01-2024 > 31-01-2024`.
    pub fn parse_range(s: &str) -> Option<Self> {
        let (start, end) = s
            .split_once(" al ")
            .or_else(|| s.split_once('>'))?;
        Some(Self {
            start: Self::parse_date(start)?,
            end: Self::parse_date(end)?,
        })
    }

    /// Derive the billing period from extracted header fields.
    ///
    /// Separate start/end fields take precedence over the combined field.
    pub fn from_fields(fields: &HeaderFields) -> Option<Self> {
        if let (Some(start), Some(end)) = (
            fields.get(FieldKind::PeriodStart),
            fields.get(FieldKind::PeriodEnd),
        ) {
            if let (Some(start), Some(end)) = (Self::parse_date(start), Self::parse_date(end)) {
                return Some(Self { start, end });
            }
        }
        fields
            .get(FieldKind::BillingPeriod)
            .and_then(Self::parse_range)
    }
}

/// Data-quality notice raised while extracting one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// No template matched the text; the fallback template was used.
    TemplateNotDetected { fallback: String },
    /// A section's start marker is missing from the text.
    SectionNotFound { section: String },
    /// A section was found but no period rows matched inside it.
    EmptySection { section: String },
    /// A numeric token could not be parsed.
    UnparsableNumber {
        section: String,
        period: TariffPeriod,
        column: Column,
        token: String,
    },
    /// A row was discarded because one of its numbers could not be parsed.
    DroppedRow { section: String, period: TariffPeriod },
    /// A period appeared again in the same section; the later row was discarded.
    DuplicatePeriod { section: String, period: TariffPeriod },
    /// A row matched with a period digit outside 1-6.
    InvalidPeriod { section: String, digit: String },
    /// A date field is present but not a recognizable date.
    InvalidDate { field: FieldKind, value: String },
    /// The invoice total is present but not a number.
    InvalidTotal { value: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::TemplateNotDetected { fallback } => {
                write!(f, "no template matched, using {}", fallback)
            }
            Warning::SectionNotFound { section } => write!(f, "section {} not found", section),
            Warning::EmptySection { section } => {
                write!(f, "section {} has no period rows", section)
            }
            Warning::UnparsableNumber {
                section,
                period,
                column,
                token,
            } => write!(
                f,
                "unparsable number {:?} in {} {} ({})",
                token, section, period, column
            ),
            Warning::DroppedRow { section, period } => {
                write!(f, "dropped row {} in {}", period, section)
            }
            Warning::DuplicatePeriod { section, period } => {
                write!(f, "duplicate period {} in {} discarded", period, section)
            }
            Warning::InvalidPeriod { section, digit } => {
                write!(f, "invalid period digit {:?} in {}", digit, section)
            }
            Warning::InvalidDate { field, value } => {
                write!(f, "invalid date {:?} in {}", value, field)
            }
            Warning::InvalidTotal { value } => write!(f, "invalid invoice total {:?}", value),
        }
    }
}

/// One extracted invoice document.
#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    /// Source filename.
    pub source: String,

    /// Name of the template used for extraction.
    pub template: String,

    /// Header fields declared by the template.
    pub fields: HeaderFields,

    /// Billing period parsed from the header fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_period: Option<BillingPeriod>,

    /// Invoice total parsed from the header fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,

    /// One table per template section, in template order.
    pub sections: Vec<SectionTable>,

    /// Data-quality warnings raised during extraction.
    pub warnings: Vec<Warning>,

    /// Text as extracted from the document.
    #[serde(skip)]
    pub raw_text: String,

    /// Whitespace-normalized text the patterns ran against.
    #[serde(skip)]
    pub normalized_text: String,
}

impl Invoice {
    /// Section table by name.
    pub fn section(&self, name: &str) -> Option<&SectionTable> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Period start as shown in reports.
    pub fn period_start_label(&self) -> String {
        match self.billing_period {
            Some(p) => p.start.format("%d/%m/%Y").to_string(),
            None => self
                .fields
                .get(FieldKind::PeriodStart)
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Period end as shown in reports.
    pub fn period_end_label(&self) -> String {
        match self.billing_period {
            Some(p) => p.end.format("%d/%m/%Y").to_string(),
            None => self
                .fields
                .get(FieldKind::PeriodEnd)
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Total number of period rows across sections.
    pub fn row_count(&self) -> usize {
        self.sections.iter().map(|s| s.rows.len()).sum()
    }
}
