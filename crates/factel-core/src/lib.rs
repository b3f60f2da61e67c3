//! Core library for Spanish electricity invoice extraction.
//!
//! This crate provides:
//! - PDF text extraction (lopdf and pdf-extract)
//! - Text normalization
//! - Template-driven header field and tariff-period table extraction
//! - European number parsing and display formatting
//! - Per-file and global totals
//! - Multi-sheet spreadsheet reports (XLSX export and read-back)

pub mod aggregate;
pub mod error;
pub mod extract;
pub mod invoice;
pub mod models;
pub mod pdf;
pub mod report;
pub mod text;

pub use aggregate::{Totals, TotalsRow};
pub use error::{ExtractionError, FactelError, PdfError, ReportError, Result, TemplateError};
pub use extract::numeric::{format_decimal, parse_decimal, NumericPolicy};
pub use extract::template::{InvoiceTemplate, TemplateRegistry, TemplateSpec};
pub use invoice::{
    BatchAccumulator, Document, DocumentFailure, ExtractionResult, InvoiceParser,
    TemplateInvoiceParser,
};
pub use models::config::FactelConfig;
pub use models::invoice::{
    BillingPeriod, Column, FieldKind, HeaderFields, Invoice, PeriodRow, SectionTable,
    TariffPeriod, Warning,
};
pub use pdf::{PdfExtractor, PdfProcessor, PdfType};
pub use report::{Cell, Report, ReportBuilder, Table};
pub use text::normalize_text;
