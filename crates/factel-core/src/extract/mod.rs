//! Template-driven extraction of header fields and tariff-period tables.

pub mod builtin;
pub mod fields;
pub mod numeric;
pub mod periods;
pub mod template;

pub use fields::{extract_fields, FieldRule};
pub use numeric::{format_decimal, parse_decimal, NumericPolicy};
pub use periods::{RawPeriodRow, SectionRule, SectionScan};
pub use template::{Detection, InvoiceTemplate, TemplateRegistry, TemplateSpec};

use crate::error::TemplateError;

/// Result type for template compilation and lookup.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Trait for pattern-based extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the first occurrence from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all non-overlapping occurrences, in text order.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// An extracted value with the text it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Byte span of the whole match in the searched text.
    pub position: (usize, usize),
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, source: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            value,
            position: (start, end),
            source: source.into(),
        }
    }
}
