//! Invoice extraction: template selection, parsing and batch accumulation.

mod batch;
mod parser;

pub use batch::{
    process_batch, process_batch_with, process_document, BatchAccumulator, Document,
    DocumentContent, DocumentFailure, DocumentOutcome,
};
pub use parser::{ExtractionResult, InvoiceParser, TemplateInvoiceParser};

/// Result type for extraction operations.
pub type Result<T> = crate::error::Result<T>;
