//! Sequential batch processing with an explicit accumulator.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};

use crate::error::{ExtractionError, FactelError};
use crate::models::config::PdfConfig;
use crate::models::invoice::Invoice;
use crate::pdf::read_pdf_text;

use super::parser::{ExtractionResult, InvoiceParser};
use super::Result;

/// Content of one input document.
#[derive(Debug, Clone)]
pub enum DocumentContent {
    /// PDF file bytes.
    Pdf(Vec<u8>),
    /// Text already extracted from a PDF.
    Text(String),
    /// A file on disk, read when the document is processed.
    File(PathBuf),
}

/// One input document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Source filename, as shown in reports.
    pub name: String,
    pub content: DocumentContent,
}

impl Document {
    pub fn pdf(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content: DocumentContent::Pdf(data),
        }
    }

    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: DocumentContent::Text(text.into()),
        }
    }

    /// A document backed by a file that is only read when processed, so
    /// read errors surface as failures of this document.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: file_name(&path),
            content: DocumentContent::File(path),
        }
    }

    /// Read a document from disk; `.txt` files are taken as extracted text.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let name = file_name(path);

        let is_text = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("txt"));

        if is_text {
            Ok(Self::text(name, std::fs::read_to_string(path)?))
        } else {
            Ok(Self::pdf(name, std::fs::read(path)?))
        }
    }

    /// Text of the document, extracting it from the PDF if needed.
    pub fn text_content(&self, pdf: &PdfConfig) -> Result<String> {
        match &self.content {
            DocumentContent::Text(text) => Ok(text.clone()),
            DocumentContent::Pdf(data) => Ok(read_pdf_text(data, pdf.min_text_length)?),
            DocumentContent::File(path) => Self::from_path(path)?.text_content(pdf),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A document that could not be extracted.
#[derive(Debug)]
pub struct DocumentFailure {
    pub source: String,
    pub error: FactelError,
}

/// Invoices and failures collected over one batch run.
#[derive(Debug, Default)]
pub struct BatchAccumulator {
    /// Extracted invoices, in input order.
    pub invoices: Vec<Invoice>,
    /// Documents that failed, in input order.
    pub failures: Vec<DocumentFailure>,
}

impl BatchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one document.
    pub fn record(mut self, source: &str, result: Result<Invoice>) -> Self {
        match result {
            Ok(invoice) => self.invoices.push(invoice),
            Err(error) => {
                warn!("Failed to process {}: {}", source, error);
                self.failures.push(DocumentFailure {
                    source: source.to_string(),
                    error,
                });
            }
        }
        self
    }

    /// Number of documents recorded.
    pub fn processed(&self) -> usize {
        self.invoices.len() + self.failures.len()
    }

    /// Extracted invoices, or [`ExtractionError::NoData`] if there are none.
    pub fn into_invoices(self) -> Result<Vec<Invoice>> {
        if self.invoices.is_empty() {
            return Err(ExtractionError::NoData.into());
        }
        Ok(self.invoices)
    }
}

/// Extract one document.
pub fn process_document<P: InvoiceParser + ?Sized>(
    parser: &P,
    document: &Document,
    pdf: &PdfConfig,
) -> Result<ExtractionResult> {
    let text = document.text_content(pdf)?;
    parser.parse(&document.name, &text)
}

/// Outcome of one document, reported while a batch runs.
pub struct DocumentOutcome<'a> {
    pub source: &'a str,
    pub result: &'a Result<ExtractionResult>,
    /// Wall time for reading and extracting the document.
    pub elapsed_ms: u64,
}

/// Extract documents one at a time, in input order.
///
/// A failed document is recorded and the batch moves on to the next one.
pub fn process_batch<P, I>(parser: &P, documents: I, pdf: &PdfConfig) -> BatchAccumulator
where
    P: InvoiceParser + ?Sized,
    I: IntoIterator<Item = Document>,
{
    process_batch_with(parser, documents, pdf, |_| {})
}

/// Like [`process_batch`], calling `on_document` after each document.
pub fn process_batch_with<P, I, F>(
    parser: &P,
    documents: I,
    pdf: &PdfConfig,
    mut on_document: F,
) -> BatchAccumulator
where
    P: InvoiceParser + ?Sized,
    I: IntoIterator<Item = Document>,
    F: FnMut(&DocumentOutcome<'_>),
{
    let batch = documents
        .into_iter()
        .fold(BatchAccumulator::new(), |acc, document| {
            let start = Instant::now();
            let result = process_document(parser, &document, pdf);

            on_document(&DocumentOutcome {
                source: &document.name,
                result: &result,
                elapsed_ms: start.elapsed().as_millis() as u64,
            });

            acc.record(&document.name, result.map(|r| r.invoice))
        });

    info!(
        "Batch complete: {} extracted, {} failed",
        batch.invoices.len(),
        batch.failures.len()
    );
    batch
}
