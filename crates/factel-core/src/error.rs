//! Error types for the factel-core library.

use thiserror::Error;

/// Main error type for the factel library.
#[derive(Error, Debug)]
pub enum FactelError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Invoice extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Invoice template error.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// Report export or read-back error.
    #[error("report error: {0}")]
    Report(#[from] ReportError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// The PDF carries too little embedded text; it is a scanned document.
    #[error("PDF looks scanned ({chars} characters of embedded text); OCR is not supported")]
    Scanned { chars: usize },
}

/// Errors related to invoice extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The document yielded no text at all.
    #[error("document {0} contains no text")]
    EmptyText(String),

    /// No invoice data could be extracted from any input.
    #[error("no data could be extracted from any input")]
    NoData,
}

/// Errors related to invoice templates.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// No template with the given name is registered.
    #[error("unknown template: {0}")]
    Unknown(String),

    /// The registry holds no templates at all.
    #[error("no invoice templates available")]
    Empty,

    /// A pattern failed to compile.
    #[error("invalid pattern for {context} in template {template}: {source}")]
    Pattern {
        template: String,
        context: String,
        #[source]
        source: regex::Error,
    },

    /// A pattern has the wrong number of capture groups.
    #[error("pattern for {context} in template {template} has {found} capture groups, expected {expected}")]
    GroupCount {
        template: String,
        context: String,
        expected: usize,
        found: usize,
    },
}

/// Errors related to spreadsheet export and read-back.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Writing the workbook failed.
    #[error("failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    /// Reading the workbook back failed.
    #[error("failed to read workbook: {0}")]
    Read(#[from] calamine::XlsxError),

    /// I/O error while writing the workbook.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the factel library.
pub type Result<T> = std::result::Result<T, FactelError>;
