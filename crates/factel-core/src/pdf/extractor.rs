//! PDF text extraction using lopdf and pdf-extract.

use lopdf::Document;
use tracing::{debug, warn};

use super::{PdfProcessor, PdfType, Result};
use crate::error::PdfError;
use crate::text::normalize_pages;

/// PDF content extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
}

/// Extracted content from a PDF.
#[derive(Debug, Clone)]
pub struct PdfContent {
    /// Type of PDF content.
    pub pdf_type: PdfType,
    /// Full document text.
    pub text: String,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
        }
    }

    /// Extract the document text and classify it.
    ///
    /// The whole-document pdf-extract text is used first; when pdf-extract
    /// fails, the page text decoded by lopdf is joined instead.
    pub fn extract_all(&self, min_text_length: usize) -> Result<PdfContent> {
        let page_count = self.page_count();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        let text = match self.extract_text() {
            Ok(text) => text,
            Err(e) => {
                debug!("pdf-extract failed ({}), joining page text", e);
                normalize_pages(&self.page_texts())
            }
        };

        let pdf_type = classify(&text, min_text_length);
        debug!(
            "PDF analysis: {} pages, {} chars text -> {:?}",
            page_count,
            text_chars(&text),
            pdf_type
        );

        Ok(PdfContent { pdf_type, text })
    }

    /// Text of every page decoded by lopdf; unreadable pages are empty.
    fn page_texts(&self) -> Vec<String> {
        (1..=self.page_count())
            .map(|number| {
                self.extract_page_text(number).unwrap_or_else(|e| {
                    warn!("Failed to extract text from page {}: {}", number, e);
                    String::new()
                })
            })
            .collect()
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // Save decrypted document to raw_data for pdf_extract
            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_text(&self) -> Result<String> {
        if self.document.is_none() {
            return Err(PdfError::Parse("No document loaded".to_string()));
        }
        pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }

    fn extract_page_text(&self, page: u32) -> Result<String> {
        let doc = self
            .document
            .as_ref()
            .ok_or(PdfError::Parse("No document loaded".to_string()))?;

        if !doc.get_pages().contains_key(&page) {
            return Err(PdfError::InvalidPage(page));
        }

        doc.extract_text(&[page])
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }
}

fn text_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

fn classify(text: &str, min_text_length: usize) -> PdfType {
    if text_chars(text) < min_text_length {
        PdfType::Scanned
    } else {
        PdfType::Text
    }
}

/// Load a PDF and return its embedded text.
///
/// Fails with [`PdfError::Scanned`] when the document carries less than
/// `min_text_length` non-whitespace characters.
pub fn read_pdf_text(data: &[u8], min_text_length: usize) -> Result<String> {
    let mut extractor = PdfExtractor::new();
    extractor.load(data)?;

    let content = extractor.extract_all(min_text_length)?;
    if content.pdf_type == PdfType::Scanned {
        return Err(PdfError::Scanned {
            chars: text_chars(&content.text),
        });
    }

    Ok(content.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// One-page PDF showing `lines` in Helvetica.
    fn text_pdf(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![50.into(), 700.into()]),
            Operation::new("TL", vec![14.into()]),
        ];
        for line in lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut data = Vec::new();
        doc.save_to(&mut data).unwrap();
        data
    }

    #[test]
    fn test_pdf_extractor_new() {
        let extractor = PdfExtractor::new();
        assert!(extractor.document.is_none());
        assert_eq!(extractor.page_count(), 0);
        assert!(extractor.extract_text().is_err());
    }

    #[test]
    fn test_load_garbage_fails() {
        let mut extractor = PdfExtractor::new();
        assert!(matches!(
            extractor.load(b"not a pdf at all"),
            Err(PdfError::Parse(_))
        ));
        assert!(read_pdf_text(b"%PDF-broken", 10).is_err());
    }

    #[test]
    fn test_read_text_pdf() {
        let data = text_pdf(&["Periodo facturacion", "Total Factura 123,45"]);

        let text = read_pdf_text(&data, 10).unwrap();
        assert!(text.contains("Total Factura"));

        let mut extractor = PdfExtractor::new();
        extractor.load(&data).unwrap();
        assert_eq!(extractor.page_count(), 1);
        assert!(extractor.extract_page_text(1).unwrap().contains("Periodo"));
        assert!(matches!(
            extractor.extract_page_text(2),
            Err(PdfError::InvalidPage(2))
        ));
    }

    #[test]
    fn test_little_text_is_scanned() {
        let data = text_pdf(&["P1"]);
        assert!(matches!(
            read_pdf_text(&data, 100),
            Err(PdfError::Scanned { chars: 2 })
        ));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("  a b c  ", 3), PdfType::Text);
        assert_eq!(classify("  a b  ", 3), PdfType::Scanned);
        assert_eq!(classify("", 1), PdfType::Scanned);
    }
}
