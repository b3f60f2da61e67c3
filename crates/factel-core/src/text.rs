//! Text normalization for extracted PDF text.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Collapse a document's raw text into a single whitespace-normalized line.
///
/// Newlines become spaces and every run of whitespace (including
/// non-breaking spaces) collapses to one space.
pub fn normalize_text(raw: &str) -> String {
    WHITESPACE.replace_all(raw.trim(), " ").into_owned()
}

/// Normalize page-by-page text into one string, pages joined by a space.
pub fn normalize_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let joined = pages
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join(" ");
    normalize_text(&joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(
            normalize_text("Factura nº:\n  F25100479\t\tTotal\r\n"),
            "Factura nº: F25100479 Total"
        );
        assert_eq!(normalize_text("1.234,56\u{00a0}\u{00a0}€"), "1.234,56 €");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text(" \n\t "), "");
    }

    #[test]
    fn test_normalize_pages() {
        let pages = vec!["ENERGÍA ACTIVA kWh\nP1", "  7.275,00\n"];
        assert_eq!(normalize_pages(&pages), "ENERGÍA ACTIVA kWh P1 7.275,00");
        assert_eq!(normalize_pages::<&str>(&[]), "");
    }
}
