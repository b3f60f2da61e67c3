//! European-formatted number parsing and display.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    // Trailing unit or currency: "kWh", "kVArh", "kW", "€", "EUR", "%", "€/kW día".
    static ref UNIT_SUFFIX: Regex = Regex::new(r"[\s\p{L}€%/]+$").unwrap();

    static ref PLAIN_NUMBER: Regex = Regex::new(r"^[+-]?\d+(?:\.\d+)?$").unwrap();
}

/// What to do with a row holding a number that cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericPolicy {
    /// Keep the row, the value becomes zero.
    #[default]
    Zero,
    /// Discard the whole row.
    DropRow,
}

/// Parse a European-formatted number (e.g. "1.234,56 kWh").
///
/// Full stops are thousands separators and the comma is the decimal
/// separator. Returns `None` for anything that is not a plain number once
/// the unit suffix is stripped.
pub fn parse_decimal(token: &str) -> Option<f64> {
    let stripped = UNIT_SUFFIX.replace(token.trim(), "");
    let cleaned = stripped.trim().replace('.', "").replace(',', ".");

    if !PLAIN_NUMBER.is_match(&cleaned) {
        return None;
    }

    cleaned.parse::<f64>().ok()
}

/// Format a number for display with `.` thousands and `,` decimals.
pub fn format_decimal(value: f64, decimals: usize) -> String {
    let s = format!("{:.*}", decimals, value.abs());
    let (integer_part, decimal_part) = match s.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (s.as_str(), None),
    };

    // Add thousand separators
    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();
    if value < 0.0 && s.chars().any(|c| c != '0' && c != '.') {
        formatted.push('-');
    }

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push('.');
        }
        formatted.push(*c);
    }

    if let Some(decimal_part) = decimal_part {
        formatted.push(',');
        formatted.push_str(decimal_part);
    }

    formatted
}
