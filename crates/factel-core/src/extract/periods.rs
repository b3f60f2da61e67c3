//! Section-bounded extraction of per-tariff-period rows.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use tracing::{debug, warn};

use super::numeric::{parse_decimal, NumericPolicy};
use super::{ExtractionMatch, FieldExtractor};
use crate::models::invoice::{Column, PeriodRow, SectionTable, TariffPeriod, Warning};

/// One matched period row, values still raw strings.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPeriodRow {
    /// Period digit as captured.
    pub digit: String,
    /// Captured cells, one per section column.
    pub cells: Vec<String>,
}

/// Outcome of scanning a document for one section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionScan {
    /// The start marker does not occur in the text.
    NotFound,
    /// Rows in source order, one per period.
    Found {
        rows: Vec<(TariffPeriod, RawPeriodRow)>,
        /// Periods seen again after their first row.
        duplicates: Vec<TariffPeriod>,
        /// Captured digits outside 1-6.
        invalid: Vec<String>,
    },
}

/// A repeating period table delimited by marker text.
#[derive(Debug, Clone)]
pub struct SectionRule {
    name: String,
    start: Option<String>,
    end: Option<String>,
    row: Regex,
    columns: Vec<Column>,
}

impl SectionRule {
    /// Create a rule; `row` has one group for the period digit plus one per column.
    pub(crate) fn new(
        name: String,
        start: Option<String>,
        end: Option<String>,
        row: Regex,
        columns: Vec<Column>,
    ) -> Self {
        Self {
            name,
            start,
            end,
            row,
            columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Slice of text holding the section's rows.
    ///
    /// Starts after the start marker (or at the beginning when the section
    /// has none) and stops at the first end marker after it.
    pub fn block<'t>(&self, text: &'t str) -> Option<&'t str> {
        let begin = match &self.start {
            Some(marker) => text.find(marker.as_str())? + marker.len(),
            None => 0,
        };
        let rest = &text[begin..];

        let block = match &self.end {
            Some(marker) => rest.find(marker.as_str()).map_or(rest, |i| &rest[..i]),
            None => rest,
        };
        Some(block)
    }

    /// Locate the section and collect its rows, first occurrence of each period wins.
    pub fn scan(&self, text: &str) -> SectionScan {
        let Some(block) = self.block(text) else {
            return SectionScan::NotFound;
        };

        let mut seen = HashSet::new();
        let mut rows = Vec::new();
        let mut duplicates = Vec::new();
        let mut invalid = Vec::new();

        for m in self.extract_all(block) {
            let Some(period) = TariffPeriod::from_digit(&m.value.digit) else {
                invalid.push(m.value.digit);
                continue;
            };
            if !seen.insert(period) {
                duplicates.push(period);
                continue;
            }
            rows.push((period, m.value));
        }

        SectionScan::Found {
            rows,
            duplicates,
            invalid,
        }
    }

    /// Scan the text and convert the rows into numeric period rows.
    ///
    /// Every data-quality problem is logged and recorded in `warnings`.
    pub fn extract_table(
        &self,
        text: &str,
        policy: NumericPolicy,
        warnings: &mut Vec<Warning>,
    ) -> SectionTable {
        let mut table = SectionTable {
            name: self.name.clone(),
            columns: self.columns.clone(),
            found: false,
            rows: Vec::new(),
        };

        let (raw_rows, duplicates, invalid) = match self.scan(text) {
            SectionScan::NotFound => {
                warn!("Section {} not found", self.name);
                warnings.push(Warning::SectionNotFound {
                    section: self.name.clone(),
                });
                return table;
            }
            SectionScan::Found {
                rows,
                duplicates,
                invalid,
            } => (rows, duplicates, invalid),
        };
        table.found = true;

        for period in duplicates {
            debug!("Duplicate period {} in {} discarded", period, self.name);
            warnings.push(Warning::DuplicatePeriod {
                section: self.name.clone(),
                period,
            });
        }
        for digit in invalid {
            warn!("Invalid period digit {:?} in {}", digit, self.name);
            warnings.push(Warning::InvalidPeriod {
                section: self.name.clone(),
                digit,
            });
        }

        for (period, raw) in raw_rows {
            if let Some(row) = self.convert_row(period, &raw, policy, warnings) {
                table.rows.push(row);
            }
        }

        if table.rows.is_empty() {
            warn!("Section {} has no period rows", self.name);
            warnings.push(Warning::EmptySection {
                section: self.name.clone(),
            });
        }

        debug!("Section {}: {} rows", self.name, table.rows.len());
        table
    }

    fn convert_row(
        &self,
        period: TariffPeriod,
        raw: &RawPeriodRow,
        policy: NumericPolicy,
        warnings: &mut Vec<Warning>,
    ) -> Option<PeriodRow> {
        let mut values = BTreeMap::new();
        let mut malformed = false;

        for (column, token) in self.columns.iter().zip(&raw.cells) {
            match parse_decimal(token) {
                Some(value) => {
                    values.insert(*column, value);
                }
                None => {
                    warn!(
                        "Unparsable number {:?} in {} {} ({})",
                        token, self.name, period, column
                    );
                    warnings.push(Warning::UnparsableNumber {
                        section: self.name.clone(),
                        period,
                        column: *column,
                        token: token.clone(),
                    });
                    malformed = true;
                    values.insert(*column, 0.0);
                }
            }
        }

        if malformed && policy == NumericPolicy::DropRow {
            warnings.push(Warning::DroppedRow {
                section: self.name.clone(),
                period,
            });
            return None;
        }

        Some(PeriodRow { period, values })
    }
}

impl FieldExtractor for SectionRule {
    type Output = ExtractionMatch<RawPeriodRow>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.row
            .captures_iter(text)
            .filter_map(|caps| {
                let full = caps.get(0)?;
                let digit = caps.get(1)?.as_str().to_string();
                let cells = (2..caps.len())
                    .map(|i| {
                        caps.get(i)
                            .map(|m| m.as_str().trim().to_string())
                            .unwrap_or_default()
                    })
                    .collect();
                Some(ExtractionMatch::new(
                    RawPeriodRow { digit, cells },
                    full.as_str(),
                    full.start(),
                    full.end(),
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reactive_rule() -> SectionRule {
        SectionRule::new(
            "Energía Reactiva Inductiva".to_string(),
            Some("ENERGÍA REACTIVA INDUCTIVA kWh".to_string()),
            Some("EXCESOS DE POTENCIA".to_string()),
            Regex::new(r"P(\d)\s+([\d.,]+)\s+([\d.,]+)\s+([\d.,]+)").unwrap(),
            vec![Column::ReactiveEnergy, Column::CosPhi, Column::ReactiveAmount],
        )
    }

    #[test]
    fn test_section_not_found() {
        let rule = reactive_rule();
        assert_eq!(rule.scan("ENERGÍA ACTIVA kWh P1 1 2 3"), SectionScan::NotFound);

        let mut warnings = Vec::new();
        let table = rule.extract_table("nada", NumericPolicy::Zero, &mut warnings);
        assert!(!table.found);
        assert!(table.rows.is_empty());
        assert_eq!(
            warnings,
            vec![Warning::SectionNotFound {
                section: "Energía Reactiva Inductiva".to_string()
            }]
        );
    }

    #[test]
    fn test_block_stops_at_end_marker() {
        let rule = reactive_rule();
        let text = "ENERGÍA REACTIVA INDUCTIVA kWh P1 1,00 0,95 2,00 \
                    EXCESOS DE POTENCIA P2 9,00 9,00 9,00";
        let mut warnings = Vec::new();
        let table = rule.extract_table(text, NumericPolicy::Zero, &mut warnings);

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].period.to_string(), "P1");
        assert_eq!(table.rows[0].get(Column::CosPhi), Some(0.95));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_end_marker_uses_remainder() {
        let rule = reactive_rule();
        let text = "ENERGÍA REACTIVA INDUCTIVA kWh P1 1,00 0,95 2,00 P2 3,00 0,90 4,00";
        match rule.scan(text) {
            SectionScan::Found { rows, .. } => assert_eq!(rows.len(), 2),
            SectionScan::NotFound => panic!("section should be found"),
        }
    }

    #[test]
    fn test_duplicate_period_first_wins() {
        let rule = reactive_rule();
        let text = "ENERGÍA REACTIVA INDUCTIVA kWh P1 100,00 0,95 1,00 \
                    P2 5,00 0,90 2,00 P1 999,00 0,10 3,00";
        let mut warnings = Vec::new();
        let table = rule.extract_table(text, NumericPolicy::Zero, &mut warnings);

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get(Column::ReactiveEnergy), Some(100.0));
        assert_eq!(table.rows[1].period.to_string(), "P2");
        assert_eq!(
            warnings,
            vec![Warning::DuplicatePeriod {
                section: "Energía Reactiva Inductiva".to_string(),
                period: TariffPeriod::new(1).unwrap(),
            }]
        );
    }

    #[test]
    fn test_rows_keep_source_order() {
        let rule = reactive_rule();
        let text = "ENERGÍA REACTIVA INDUCTIVA kWh P3 1,00 1,00 1,00 P1 2,00 1,00 1,00";
        let mut warnings = Vec::new();
        let table = rule.extract_table(text, NumericPolicy::Zero, &mut warnings);
        let periods: Vec<String> = table.rows.iter().map(|r| r.period.to_string()).collect();
        assert_eq!(periods, vec!["P3", "P1"]);
    }

    #[test]
    fn test_invalid_period_digit_skipped() {
        let rule = reactive_rule();
        let text = "ENERGÍA REACTIVA INDUCTIVA kWh P7 1,00 1,00 1,00 P2 2,00 1,00 1,00";
        let mut warnings = Vec::new();
        let table = rule.extract_table(text, NumericPolicy::Zero, &mut warnings);
        assert_eq!(table.rows.len(), 1);
        assert!(matches!(&warnings[0], Warning::InvalidPeriod { digit, .. } if digit == "7"));
    }

    #[test]
    fn test_unparsable_number_zero_policy() {
        let rule = reactive_rule();
        let text = "ENERGÍA REACTIVA INDUCTIVA kWh P1 1,2,3 0,95 2,00";
        let mut warnings = Vec::new();
        let table = rule.extract_table(text, NumericPolicy::Zero, &mut warnings);

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].get(Column::ReactiveEnergy), Some(0.0));
        assert_eq!(table.rows[0].get(Column::ReactiveAmount), Some(2.0));
        assert!(matches!(
            &warnings[0],
            Warning::UnparsableNumber { column: Column::ReactiveEnergy, token, .. } if token == "1,2,3"
        ));
    }

    #[test]
    fn test_unparsable_number_drop_policy() {
        let rule = reactive_rule();
        let text = "ENERGÍA REACTIVA INDUCTIVA kWh P1 1,2,3 0,95 2,00 P2 1,00 0,95 2,00";
        let mut warnings = Vec::new();
        let table = rule.extract_table(text, NumericPolicy::DropRow, &mut warnings);

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].period.to_string(), "P2");
        assert!(warnings
            .iter()
            .any(|w| matches!(w, Warning::DroppedRow { .. })));
    }

    #[test]
    fn test_found_but_empty() {
        let rule = reactive_rule();
        let mut warnings = Vec::new();
        let table = rule.extract_table(
            "ENERGÍA REACTIVA INDUCTIVA kWh sin lecturas",
            NumericPolicy::Zero,
            &mut warnings,
        );
        assert!(table.found);
        assert!(matches!(&warnings[0], Warning::EmptySection { .. }));
    }
}
