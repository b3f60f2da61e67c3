//! Header field extraction with labeled single-group patterns.

use regex::Regex;
use tracing::trace;

use super::{ExtractionMatch, FieldExtractor};
use crate::models::invoice::{FieldKind, HeaderFields};

/// Pattern locating one header field; its single capture group is the value.
#[derive(Debug, Clone)]
pub struct FieldRule {
    kind: FieldKind,
    pattern: Regex,
}

impl FieldRule {
    /// Create a rule from a compiled pattern with exactly one capture group.
    pub(crate) fn new(kind: FieldKind, pattern: Regex) -> Self {
        Self { kind, pattern }
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

impl FieldExtractor for FieldRule {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let full = caps.get(0)?;
                let value = caps.get(1)?.as_str().trim();
                if value.is_empty() {
                    return None;
                }
                Some(ExtractionMatch::new(
                    value.to_string(),
                    full.as_str(),
                    full.start(),
                    full.end(),
                ))
            })
            .collect()
    }
}

/// Run every field rule against the text.
///
/// Every rule's field is present in the result; a rule that does not match
/// leaves its field absent.
pub fn extract_fields(rules: &[FieldRule], text: &str) -> HeaderFields {
    let mut fields = HeaderFields::new();

    for rule in rules {
        let value = rule.extract(text).map(|m| m.value);
        trace!("Field {}: {:?}", rule.kind, value);

        // First rule for a field wins; later rules only fill a gap.
        if fields.get(rule.kind).is_none() {
            fields.insert(rule.kind, value);
        }
    }

    fields
}
