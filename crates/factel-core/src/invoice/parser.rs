//! Template-driven invoice parser.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{ExtractionError, TemplateError};
use crate::extract::fields::extract_fields;
use crate::extract::numeric::{parse_decimal, NumericPolicy};
use crate::extract::template::{InvoiceTemplate, TemplateRegistry};
use crate::models::config::FactelConfig;
use crate::models::invoice::{BillingPeriod, FieldKind, HeaderFields, Invoice, Warning};
use crate::text::normalize_text;

use super::Result;

/// Result of invoice extraction.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Extracted invoice data, warnings included.
    pub invoice: Invoice,
    /// Marker score of the detected template; `None` when it was forced
    /// or fell back.
    pub detection_score: Option<usize>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Trait for invoice parsing.
pub trait InvoiceParser {
    /// Parse one document's text.
    fn parse(&self, source: &str, raw_text: &str) -> Result<ExtractionResult>;
}

/// Parser that runs one invoice template over a document.
pub struct TemplateInvoiceParser {
    registry: TemplateRegistry,
    /// Template used for every document, skipping detection.
    forced: Option<String>,
    /// Template used when detection finds nothing.
    fallback: Option<String>,
    numeric_policy: NumericPolicy,
}

impl TemplateInvoiceParser {
    /// Create a parser over a template registry with default settings.
    pub fn new(registry: TemplateRegistry) -> Self {
        Self {
            registry,
            forced: None,
            fallback: None,
            numeric_policy: NumericPolicy::default(),
        }
    }

    /// Create a parser from configuration.
    pub fn from_config(config: &FactelConfig) -> Result<Self> {
        let registry = config.registry()?;
        if let Some(name) = &config.extraction.default_template {
            registry.require(name)?;
        }

        Ok(Self {
            registry,
            forced: None,
            fallback: config.extraction.default_template.clone(),
            numeric_policy: config.extraction.numeric_policy,
        })
    }

    /// Use the named template for every document.
    pub fn with_template(mut self, name: &str) -> std::result::Result<Self, TemplateError> {
        self.registry.require(name)?;
        self.forced = Some(name.to_string());
        Ok(self)
    }

    /// Set the unparsable-number policy.
    pub fn with_numeric_policy(mut self, policy: NumericPolicy) -> Self {
        self.numeric_policy = policy;
        self
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    fn select_template(
        &self,
        text: &str,
        warnings: &mut Vec<Warning>,
    ) -> Result<(&InvoiceTemplate, Option<usize>)> {
        if let Some(name) = &self.forced {
            return Ok((self.registry.require(name)?, None));
        }

        if let Some(detection) = self.registry.detect(text) {
            debug!(
                "Detected template {} (score {})",
                detection.template.name(),
                detection.score
            );
            return Ok((detection.template, Some(detection.score)));
        }

        let template = match &self.fallback {
            Some(name) => self.registry.require(name)?,
            None => self.registry.first().ok_or(TemplateError::Empty)?,
        };
        warn!("No template matched, using {}", template.name());
        warnings.push(Warning::TemplateNotDetected {
            fallback: template.name().to_string(),
        });
        Ok((template, None))
    }

    fn billing_period(
        &self,
        fields: &HeaderFields,
        warnings: &mut Vec<Warning>,
    ) -> Option<BillingPeriod> {
        let period = BillingPeriod::from_fields(fields);
        if period.is_some() {
            return period;
        }

        for kind in [FieldKind::PeriodStart, FieldKind::PeriodEnd] {
            if let Some(value) = fields.get(kind) {
                if BillingPeriod::parse_date(value).is_none() {
                    warn!("Invalid date {:?} in {}", value, kind);
                    warnings.push(Warning::InvalidDate {
                        field: kind,
                        value: value.to_string(),
                    });
                }
            }
        }
        if let Some(value) = fields.get(FieldKind::BillingPeriod) {
            warn!("Invalid billing period {:?}", value);
            warnings.push(Warning::InvalidDate {
                field: FieldKind::BillingPeriod,
                value: value.to_string(),
            });
        }

        None
    }

    fn total_amount(&self, fields: &HeaderFields, warnings: &mut Vec<Warning>) -> Option<f64> {
        let value = fields.get(FieldKind::TotalAmount)?;
        let total = parse_decimal(value);
        if total.is_none() {
            warn!("Invalid invoice total {:?}", value);
            warnings.push(Warning::InvalidTotal {
                value: value.to_string(),
            });
        }
        total
    }
}

impl InvoiceParser for TemplateInvoiceParser {
    fn parse(&self, source: &str, raw_text: &str) -> Result<ExtractionResult> {
        let start = Instant::now();

        let normalized = normalize_text(raw_text);
        if normalized.is_empty() {
            return Err(ExtractionError::EmptyText(source.to_string()).into());
        }

        info!(
            "Parsing {} from {} characters of text",
            source,
            normalized.len()
        );

        let mut warnings = Vec::new();
        let (template, detection_score) = self.select_template(&normalized, &mut warnings)?;

        let fields = extract_fields(template.fields(), &normalized);
        let billing_period = self.billing_period(&fields, &mut warnings);
        let total_amount = self.total_amount(&fields, &mut warnings);

        let mut sections = Vec::with_capacity(template.sections().len());
        for rule in template.sections() {
            sections.push(rule.extract_table(&normalized, self.numeric_policy, &mut warnings));
        }

        let invoice = Invoice {
            source: source.to_string(),
            template: template.name().to_string(),
            fields,
            billing_period,
            total_amount,
            sections,
            warnings,
            raw_text: raw_text.to_string(),
            normalized_text: normalized,
        };

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Extracted {} with template {}: {} rows, {} warnings in {}ms",
            source,
            invoice.template,
            invoice.row_count(),
            invoice.warnings.len(),
            processing_time_ms
        );

        Ok(ExtractionResult {
            invoice,
            detection_score,
            processing_time_ms,
        })
    }
}
