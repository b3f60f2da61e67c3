//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;
use crate::extract::numeric::NumericPolicy;
use crate::extract::template::{TemplateRegistry, TemplateSpec};

/// Main configuration for factel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FactelConfig {
    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Invoice extraction configuration.
    pub extraction: ExtractionConfig,

    /// Report configuration.
    pub report: ReportConfig,

    /// User-defined invoice templates, tried before the built-ins.
    pub templates: Vec<TemplateSpec>,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Minimum non-whitespace characters for a PDF to count as text-based.
    pub min_text_length: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            min_text_length: 100,
        }
    }
}

/// Invoice extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Template used when detection finds no match.
    pub default_template: Option<String>,

    /// What to do with a row holding an unparsable number.
    pub numeric_policy: NumericPolicy,

    /// Include the built-in templates.
    pub builtin_templates: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_template: None,
            numeric_policy: NumericPolicy::Zero,
            builtin_templates: true,
        }
    }
}

/// Report configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Order invoices by billing-period start date.
    pub sort_by_period: bool,

    /// Append a global TOTAL row to every detail table.
    pub grand_total: bool,

    /// Decimal places in text renderings.
    pub decimals: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sort_by_period: true,
            grand_total: true,
            decimals: 2,
        }
    }
}

impl FactelConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Compile the configured templates into a registry.
    pub fn registry(&self) -> Result<TemplateRegistry, TemplateError> {
        let registry =
            TemplateRegistry::from_specs(&self.templates, self.extraction.builtin_templates)?;
        if registry.is_empty() {
            return Err(TemplateError::Empty);
        }
        Ok(registry)
    }
}
