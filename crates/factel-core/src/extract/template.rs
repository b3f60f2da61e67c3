//! Invoice templates: per-layout field and section rules plus detection.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::builtin::builtin_specs;
use super::fields::FieldRule;
use super::periods::SectionRule;
use crate::error::TemplateError;
use crate::models::invoice::{Column, FieldKind};
use crate::text::normalize_text;

/// Serializable description of an invoice layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSpec {
    /// Unique template name.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Marker strings whose presence identifies the layout.
    #[serde(default)]
    pub markers: Vec<String>,

    /// Header field patterns.
    #[serde(default)]
    pub fields: Vec<FieldSpec>,

    /// Period-table sections.
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
}

/// Header field pattern: one capture group holding the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub pattern: String,
}

/// Period-table section of a layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    /// Section name, also used as the report sheet name.
    pub name: String,

    /// Text opening the section; the whole document when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    /// Text closing the section; the rest of the document when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,

    /// Row pattern: period digit group followed by one group per column.
    pub row: String,

    /// Column layout of the captured values.
    pub columns: Vec<Column>,
}

/// A compiled invoice template.
#[derive(Debug, Clone)]
pub struct InvoiceTemplate {
    spec: TemplateSpec,
    markers: Vec<String>,
    fields: Vec<FieldRule>,
    sections: Vec<SectionRule>,
}

impl InvoiceTemplate {
    /// Compile a template, checking every pattern's capture groups.
    pub fn compile(spec: &TemplateSpec) -> Result<Self, TemplateError> {
        let fields = spec
            .fields
            .iter()
            .map(|field| {
                let context = format!("field {}", field.kind);
                let pattern = compile_pattern(&spec.name, &context, &field.pattern, 1)?;
                Ok(FieldRule::new(field.kind, pattern))
            })
            .collect::<Result<Vec<_>, TemplateError>>()?;

        let sections = spec
            .sections
            .iter()
            .map(|section| {
                let context = format!("section {}", section.name);
                let row = compile_pattern(
                    &spec.name,
                    &context,
                    &section.row,
                    section.columns.len() + 1,
                )?;
                Ok(SectionRule::new(
                    section.name.clone(),
                    section.start.as_deref().map(normalize_text),
                    section.end.as_deref().map(normalize_text),
                    row,
                    section.columns.clone(),
                ))
            })
            .collect::<Result<Vec<_>, TemplateError>>()?;

        let markers = spec
            .markers
            .iter()
            .map(|m| normalize_text(m))
            .filter(|m| !m.is_empty())
            .collect();

        Ok(Self {
            spec: spec.clone(),
            markers,
            fields,
            sections,
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn description(&self) -> &str {
        &self.spec.description
    }

    /// The specification this template was compiled from.
    pub fn spec(&self) -> &TemplateSpec {
        &self.spec
    }

    pub fn fields(&self) -> &[FieldRule] {
        &self.fields
    }

    pub fn sections(&self) -> &[SectionRule] {
        &self.sections
    }

    /// Number of detection markers present in normalized text.
    pub fn score(&self, text: &str) -> usize {
        self.markers.iter().filter(|m| text.contains(m.as_str())).count()
    }
}

fn compile_pattern(
    template: &str,
    context: &str,
    pattern: &str,
    expected_groups: usize,
) -> Result<Regex, TemplateError> {
    let regex = Regex::new(pattern).map_err(|source| TemplateError::Pattern {
        template: template.to_string(),
        context: context.to_string(),
        source,
    })?;

    // captures_len counts the implicit whole-match group
    let found = regex.captures_len() - 1;
    if found != expected_groups {
        return Err(TemplateError::GroupCount {
            template: template.to_string(),
            context: context.to_string(),
            expected: expected_groups,
            found,
        });
    }

    Ok(regex)
}

/// Result of template detection.
#[derive(Debug, Clone, Copy)]
pub struct Detection<'a> {
    pub template: &'a InvoiceTemplate,
    /// Number of markers found.
    pub score: usize,
}

/// Ordered set of compiled templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: Vec<InvoiceTemplate>,
}

impl TemplateRegistry {
    /// Registry with the built-in templates only.
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::from_specs(&[], true)
    }

    /// Compile user templates followed by (optionally) the built-ins.
    ///
    /// A user template shadows a built-in template of the same name.
    pub fn from_specs(user: &[TemplateSpec], include_builtin: bool) -> Result<Self, TemplateError> {
        let mut registry = Self::default();

        for spec in user {
            registry.register(InvoiceTemplate::compile(spec)?);
        }

        if include_builtin {
            for spec in builtin_specs() {
                if registry.get(&spec.name).is_none() {
                    registry.register(InvoiceTemplate::compile(&spec)?);
                }
            }
        }

        debug!("Template registry holds {} templates", registry.len());
        Ok(registry)
    }

    /// Append a template; an existing template with the same name is replaced.
    pub fn register(&mut self, template: InvoiceTemplate) {
        match self.templates.iter_mut().find(|t| t.name() == template.name()) {
            Some(existing) => *existing = template,
            None => self.templates.push(template),
        }
    }

    pub fn get(&self, name: &str) -> Option<&InvoiceTemplate> {
        self.templates.iter().find(|t| t.name() == name)
    }

    /// Template by name, or [`TemplateError::Unknown`].
    pub fn require(&self, name: &str) -> Result<&InvoiceTemplate, TemplateError> {
        self.get(name)
            .ok_or_else(|| TemplateError::Unknown(name.to_string()))
    }

    /// The template whose markers best match normalized text.
    ///
    /// Highest positive score wins; ties go to the earlier template.
    pub fn detect(&self, text: &str) -> Option<Detection<'_>> {
        let mut best: Option<Detection<'_>> = None;

        for template in &self.templates {
            let score = template.score(text);
            debug!("Template {} scored {}", template.name(), score);
            if score > 0 && best.is_none_or(|b| score > b.score) {
                best = Some(Detection { template, score });
            }
        }

        best
    }

    pub fn iter(&self) -> impl Iterator<Item = &InvoiceTemplate> {
        self.templates.iter()
    }

    pub fn first(&self) -> Option<&InvoiceTemplate> {
        self.templates.first()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
