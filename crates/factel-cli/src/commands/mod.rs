//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod output;
pub mod process;
pub mod templates;

use std::path::{Path, PathBuf};

use tracing::debug;

use factel_core::{FactelConfig, TemplateInvoiceParser};

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("factel")
        .join("config.json")
}

/// Configuration file in use: the `--config` path or the default location.
pub fn config_file(config_path: Option<&str>) -> PathBuf {
    config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path)
}

/// Load configuration; an explicit path must exist, the default one may not.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FactelConfig> {
    if let Some(path) = config_path {
        return FactelConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path, e));
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Loading configuration from {}", path.display());
        Ok(FactelConfig::from_file(&path)?)
    } else {
        Ok(FactelConfig::default())
    }
}

/// Parser for the configured templates, optionally forced to one template.
pub fn build_parser(
    config: &FactelConfig,
    template: Option<&str>,
) -> anyhow::Result<TemplateInvoiceParser> {
    let parser = TemplateInvoiceParser::from_config(config)?;
    match template {
        Some(name) => Ok(parser.with_template(name)?),
        None => Ok(parser),
    }
}
