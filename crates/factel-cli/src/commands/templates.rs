//! Templates command - inspect invoice templates and detection.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use factel_core::invoice::Document;
use factel_core::normalize_text;

use super::load_config;

/// Arguments for the templates command.
#[derive(Args)]
pub struct TemplatesArgs {
    #[command(subcommand)]
    command: TemplatesCommand,
}

#[derive(Subcommand)]
enum TemplatesCommand {
    /// List available templates
    List,

    /// Show a template definition as JSON
    Show {
        /// Template name
        name: String,
    },

    /// Score every template against a file
    Detect {
        /// Input file (PDF or .txt)
        input: PathBuf,
    },
}

pub fn run(args: TemplatesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = config.registry()?;

    match args.command {
        TemplatesCommand::List => {
            println!("{}", style("Available templates:").bold());
            println!();
            for template in registry.iter() {
                let sections: Vec<&str> = template.sections().iter().map(|s| s.name()).collect();
                println!("  {}", style(template.name()).cyan());
                if !template.description().is_empty() {
                    println!("    {}", template.description());
                }
                println!(
                    "    {} markers, {} fields, sections: {}",
                    template.spec().markers.len(),
                    template.fields().len(),
                    if sections.is_empty() {
                        "-".to_string()
                    } else {
                        sections.join(", ")
                    }
                );
            }
        }
        TemplatesCommand::Show { name } => {
            let template = registry.require(&name)?;
            println!("{}", serde_json::to_string_pretty(template.spec())?);
        }
        TemplatesCommand::Detect { input } => {
            if !input.exists() {
                anyhow::bail!("Input file not found: {}", input.display());
            }

            let document = Document::from_path(&input)?;
            let text = normalize_text(&document.text_content(&config.pdf)?);

            for template in registry.iter() {
                println!("  {:<20} {}", template.name(), template.score(&text));
            }
            println!();

            match registry.detect(&text) {
                Some(detection) => println!(
                    "{} Detected template: {}",
                    style("✓").green(),
                    style(detection.template.name()).cyan()
                ),
                None => println!(
                    "{} No template matched; {} would be used",
                    style("⚠").yellow(),
                    config
                        .extraction
                        .default_template
                        .as_deref()
                        .or_else(|| registry.first().map(|t| t.name()))
                        .unwrap_or("-")
                ),
            }
        }
    }

    Ok(())
}
