//! Process command - extract data from a single invoice file.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use factel_core::invoice::{process_document, Document};
use factel_core::ReportBuilder;

use super::output::{write_output, OutputFormat};
use super::{build_parser, load_config};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF, or .txt with text already extracted from a PDF)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file or, for CSV, directory (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (default: from the output extension, else text)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Use this template instead of detecting one
    #[arg(short, long)]
    template: Option<String>,

    /// Show template detection score and processing time
    #[arg(long)]
    show_details: bool,
}

pub fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    // Check input file exists
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let extension = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !matches!(extension.as_str(), "pdf" | "txt") {
        anyhow::bail!("Unsupported file format: {}", extension);
    }

    let format = OutputFormat::resolve(args.format, args.output.as_deref(), OutputFormat::Text);
    let parser = build_parser(&config, args.template.as_deref())?;

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.set_message("Extracting invoice data...");

    let document = Document::from_path(&args.input)?;
    let result = process_document(&parser, &document, &config.pdf);
    pb.finish_and_clear();

    let result = result.map_err(|e| {
        anyhow::anyhow!("Failed to process {}: {}", args.input.display(), e)
    })?;
    let invoice = result.invoice;

    if !invoice.warnings.is_empty() {
        eprintln!("{}", style("Warnings:").yellow());
        for warning in &invoice.warnings {
            eprintln!("  - {}", warning);
        }
    }

    let invoices = vec![invoice];
    let report = ReportBuilder::from_config(&config.report).build(&invoices);
    let stem = args
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("factura");

    write_output(
        &report,
        &invoices,
        format,
        args.output.as_deref(),
        stem,
        config.report.decimals,
    )?;

    if args.show_details {
        println!();
        println!(
            "{} Template: {} ({})",
            style("ℹ").blue(),
            invoices[0].template,
            match result.detection_score {
                Some(score) => format!("{} markers matched", score),
                None if args.template.is_some() => "forced".to_string(),
                None => "not detected".to_string(),
            }
        );
        println!(
            "{} Processing time: {}ms",
            style("ℹ").blue(),
            result.processing_time_ms
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
