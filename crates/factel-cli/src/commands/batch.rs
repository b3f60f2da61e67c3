//! Batch processing command for multiple invoice files.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use factel_core::invoice::{process_batch_with, Document};
use factel_core::ReportBuilder;

use super::output::{write_output, OutputFormat};
use super::{build_parser, load_config};

/// Default workbook written by the batch command.
const DEFAULT_OUTPUT: &str = "facturas.xlsx";

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files glob pattern (PDF or .txt)
    #[arg(required = true)]
    input: String,

    /// Output file or, for CSV, directory
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Output format (default: from the output extension, else xlsx)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Use this template instead of detecting one
    #[arg(short, long)]
    template: Option<String>,

    /// Also write a per-file status CSV
    #[arg(long)]
    summary: Option<PathBuf>,
}

/// Outcome of processing a single file.
struct ProcessResult {
    name: String,
    template: Option<String>,
    rows: usize,
    warnings: usize,
    error: Option<String>,
    processing_time_ms: u64,
}

pub fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    // Expand glob pattern
    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            matches!(ext.to_lowercase().as_str(), "pdf" | "txt")
        })
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let format = OutputFormat::resolve(
        args.format,
        Some(args.output.as_path()),
        OutputFormat::Xlsx,
    );
    let parser = build_parser(&config, args.template.as_deref())?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(files.len());
    let documents = files.iter().map(Document::file);

    let batch = process_batch_with(&parser, documents, &config.pdf, |outcome| {
        results.push(match outcome.result {
            Ok(extracted) => ProcessResult {
                name: outcome.source.to_string(),
                template: Some(extracted.invoice.template.clone()),
                rows: extracted.invoice.row_count(),
                warnings: extracted.invoice.warnings.len(),
                error: None,
                processing_time_ms: outcome.elapsed_ms,
            },
            Err(e) => ProcessResult {
                name: outcome.source.to_string(),
                template: None,
                rows: 0,
                warnings: 0,
                error: Some(e.to_string()),
                processing_time_ms: outcome.elapsed_ms,
            },
        });
        pb.inc(1);
    });

    pb.finish_and_clear();

    // Print summary
    println!();
    println!(
        "{} Processed {} files in {:.2}s",
        style("✓").green(),
        batch.processed(),
        start.elapsed().as_secs_f64()
    );
    println!("  {} succeeded", style(batch.invoices.len()).green());

    if !batch.failures.is_empty() {
        println!("  {} failed", style(batch.failures.len()).red());
        println!();
        println!("{}", style("Failed files:").red());
        for failure in &batch.failures {
            println!("  - {}: {}", failure.source, failure.error);
        }
    }

    let warned: Vec<_> = batch
        .invoices
        .iter()
        .filter(|i| !i.warnings.is_empty())
        .collect();
    if !warned.is_empty() {
        println!();
        println!("{}", style("Warnings:").yellow());
        for invoice in warned {
            for warning in &invoice.warnings {
                println!("  - {}: {}", invoice.source, warning);
            }
        }
    }

    if let Some(summary_path) = &args.summary {
        write_summary(summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let invoices = batch.into_invoices()?;
    let report = ReportBuilder::from_config(&config.report).build(&invoices);

    write_output(
        &report,
        &invoices,
        format,
        Some(args.output.as_path()),
        "facturas",
        config.report.decimals,
    )?;

    debug!("Total batch time: {:?}", start.elapsed());

    Ok(())
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "archivo",
        "estado",
        "plantilla",
        "filas",
        "avisos",
        "tiempo_ms",
        "error",
    ])?;

    for result in results {
        let status = if result.error.is_some() { "error" } else { "ok" };
        wtr.write_record([
            result.name.as_str(),
            status,
            result.template.as_deref().unwrap_or(""),
            &result.rows.to_string(),
            &result.warnings.to_string(),
            &result.processing_time_ms.to_string(),
            result.error.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
