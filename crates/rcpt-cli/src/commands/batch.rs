//! Batch command - extract every image in a directory.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use rcpt_core::batch::{
    BatchObserver, BatchProcessor, BatchReport, collect_inputs, prepare_output_dir,
};
use rcpt_core::{ImageLoader, RcptError};

use super::{build_client, load_config};

/// Arguments for the batch command.
#[derive(Args, Default)]
pub struct BatchArgs {
    /// Directory containing receipt images
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// Directory receiving one JSON file per image
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write summary.csv into the output directory
    #[arg(long)]
    summary: bool,
}

/// Prints per-file progress lines around the progress bar.
struct ConsoleObserver {
    pb: ProgressBar,
}

impl BatchObserver for ConsoleObserver {
    fn on_start(&self, input: &Path) {
        self.pb
            .suspend(|| println!("Processing {}...", display_name(input)));
    }

    fn on_saved(&self, _input: &Path, output: &Path) {
        self.pb.inc(1);
        self.pb.suspend(|| {
            println!(
                "{} Saved extracted information to {}",
                style("✓").green(),
                display_name(output)
            )
        });
    }

    fn on_error(&self, input: &Path, error: &RcptError) {
        self.pb.inc(1);
        self.pb.suspend(|| {
            eprintln!(
                "{} Error processing {}: {}",
                style("✗").red(),
                display_name(input),
                error
            )
        });
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let client = build_client(&config)?;

    let input_dir = args.input_dir.unwrap_or_else(|| config.batch.input_dir.clone());
    let output_dir = args.output_dir.unwrap_or_else(|| config.batch.output_dir.clone());

    let files = collect_inputs(&input_dir)
        .with_context(|| format!("Cannot read input directory {}", input_dir.display()))?;

    prepare_output_dir(&output_dir);

    if files.is_empty() {
        println!(
            "{} No images found in {}",
            style("ℹ").blue(),
            input_dir.display()
        );
        return Ok(());
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let loader = ImageLoader::new(config.extraction.prompt.clone())
        .with_max_bytes(config.extraction.max_image_bytes);
    let processor = BatchProcessor::new(&client, loader);
    let observer = ConsoleObserver { pb: pb.clone() };

    let report = processor.run_files(files, &output_dir, &observer).await;
    pb.finish_and_clear();

    if args.summary {
        let summary_path = output_dir.join("summary.csv");
        write_summary(&summary_path, &report)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    print_summary(&report, start);

    Ok(())
}

fn print_summary(report: &BatchReport, start: Instant) {
    let successful = report.succeeded().count();
    let failed: Vec<_> = report.failed().collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        report.outcomes.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for outcome in failed {
            println!(
                "  - {}: {}",
                outcome.input.display(),
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

fn write_summary(path: &Path, report: &BatchReport) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "businessName",
        "businessAddress",
        "transactionDate",
        "totalCharge",
        "processing_time_ms",
        "error",
    ])?;

    for outcome in &report.outcomes {
        let filename = display_name(&outcome.input);
        let time_ms = outcome.processing_time_ms.to_string();

        match &outcome.result {
            Some(result) => wtr.write_record([
                filename.as_str(),
                "success",
                &result.business_name,
                &result.business_address,
                &result.transaction_date,
                &result.total_charge,
                &time_ms,
                "",
            ])?,
            None => wtr.write_record([
                filename.as_str(),
                "error",
                "",
                "",
                "",
                "",
                &time_ms,
                outcome.error.as_deref().unwrap_or(""),
            ])?,
        }
    }

    wtr.flush()?;
    debug!("Wrote summary to {}", path.display());
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcpt_core::{ExtractionResult, FileOutcome};

    #[test]
    fn test_write_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("summary.csv");

        let report = BatchReport {
            outcomes: vec![
                FileOutcome {
                    input: PathBuf::from("in/a.png"),
                    output: Some(PathBuf::from("out/a.json")),
                    result: Some(ExtractionResult {
                        business_name: "Deli, Inc.".to_string(),
                        business_address: "1 Main St".to_string(),
                        transaction_date: "2024-01-01".to_string(),
                        total_charge: "$4.20".to_string(),
                    }),
                    error: None,
                    processing_time_ms: 12,
                },
                FileOutcome {
                    input: PathBuf::from("in/b.jpg"),
                    output: None,
                    result: None,
                    error: Some("service error: timed out".to_string()),
                    processing_time_ms: 7,
                },
            ],
        };

        write_summary(&path, &report).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "a.png,success,\"Deli, Inc.\",1 Main St,2024-01-01,$4.20,12,"
        );
        assert_eq!(lines[2], "b.jpg,error,,,,,7,service error: timed out");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("dir/receipt.png")), "receipt.png");
    }
}
