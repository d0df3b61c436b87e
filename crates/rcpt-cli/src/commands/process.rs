//! Process command - extract data from a single receipt image.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::ProgressBar;
use tracing::{debug, info};

use rcpt_core::batch::write_result;
use rcpt_core::{ExtractionResult, ImageLoader, ReceiptExtractor};

use super::{build_client, load_config};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input image
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Warn about fields the model left blank
    #[arg(long)]
    validate: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    if !args.input.is_file() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let client = build_client(&config)?;

    info!("Processing file: {}", args.input.display());

    let request = ImageLoader::new(config.extraction.prompt.clone())
        .with_max_bytes(config.extraction.max_image_bytes)
        .load(&args.input)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Waiting for the model...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));
    let result = client.extract(&request).await;
    spinner.finish_and_clear();
    let result = result?;

    if args.validate {
        let issues = result.validate();
        if !issues.is_empty() {
            eprintln!("{}", style("Validation issues:").yellow());
            for issue in &issues {
                eprintln!("  - {}", issue);
            }
        }
    }

    match (&args.output, args.format) {
        (Some(output_path), OutputFormat::Json) => {
            write_result(&result, output_path)?;
            println!(
                "{} Output written to {}",
                style("✓").green(),
                output_path.display()
            );
        }
        (Some(output_path), OutputFormat::Text) => {
            fs::write(output_path, format_text(&result))?;
            println!(
                "{} Output written to {}",
                style("✓").green(),
                output_path.display()
            );
        }
        (None, OutputFormat::Json) => println!("{}", result.to_pretty_json()?),
        (None, OutputFormat::Text) => print!("{}", format_text(&result)),
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn format_text(result: &ExtractionResult) -> String {
    let mut output = String::new();

    output.push_str(&format!("Business: {}\n", result.business_name));
    output.push_str(&format!("Address:  {}\n", result.business_address));
    output.push_str(&format!("Date:     {}\n", result.transaction_date));
    output.push_str(&format!("Total:    {}\n", result.total_charge));

    output
}
