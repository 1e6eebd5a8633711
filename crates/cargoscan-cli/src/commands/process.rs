//! Process command - extract data from a single PDF file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::info;

use cargoscan_core::record::ExtractionRecord;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also dump the extracted OCR text next to the output
    #[arg(long)]
    dump_text: Option<PathBuf>,
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

    let config = super::load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pipeline = super::build_pipeline(&config);
    let outcome = pipeline.process_file(&args.input);

    if let (Some(path), Some(text)) = (&args.dump_text, &outcome.text) {
        fs::write(path, text)?;
        info!("Wrote OCR text to {}", path.display());
    }

    let output = format_record(&outcome.record, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    println!(
        "{} Processed in {:?}",
        style("✓").green(),
        start.elapsed()
    );

    Ok(())
}

fn format_record(record: &ExtractionRecord, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str(&format!("File:   {}\n", record.filename));
            out.push_str(&format!("Type:   {}\n", record.kind));
            if let Some(err) = &record.error {
                out.push_str(&format!("Error:  {}\n", err));
            }
            for (name, value) in &record.fields {
                out.push_str(&format!("{}: {}\n", name, value.flatten()));
            }
            Ok(out)
        }
    }
}
