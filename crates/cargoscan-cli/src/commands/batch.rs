//! Batch command - process every PDF in a folder into one CSV table.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use cargoscan_core::config::ScanConfig;
use cargoscan_core::pipeline::DocumentOutcome;
use cargoscan_core::record::{DocumentKind, ExtractionRecord};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Folder containing PDF files
    #[arg(required = true)]
    input_dir: PathBuf,

    /// Output directory for the CSV table and side artifacts
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Skip writing per-document OCR text and page image dumps
    #[arg(long)]
    no_dumps: bool,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = super::load_config(config_path)?;

    let pattern = args.input_dir.join("*.pdf");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("input path is not valid UTF-8"))?;

    let mut files: Vec<PathBuf> = glob(pattern)?.filter_map(|r| r.ok()).collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No PDF files found in {}", args.input_dir.display());
    }

    println!(
        "{} Found {} PDF files to process",
        style("ℹ").blue(),
        files.len()
    );

    let dump_dirs = init_output_dirs(&args, &config)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let pipeline = super::build_pipeline(&config);
    let mut records = Vec::with_capacity(files.len());

    for path in &files {
        pb.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        let outcome = pipeline.process_file(path);

        if let Some(dirs) = &dump_dirs {
            if let Err(err) = write_dumps(dirs, path, &outcome) {
                warn!("failed to write dumps for {}: {}", path.display(), err);
            }
        }

        records.push(outcome.record);
        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    let table_path = args.output_dir.join(&config.output.table_path);
    write_table(&table_path, &records)?;

    print_summary(&records, &table_path, start);
    Ok(())
}

struct DumpDirs {
    text_dir: PathBuf,
    image_dir: PathBuf,
}

/// Create the output directory tree up front so a failure surfaces
/// before any document is processed.
fn init_output_dirs(args: &BatchArgs, config: &ScanConfig) -> anyhow::Result<Option<DumpDirs>> {
    fs::create_dir_all(&args.output_dir)?;
    if args.no_dumps {
        return Ok(None);
    }
    let dirs = DumpDirs {
        text_dir: args.output_dir.join(&config.output.text_dir),
        image_dir: args.output_dir.join(&config.output.image_dir),
    };
    fs::create_dir_all(&dirs.text_dir)?;
    fs::create_dir_all(&dirs.image_dir)?;
    Ok(Some(dirs))
}

/// Write the OCR text and rendered page images for one document.
fn write_dumps(dirs: &DumpDirs, path: &Path, outcome: &DocumentOutcome) -> anyhow::Result<()> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    if let Some(text) = &outcome.text {
        let text_path = dirs.text_dir.join(format!("{}.txt", stem));
        fs::write(&text_path, text)?;
        debug!("wrote text dump {}", text_path.display());
    }

    for page in &outcome.pages {
        let image_path = dirs
            .image_dir
            .join(format!("{}_page_{}.png", stem, page.number));
        fs::write(&image_path, &page.png)?;
    }

    Ok(())
}

/// Write the summary table, one row per input document.
fn write_table(path: &Path, records: &[ExtractionRecord]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["pdf_type", "filename", "product_info"])?;
    for record in records {
        writer.write_record([
            record.kind.as_str(),
            record.filename.as_str(),
            record.serialized_fields().as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_summary(records: &[ExtractionRecord], table_path: &Path, start: Instant) {
    let errors = records
        .iter()
        .filter(|r| r.kind == DocumentKind::Error)
        .count();
    let unknown = records
        .iter()
        .filter(|r| r.kind == DocumentKind::Unknown)
        .count();
    let classified = records.len() - errors - unknown;

    println!();
    println!(
        "{} Processed {} documents in {:?}",
        style("✓").green(),
        records.len(),
        start.elapsed()
    );
    println!(
        "   {} classified, {} unknown, {} errors",
        style(classified).green(),
        style(unknown).yellow(),
        style(errors).red()
    );
    println!(
        "{} Table written to {}",
        style("✓").green(),
        table_path.display()
    );

    if errors > 0 {
        println!();
        println!("{}", style("Failed documents:").red());
        for record in records.iter().filter(|r| r.kind == DocumentKind::Error) {
            println!(
                "  - {}: {}",
                record.filename,
                record.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
