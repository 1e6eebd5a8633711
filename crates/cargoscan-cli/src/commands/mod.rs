//! CLI subcommands and shared setup.

pub mod batch;
pub mod process;

use std::path::Path;

use cargoscan_core::config::ScanConfig;
use cargoscan_core::ocr::{OcrBackend, TextExtractor};
use cargoscan_core::pipeline::DocumentPipeline;

/// Load configuration from an optional file path, falling back to defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ScanConfig> {
    match config_path {
        Some(path) => Ok(ScanConfig::from_file(Path::new(path))?),
        None => Ok(ScanConfig::default()),
    }
}

/// Build the full document pipeline from configuration.
pub fn build_pipeline(config: &ScanConfig) -> DocumentPipeline {
    let extractor = TextExtractor::new(build_backend(config));
    DocumentPipeline::new(extractor)
        .with_render_dpi(config.pdf.render_dpi)
        .with_max_pages(config.pdf.max_pages as u32)
}

#[cfg(feature = "tesseract")]
fn build_backend(config: &ScanConfig) -> Box<dyn OcrBackend> {
    use cargoscan_core::ocr::TesseractOcr;

    Box::new(TesseractOcr::new(
        config
            .ocr
            .datapath
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
        &config.ocr.languages,
        config.ocr.page_seg_mode,
    ))
}

#[cfg(not(feature = "tesseract"))]
fn build_backend(_config: &ScanConfig) -> Box<dyn OcrBackend> {
    use cargoscan_core::ocr::UnavailableOcr;
    use console::style;

    eprintln!(
        "{} built without the `tesseract` feature; documents will be recorded as errors",
        style("!").yellow()
    );
    Box::new(UnavailableOcr)
}
