//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the cargoscan pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// PDF rendering configuration.
    pub pdf: PdfConfig,

    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Output paths for the table and side artifacts.
    pub output: OutputConfig,
}

/// PDF rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// DPI at which pages are rendered for OCR.
    pub render_dpi: u32,

    /// Maximum pages to process per document (0 = unlimited).
    pub max_pages: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            render_dpi: 400,
            max_pages: 0,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language string.
    pub languages: String,

    /// Page segmentation mode. 6 assumes a single uniform block of text.
    pub page_seg_mode: u32,

    /// Tessdata directory (None = system default).
    pub datapath: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: "jpn+eng".to_string(),
            page_seg_mode: 6,
            datapath: None,
        }
    }
}

/// Output table and side-artifact locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path of the CSV result table.
    pub table_path: PathBuf,

    /// Directory for per-document OCR text dumps.
    pub text_dir: PathBuf,

    /// Directory for per-page PNG dumps.
    pub image_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            table_path: PathBuf::from("extracted_data.csv"),
            text_dir: PathBuf::from("extracted_texts"),
            image_dir: PathBuf::from("extracted_images"),
        }
    }
}

impl ScanConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}
