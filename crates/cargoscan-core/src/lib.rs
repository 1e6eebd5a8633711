//! Core library for batch OCR of scanned logistics paperwork.
//!
//! This crate provides:
//! - PDF handling for scanned documents (embedded page-scan extraction)
//! - Image normalization tuned for OCR (denoise, CLAHE, Otsu binarization)
//! - A pluggable OCR backend trait with a Tesseract implementation
//! - Document type classification (export permits, air and ocean waybills)
//! - Per-type field extraction into structured records

pub mod config;
pub mod error;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod record;
pub mod rules;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{OcrConfig, OutputConfig, PdfConfig, ScanConfig};
pub use error::{OcrError, PipelineError, RenderError, Result};
pub use ocr::{MockOcr, OcrBackend, TextExtractor, UnavailableOcr};
#[cfg(feature = "tesseract")]
pub use ocr::TesseractOcr;
pub use pdf::{LopdfRenderer, PageRenderer};
pub use pipeline::{DocumentOutcome, DocumentPipeline, RenderedPage};
pub use record::{DocumentKind, ExtractionRecord, FieldMap, FieldValue};
pub use rules::{classify, extract_fields, DocumentTypeRule, RULES};
