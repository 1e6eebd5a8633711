//! Error types for the cargoscan-core library.

use thiserror::Error;

/// Main error type for document processing.
///
/// Every variant is resolved at the single-document boundary by the
/// pipeline; none of them aborts a batch.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// PDF rendering error.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Both OCR passes came back empty for every page.
    #[error("no text could be extracted from the document")]
    NoTextExtracted,

    /// Unexpected fault inside a type-specific field extractor.
    #[error("field extraction fault: {0}")]
    ExtractionFault(String),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to rasterizing PDF pages.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// The page carries no decodable scan image.
    #[error("no page image found on page {0}")]
    NoPageImage(u32),

    /// Failed to decode the embedded page image.
    #[error("failed to decode page image: {0}")]
    Decode(String),
}

/// Errors related to OCR invocation.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to encode an image for the OCR engine.
    #[error("image encode error: {0}")]
    Encode(String),

    /// The OCR engine itself failed.
    #[error("OCR engine error: {0}")]
    Engine(String),

    /// Built without an OCR backend.
    #[error("Tesseract not available - build with the `tesseract` feature")]
    NotAvailable,
}

/// Result type for document processing.
pub type Result<T> = std::result::Result<T, PipelineError>;
