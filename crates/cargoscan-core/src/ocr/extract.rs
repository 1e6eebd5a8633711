//! Two-pass OCR text extraction.

use image::DynamicImage;
use tracing::debug;

use super::preprocess::{boost_contrast, encode_png, preprocess};
use super::OcrBackend;
use crate::error::OcrError;

/// Contrast multiplier for the fallback OCR pass.
const FALLBACK_CONTRAST_FACTOR: f32 = 2.0;

/// Drives the OCR backend over page images.
///
/// First pass runs on the fully normalized (binarized) image. Because the
/// binarization can wash out low-contrast scans, an empty first pass
/// triggers exactly one softer fallback: OCR on the original image with
/// its contrast boosted 2x.
pub struct TextExtractor {
    backend: Box<dyn OcrBackend>,
}

impl TextExtractor {
    pub fn new(backend: Box<dyn OcrBackend>) -> Self {
        Self { backend }
    }

    /// OCR a single page image. Returns an empty string when both passes
    /// see nothing.
    pub fn extract_page_text(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let normalized = preprocess(image);
        let bytes = encode_png(&DynamicImage::ImageLuma8(normalized))?;
        let text = self.backend.recognize(&bytes)?;
        if !text.trim().is_empty() {
            return Ok(text);
        }

        debug!("first OCR pass empty, retrying with boosted contrast");
        let boosted = boost_contrast(image, FALLBACK_CONTRAST_FACTOR);
        let bytes = encode_png(&boosted)?;
        self.backend.recognize(&bytes)
    }

    /// OCR all pages of a document and join the per-page texts with
    /// newlines in page order.
    pub fn extract_document_text(&self, pages: &[DynamicImage]) -> Result<String, OcrError> {
        let texts = pages
            .iter()
            .map(|page| self.extract_page_text(page))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(texts.join("\n"))
    }
}
