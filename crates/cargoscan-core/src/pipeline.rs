//! End-to-end document pipeline: render, OCR, classify, extract.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::ocr::{encode_png, TextExtractor};
use crate::pdf::{LopdfRenderer, PageRenderer};
use crate::record::ExtractionRecord;
use crate::rules;

/// One rendered page, kept as encoded PNG for side-artifact dumps.
pub struct RenderedPage {
    /// 1-based page number.
    pub number: u32,
    pub png: Vec<u8>,
}

/// Everything produced for one input document.
///
/// The record is always present; text and page images are only there
/// when processing got far enough to produce them.
pub struct DocumentOutcome {
    pub record: ExtractionRecord,
    pub text: Option<String>,
    pub pages: Vec<RenderedPage>,
}

/// Per-document processing pipeline.
///
/// Failures never cross document boundaries: `process` always returns
/// an outcome, downgrading any error (or panic) to an `Error` record.
pub struct DocumentPipeline {
    extractor: TextExtractor,
    render_dpi: u32,
    max_pages: u32,
}

impl DocumentPipeline {
    pub fn new(extractor: TextExtractor) -> Self {
        Self {
            extractor,
            render_dpi: 400,
            max_pages: 0,
        }
    }

    /// Set the render resolution in DPI.
    pub fn with_render_dpi(mut self, dpi: u32) -> Self {
        self.render_dpi = dpi;
        self
    }

    /// Cap the number of pages rendered per document (0 = no limit).
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Process one document from raw PDF bytes.
    pub fn process(&self, filename: &str, data: &[u8]) -> DocumentOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.try_process(filename, data)));
        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                warn!(filename, error = %err, "document failed");
                DocumentOutcome {
                    record: ExtractionRecord::failure(filename, err.to_string()),
                    text: None,
                    pages: Vec::new(),
                }
            }
            Err(payload) => {
                let err = PipelineError::ExtractionFault(panic_message(&payload));
                warn!(filename, error = %err, "document processing panicked");
                DocumentOutcome {
                    record: ExtractionRecord::failure(filename, err.to_string()),
                    text: None,
                    pages: Vec::new(),
                }
            }
        }
    }

    /// Process a document from disk. A read failure becomes an `Error`
    /// record like any other per-document failure.
    pub fn process_file(&self, path: &Path) -> DocumentOutcome {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match std::fs::read(path) {
            Ok(data) => self.process(&filename, &data),
            Err(err) => {
                warn!(filename, error = %err, "failed to read PDF");
                DocumentOutcome {
                    record: ExtractionRecord::failure(filename, err.to_string()),
                    text: None,
                    pages: Vec::new(),
                }
            }
        }
    }

    fn try_process(&self, filename: &str, data: &[u8]) -> Result<DocumentOutcome> {
        let mut renderer = LopdfRenderer::new();
        renderer.load(data)?;

        let mut page_count = renderer.page_count();
        if self.max_pages > 0 {
            page_count = page_count.min(self.max_pages);
        }
        debug!(filename, pages = page_count, dpi = self.render_dpi, "rendering document");

        let mut images: Vec<DynamicImage> = Vec::with_capacity(page_count as usize);
        let mut pages = Vec::with_capacity(page_count as usize);
        for number in 1..=page_count {
            let image = renderer.render_page(number, self.render_dpi)?;
            pages.push(RenderedPage {
                number,
                png: encode_png(&image)?,
            });
            images.push(image);
        }

        let text = self.extractor.extract_document_text(&images)?;
        if text.trim().is_empty() {
            return Err(PipelineError::NoTextExtracted);
        }

        let kind = rules::classify(&text);
        let fields = rules::extract_fields(kind, &text);
        info!(filename, kind = %kind, "document classified");

        Ok(DocumentOutcome {
            record: ExtractionRecord::classified(filename, kind, fields),
            text: Some(text),
            pages,
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{MockOcr, ScriptedOcr};
    use crate::record::DocumentKind;
    use crate::testutil::scanned_pdf;
    use pretty_assertions::assert_eq;

    fn pipeline_with_text(text: &str) -> DocumentPipeline {
        let extractor = TextExtractor::new(Box::new(MockOcr::new(text)));
        DocumentPipeline::new(extractor).with_render_dpi(72)
    }

    #[test]
    fn test_process_air_waybill_end_to_end() {
        let pdf = scanned_pdf(&[(40, 40, 200)]);
        let pipeline = pipeline_with_text("AWB No 123\n1 Widget A 0.05 kg | JAPAN 72PCS");
        let outcome = pipeline.process("awb.pdf", &pdf);

        assert_eq!(outcome.record.kind, DocumentKind::AirWaybill);
        assert_eq!(outcome.record.filename, "awb.pdf");
        assert!(outcome.record.error.is_none());
        assert_eq!(
            outcome.record.serialized_fields(),
            "72; Widget A: 72"
        );
        assert!(outcome.text.is_some());
        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(outcome.pages[0].number, 1);
        assert!(outcome.pages[0].png.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn test_process_garbage_bytes_yields_error_record() {
        let pipeline = pipeline_with_text("irrelevant");
        let outcome = pipeline.process("broken.pdf", b"not a pdf at all");

        assert_eq!(outcome.record.kind, DocumentKind::Error);
        assert!(outcome.record.error.is_some());
        assert!(outcome.text.is_none());
        assert!(outcome.pages.is_empty());
    }

    #[test]
    fn test_process_no_text_yields_error_record() {
        let pdf = scanned_pdf(&[(40, 40, 255)]);
        // Both OCR passes come back empty.
        let extractor = TextExtractor::new(Box::new(ScriptedOcr::new(Vec::<String>::new())));
        let pipeline = DocumentPipeline::new(extractor).with_render_dpi(72);
        let outcome = pipeline.process("blank.pdf", &pdf);

        assert_eq!(outcome.record.kind, DocumentKind::Error);
        assert_eq!(
            outcome.record.error.as_deref(),
            Some(PipelineError::NoTextExtracted.to_string().as_str())
        );
    }

    #[test]
    fn test_process_unmatched_text_yields_unknown() {
        let pdf = scanned_pdf(&[(40, 40, 128)]);
        let pipeline = pipeline_with_text("a handwritten memo");
        let outcome = pipeline.process("memo.pdf", &pdf);

        assert_eq!(outcome.record.kind, DocumentKind::Unknown);
        assert!(outcome.record.fields.is_empty());
        assert!(outcome.record.error.is_none());
    }

    #[test]
    fn test_max_pages_caps_rendering() {
        let pdf = scanned_pdf(&[(20, 20, 100), (20, 20, 150), (20, 20, 200)]);
        let pipeline = pipeline_with_text("WAYBILL 1.0 kg 3").with_max_pages(2);
        let outcome = pipeline.process("multi.pdf", &pdf);

        assert_eq!(outcome.pages.len(), 2);
        assert_eq!(outcome.record.kind, DocumentKind::OceanWaybill);
    }

    #[test]
    fn test_missing_file_yields_error_record() {
        let pipeline = pipeline_with_text("irrelevant");
        let outcome = pipeline.process_file(Path::new("/nonexistent/dir/x.pdf"));

        assert_eq!(outcome.record.kind, DocumentKind::Error);
        assert_eq!(outcome.record.filename, "x.pdf");
        assert!(outcome.record.error.is_some());
    }
}
