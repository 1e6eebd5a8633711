//! OCR backends and the two-pass text extraction driver.

mod extract;
pub mod preprocess;

pub use extract::TextExtractor;
pub use preprocess::{boost_contrast, encode_png, preprocess};

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::OcrError;

/// Abstraction over an OCR engine.
///
/// Implementations accept encoded PNG/JPEG image bytes and return the
/// recognized text. An empty string signals that the engine saw nothing.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError>;
}

impl<T: OcrBackend + ?Sized> OcrBackend for std::sync::Arc<T> {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        (**self).recognize(image_bytes)
    }
}

// -- Mock backends (always available, used for tests) -------------------------

/// Returns a pre-set string on every call. Lets the classification and
/// extraction stages be exercised without a Tesseract installation.
pub struct MockOcr {
    pub text: String,
}

impl MockOcr {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OcrBackend for MockOcr {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }
}

/// Plays back a scripted sequence of responses, one per call, and records
/// the call count. Returns empty strings once the script is exhausted.
/// Used to test the contrast-boost fallback pass.
pub struct ScriptedOcr {
    responses: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedOcr {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of recognize() invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrBackend for ScriptedOcr {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().expect("scripted responses poisoned");
        Ok(responses.pop_front().unwrap_or_default())
    }
}

/// Backend used when the binary was built without any OCR engine.
/// Every call fails, which the pipeline turns into per-document Error
/// records rather than aborting the batch.
pub struct UnavailableOcr;

impl OcrBackend for UnavailableOcr {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
        Err(OcrError::NotAvailable)
    }
}

// -- Tesseract backend (optional, gated behind `tesseract` feature) -----------

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError};
    use leptess::{LepTess, Variable};

    /// Tesseract OCR configured for mixed Japanese+English paperwork with
    /// a single-uniform-block page segmentation mode.
    pub struct TesseractOcr {
        datapath: Option<String>,
        languages: String,
        page_seg_mode: u32,
    }

    impl TesseractOcr {
        pub fn new(datapath: Option<String>, languages: &str, page_seg_mode: u32) -> Self {
            Self {
                datapath,
                languages: languages.to_string(),
                page_seg_mode,
            }
        }
    }

    impl OcrBackend for TesseractOcr {
        fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
            // LepTess is not Sync; a fresh instance per call keeps the
            // backend shareable across worker tasks.
            let mut lt = LepTess::new(self.datapath.as_deref(), &self.languages)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_variable(
                Variable::TesseditPagesegMode,
                &self.page_seg_mode.to_string(),
            )
            .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::Encode(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }
}

#[cfg(feature = "tesseract")]
pub use tesseract_backend::TesseractOcr;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_returns_preset_text() {
        let backend = MockOcr::new("AWB No 123\n45 PCS");
        assert_eq!(backend.recognize(b"fake image").unwrap(), "AWB No 123\n45 PCS");
        assert_eq!(backend.recognize(b"").unwrap(), "AWB No 123\n45 PCS");
    }

    #[test]
    fn test_scripted_plays_in_order_then_empty() {
        let backend = ScriptedOcr::new(["first", "second"]);
        assert_eq!(backend.recognize(b"x").unwrap(), "first");
        assert_eq!(backend.recognize(b"x").unwrap(), "second");
        assert_eq!(backend.recognize(b"x").unwrap(), "");
        assert_eq!(backend.calls(), 3);
    }

    #[test]
    fn test_unavailable_backend_errors() {
        let err = UnavailableOcr.recognize(b"x").unwrap_err();
        assert!(matches!(err, OcrError::NotAvailable));
    }
}
