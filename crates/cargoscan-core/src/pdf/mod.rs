//! PDF page rendering for scanned documents.

mod renderer;

pub use renderer::LopdfRenderer;

use crate::error::RenderError;
use image::DynamicImage;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Trait for turning PDF pages into images.
///
/// Scanned logistics paperwork is page-per-image: each page carries one
/// full-page scan. Implementations load a document once and hand out
/// page images on demand.
pub trait PageRenderer {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Render a page (1-based) as an image at the requested DPI.
    fn render_page(&self, page: u32, dpi: u32) -> Result<DynamicImage>;
}
