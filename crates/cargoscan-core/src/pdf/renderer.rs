//! Page-image extraction using lopdf.
//!
//! Scanned PDFs embed each page as a single image XObject (usually JPEG
//! or raw gray/RGB behind FlateDecode). Decoding that object directly
//! yields the page at the scanner's native resolution, so the `dpi`
//! argument only matters for vector PDFs, which this renderer does not
//! rasterize.

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{PageRenderer, Result};
use crate::error::RenderError;

/// PDF page renderer backed by lopdf.
#[derive(Default)]
pub struct LopdfRenderer {
    document: Option<Document>,
}

impl LopdfRenderer {
    /// Create a new renderer with no document loaded.
    pub fn new() -> Self {
        Self { document: None }
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or_else(|| RenderError::Parse("no document loaded".to_string()))
    }

    /// Decode every image XObject reachable from the page resources and
    /// return the largest one by pixel count.
    fn page_scan_image(&self, doc: &Document, page_id: ObjectId) -> Option<DynamicImage> {
        let resources = page_resources(doc, page_id)?;
        let xobjects = resources.get(b"XObject").ok()?;
        let (_, xobjects) = doc.dereference(xobjects).ok()?;
        let xobjects = xobjects.as_dict().ok()?;

        let mut best: Option<DynamicImage> = None;
        for (name, obj_ref) in xobjects.iter() {
            let Ok((_, obj)) = doc.dereference(obj_ref) else {
                continue;
            };
            if let Some(img) = decode_image_object(obj) {
                trace!(
                    "page image {:?}: {}x{}",
                    String::from_utf8_lossy(name),
                    img.width(),
                    img.height()
                );
                let pixels = u64::from(img.width()) * u64::from(img.height());
                let best_pixels = best
                    .as_ref()
                    .map(|b| u64::from(b.width()) * u64::from(b.height()))
                    .unwrap_or(0);
                if pixels > best_pixels {
                    best = Some(img);
                }
            }
        }
        best
    }
}

impl PageRenderer for LopdfRenderer {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| RenderError::Parse(e.to_string()))?;

        // Some scanners emit PDFs encrypted with an empty password.
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(RenderError::Encrypted);
            }
            debug!("decrypted PDF with empty password");
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(RenderError::NoPages);
        }

        debug!("loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn render_page(&self, page: u32, _dpi: u32) -> Result<DynamicImage> {
        let doc = self.document()?;
        let pages = doc.get_pages();
        let page_id = *pages.get(&page).ok_or(RenderError::InvalidPage(page))?;

        self.page_scan_image(doc, page_id)
            .ok_or(RenderError::NoPageImage(page))
    }
}

/// Resources dictionary for a page, following Parent inheritance.
fn page_resources(doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
    let node = doc.get_object(node_id).ok()?;
    let dict = node.as_dict().ok()?;

    if let Ok(resources) = dict.get(b"Resources") {
        if let Ok((_, Object::Dictionary(res))) = doc.dereference(resources) {
            return Some(res.clone());
        }
    }

    if let Ok(Object::Reference(parent_id)) = dict.get(b"Parent") {
        return page_resources(doc, *parent_id);
    }
    None
}

/// Decode an image XObject stream into a `DynamicImage`.
fn decode_image_object(obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;

    let subtype = dict.get(b"Subtype").ok()?;
    if subtype.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;

    if let Some(filter) = image_filter_name(dict) {
        match filter.as_slice() {
            b"DCTDecode" => {
                // JPEG data: the raw stream content is the compressed file.
                return image::load_from_memory_with_format(
                    &stream.content,
                    image::ImageFormat::Jpeg,
                )
                .ok();
            }
            b"JPXDecode" | b"CCITTFaxDecode" | b"JBIG2Decode" => {
                trace!(
                    "unsupported image filter {:?}",
                    String::from_utf8_lossy(&filter)
                );
                return None;
            }
            _ => {}
        }
    }

    // FlateDecode or unfiltered: decompress and treat as raw samples.
    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.clone()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok().map(|n| n.to_vec())),
            _ => None,
        })
        .unwrap_or_else(|| b"DeviceRGB".to_vec());

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        trace!("unsupported bits per component: {}", bits);
        return None;
    }

    decode_raw_samples(&data, width, height, &color_space)
}

fn image_filter_name(dict: &Dictionary) -> Option<Vec<u8>> {
    match dict.get(b"Filter").ok()? {
        Object::Name(name) => Some(name.clone()),
        Object::Array(arr) => arr
            .first()
            .and_then(|o| o.as_name().ok().map(|n| n.to_vec())),
        _ => None,
    }
}

fn decode_raw_samples(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
) -> Option<DynamicImage> {
    let pixels = (width as usize).checked_mul(height as usize)?;

    match color_space {
        b"DeviceGray" | b"G" | b"CalGray" => {
            if data.len() < pixels {
                return None;
            }
            GrayImage::from_raw(width, height, data[..pixels].to_vec())
                .map(DynamicImage::ImageLuma8)
        }
        b"DeviceRGB" | b"RGB" | b"CalRGB" => {
            let expected = pixels.checked_mul(3)?;
            if data.len() < expected {
                return None;
            }
            RgbImage::from_raw(width, height, data[..expected].to_vec())
                .map(DynamicImage::ImageRgb8)
        }
        _ => {
            trace!(
                "unsupported color space {:?}",
                String::from_utf8_lossy(color_space)
            );
            None
        }
    }
}
