//! Image normalization for OCR.
//!
//! Scanned logistics paperwork suffers from uneven lighting and JPEG
//! compression artifacts. The fixed sequence grayscale -> non-local-means
//! denoise -> CLAHE -> Otsu binarization normalizes the input without any
//! per-document tuning.

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use std::io::Cursor;

use crate::error::OcrError;

/// Denoising strength (filter parameter h).
const NLM_STRENGTH: f32 = 10.0;
/// Patch radius: 7x7 comparison patches.
const NLM_PATCH_RADIUS: i64 = 3;
/// Search radius: 21x21 search window.
const NLM_SEARCH_RADIUS: i64 = 10;
/// CLAHE tile grid: 8x8 tiles.
const CLAHE_GRID: u32 = 8;
/// CLAHE contrast clip limit.
const CLAHE_CLIP_LIMIT: f32 = 2.0;

/// Normalize a page image for OCR.
///
/// Pure function: grayscale, denoise, local contrast equalization, then
/// global Otsu thresholding to a two-level image.
pub fn preprocess(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    let denoised = denoise_nl_means(&gray, NLM_STRENGTH);
    let equalized = clahe(&denoised, CLAHE_GRID, CLAHE_CLIP_LIMIT);
    let threshold = otsu_threshold(&equalized);
    binarize(&equalized, threshold)
}

/// Multiplicative contrast boost around the image mean.
///
/// Matches the usual "contrast enhance" semantics: each channel moves away
/// from the mean luminance by `factor`. Used for the softer OCR fallback
/// pass on scans that the binarization washed out.
pub fn boost_contrast(image: &DynamicImage, factor: f32) -> DynamicImage {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let pixel_count = (width as u64) * (height as u64);
    if pixel_count == 0 {
        return image.clone();
    }

    let mean = image
        .to_luma8()
        .pixels()
        .map(|p| p[0] as f64)
        .sum::<f64>() as f32
        / pixel_count as f32;

    let boosted = RgbImage::from_fn(width, height, |x, y| {
        let p = rgb.get_pixel(x, y);
        let adjust = |c: u8| (mean + (c as f32 - mean) * factor).round().clamp(0.0, 255.0) as u8;
        Rgb([adjust(p[0]), adjust(p[1]), adjust(p[2])])
    });
    DynamicImage::ImageRgb8(boosted)
}

/// Encode an image as PNG bytes for the OCR engine.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, OcrError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| OcrError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Non-local-means denoising with fixed strength.
///
/// For every pixel, averages the 21x21 search neighborhood weighted by
/// 7x7 patch similarity. Borders are handled by clamping coordinates.
fn denoise_nl_means(img: &GrayImage, h: f32) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    let h2 = h * h;
    let mut out = GrayImage::new(width, height);

    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let mut weight_sum = 0.0f32;
            let mut value_sum = 0.0f32;

            for ny in (y - NLM_SEARCH_RADIUS)..=(y + NLM_SEARCH_RADIUS) {
                if ny < 0 || ny >= height as i64 {
                    continue;
                }
                for nx in (x - NLM_SEARCH_RADIUS)..=(x + NLM_SEARCH_RADIUS) {
                    if nx < 0 || nx >= width as i64 {
                        continue;
                    }
                    let dist = patch_distance(img, (x, y), (nx, ny));
                    let weight = (-dist / h2).exp();
                    weight_sum += weight;
                    value_sum += weight * img.get_pixel(nx as u32, ny as u32)[0] as f32;
                }
            }

            let value = (value_sum / weight_sum).round().clamp(0.0, 255.0) as u8;
            out.put_pixel(x as u32, y as u32, Luma([value]));
        }
    }
    out
}

/// Mean squared difference between the patches centered on two pixels.
fn patch_distance(img: &GrayImage, a: (i64, i64), b: (i64, i64)) -> f32 {
    let (width, height) = img.dimensions();
    let max_x = width as i64 - 1;
    let max_y = height as i64 - 1;

    let mut sum = 0.0f32;
    let mut count = 0u32;
    for dy in -NLM_PATCH_RADIUS..=NLM_PATCH_RADIUS {
        for dx in -NLM_PATCH_RADIUS..=NLM_PATCH_RADIUS {
            let ax = (a.0 + dx).clamp(0, max_x) as u32;
            let ay = (a.1 + dy).clamp(0, max_y) as u32;
            let bx = (b.0 + dx).clamp(0, max_x) as u32;
            let by = (b.1 + dy).clamp(0, max_y) as u32;
            let diff = img.get_pixel(ax, ay)[0] as f32 - img.get_pixel(bx, by)[0] as f32;
            sum += diff * diff;
            count += 1;
        }
    }
    sum / count as f32
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is divided into a `grid` x `grid` tile grid; each tile gets a
/// clipped-histogram equalization mapping, and pixels are remapped by
/// bilinear interpolation between the four surrounding tile mappings.
fn clahe(img: &GrayImage, grid: u32, clip_limit: f32) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    // Tiles never smaller than one pixel.
    let grid = grid.min(width).min(height).max(1);
    let tile_w = width.div_ceil(grid);
    let tile_h = height.div_ceil(grid);

    // Per-tile remapping tables. Tiles past the image edge keep identity.
    let mut maps = vec![identity_map(); (grid * grid) as usize];
    for ty in 0..grid {
        for tx in 0..grid {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            if x0 >= width || y0 >= height {
                continue;
            }
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            maps[(ty * grid + tx) as usize] = tile_map(img, x0, y0, x1, y1, clip_limit);
        }
    }

    let mut out = GrayImage::new(width, height);
    let max_tile = (grid - 1) as f32;
    for y in 0..height {
        for x in 0..width {
            // Position in tile-grid space, measured from tile centers.
            let gx = ((x as f32 + 0.5) / tile_w as f32 - 0.5).clamp(0.0, max_tile);
            let gy = ((y as f32 + 0.5) / tile_h as f32 - 0.5).clamp(0.0, max_tile);
            let tx0 = gx.floor() as u32;
            let ty0 = gy.floor() as u32;
            let tx1 = (tx0 + 1).min(grid - 1);
            let ty1 = (ty0 + 1).min(grid - 1);
            let fx = gx - tx0 as f32;
            let fy = gy - ty0 as f32;

            let v = img.get_pixel(x, y)[0] as usize;
            let m00 = maps[(ty0 * grid + tx0) as usize][v] as f32;
            let m10 = maps[(ty0 * grid + tx1) as usize][v] as f32;
            let m01 = maps[(ty1 * grid + tx0) as usize][v] as f32;
            let m11 = maps[(ty1 * grid + tx1) as usize][v] as f32;

            let top = m00 * (1.0 - fx) + m10 * fx;
            let bottom = m01 * (1.0 - fx) + m11 * fx;
            let value = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
            out.put_pixel(x, y, Luma([value]));
        }
    }
    out
}

fn identity_map() -> [u8; 256] {
    let mut map = [0u8; 256];
    for (i, v) in map.iter_mut().enumerate() {
        *v = i as u8;
    }
    map
}

/// Clipped-histogram equalization mapping for one tile.
fn tile_map(img: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[img.get_pixel(x, y)[0] as usize] += 1;
        }
    }
    let area = ((x1 - x0) * (y1 - y0)) as f32;

    // Clip the histogram and redistribute the excess uniformly.
    let limit = ((clip_limit * area / 256.0).max(1.0)) as u32;
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let bump = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, bin) in hist.iter_mut().enumerate() {
        *bin += bump + u32::from(i < remainder);
    }

    let mut map = [0u8; 256];
    let mut cdf = 0u32;
    for (i, &bin) in hist.iter().enumerate() {
        cdf += bin;
        map[i] = ((cdf as f32 / area) * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    map
}

/// Otsu's automatic global threshold.
pub fn otsu_threshold(img: &GrayImage) -> u8 {
    let mut hist = [0u64; 256];
    for p in img.pixels() {
        hist[p[0] as usize] += 1;
    }
    let total: u64 = hist.iter().sum();
    if total == 0 {
        return 0;
    }

    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut best_threshold = 0u8;
    let mut best_variance = f64::MIN;
    let mut weight_bg = 0u64;
    let mut sum_bg = 0.0f64;

    for t in 0..256usize {
        weight_bg += hist[t];
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }
        sum_bg += t as f64 * hist[t] as f64;

        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum_all - sum_bg) / weight_fg as f64;
        let between =
            weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg) * (mean_bg - mean_fg);

        if between > best_variance {
            best_variance = between;
            best_threshold = t as u8;
        }
    }
    best_threshold
}

/// Two-level thresholding: above the threshold is white, rest is black.
fn binarize(img: &GrayImage, threshold: u8) -> GrayImage {
    let (width, height) = img.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        if img.get_pixel(x, y)[0] > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageBuffer;

    fn gray(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> GrayImage {
        ImageBuffer::from_fn(width, height, |x, y| Luma([f(x, y)]))
    }

    #[test]
    fn test_otsu_separates_bimodal_image() {
        // Left half dark, right half bright.
        let img = gray(16, 16, |x, _| if x < 8 { 40 } else { 210 });
        let t = otsu_threshold(&img);
        assert!((40..210).contains(&t), "threshold {} outside modes", t);
    }

    #[test]
    fn test_preprocess_is_two_level() {
        let img = gray(16, 16, |x, y| ((x * 13 + y * 7) % 256) as u8);
        let out = preprocess(&DynamicImage::ImageLuma8(img));
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_preprocess_keeps_dimensions() {
        let img = gray(10, 14, |x, _| (x * 20) as u8);
        let out = preprocess(&DynamicImage::ImageLuma8(img));
        assert_eq!(out.dimensions(), (10, 14));
    }

    #[test]
    fn test_denoise_smooths_impulse_noise() {
        // Uniform field with a single hot pixel.
        let mut img = gray(11, 11, |_, _| 100);
        img.put_pixel(5, 5, Luma([255]));
        let out = denoise_nl_means(&img, NLM_STRENGTH);
        assert!(out.get_pixel(5, 5)[0] < 255);
        // Flat background stays flat.
        assert_eq!(out.get_pixel(0, 0)[0], 100);
    }

    #[test]
    fn test_clahe_stretches_low_contrast_tile() {
        // Narrow band of values around mid-gray.
        let img = gray(32, 32, |x, y| 120 + ((x + y) % 16) as u8);
        let out = clahe(&img, CLAHE_GRID, CLAHE_CLIP_LIMIT);
        let min = out.pixels().map(|p| p[0]).min().unwrap();
        let max = out.pixels().map(|p| p[0]).max().unwrap();
        assert!(max - min > 15, "contrast not expanded: {}..{}", min, max);
    }

    #[test]
    fn test_boost_contrast_moves_away_from_mean() {
        let img = gray(8, 8, |x, _| if x < 4 { 100 } else { 160 });
        let boosted = boost_contrast(&DynamicImage::ImageLuma8(img), 2.0);
        let out = boosted.to_luma8();
        // Mean is 130; dark side pushed to ~70, bright side to ~190.
        assert!(out.get_pixel(0, 0)[0] < 90);
        assert!(out.get_pixel(7, 0)[0] > 170);
    }

    #[test]
    fn test_boost_contrast_clamps() {
        let img = gray(4, 4, |x, _| if x == 0 { 0 } else { 255 });
        let boosted = boost_contrast(&DynamicImage::ImageLuma8(img), 2.0);
        let out = boosted.to_luma8();
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(3, 3)[0], 255);
    }

    #[test]
    fn test_encode_png_magic_bytes() {
        let img = gray(4, 4, |_, _| 128);
        let bytes = encode_png(&DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
    }
}
