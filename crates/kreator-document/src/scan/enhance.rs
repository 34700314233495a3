// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Photometric enhancement — contrast and brightness adjustment, full-range
// rescaling and CLAHE for cropped name fields.

use image::{DynamicImage, GrayImage, Luma};
use kreator_core::PipelineConfig;
use kreator_core::error::KreatorError;
use tracing::{debug, info, instrument};

use super::clahe::clahe;

/// Tonal clean-up of a single-channel page region.
///
/// Each step consumes `self` and returns a new `ScanEnhancer`, so the
/// pipeline reads top to bottom:
///
/// ```ignore
/// let crop = ScanEnhancer::from_dynamic(&image)
///     .adjust_contrast(3.0)
///     .scale_brightness(0.6)
///     .normalize_min_max()
///     .equalize_adaptive((8, 8), 2.0)
///     .into_gray();
/// ```
pub struct ScanEnhancer {
    /// The working luminance plane.
    image: GrayImage,
}

impl ScanEnhancer {
    // -- Construction ---------------------------------------------------------

    /// Start from any raster; colour input is converted to luminance.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self {
            image: image.to_luma8(),
        }
    }

    pub fn from_gray(image: GrayImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_gray(self) -> GrayImage {
        self.image
    }

    // -- Global adjustments ---------------------------------------------------

    /// Push every pixel away from the image mean by `gain`:
    /// `mean + gain * (p - mean)`, with `mean` rounded to an integer level.
    #[instrument(skip(self))]
    pub fn adjust_contrast(self, gain: f32) -> Self {
        let mean = mean_level(&self.image);
        debug!(mean, "Adjusting contrast around image mean");
        self.map_levels(|p| mean + gain * (p - mean))
    }

    /// Multiply every pixel by `factor`.
    #[instrument(skip(self))]
    pub fn scale_brightness(self, factor: f32) -> Self {
        self.map_levels(|p| p * factor)
    }

    /// Linearly stretch the darkest pixel to 0 and the brightest to 255.
    /// A flat image becomes all black.
    #[instrument(skip(self))]
    pub fn normalize_min_max(self) -> Self {
        let (lo, hi) = self
            .image
            .pixels()
            .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));

        if hi <= lo {
            debug!(level = lo, "Flat image, rescaled to black");
            let (w, h) = self.image.dimensions();
            return Self {
                image: GrayImage::from_pixel(w, h, Luma([0u8])),
            };
        }

        let (lo, scale) = (lo as f32, 255.0 / (hi - lo) as f32);
        self.map_levels(|p| (p - lo) * scale)
    }

    // -- Local equalization ---------------------------------------------------

    /// Contrast-limited adaptive histogram equalization over a
    /// `tiles.0 x tiles.1` grid.
    #[instrument(skip(self))]
    pub fn equalize_adaptive(self, tiles: (u32, u32), clip_limit: f32) -> Self {
        Self {
            image: clahe(&self.image, tiles, clip_limit),
        }
    }

    fn map_levels(self, f: impl Fn(f32) -> f32) -> Self {
        let mut image = self.image;
        for pixel in image.pixels_mut() {
            let value = f(pixel.0[0] as f32);
            pixel.0[0] = value.round().clamp(0.0, 255.0) as u8;
        }
        Self { image }
    }
}

/// Run the configured enhancement chain on `image` and return the
/// single-channel result, same size as the input.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn enhance(image: &DynamicImage, config: &PipelineConfig) -> Result<GrayImage, KreatorError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(KreatorError::MalformedImage(format!(
            "cannot enhance a {}x{} image",
            image.width(),
            image.height()
        )));
    }

    let enhanced = ScanEnhancer::from_dynamic(image)
        .adjust_contrast(config.contrast_gain)
        .scale_brightness(config.brightness_scale)
        .normalize_min_max()
        .equalize_adaptive(config.clahe_tiles, config.clahe_clip_limit)
        .into_gray();

    info!("Enhancement complete");
    Ok(enhanced)
}

/// Global mean luminance rounded to the nearest level.
fn mean_level(gray: &GrayImage) -> f32 {
    let count = gray.width() as u64 * gray.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    (sum as f64 / count as f64).round() as f32
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn min_max(img: &GrayImage) -> (u8, u8) {
        img.pixels()
            .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])))
    }

    /// Contrast pivots on the rounded mean: levels below it get darker,
    /// levels above it brighter, and the mean itself stays put.
    #[test]
    fn contrast_pivots_on_mean() {
        let img = GrayImage::from_fn(4, 1, |x, _| Luma([[90u8, 100, 100, 110][x as usize]]));
        let out = ScanEnhancer::from_gray(img).adjust_contrast(3.0).into_gray();
        let values: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![70, 100, 100, 130]);
    }

    #[test]
    fn contrast_clamps_to_range() {
        let img = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 10u8 } else { 240 }]));
        let out = ScanEnhancer::from_gray(img).adjust_contrast(3.0).into_gray();
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn brightness_scales_levels() {
        let img = GrayImage::from_pixel(3, 3, Luma([200u8]));
        let out = ScanEnhancer::from_gray(img).scale_brightness(0.6).into_gray();
        assert!(out.pixels().all(|p| p.0[0] == 120));
    }

    #[test]
    fn min_max_stretches_to_full_range() {
        let img = GrayImage::from_fn(16, 1, |x, _| Luma([(60 + x * 4) as u8]));
        let out = ScanEnhancer::from_gray(img).normalize_min_max().into_gray();
        assert_eq!(min_max(&out), (0, 255));
    }

    #[test]
    fn min_max_of_flat_image_is_black() {
        let img = GrayImage::from_pixel(5, 4, Luma([77u8]));
        let out = ScanEnhancer::from_gray(img).normalize_min_max().into_gray();
        assert!(out.pixels().all(|p| p.0[0] == 0));
    }

    /// A washed-out colour crop should come back as a single-channel image
    /// of the same size that uses the full tonal range.
    #[test]
    fn enhance_spans_full_range() {
        let img = RgbImage::from_fn(173, 36, |x, y| {
            let v = (110 + (x % 23) + (y % 7) * 3) as u8;
            Rgb([v, v.saturating_add(5), v])
        });
        let out = enhance(&DynamicImage::ImageRgb8(img), &PipelineConfig::default())
            .expect("valid image");

        assert_eq!(out.dimensions(), (173, 36));
        let (lo, hi) = min_max(&out);
        assert!(lo <= 10, "darkest level {lo}");
        assert!(hi >= 245, "brightest level {hi}");
    }

    #[test]
    fn enhance_rejects_empty_image() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(0, 4));
        assert!(matches!(
            enhance(&img, &PipelineConfig::default()),
            Err(KreatorError::MalformedImage(_))
        ));
    }

    #[test]
    fn mean_level_rounds() {
        let img = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 10u8 } else { 11 }]));
        assert_eq!(mean_level(&img), 11.0);
    }
}
