// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — load, validate, crop and resize page rasters.
// Operates on in-memory images using the `image` crate.

use std::path::Path;

use image::{DynamicImage, GrayImage};
use kreator_core::CropBox;
use kreator_core::error::KreatorError;
use tracing::{debug, info, instrument};

/// Validate a raster and bring it into one of the two layouts the pipeline
/// works with: 8-bit luminance or 8-bit RGB.
///
/// Alpha is dropped and 16/32-bit samples are reduced to 8 bits. A zero-sized
/// image is rejected as malformed.
pub fn into_raster(image: DynamicImage) -> Result<DynamicImage, KreatorError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(KreatorError::MalformedImage(format!(
            "{}x{} image has no pixels",
            image.width(),
            image.height()
        )));
    }

    let raster = match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image,
        DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLuma8(image.to_luma8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    };
    Ok(raster)
}

/// Image processing helper operating on a single in-memory page.
///
/// Each transforming method consumes `self` and returns a new
/// `ImageProcessor`, enabling method chaining.
///
/// ```ignore
/// let name = ImageProcessor::open("page.png")?
///     .crop_box(CropBox::default())?
///     .into_luma8();
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KreatorError> {
        let img = image::open(path.as_ref()).map_err(|err| {
            KreatorError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Consume the processor and return a validated pipeline raster.
    pub fn into_raster(self) -> Result<DynamicImage, KreatorError> {
        into_raster(self.image)
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Resize to exactly `width` x `height`, ignoring aspect ratio. Uses
    /// Lanczos3 filtering. A no-op when the size already matches.
    #[instrument(skip(self), fields(width, height))]
    pub fn resize_exact(self, width: u32, height: u32) -> Self {
        if self.image.width() == width && self.image.height() == height {
            return self;
        }
        debug!(
            from_w = self.image.width(),
            from_h = self.image.height(),
            "Resizing image"
        );
        let resized =
            self.image
                .resize_exact(width, height, image::imageops::FilterType::Lanczos3);
        Self { image: resized }
    }

    /// Rotate by a multiple of 90 degrees (clockwise). Other values are
    /// ignored.
    pub fn rotate_quarter_turns(self, degrees: i64) -> Self {
        let image = match degrees.rem_euclid(360) {
            90 => self.image.rotate90(),
            180 => self.image.rotate180(),
            270 => self.image.rotate270(),
            _ => self.image,
        };
        Self { image }
    }

    /// Crop the `crop` rectangle out of the image.
    ///
    /// The rectangle is clamped to the image bounds; if nothing of it remains
    /// inside the image the crop fails.
    #[instrument(skip(self))]
    pub fn crop_box(self, crop: CropBox) -> Result<Self, KreatorError> {
        let img_w = self.image.width();
        let img_h = self.image.height();

        let right = crop.right.min(img_w);
        let bottom = crop.bottom.min(img_h);
        if crop.left >= right || crop.top >= bottom {
            return Err(KreatorError::InvalidCropBox(format!(
                "({crop}) lies outside the {img_w}x{img_h} page"
            )));
        }

        let (safe_w, safe_h) = (right - crop.left, bottom - crop.top);
        debug!(
            x = crop.left,
            y = crop.top,
            safe_w,
            safe_h,
            "Cropping image"
        );

        let cropped = self.image.crop_imm(crop.left, crop.top, safe_w, safe_h);
        Ok(Self { image: cropped })
    }

    /// Consume the processor and return the luminance plane.
    pub fn into_luma8(self) -> GrayImage {
        match self.image {
            DynamicImage::ImageLuma8(gray) => gray,
            other => other.to_luma8(),
        }
    }
}

/// Save each image as `page_001.png`, `page_002.png`, ... inside `dir`,
/// creating the directory if needed. Returns the written paths.
#[instrument(skip_all, fields(dir = %dir.as_ref().display(), count = images.len()))]
pub fn save_images_as_png(
    images: &[(u32, GrayImage)],
    dir: impl AsRef<Path>,
) -> Result<Vec<std::path::PathBuf>, KreatorError> {
    std::fs::create_dir_all(dir.as_ref())?;
    let mut written = Vec::with_capacity(images.len());
    for (page, image) in images {
        let path = dir.as_ref().join(format!("page_{page:03}.png"));
        image.save(&path).map_err(|err| {
            KreatorError::ImageError(format!("failed to save {}: {}", path.display(), err))
        })?;
        written.push(path);
    }
    info!(written = written.len(), "Crops saved");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba, RgbaImage};

    #[test]
    fn into_raster_rejects_empty_image() {
        let empty = DynamicImage::ImageLuma8(GrayImage::new(0, 10));
        assert!(matches!(
            into_raster(empty),
            Err(KreatorError::MalformedImage(_))
        ));
    }

    #[test]
    fn into_raster_drops_alpha() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 40])));
        let raster = into_raster(rgba).expect("valid raster");
        assert!(matches!(raster, DynamicImage::ImageRgb8(_)));
        assert_eq!(raster.to_rgb8().get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn crop_box_extracts_region() {
        let mut img = GrayImage::from_pixel(50, 40, Luma([0u8]));
        img.put_pixel(12, 7, Luma([200u8]));
        let crop = CropBox::new(10, 5, 30, 25).expect("valid");

        let out = ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(img))
            .crop_box(crop)
            .expect("crop inside image")
            .into_luma8();

        assert_eq!(out.dimensions(), (20, 20));
        assert_eq!(out.get_pixel(2, 2).0[0], 200);
    }

    #[test]
    fn crop_box_is_clamped_to_bounds() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(100, 40));
        let crop = CropBox::new(80, 30, 200, 90).expect("valid");
        let out = ImageProcessor::from_dynamic(img).crop_box(crop).expect("partially inside");
        assert_eq!((out.width(), out.height()), (20, 10));
    }

    #[test]
    fn crop_box_outside_image_fails() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(100, 40));
        let crop = CropBox::new(120, 0, 150, 10).expect("valid");
        assert!(matches!(
            ImageProcessor::from_dynamic(img).crop_box(crop),
            Err(KreatorError::InvalidCropBox(_))
        ));
    }

    #[test]
    fn save_images_as_png_numbers_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let crops = vec![
            (1, GrayImage::new(3, 3)),
            (12, GrayImage::new(3, 3)),
        ];
        let written = save_images_as_png(&crops, dir.path()).expect("save");
        assert_eq!(written.len(), 2);
        assert!(dir.path().join("page_001.png").exists());
        assert!(dir.path().join("page_012.png").exists());
    }
}
