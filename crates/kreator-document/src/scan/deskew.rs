// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Skew corrector — estimate the dominant text-line angle with a Hough
// transform and rotate the page back to level.

use image::DynamicImage;
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use kreator_core::PipelineConfig;
use kreator_core::error::KreatorError;
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::edges::extract_edges;
use crate::image::{RotationTransform, into_raster, warp_affine};

/// Skews smaller than this are treated as level and skip resampling.
const MIN_CORRECTION_DEGREES: f32 = 1e-3;

/// Median line angle of a page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SkewEstimate {
    /// Degrees, positive when lines fall towards the right (clockwise on
    /// screen). Zero when no line was found.
    pub degrees: f32,
    /// Number of Hough lines that voted.
    pub line_count: usize,
}

/// Result of [`deskew`].
#[derive(Debug, Clone)]
pub struct SkewCorrection {
    /// The rotated page, same size as the input.
    pub image: DynamicImage,
    /// Estimated skew of the input.
    pub skew_degrees: f32,
    pub line_count: usize,
}

impl SkewCorrection {
    /// Rotation applied to the page (clockwise positive).
    pub fn correction_degrees(&self) -> f32 {
        if self.skew_degrees.abs() < MIN_CORRECTION_DEGREES {
            0.0
        } else {
            -self.skew_degrees
        }
    }
}

/// Estimate the skew of `image` without resampling it.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn estimate_skew(image: &DynamicImage, config: &PipelineConfig) -> SkewEstimate {
    let edges = extract_edges(image, config);
    let options = LineDetectionOptions {
        vote_threshold: config.line_vote_threshold,
        suppression_radius: config.line_suppression_radius,
    };
    let lines = detect_lines(&edges, options);

    let mut angles: Vec<f32> = lines
        .iter()
        .map(|line| line_angle(line, config.fold_vertical_lines))
        .collect();
    let degrees = median(&mut angles).unwrap_or(0.0);

    debug!(
        line_count = lines.len(),
        degrees,
        vote_threshold = config.line_vote_threshold,
        "Skew estimated"
    );
    SkewEstimate {
        degrees,
        line_count: lines.len(),
    }
}

/// Level the page by rotating it about its center by the negative of the
/// estimated skew. Uncovered corners repeat the nearest edge pixel.
///
/// Only a zero-sized input is an error; a page with no detectable lines is
/// returned as is with a skew of 0.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn deskew(
    image: DynamicImage,
    config: &PipelineConfig,
) -> Result<SkewCorrection, KreatorError> {
    let image = into_raster(image)?;
    let estimate = estimate_skew(&image, config);

    if estimate.degrees.abs() < MIN_CORRECTION_DEGREES {
        debug!(line_count = estimate.line_count, "Page already level");
        return Ok(SkewCorrection {
            image,
            skew_degrees: estimate.degrees,
            line_count: estimate.line_count,
        });
    }

    let (w, h) = (image.width(), image.height());
    let transform = RotationTransform::about_center(w, h, -(estimate.degrees as f64));
    let rotated = match &image {
        DynamicImage::ImageLuma8(gray) => {
            warp_affine(gray, &transform, w, h).map(DynamicImage::ImageLuma8)
        }
        other => warp_affine(&other.to_rgb8(), &transform, w, h)
            .map(DynamicImage::ImageRgb8),
    };

    // A pure rotation is always invertible.
    let Some(rotated) = rotated else {
        return Ok(SkewCorrection {
            image,
            skew_degrees: estimate.degrees,
            line_count: estimate.line_count,
        });
    };

    info!(
        skew_degrees = estimate.degrees,
        line_count = estimate.line_count,
        "Skew corrected"
    );
    Ok(SkewCorrection {
        image: rotated,
        skew_degrees: estimate.degrees,
        line_count: estimate.line_count,
    })
}

/// Angle of a detected line relative to the horizontal, in degrees.
///
/// `PolarLine` stores the angle of the line's normal, so a horizontal line
/// has 90 and a vertical one -90. With `fold` set the result is brought into
/// (-45, 45] so that vertical rules and page borders agree with the text
/// lines.
fn line_angle(line: &PolarLine, fold: bool) -> f32 {
    let angle = line.angle_in_degrees as f32 - 90.0;
    if !fold {
        return angle;
    }
    if angle <= -45.0 {
        angle + 90.0
    } else if angle > 45.0 {
        angle - 90.0
    } else {
        angle
    }
}

/// Median of `values`; for an even count the mean of the two middle values.
fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use imageproc::drawing::draw_polygon_mut;
    use imageproc::point::Point;

    /// Dark bands on white, each 16 px thick, sloping `degrees` clockwise
    /// about the image center.
    fn banded_page(w: u32, h: u32, degrees: f32, centers: &[f32]) -> GrayImage {
        let mut img = GrayImage::from_pixel(w, h, Luma([255u8]));
        let slope = degrees.to_radians().tan();
        let cx = w as f32 / 2.0;
        let right = (w - 1) as f32;
        for &yc in centers {
            let y_at = |x: f32| yc + (x - cx) * slope;
            let band = [
                Point::new(0, (y_at(0.0) - 8.0).round() as i32),
                Point::new(right as i32, (y_at(right) - 8.0).round() as i32),
                Point::new(right as i32, (y_at(right) + 8.0).round() as i32),
                Point::new(0, (y_at(0.0) + 8.0).round() as i32),
            ];
            draw_polygon_mut(&mut img, &band, Luma([0u8]));
        }
        img
    }

    fn line(angle_in_degrees: u32) -> PolarLine {
        PolarLine {
            r: 0.0,
            angle_in_degrees,
        }
    }

    #[test]
    fn median_of_odd_and_even_counts() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn line_angles_relative_to_horizontal() {
        assert_eq!(line_angle(&line(90), true), 0.0);
        assert_eq!(line_angle(&line(100), true), 10.0);
        assert_eq!(line_angle(&line(80), true), -10.0);
        // Vertical lines fold onto the horizontal when requested.
        assert_eq!(line_angle(&line(0), true), 0.0);
        assert_eq!(line_angle(&line(0), false), -90.0);
        assert_eq!(line_angle(&line(179), true), -1.0);
        assert_eq!(line_angle(&line(45), true), 45.0);
    }

    #[test]
    fn horizontal_lines_leave_page_untouched() {
        let img = DynamicImage::ImageLuma8(banded_page(400, 300, 0.0, &[60.0, 140.0, 220.0]));
        let config = PipelineConfig::default();

        let estimate = estimate_skew(&img, &config);
        assert!(estimate.line_count > 0);
        assert!(estimate.degrees.abs() < 0.5, "skew {}", estimate.degrees);

        let corrected = deskew(img.clone(), &config).expect("valid image");
        assert_eq!(corrected.correction_degrees(), 0.0);
        assert_eq!(corrected.image, img);
    }

    #[test]
    fn ten_degree_lines_are_rotated_back() {
        let img = DynamicImage::ImageLuma8(banded_page(
            800,
            600,
            10.0,
            &[150.0, 250.0, 350.0, 450.0],
        ));
        let config = PipelineConfig::default();

        let corrected = deskew(img, &config).expect("valid image");
        assert!(
            (corrected.skew_degrees - 10.0).abs() < 0.5,
            "skew {}",
            corrected.skew_degrees
        );
        assert!((corrected.correction_degrees() + 10.0).abs() < 0.5);
        assert_eq!((corrected.image.width(), corrected.image.height()), (800, 600));

        let residual = estimate_skew(&corrected.image, &config);
        assert!(residual.degrees.abs() < 1.0, "residual {}", residual.degrees);
    }

    /// Dark vertical bands on white, 20 px wide, full height.
    fn vertical_banded_page(size: u32, lefts: &[u32]) -> GrayImage {
        GrayImage::from_fn(size, size, |x, _| {
            if lefts.iter().any(|&left| (left..left + 20).contains(&x)) {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        })
    }

    #[test]
    fn vertical_rules_vote_minus_ninety_unless_folded() {
        let img = DynamicImage::ImageLuma8(vertical_banded_page(400, &[90, 190, 290]));

        let raw = estimate_skew(&img, &PipelineConfig::default());
        assert!(raw.line_count > 0);
        assert!((raw.degrees + 90.0).abs() < 1.5, "skew {}", raw.degrees);

        let folded = PipelineConfig {
            fold_vertical_lines: true,
            ..PipelineConfig::default()
        };
        let estimate = estimate_skew(&img, &folded);
        assert_eq!(estimate.line_count, raw.line_count);
        assert!(estimate.degrees.abs() < 1.5, "skew {}", estimate.degrees);
    }

    #[test]
    fn blank_page_has_no_skew() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 150, Rgb([240, 240, 240])));
        let corrected = deskew(img.clone(), &PipelineConfig::default()).expect("valid image");
        assert_eq!(corrected.line_count, 0);
        assert_eq!(corrected.skew_degrees, 0.0);
        assert_eq!(corrected.image, img);
    }

    #[test]
    fn zero_sized_image_is_an_error() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(10, 0));
        assert!(deskew(img, &PipelineConfig::default()).is_err());
    }
}
