// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectifier — find the dominant four-cornered outline of a
// photographed page and warp it onto an upright rectangle.
//
// Detection steps:
//   1. Canny edge map, dilated and traced into external contours
//   2. Keep the contour enclosing the largest area
//   3. Douglas–Peucker simplification at 2% of its perimeter
//   4. Exactly four vertices → order corners tl, tr, br, bl
//   5. Projective transform onto (0,0) .. (w-1,h-1), bilinear resampling
//
// A page without a usable quadrilateral comes back untouched together with
// the reason, instead of an error.

use std::fmt;

use image::{DynamicImage, ImageBuffer, Luma, Pixel, Rgb};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use kreator_core::PipelineConfig;
use kreator_core::error::KreatorError;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::edges::{Contour, extract_contours, extract_edges};
use super::geometry::{Point2, Quadrilateral, approximate_closed_polygon, order_corners};
use crate::image::into_raster;

/// Why a page was passed through without perspective correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnchangedReason {
    /// The edge map produced no external contour at all.
    NoContours,
    /// The largest contour did not simplify to four corners.
    NotQuadrilateral { vertices: usize },
    /// Four corners were found but they do not span a usable rectangle.
    DegenerateQuad,
}

impl fmt::Display for UnchangedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoContours => write!(f, "no contours found"),
            Self::NotQuadrilateral { vertices } => {
                write!(f, "largest contour has {vertices} vertices, not 4")
            }
            Self::DegenerateQuad => write!(f, "quadrilateral is degenerate"),
        }
    }
}

/// Outcome of [`rectify`].
#[derive(Debug, Clone)]
pub enum Rectification {
    /// The quadrilateral was found and warped to a `width x height` image.
    Rectified {
        image: DynamicImage,
        quad: Quadrilateral,
    },
    /// The input image, pixel-identical.
    Unchanged {
        image: DynamicImage,
        reason: UnchangedReason,
    },
}

impl Rectification {
    pub fn image(&self) -> &DynamicImage {
        match self {
            Self::Rectified { image, .. } | Self::Unchanged { image, .. } => image,
        }
    }

    pub fn into_image(self) -> DynamicImage {
        match self {
            Self::Rectified { image, .. } | Self::Unchanged { image, .. } => image,
        }
    }

    pub fn is_rectified(&self) -> bool {
        matches!(self, Self::Rectified { .. })
    }

    /// The reason the page was left alone, if it was.
    pub fn unchanged_reason(&self) -> Option<UnchangedReason> {
        match self {
            Self::Rectified { .. } => None,
            Self::Unchanged { reason, .. } => Some(*reason),
        }
    }
}

/// Locate the page outline and return its ordered corners.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn detect_quadrilateral(
    image: &DynamicImage,
    config: &PipelineConfig,
) -> Result<Quadrilateral, UnchangedReason> {
    let edges = extract_edges(image, config);
    let contours = extract_contours(&edges, config);

    let largest = contours
        .iter()
        .max_by(|a, b| a.area().total_cmp(&b.area()))
        .ok_or(UnchangedReason::NoContours)?;

    let polygon = simplify(largest, config);
    debug!(
        contour_points = largest.points.len(),
        area = largest.area(),
        vertices = polygon.len(),
        "Largest contour simplified"
    );

    let corners: [Point2; 4] = polygon
        .as_slice()
        .try_into()
        .map_err(|_| UnchangedReason::NotQuadrilateral {
            vertices: polygon.len(),
        })?;

    let quad = order_corners(corners);
    if quad.has_repeated_corner() {
        return Err(UnchangedReason::DegenerateQuad);
    }
    Ok(quad)
}

fn simplify(contour: &Contour, config: &PipelineConfig) -> Vec<Point2> {
    let curve: Vec<Point2> = contour
        .points
        .iter()
        .map(|p| (p.x as f32, p.y as f32))
        .collect();
    let epsilon = config.polygon_epsilon_fraction * contour.perimeter() as f32;
    approximate_closed_polygon(&curve, epsilon)
}

/// Rectify the dominant quadrilateral of `image`.
///
/// Only a zero-sized input is an error. Every detection failure yields
/// [`Rectification::Unchanged`] carrying the input back.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn rectify(
    image: DynamicImage,
    config: &PipelineConfig,
) -> Result<Rectification, KreatorError> {
    let image = into_raster(image)?;

    let quad = match detect_quadrilateral(&image, config) {
        Ok(quad) => quad,
        Err(reason) => {
            warn!(%reason, "No document outline; page left as is");
            return Ok(Rectification::Unchanged { image, reason });
        }
    };

    let (width, height) = quad.target_size();
    if width < 2 || height < 2 {
        warn!(width, height, "Quadrilateral too small to warp");
        return Ok(Rectification::Unchanged {
            image,
            reason: UnchangedReason::DegenerateQuad,
        });
    }

    let (right, bottom) = ((width - 1) as f32, (height - 1) as f32);
    let target = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];
    let Some(projection) = Projection::from_control_points(quad.corners(), target) else {
        warn!("Projective transform is singular; page left as is");
        return Ok(Rectification::Unchanged {
            image,
            reason: UnchangedReason::DegenerateQuad,
        });
    };

    let warped = match &image {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(warp_to(
            gray,
            &projection,
            Luma([0u8]),
            width,
            height,
        )),
        other => DynamicImage::ImageRgb8(warp_to(
            &other.to_rgb8(),
            &projection,
            Rgb([0u8, 0, 0]),
            width,
            height,
        )),
    };

    info!(
        out_w = width,
        out_h = height,
        tl = ?quad.top_left,
        br = ?quad.bottom_right,
        "Perspective corrected"
    );
    Ok(Rectification::Rectified {
        image: warped,
        quad,
    })
}

fn warp_to<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    projection: &Projection,
    background: P,
    width: u32,
    height: u32,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + Send + Sync,
{
    let mut out = ImageBuffer::from_pixel(width, height, background);
    warp_into(src, projection, Interpolation::Bilinear, background, &mut out);
    out
}
