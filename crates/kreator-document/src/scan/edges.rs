// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edge and contour extraction shared by the perspective rectifier and the
// skew corrector.

use image::{DynamicImage, GrayImage};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::dilate;
use imageproc::point::Point;
use kreator_core::PipelineConfig;
use tracing::{debug, instrument};

/// Binary edge map of an image: luminance, Gaussian smoothing with a
/// `blur_kernel`-sized kernel, then Canny hysteresis between `edge_low` and
/// `edge_high`. Edge pixels are 255, background 0.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn extract_edges(image: &DynamicImage, config: &PipelineConfig) -> GrayImage {
    let gray = image.to_luma8();
    let blurred = gaussian_blur_f32(&gray, config.blur_sigma());
    let edges = canny(&blurred, config.edge_low, config.edge_high);
    debug!(
        edge_pixels = edges.pixels().filter(|p| p.0[0] > 0).count(),
        "Canny edge detection complete"
    );
    edges
}

/// A closed boundary, stored as its direction-change vertices only.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

impl Contour {
    /// Build a contour from a full pixel chain, dropping every point that
    /// continues the previous step's direction.
    pub fn from_chain(chain: &[Point<i32>]) -> Self {
        Self {
            points: compress_chain(chain),
        }
    }

    /// Enclosed area by the shoelace formula.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: f64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64
            })
            .sum();
        twice.abs() / 2.0
    }

    /// Length of the closed boundary.
    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                ((b.x - a.x) as f64).hypot((b.y - a.y) as f64)
            })
            .sum()
    }
}

/// Outer boundaries of the connected foreground regions of `edges`.
///
/// Boundaries nested inside another region (holes, and anything inside
/// holes) are not reported. A non-zero `contour_dilation` dilates the edge
/// map first, bridging single-pixel breaks in an outline at the cost of
/// growing it by that radius.
#[instrument(skip_all)]
pub fn extract_contours(edges: &GrayImage, config: &PipelineConfig) -> Vec<Contour> {
    let closed = if config.contour_dilation > 0 {
        dilate(edges, Norm::LInf, config.contour_dilation)
    } else {
        edges.clone()
    };

    let contours: Vec<Contour> = find_contours::<i32>(&closed)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| Contour::from_chain(&c.points))
        .collect();

    debug!(count = contours.len(), "External contours traced");
    contours
}

fn compress_chain(chain: &[Point<i32>]) -> Vec<Point<i32>> {
    let mut chain: Vec<Point<i32>> = chain.to_vec();
    chain.dedup();
    while chain.len() > 1 && chain.first() == chain.last() {
        chain.pop();
    }

    let n = chain.len();
    if n < 3 {
        return chain;
    }

    let kept: Vec<Point<i32>> = (0..n)
        .filter(|&i| {
            let prev = chain[(i + n - 1) % n];
            let cur = chain[i];
            let next = chain[(i + 1) % n];
            (cur.x - prev.x, cur.y - prev.y) != (next.x - cur.x, next.y - cur.y)
        })
        .map(|i| chain[i])
        .collect();

    if kept.is_empty() {
        chain[..1].to_vec()
    } else {
        kept
    }
}
