// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plane geometry for quadrilateral detection — closed-curve Douglas–Peucker
// simplification and canonical corner ordering.

use std::cmp::Ordering;

use serde::Serialize;

/// A 2D point in pixel coordinates.
pub type Point2 = (f32, f32);

/// Four corners in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quadrilateral {
    pub top_left: Point2,
    pub top_right: Point2,
    pub bottom_right: Point2,
    pub bottom_left: Point2,
}

impl Quadrilateral {
    /// Corners as `[tl, tr, br, bl]`.
    pub fn corners(&self) -> [Point2; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Size of the axis-aligned rectangle the quadrilateral is warped onto:
    /// the longer of each pair of opposing edges, floored.
    pub fn target_size(&self) -> (u32, u32) {
        let width_bottom = distance(self.bottom_right, self.bottom_left);
        let width_top = distance(self.top_right, self.top_left);
        let height_right = distance(self.top_right, self.bottom_right);
        let height_left = distance(self.top_left, self.bottom_left);

        let width = (width_bottom as u32).max(width_top as u32);
        let height = (height_right as u32).max(height_left as u32);
        (width, height)
    }

    /// True when two roles were assigned the same input point.
    pub fn has_repeated_corner(&self) -> bool {
        let c = self.corners();
        (0..4).any(|i| ((i + 1)..4).any(|j| c[i] == c[j]))
    }

    /// Enclosed area (shoelace, corners taken in canonical order).
    pub fn area(&self) -> f32 {
        let c = self.corners();
        let twice: f32 = (0..4)
            .map(|i| {
                let j = (i + 1) % 4;
                c[i].0 * c[j].1 - c[j].0 * c[i].1
            })
            .sum();
        twice.abs() / 2.0
    }
}

/// Assign four points to corners with the sum/difference rule:
///
/// - top-left has the smallest `x + y`, bottom-right the largest;
/// - top-right has the smallest `y - x`, bottom-left the largest.
///
/// Ties are broken on `(x, y)` so the result does not depend on the order the
/// points are given in.
pub fn order_corners(points: [Point2; 4]) -> Quadrilateral {
    let sum = |p: &Point2| p.0 + p.1;
    let diff = |p: &Point2| p.1 - p.0;

    let pick = |key: &dyn Fn(&Point2) -> f32, want: Ordering| -> Point2 {
        let mut best = points[0];
        for p in &points[1..] {
            let ord = key(p)
                .partial_cmp(&key(&best))
                .unwrap_or(Ordering::Equal)
                .then_with(|| tie_break(p, &best));
            if ord == want {
                best = *p;
            }
        }
        best
    };

    Quadrilateral {
        top_left: pick(&sum, Ordering::Less),
        bottom_right: pick(&sum, Ordering::Greater),
        top_right: pick(&diff, Ordering::Less),
        bottom_left: pick(&diff, Ordering::Greater),
    }
}

fn tie_break(a: &Point2, b: &Point2) -> Ordering {
    a.0.partial_cmp(&b.0)
        .unwrap_or(Ordering::Equal)
        .then(a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
}

pub fn distance(a: Point2, b: Point2) -> f32 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

/// Perpendicular distance from `p` to the infinite line through `a` and `b`
/// (distance to `a` if the two coincide).
fn line_distance(p: Point2, a: Point2, b: Point2) -> f32 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    let len = dx.hypot(dy);
    if len == 0.0 {
        return distance(p, a);
    }
    ((p.0 - a.0) * dy - (p.1 - a.1) * dx).abs() / len
}

/// Simplify a closed curve with the Douglas–Peucker algorithm.
///
/// The curve is split between two extreme points and each half is simplified
/// as an open chain. The extremes are found by repeatedly jumping to the point
/// farthest from the current one, which settles on a pair of real vertices
/// whatever point the curve starts at. An anchor that still lies on a
/// straight run is dropped afterwards.
pub fn approximate_closed_polygon(curve: &[Point2], epsilon: f32) -> Vec<Point2> {
    let n = curve.len();
    if n <= 3 {
        return curve.to_vec();
    }

    let (first, second) = extreme_pair(curve);

    let mut keep = vec![false; n];
    keep[first] = true;
    keep[second] = true;

    let forward: Vec<usize> = cyclic_range(first, second, n);
    let backward: Vec<usize> = cyclic_range(second, first, n);
    mark_douglas_peucker(curve, &forward, epsilon, &mut keep);
    mark_douglas_peucker(curve, &backward, epsilon, &mut keep);

    let mut polygon: Vec<Point2> = (0..n).filter(|&i| keep[i]).map(|i| curve[i]).collect();

    for anchor in [curve[second], curve[first]] {
        if polygon.len() <= 3 {
            break;
        }
        if let Some(idx) = polygon.iter().position(|&p| p == anchor) {
            let m = polygon.len();
            let prev = polygon[(idx + m - 1) % m];
            let next = polygon[(idx + 1) % m];
            if line_distance(anchor, prev, next) <= epsilon {
                polygon.remove(idx);
            }
        }
    }

    polygon
}

/// Number of farthest-point jumps used to settle the split anchors.
const ANCHOR_ITERATIONS: usize = 3;

/// Two mutually distant curve indices: start at point 0, jump to the
/// farthest point, and repeat from there until the pair stops changing.
fn extreme_pair(curve: &[Point2]) -> (usize, usize) {
    let mut from = 0;
    let mut to = farthest_from(curve, from);
    for _ in 0..ANCHOR_ITERATIONS {
        let next = farthest_from(curve, to);
        if next == from {
            break;
        }
        from = to;
        to = next;
    }
    (from, to)
}

fn farthest_from(curve: &[Point2], origin: usize) -> usize {
    let anchor = curve[origin];
    (0..curve.len())
        .max_by(|&i, &j| {
            distance(curve[i], anchor)
                .partial_cmp(&distance(curve[j], anchor))
                .unwrap_or(Ordering::Equal)
        })
        .unwrap_or(origin)
}

/// Indices `from..=to` walking forward around a closed curve of `n` points.
fn cyclic_range(from: usize, to: usize, n: usize) -> Vec<usize> {
    let len = (to + n - from) % n;
    (0..=len).map(|k| (from + k) % n).collect()
}

/// Iterative Douglas–Peucker over the chain `indices` of `curve`, marking
/// retained points in `keep`.
fn mark_douglas_peucker(curve: &[Point2], indices: &[usize], epsilon: f32, keep: &mut [bool]) {
    if indices.len() <= 2 {
        return;
    }

    let mut stack = vec![(0usize, indices.len() - 1)];
    while let Some((lo, hi)) = stack.pop() {
        if hi - lo <= 1 {
            continue;
        }

        let a = curve[indices[lo]];
        let b = curve[indices[hi]];
        let mut max_dist = 0.0f32;
        let mut max_at = lo;
        for k in (lo + 1)..hi {
            let d = line_distance(curve[indices[k]], a, b);
            if d > max_dist {
                max_dist = d;
                max_at = k;
            }
        }

        if max_dist > epsilon {
            keep[indices[max_at]] = true;
            stack.push((lo, max_at));
            stack.push((max_at, hi));
        }
    }
}
