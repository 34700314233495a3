// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Affine resampling with replicated borders.
//
// `imageproc`'s warps only fill uncovered pixels with a constant colour. Skew
// correction repeats the nearest edge pixel instead, so rotation is
// resampled here.

use image::{ImageBuffer, Pixel};

/// 2×3 affine matrix mapping source coordinates to destination coordinates:
///
/// ```text
/// x' = m[0][0] * x + m[0][1] * y + m[0][2]
/// y' = m[1][0] * x + m[1][1] * y + m[1][2]
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationTransform {
    pub m: [[f64; 3]; 2],
}

impl RotationTransform {
    /// Rotation by `degrees` clockwise (as displayed, y pointing down) about
    /// `(cx, cy)`.
    pub fn about(cx: f64, cy: f64, degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            m: [
                [cos, -sin, cx - cos * cx + sin * cy],
                [sin, cos, cy - sin * cx - cos * cy],
            ],
        }
    }

    /// Rotation about the geometric center of a `width` x `height` pixel grid.
    pub fn about_center(width: u32, height: u32, degrees: f64) -> Self {
        let cx = (width as f64 - 1.0) / 2.0;
        let cy = (height as f64 - 1.0) / 2.0;
        Self::about(cx, cy, degrees)
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.m;
        (
            m[0][0] * x + m[0][1] * y + m[0][2],
            m[1][0] * x + m[1][1] * y + m[1][2],
        )
    }

    /// Inverse transform, or `None` if the linear part is singular.
    pub fn invert(&self) -> Option<Self> {
        let [[a, b, tx], [c, d, ty]] = self.m;
        let det = a * d - b * c;
        if det.abs() < 1e-12 {
            return None;
        }
        let (ia, ib, ic, id) = (d / det, -b / det, -c / det, a / det);
        Some(Self {
            m: [
                [ia, ib, -(ia * tx + ib * ty)],
                [ic, id, -(ic * tx + id * ty)],
            ],
        })
    }
}

/// Resample `src` through `transform` into a `width` x `height` image using
/// bilinear interpolation. Samples outside `src` repeat the nearest edge
/// pixel.
///
/// Returns `None` if the transform cannot be inverted.
pub fn warp_affine<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    transform: &RotationTransform,
    width: u32,
    height: u32,
) -> Option<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8>,
{
    let inverse = transform.invert()?;
    let mut out = ImageBuffer::<P, Vec<u8>>::new(width, height);
    let channels = P::CHANNEL_COUNT as usize;
    let mut acc = vec![0f64; channels];

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let (sx, sy) = inverse.apply(x as f64, y as f64);
        sample_bilinear(src, sx, sy, &mut acc);
        for (dst, value) in pixel.channels_mut().iter_mut().zip(&acc) {
            *dst = value.round().clamp(0.0, 255.0) as u8;
        }
    }

    Some(out)
}

/// Bilinear sample of every channel at `(x, y)`, written into `acc`.
fn sample_bilinear<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    x: f64,
    y: f64,
    acc: &mut [f64],
) where
    P: Pixel<Subpixel = u8>,
{
    let x0 = x.floor();
    let y0 = y.floor();
    let dx = x - x0;
    let dy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    acc.iter_mut().for_each(|a| *a = 0.0);
    let taps = [
        (x0, y0, (1.0 - dx) * (1.0 - dy)),
        (x0 + 1, y0, dx * (1.0 - dy)),
        (x0, y0 + 1, (1.0 - dx) * dy),
        (x0 + 1, y0 + 1, dx * dy),
    ];

    for (tx, ty, weight) in taps {
        if weight == 0.0 {
            continue;
        }
        if let Some(pixel) = fetch(src, tx, ty) {
            for (a, &c) in acc.iter_mut().zip(pixel.channels()) {
                *a += weight * c as f64;
            }
        }
    }
}

/// Pixel at integer coordinates, clamped to the image; `None` only for an
/// empty image.
fn fetch<P>(src: &ImageBuffer<P, Vec<u8>>, x: i64, y: i64) -> Option<&P>
where
    P: Pixel<Subpixel = u8>,
{
    let (w, h) = (src.width() as i64, src.height() as i64);
    if w == 0 || h == 0 {
        return None;
    }
    let cx = x.clamp(0, w - 1) as u32;
    let cy = y.clamp(0, h - 1) as u32;
    Some(src.get_pixel(cx, cy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn rotation_inverse_round_trips() {
        let t = RotationTransform::about(40.0, 25.0, 17.0);
        let inv = t.invert().expect("rotation is invertible");
        let (x, y) = t.apply(3.0, 9.0);
        let (bx, by) = inv.apply(x, y);
        assert!((bx - 3.0).abs() < 1e-9 && (by - 9.0).abs() < 1e-9);
    }

    #[test]
    fn rotation_keeps_center_fixed() {
        let t = RotationTransform::about_center(101, 51, 33.0);
        let (x, y) = t.apply(50.0, 25.0);
        assert!((x - 50.0).abs() < 1e-9 && (y - 25.0).abs() < 1e-9);
    }

    #[test]
    fn positive_angle_turns_x_axis_towards_y() {
        // Clockwise on screen: a point to the right of the center moves down.
        let t = RotationTransform::about(0.0, 0.0, 90.0);
        let (x, y) = t.apply(10.0, 0.0);
        assert!(x.abs() < 1e-9 && (y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn zero_rotation_is_identity_warp() {
        let img = GrayImage::from_fn(9, 7, |x, y| Luma([(x * 20 + y) as u8]));
        let t = RotationTransform::about_center(9, 7, 0.0);
        let out = warp_affine(&img, &t, 9, 7).expect("invertible");
        assert_eq!(out, img);
    }

    #[test]
    fn replicate_border_has_no_fill_colour() {
        let img = RgbImage::from_pixel(20, 20, Rgb([200, 100, 50]));
        let t = RotationTransform::about_center(20, 20, 30.0);
        let out = warp_affine(&img, &t, 20, 20).expect("invertible");
        assert!(out.pixels().all(|p| p.0 == [200, 100, 50]));
    }
}
