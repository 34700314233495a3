// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contrast-limited adaptive histogram equalization on 8-bit luminance.

use image::{GrayImage, Luma};
use tracing::{debug, instrument};

const BINS: usize = 256;

/// Equalize `gray` tile by tile with clipped histograms.
///
/// The image is split into a `tiles.0 x tiles.1` grid (columns x rows,
/// reduced to the image size when larger). Each tile's histogram is clipped
/// at `max(1, clip_limit * tile_area / 256)` and the clipped excess is spread
/// evenly over all bins before the cumulative mapping is built. Every output
/// pixel blends the mappings of its four nearest tile centers bilinearly.
#[instrument(skip(gray), fields(width = gray.width(), height = gray.height()))]
pub fn clahe(gray: &GrayImage, tiles: (u32, u32), clip_limit: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let cols = tiles.0.clamp(1, width);
    let rows = tiles.1.clamp(1, height);
    let grid = TileGrid::new(width, height, cols, rows);

    let luts: Vec<[u8; BINS]> = (0..rows)
        .flat_map(|row| (0..cols).map(move |col| (col, row)))
        .map(|(col, row)| tile_lut(gray, &grid, col, row, clip_limit))
        .collect();
    debug!(cols, rows, clip_limit, "Tile mappings built");

    let tile_w = width as f32 / cols as f32;
    let tile_h = height as f32 / rows as f32;

    // Horizontal neighbours and weights depend on x only.
    let columns: Vec<(usize, usize, f32)> = (0..width)
        .map(|x| neighbours((x as f32 + 0.5) / tile_w - 0.5, cols))
        .collect();

    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        let (r0, r1, fy) = neighbours((y as f32 + 0.5) / tile_h - 0.5, rows);
        for x in 0..width {
            let (c0, c1, fx) = columns[x as usize];
            let v = gray.get_pixel(x, y).0[0] as usize;

            let lut = |r: usize, c: usize| luts[r * cols as usize + c][v] as f32;
            let top = lut(r0, c0) * (1.0 - fx) + lut(r0, c1) * fx;
            let bottom = lut(r1, c0) * (1.0 - fx) + lut(r1, c1) * fx;
            let value = top * (1.0 - fy) + bottom * fy;

            out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// Pixel bounds of every tile. Tile `k` along an axis of length `n` split
/// into `t` parts spans `k * n / t .. (k + 1) * n / t`.
struct TileGrid {
    xs: Vec<u32>,
    ys: Vec<u32>,
}

impl TileGrid {
    fn new(width: u32, height: u32, cols: u32, rows: u32) -> Self {
        let split = |n: u32, t: u32| -> Vec<u32> {
            (0..=t)
                .map(|k| (k as u64 * n as u64 / t as u64) as u32)
                .collect()
        };
        Self {
            xs: split(width, cols),
            ys: split(height, rows),
        }
    }
}

/// Lower tile index, upper tile index and the weight of the upper one for a
/// position measured in tile units from the first tile center.
fn neighbours(pos: f32, count: u32) -> (usize, usize, f32) {
    let last = count as i64 - 1;
    let lo = pos.floor() as i64;
    let frac = pos - pos.floor();
    let a = lo.clamp(0, last) as usize;
    let b = (lo + 1).clamp(0, last) as usize;
    (a, b, frac)
}

fn tile_lut(gray: &GrayImage, grid: &TileGrid, col: u32, row: u32, clip_limit: f32) -> [u8; BINS] {
    let (x0, x1) = (grid.xs[col as usize], grid.xs[col as usize + 1]);
    let (y0, y1) = (grid.ys[row as usize], grid.ys[row as usize + 1]);
    let area = ((x1 - x0) * (y1 - y0)) as usize;

    let mut hist = [0usize; BINS];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y).0[0] as usize] += 1;
        }
    }

    let limit = ((clip_limit * area as f32 / BINS as f32) as usize).max(1);
    clip_histogram(&mut hist, limit);

    let mut lut = [0u8; BINS];
    if area == 0 {
        return lut;
    }
    let scale = 255.0 / area as f32;
    let mut cumulative = 0usize;
    for (entry, count) in lut.iter_mut().zip(hist) {
        cumulative += count;
        *entry = (cumulative as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Cut every bin at `limit` and hand the excess back evenly; the remainder
/// that does not divide evenly goes to bins at a regular stride.
fn clip_histogram(hist: &mut [usize; BINS], limit: usize) {
    let mut excess = 0usize;
    for count in hist.iter_mut() {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }
    if excess == 0 {
        return;
    }

    let per_bin = excess / BINS;
    let mut residual = excess % BINS;
    for count in hist.iter_mut() {
        *count += per_bin;
    }
    if residual > 0 {
        let step = (BINS / residual).max(1);
        let mut i = 0;
        while i < BINS && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}
