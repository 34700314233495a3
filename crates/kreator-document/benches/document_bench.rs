// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the scan pipeline stages in kreator-document,
// run on synthetic page images.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, GrayImage, Luma};

use kreator_core::PipelineConfig;
use kreator_document::{deskew, enhance, rectify};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A white page rotated by `degrees` on a dark background, with a few
/// horizontal text-like bars drawn across it.
fn synthetic_page(width: u32, height: u32, degrees: f32) -> DynamicImage {
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (half_w, half_h) = (width as f32 * 0.4, height as f32 * 0.4);

    let img = GrayImage::from_fn(width, height, |x, y| {
        let (dx, dy) = (x as f32 - cx, y as f32 - cy);
        let u = dx * cos + dy * sin;
        let v = -dx * sin + dy * cos;
        if u.abs() > half_w || v.abs() > half_h {
            return Luma([25u8]);
        }
        let band = ((v + half_h) / 12.0) as i32;
        if band % 3 == 1 && u.abs() < half_w * 0.8 {
            Luma([40u8])
        } else {
            Luma([235u8])
        }
    });
    DynamicImage::ImageLuma8(img)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_rectify(c: &mut Criterion) {
    let config = PipelineConfig::default();
    let page = synthetic_page(400, 300, 5.0);

    c.bench_function("rectify (400x300)", |b| {
        b.iter(|| {
            let result = rectify(black_box(page.clone()), &config);
            black_box(result.map(|r| r.into_image()).ok());
        });
    });
}

fn bench_deskew(c: &mut Criterion) {
    let config = PipelineConfig::default();
    let page = synthetic_page(400, 300, 7.0);

    c.bench_function("deskew (400x300)", |b| {
        b.iter(|| {
            let result = deskew(black_box(page.clone()), &config);
            black_box(result.map(|r| r.skew_degrees).ok());
        });
    });
}

fn bench_enhance(c: &mut Criterion) {
    let config = PipelineConfig::default();
    let crop = synthetic_page(173, 36, 0.0);

    c.bench_function("enhance (173x36)", |b| {
        b.iter(|| {
            black_box(enhance(black_box(&crop), &config).ok());
        });
    });
}

criterion_group!(benches, bench_rectify, bench_deskew, bench_enhance);
criterion_main!(benches);
