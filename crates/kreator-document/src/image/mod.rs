// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — raster validation, crop, and geometric resampling.

pub mod processor;
pub mod resample;

pub use processor::{ImageProcessor, into_raster, save_images_as_png};
pub use resample::{RotationTransform, warp_affine};
