// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan rectification pipeline — edge/contour extraction, perspective
// rectification, skew correction, photometric enhancement, and the per-page
// orchestrator tying them together.

pub mod clahe;
pub mod deskew;
pub mod edges;
pub mod enhance;
pub mod geometry;
pub mod pipeline;
pub mod rectify;

pub use deskew::{SkewCorrection, SkewEstimate, deskew, estimate_skew};
pub use edges::{Contour, extract_contours, extract_edges};
pub use enhance::{ScanEnhancer, enhance};
pub use geometry::{Quadrilateral, order_corners};
pub use pipeline::{BatchReport, PageOutput, PageReport, ScanPipeline};
pub use rectify::{Rectification, UnchangedReason, rectify};
