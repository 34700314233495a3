// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// kreator-document — Document processing for Kreator.
//
// Provides PDF page rasterization, image helpers (crop, resample, encode), the
// scan rectification pipeline (perspective rectification, deskew, photometric
// enhancement) and the summary report writer.

pub mod image;
pub mod pdf;
pub mod scan;

// Re-export the primary entry points so callers can use `kreator_document::ScanPipeline` etc.
pub use crate::image::processor::ImageProcessor;
pub use crate::pdf::reader::PageRasterizer;
pub use crate::pdf::writer::SummaryReport;
pub use crate::scan::deskew::{SkewCorrection, deskew};
pub use crate::scan::enhance::{ScanEnhancer, enhance};
pub use crate::scan::pipeline::{BatchReport, PageOutput, PageReport, ScanPipeline};
pub use crate::scan::rectify::{Rectification, UnchangedReason, rectify};
