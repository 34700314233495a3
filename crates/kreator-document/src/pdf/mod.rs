// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — page rasterization of scanned documents and the summary
// report writer.

pub mod reader;
pub mod writer;

pub use reader::PageRasterizer;
pub use writer::SummaryReport;
