// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Kreator.

use thiserror::Error;

/// Top-level error type for all Kreator operations.
///
/// Detection failures inside the rectification pipeline are not errors; they
/// surface as tagged stage results. Everything here is fatal for the page (or
/// the file) it was raised on.
#[derive(Debug, Error)]
pub enum KreatorError {
    // -- Image errors --
    #[error("malformed image: {0}")]
    MalformedImage(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("invalid crop box: {0}")]
    InvalidCropBox(String),

    // -- Document errors --
    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("page {page} has no decodable raster image")]
    NoPageImage { page: u32 },

    #[error("report generation failed: {0}")]
    Report(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, KreatorError>;
