// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page loading — expands the input list into page rasters in order.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use kreator_core::DocumentType;
use kreator_core::error::KreatorError;
use kreator_document::{ImageProcessor, PageRasterizer};
use tracing::{info, warn};

/// Classify an input by extension. Anything that is not a PDF is handed to
/// the image decoder, which reports unknown formats itself.
pub fn document_type(path: &Path) -> DocumentType {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(DocumentType::from_extension)
        .unwrap_or(DocumentType::Png)
}

/// Rasterize every input in the order given. A PDF contributes one entry per
/// page, an image file one entry. Inputs that cannot be opened at all
/// contribute a single failed entry so the rest of the batch still runs.
pub fn load_pages(inputs: &[PathBuf], dpi: f32) -> Vec<Result<DynamicImage, KreatorError>> {
    let mut pages = Vec::new();
    for input in inputs {
        match document_type(input) {
            DocumentType::Pdf => match PageRasterizer::open(input, dpi) {
                Ok(rasterizer) => {
                    info!(path = %input.display(), pages = rasterizer.page_count(), "Loaded PDF");
                    pages.extend(rasterizer.render_all());
                }
                Err(err) => {
                    warn!(path = %input.display(), error = %err, "Could not open PDF");
                    pages.push(Err(err));
                }
            },
            _ => {
                pages.push(ImageProcessor::open(input).map(ImageProcessor::into_dynamic));
            }
        }
    }
    pages
}

/// Report path used when `-o` is not given: `<first input stem>-summary.pdf`
/// next to the first input.
pub fn default_output(inputs: &[PathBuf]) -> PathBuf {
    let Some(first) = inputs.first() else {
        return PathBuf::from("summary.pdf");
    };
    let stem = first
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("summary");
    first.with_file_name(format!("{stem}-summary.pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn pdf_extension_is_case_insensitive() {
        assert_eq!(document_type(Path::new("forms.PDF")), DocumentType::Pdf);
        assert_eq!(document_type(Path::new("a/b/forms.pdf")), DocumentType::Pdf);
        assert_eq!(document_type(Path::new("page.jpg")), DocumentType::Jpeg);
        assert_eq!(document_type(Path::new("noext")), DocumentType::Png);
    }

    #[test]
    fn default_output_does_not_overwrite_the_input() {
        let out = default_output(&[PathBuf::from("scans/orders.pdf")]);
        assert_eq!(out, PathBuf::from("scans/orders-summary.pdf"));
        assert_eq!(default_output(&[]), PathBuf::from("summary.pdf"));
    }

    #[test]
    fn image_inputs_load_one_page_each() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("one.png");
        let second = dir.path().join("two.png");
        GrayImage::from_pixel(20, 10, Luma([200u8])).save(&first).expect("save");
        GrayImage::from_pixel(30, 15, Luma([100u8])).save(&second).expect("save");

        let pages = load_pages(&[first, second], 72.0);
        assert_eq!(pages.len(), 2);
        let widths: Vec<u32> = pages
            .iter()
            .map(|p| p.as_ref().map(|img| img.width()).unwrap_or(0))
            .collect();
        assert_eq!(widths, vec![20, 30]);
    }

    #[test]
    fn missing_inputs_become_failed_pages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pages = load_pages(
            &[dir.path().join("absent.pdf"), dir.path().join("absent.png")],
            72.0,
        );
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.is_err()));
    }
}
