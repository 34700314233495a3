// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the people running the summary tool.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity decides whether the CLI keeps going with the remaining pages.

use crate::error::KreatorError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Only this page is affected; the rest of the batch continues.
    PageSkipped,
    /// User must fix something (path, config, crop box) and run again.
    ActionRequired,
    /// The input cannot be processed at all.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `KreatorError` into a `HumanError`.
pub fn humanize_error(err: &KreatorError) -> HumanError {
    match err {
        // -- Image errors --
        KreatorError::MalformedImage(detail) => HumanError {
            message: "This page image is empty or damaged.".into(),
            suggestion: format!("The page was skipped. Check the scan of that page. ({detail})"),
            severity: Severity::PageSkipped,
        },

        KreatorError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first.".into(),
            severity: Severity::PageSkipped,
        },

        KreatorError::InvalidCropBox(detail) => HumanError {
            message: "The name-field rectangle doesn't fit.".into(),
            suggestion: format!("Use --crop left,top,right,bottom with right > left and bottom > top, inside the page. ({detail})"),
            severity: Severity::ActionRequired,
        },

        // -- Document errors --
        KreatorError::UnsupportedDocument(detail) => HumanError {
            message: "This type of document isn't supported.".into(),
            suggestion: format!("Use a scanned PDF or JPEG/PNG/TIFF page images. (File type: {detail})"),
            severity: Severity::Permanent,
        },

        KreatorError::PdfError(_) => HumanError {
            message: "There's a problem with this PDF file.".into(),
            suggestion: "The file may be damaged. Try opening it in a PDF viewer first, or scan the forms again.".into(),
            severity: Severity::Permanent,
        },

        KreatorError::NoPageImage { page } => HumanError {
            message: format!("Page {page} doesn't contain a scanned image."),
            suggestion: "Only scanned PDFs are supported. The page was skipped.".into(),
            severity: Severity::PageSkipped,
        },

        KreatorError::Report(_) => HumanError {
            message: "The summary report couldn't be created.".into(),
            suggestion: "Try a different output location.".into(),
            severity: Severity::Permanent,
        },

        // -- Configuration --
        KreatorError::Config(detail) => HumanError {
            message: "The settings file has an invalid value.".into(),
            suggestion: format!("Fix the setting or delete it to use the default. ({detail})"),
            severity: Severity::ActionRequired,
        },

        // -- Storage --
        KreatorError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Check the path and try again.".into(),
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "Permission denied.".into(),
                    suggestion: "Choose a file or folder you're allowed to read and write.".into(),
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, the disk may be full.".into(),
                    severity: Severity::Permanent,
                }
            }
        }

        KreatorError::Serialization(_) => HumanError {
            message: "The settings file couldn't be read.".into(),
            suggestion: "Check that it is valid JSON.".into(),
            severity: Severity::ActionRequired,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_image_only_skips_the_page() {
        let human = humanize_error(&KreatorError::MalformedImage("0x0".into()));
        assert_eq!(human.severity, Severity::PageSkipped);
        assert!(human.suggestion.contains("0x0"));
    }

    #[test]
    fn missing_page_image_names_the_page() {
        let human = humanize_error(&KreatorError::NoPageImage { page: 7 });
        assert!(human.message.contains('7'));
        assert_eq!(human.severity, Severity::PageSkipped);
    }

    #[test]
    fn missing_file_is_action_required() {
        let err = KreatorError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }

    #[test]
    fn unsupported_format_is_permanent() {
        let err = KreatorError::UnsupportedDocument("docx".into());
        assert_eq!(humanize_error(&err).severity, Severity::Permanent);
    }
}
