// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Kreator.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KreatorError;

/// Fixed crop rectangle in pixel coordinates, `right` and `bottom` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropBox {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Result<Self, KreatorError> {
        if right <= left || bottom <= top {
            return Err(KreatorError::InvalidCropBox(format!(
                "({left}, {top}, {right}, {bottom}) has no area"
            )));
        }
        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}

impl Default for CropBox {
    /// The name field of the order form.
    fn default() -> Self {
        Self {
            left: 152,
            top: 10,
            right: 325,
            bottom: 46,
        }
    }
}

impl std::fmt::Display for CropBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.left, self.top, self.right, self.bottom)
    }
}

impl FromStr for CropBox {
    type Err = KreatorError;

    /// Parse `left,top,right,bottom`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|part| part.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|err| KreatorError::InvalidCropBox(format!("{s:?}: {err}")))?;

        match parts.as_slice() {
            [left, top, right, bottom] => Self::new(*left, *top, *right, *bottom),
            _ => Err(KreatorError::InvalidCropBox(format!(
                "{s:?}: expected four comma-separated values"
            ))),
        }
    }
}

/// Standard paper sizes used for the summary report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }
}

/// Supported input document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    Jpeg,
    Png,
    Tiff,
}

impl DocumentType {
    /// Guess the document type from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_box_parses_four_values() {
        let crop: CropBox = "152, 10,325,46".parse().expect("valid crop box");
        assert_eq!(crop, CropBox::default());
        assert_eq!(crop.width(), 173);
        assert_eq!(crop.height(), 36);
    }

    #[test]
    fn crop_box_rejects_wrong_arity_and_empty_area() {
        assert!("1,2,3".parse::<CropBox>().is_err());
        assert!("10,10,10,20".parse::<CropBox>().is_err());
        assert!("a,b,c,d".parse::<CropBox>().is_err());
    }

    #[test]
    fn crop_box_display_round_trips() {
        let crop = CropBox::new(1, 2, 30, 40).expect("valid");
        assert_eq!(crop.to_string().parse::<CropBox>().expect("parse"), crop);
    }

    #[test]
    fn document_type_from_extension() {
        assert_eq!(DocumentType::from_extension("PDF"), Some(DocumentType::Pdf));
        assert_eq!(DocumentType::from_extension("jpeg"), Some(DocumentType::Jpeg));
        assert_eq!(DocumentType::from_extension("docx"), None);
        assert_eq!(DocumentType::from_extension("TIF"), Some(DocumentType::Tiff));
    }
}
