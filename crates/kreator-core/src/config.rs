// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application and pipeline configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{KreatorError, Result};
use crate::{CropBox, PaperSize};

/// Tuning knobs for the rectification pipeline.
///
/// Every threshold used by edge detection, quadrilateral search, skew voting
/// and photometric enhancement lives here. The defaults are tuned for
/// 72 dpi renders of scanned order forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Canny low hysteresis threshold (default 50).
    pub edge_low: f32,
    /// Canny high hysteresis threshold (default 150).
    pub edge_high: f32,
    /// Side length of the square Gaussian smoothing kernel (default 5).
    pub blur_kernel: u32,
    /// Dilation radius applied to the edge map before contour tracing
    /// (default 0). Closes breaks in a faint outline but grows the traced
    /// outline by the same radius on every side.
    pub contour_dilation: u8,
    /// Douglas–Peucker tolerance as a fraction of the contour perimeter
    /// (default 0.02).
    pub polygon_epsilon_fraction: f32,
    /// Minimum Hough accumulator votes for a line (default 200).
    pub line_vote_threshold: u32,
    /// Non-maximum suppression radius in the Hough accumulator (default 0).
    pub line_suppression_radius: u32,
    /// Fold line angles into (-45°, 45°] before taking the median skew, so
    /// vertical rules vote like text lines (default false: the median of
    /// the raw `theta - 90°` values).
    pub fold_vertical_lines: bool,
    /// CLAHE tile grid as (columns, rows) (default 8×8).
    pub clahe_tiles: (u32, u32),
    /// CLAHE clip limit (default 2.0).
    pub clahe_clip_limit: f32,
    /// Global contrast gain around the mean (default 3.0).
    pub contrast_gain: f32,
    /// Global brightness scale (default 0.6).
    pub brightness_scale: f32,
    /// Run the perspective rectifier before deskewing (default true).
    pub rectify_perspective: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            edge_low: 50.0,
            edge_high: 150.0,
            blur_kernel: 5,
            contour_dilation: 0,
            polygon_epsilon_fraction: 0.02,
            line_vote_threshold: 200,
            line_suppression_radius: 0,
            fold_vertical_lines: false,
            clahe_tiles: (8, 8),
            clahe_clip_limit: 2.0,
            contrast_gain: 3.0,
            brightness_scale: 0.6,
            rectify_perspective: true,
        }
    }
}

impl PipelineConfig {
    /// Gaussian sigma matching `blur_kernel`, using the usual
    /// `0.3 * ((k - 1) / 2 - 1) + 0.8` rule.
    pub fn blur_sigma(&self) -> f32 {
        let k = self.blur_kernel.max(1) as f32;
        0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8
    }

    /// Reject values that would make a stage meaningless.
    pub fn validate(&self) -> Result<()> {
        if !(self.edge_low >= 0.0 && self.edge_low <= self.edge_high) {
            return Err(KreatorError::Config(format!(
                "edge thresholds must satisfy 0 <= low <= high (low {}, high {})",
                self.edge_low, self.edge_high
            )));
        }
        if self.blur_kernel % 2 == 0 {
            return Err(KreatorError::Config(format!(
                "blur kernel must be odd, got {}",
                self.blur_kernel
            )));
        }
        if !(self.polygon_epsilon_fraction > 0.0 && self.polygon_epsilon_fraction < 1.0) {
            return Err(KreatorError::Config(format!(
                "polygon tolerance fraction must be in (0, 1), got {}",
                self.polygon_epsilon_fraction
            )));
        }
        if self.clahe_tiles.0 == 0 || self.clahe_tiles.1 == 0 {
            return Err(KreatorError::Config("CLAHE tile grid must be non-empty".into()));
        }
        if self.clahe_clip_limit <= 0.0 {
            return Err(KreatorError::Config(format!(
                "CLAHE clip limit must be positive, got {}",
                self.clahe_clip_limit
            )));
        }
        if self.contrast_gain < 0.0 || self.brightness_scale < 0.0 {
            return Err(KreatorError::Config(
                "contrast gain and brightness scale must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Labels and layout of the summary report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Title spanning the whole first row.
    pub title: String,
    /// Header of the row-number column.
    pub number_header: String,
    /// Header of the column holding the name crops.
    pub image_header: String,
    /// Header of the amount column (left empty for manual entry).
    pub amount_header: String,
    /// Label of the closing total row.
    pub total_label: String,
    pub paper_size: PaperSize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "School".into(),
            number_header: "No.".into(),
            image_header: "Class".into(),
            amount_header: "Amount".into(),
            total_label: "TOTAL".into(),
            paper_size: PaperSize::A4,
        }
    }
}

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    /// Region cropped out of every normalized page.
    pub crop_box: CropBox,
    /// Resolution pages are rasterized at (72 = one pixel per PDF point).
    pub render_dpi: f32,
    pub report: ReportConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            crop_box: CropBox::default(),
            render_dpi: 72.0,
            report: ReportConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load settings from a JSON file. Absent fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Write settings as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        debug!(path = %path.as_ref().display(), "Configuration saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        if !(self.render_dpi.is_finite() && self.render_dpi > 0.0) {
            return Err(KreatorError::Config(format!(
                "render dpi must be positive, got {}",
                self.render_dpi
            )));
        }
        if self.crop_box.width() == 0 || self.crop_box.height() == 0 {
            return Err(KreatorError::InvalidCropBox(format!(
                "({}) has no area",
                self.crop_box
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.edge_low, 50.0);
        assert_eq!(cfg.edge_high, 150.0);
        assert_eq!(cfg.blur_kernel, 5);
        assert_eq!(cfg.polygon_epsilon_fraction, 0.02);
        assert_eq!(cfg.line_vote_threshold, 200);
        assert_eq!(cfg.contour_dilation, 0);
        assert!(!cfg.fold_vertical_lines);
        assert_eq!(cfg.clahe_tiles, (8, 8));
        assert_eq!(cfg.clahe_clip_limit, 2.0);
        assert_eq!(cfg.contrast_gain, 3.0);
        assert_eq!(cfg.brightness_scale, 0.6);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn blur_sigma_for_5x5_kernel() {
        let cfg = PipelineConfig::default();
        assert!((cfg.blur_sigma() - 1.1).abs() < 1e-6);
    }

    #[test]
    fn validate_rejects_inverted_thresholds() {
        let cfg = PipelineConfig {
            edge_low: 200.0,
            edge_high: 100.0,
            ..PipelineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(KreatorError::Config(_))));
    }

    #[test]
    fn validate_rejects_even_kernel_and_empty_grid() {
        let even = PipelineConfig {
            blur_kernel: 4,
            ..PipelineConfig::default()
        };
        assert!(even.validate().is_err());

        let no_tiles = PipelineConfig {
            clahe_tiles: (0, 8),
            ..PipelineConfig::default()
        };
        assert!(no_tiles.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{ "pipeline": { "edge_low": 30.0 }, "render_dpi": 144.0 }"#)
                .expect("partial config parses");
        assert_eq!(cfg.pipeline.edge_low, 30.0);
        assert_eq!(cfg.pipeline.edge_high, 150.0);
        assert_eq!(cfg.render_dpi, 144.0);
        assert_eq!(cfg.crop_box, CropBox::default());
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("kreator.json");

        let mut cfg = AppConfig::default();
        cfg.pipeline.rectify_perspective = false;
        cfg.report.title = "Szkoła".into();
        cfg.save(&path).expect("save");

        let loaded = AppConfig::load(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "render_dpi": 0.0 }"#).expect("write");
        assert!(matches!(AppConfig::load(&path), Err(KreatorError::Config(_))));
    }
}
