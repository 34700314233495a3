// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-page orchestration: rectify → deskew → crop → enhance.
//
// Pages are independent. A page that fails is recorded and the batch moves
// on to the next one.

use image::{DynamicImage, GrayImage};
use kreator_core::error::KreatorError;
use kreator_core::{CropBox, PipelineConfig};
use serde::{Serialize, Serializer};
use tracing::{info, instrument, warn};

use super::deskew::deskew;
use super::enhance::enhance;
use super::geometry::Quadrilateral;
use super::rectify::{Rectification, UnchangedReason, rectify};
use crate::image::ImageProcessor;

/// A page that went through every stage.
#[derive(Debug, Clone, Serialize)]
pub struct PageOutput {
    /// 1-based page number.
    pub page: u32,
    /// Corners of the detected outline, if the page was rectified.
    pub quad: Option<Quadrilateral>,
    /// Why rectification left the page alone. `None` both when it was
    /// rectified and when rectification is switched off.
    #[serde(flatten)]
    pub unchanged_reason: Option<UnchangedReason>,
    pub skew_degrees: f32,
    pub line_count: usize,
    pub width: u32,
    pub height: u32,
    /// The enhanced crop.
    #[serde(skip)]
    pub image: GrayImage,
}

impl PageOutput {
    pub fn is_rectified(&self) -> bool {
        self.quad.is_some()
    }
}

/// Outcome of one page in a batch.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageReport {
    Processed(PageOutput),
    Failed {
        page: u32,
        #[serde(serialize_with = "serialize_display")]
        error: KreatorError,
    },
}

impl PageReport {
    pub fn page(&self) -> u32 {
        match self {
            Self::Processed(output) => output.page,
            Self::Failed { page, .. } => *page,
        }
    }

    pub fn output(&self) -> Option<&PageOutput> {
        match self {
            Self::Processed(output) => Some(output),
            Self::Failed { .. } => None,
        }
    }
}

fn serialize_display<S: Serializer>(err: &KreatorError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(err)
}

/// All page reports of a run, in page order.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub pages: Vec<PageReport>,
}

impl BatchReport {
    pub fn processed_count(&self) -> usize {
        self.pages.iter().filter(|r| r.output().is_some()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.pages.len() - self.processed_count()
    }

    /// `(page, crop)` for every successful page, cloned for the report writer.
    pub fn crops(&self) -> Vec<(u32, GrayImage)> {
        self.pages
            .iter()
            .filter_map(PageReport::output)
            .map(|out| (out.page, out.image.clone()))
            .collect()
    }
}

/// Runs the rectification stages over one page at a time.
#[derive(Debug, Clone)]
pub struct ScanPipeline {
    config: PipelineConfig,
    crop: Option<CropBox>,
}

impl ScanPipeline {
    /// Build a pipeline; rejects an invalid configuration up front.
    pub fn new(config: PipelineConfig) -> Result<Self, KreatorError> {
        config.validate()?;
        Ok(Self { config, crop: None })
    }

    /// Region to cut out of every page after deskewing. `None` keeps the
    /// whole page.
    pub fn with_crop(mut self, crop: Option<CropBox>) -> Self {
        self.crop = crop;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage on one page.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn process_page(&self, page: u32, image: DynamicImage) -> Result<PageOutput, KreatorError> {
        let (image, quad, unchanged_reason) = if self.config.rectify_perspective {
            match rectify(image, &self.config)? {
                Rectification::Rectified { image, quad } => (image, Some(quad), None),
                Rectification::Unchanged { image, reason } => (image, None, Some(reason)),
            }
        } else {
            (image, None, None)
        };

        let leveled = deskew(image, &self.config)?;
        let (skew_degrees, line_count) = (leveled.skew_degrees, leveled.line_count);

        let region = match self.crop {
            Some(crop) => ImageProcessor::from_dynamic(leveled.image)
                .crop_box(crop)?
                .into_dynamic(),
            None => leveled.image,
        };

        let image = enhance(&region, &self.config)?;
        info!(
            page,
            rectified = quad.is_some(),
            skew_degrees,
            "Page processed"
        );

        Ok(PageOutput {
            page,
            quad,
            unchanged_reason,
            skew_degrees,
            line_count,
            width: image.width(),
            height: image.height(),
            image,
        })
    }

    /// Process pages in order, numbering them from 1. A page that could not
    /// be loaded or processed becomes [`PageReport::Failed`] and the rest
    /// still run.
    #[instrument(skip_all)]
    pub fn process_batch<I>(&self, pages: I) -> BatchReport
    where
        I: IntoIterator<Item = Result<DynamicImage, KreatorError>>,
    {
        let mut report = BatchReport::default();
        for (index, loaded) in pages.into_iter().enumerate() {
            let page = index as u32 + 1;
            let outcome = loaded.and_then(|image| self.process_page(page, image));
            match outcome {
                Ok(output) => report.pages.push(PageReport::Processed(output)),
                Err(error) => {
                    warn!(page, %error, "Page skipped");
                    report.pages.push(PageReport::Failed { page, error });
                }
            }
        }
        info!(
            processed = report.processed_count(),
            failed = report.failed_count(),
            "Batch complete"
        );
        report
    }
}
