// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Settings resolution: settings file first, command-line overrides on top.

use std::path::Path;

use kreator_core::error::Result;
use kreator_core::{AppConfig, CropBox};
use tracing::{debug, info};

use super::data_dir;

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub crop: Option<CropBox>,
    pub dpi: Option<f32>,
    pub no_rectify: bool,
}

/// Load the effective configuration.
///
/// An explicit `config_path` must exist. Without one, the default settings
/// file is used when present and built-in defaults otherwise.
pub fn resolve(config_path: Option<&Path>, overrides: &Overrides) -> Result<AppConfig> {
    let mut config = match config_path {
        Some(path) => AppConfig::load(path)?,
        None => {
            let default_path = data_dir::default_config_path();
            if default_path.is_file() {
                AppConfig::load(&default_path)?
            } else {
                debug!("No settings file, using defaults");
                AppConfig::default()
            }
        }
    };

    if let Some(crop) = overrides.crop {
        config.crop_box = crop;
    }
    if let Some(dpi) = overrides.dpi {
        config.render_dpi = dpi;
    }
    if overrides.no_rectify {
        config.pipeline.rectify_perspective = false;
    }

    config.validate()?;
    info!(
        crop = %config.crop_box,
        dpi = config.render_dpi,
        rectify = config.pipeline.rectify_perspective,
        "Settings resolved"
    );
    Ok(config)
}
