// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Kreator — scanned order-form rectification and summary report builder
//
// Entry point. Initialises logging, resolves settings, runs every page
// through the scan pipeline and writes the summary report.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use kreator_core::human_errors::humanize_error;
use kreator_core::{CropBox, KreatorError};
use kreator_document::image::save_images_as_png;
use kreator_document::{BatchReport, PageReport, ScanPipeline, SummaryReport};
use tracing::{error, info, warn};

use services::pages::{default_output, load_pages};
use services::settings::{Overrides, resolve};

/// Straighten scanned order forms, crop the name field of every page and
/// collect the crops into a printable summary table.
#[derive(Debug, Parser)]
#[command(name = "kreator", version)]
struct Args {
    /// A scanned PDF or page images (JPEG, PNG, TIFF), processed in order
    #[arg(required_unless_present = "save_config")]
    inputs: Vec<PathBuf>,

    /// Summary report path (default: <first input>-summary.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Settings file (JSON); defaults to the one in the data directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name-field rectangle as left,top,right,bottom in page pixels
    #[arg(long)]
    crop: Option<CropBox>,

    /// Skip perspective rectification and only deskew
    #[arg(long)]
    no_rectify: bool,

    /// Also save every enhanced crop as page_NNN.png in this directory
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Resolution PDF pages are rasterized at
    #[arg(long)]
    dpi: Option<f32>,

    /// Print the per-page reports as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Write the effective settings to this file and exit
    #[arg(long)]
    save_config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            crop: self.crop,
            dpi: self.dpi,
            no_rectify: self.no_rectify,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(Outcome::NothingProcessed) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

/// How a run ended when no fatal error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    SettingsSaved,
    ReportWritten,
    /// Every page failed; no report was written.
    NothingProcessed,
}

fn run(args: &Args) -> Result<Outcome, KreatorError> {
    let config = resolve(args.config.as_deref(), &args.overrides())?;

    if let Some(path) = &args.save_config {
        config.save(path)?;
        info!(path = %path.display(), "Settings written");
        return Ok(Outcome::SettingsSaved);
    }

    info!(inputs = args.inputs.len(), "Kreator starting");
    let pipeline = ScanPipeline::new(config.pipeline.clone())?.with_crop(Some(config.crop_box));
    let batch = pipeline.process_batch(load_pages(&args.inputs, config.render_dpi));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&batch)?);
    } else {
        print_summary(&batch);
    }

    let crops = batch.crops();
    if crops.is_empty() {
        error!(failed = batch.failed_count(), "No page could be processed");
        return Ok(Outcome::NothingProcessed);
    }

    if let Some(dir) = &args.dump_dir {
        if let Err(err) = save_images_as_png(&crops, dir) {
            warn!(error = %err, "Could not save crops");
            report_error(&err);
        }
    }

    let output = args.output.clone().unwrap_or_else(|| default_output(&args.inputs));
    SummaryReport::new(config.report.clone()).write_to_file(&crops, &output)?;

    info!(
        processed = batch.processed_count(),
        failed = batch.failed_count(),
        output = %output.display(),
        "Done"
    );
    Ok(Outcome::ReportWritten)
}

/// One line per page on stdout; failures go to stderr in plain language.
fn print_summary(batch: &BatchReport) {
    for report in &batch.pages {
        match report {
            PageReport::Processed(out) => {
                let rectified = if out.is_rectified() {
                    "rectified".to_string()
                } else if let Some(reason) = &out.unchanged_reason {
                    format!("not rectified ({reason})")
                } else {
                    "rectification off".to_string()
                };
                println!(
                    "page {:>3}: {}, skew {:+.2}°, crop {}x{}",
                    out.page, rectified, out.skew_degrees, out.width, out.height
                );
            }
            PageReport::Failed { page, error } => {
                let human = humanize_error(error);
                eprintln!("page {page:>3}: skipped. {}", human.message);
                eprintln!("          {}", human.suggestion);
            }
        }
    }
    println!(
        "{} of {} pages processed",
        batch.processed_count(),
        batch.pages.len()
    );
}

fn report_error(err: &KreatorError) {
    let human = humanize_error(err);
    error!(error = %err, severity = ?human.severity, "{}", human.message);
    eprintln!("{}", human.message);
    eprintln!("{}", human.suggestion);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_crop_and_flags() {
        let args = Args::try_parse_from([
            "kreator",
            "forms.pdf",
            "--crop",
            "10,20,110,60",
            "--no-rectify",
            "--dpi",
            "144",
            "-o",
            "out.pdf",
        ])
        .expect("valid arguments");

        assert_eq!(args.inputs, vec![PathBuf::from("forms.pdf")]);
        assert_eq!(args.output, Some(PathBuf::from("out.pdf")));
        let overrides = args.overrides();
        assert_eq!(overrides.crop, Some(CropBox::new(10, 20, 110, 60).expect("valid crop")));
        assert_eq!(overrides.dpi, Some(144.0));
        assert!(overrides.no_rectify);
    }

    #[test]
    fn rejects_malformed_crop() {
        assert!(Args::try_parse_from(["kreator", "a.pdf", "--crop", "1,2,3"]).is_err());
    }

    #[test]
    fn inputs_required_unless_saving_settings() {
        assert!(Args::try_parse_from(["kreator"]).is_err());
        assert!(Args::try_parse_from(["kreator", "--save-config", "settings.json"]).is_ok());
    }

    /// Horizontal bars on white, a page the deskewer leaves level.
    fn form_page() -> image::GrayImage {
        image::GrayImage::from_fn(400, 300, |_, y| {
            if y % 40 < 4 { image::Luma([20u8]) } else { image::Luma([235u8]) }
        })
    }

    fn argv(parts: &[&std::ffi::OsStr]) -> Vec<std::ffi::OsString> {
        parts.iter().map(|p| p.to_os_string()).collect()
    }

    #[test]
    fn run_writes_report_and_skips_unreadable_pages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let page = dir.path().join("page.png");
        form_page().save(&page).expect("save page");
        let missing = dir.path().join("missing.png");
        let output = dir.path().join("report.pdf");
        let settings = dir.path().join("settings.json");
        kreator_core::AppConfig::default().save(&settings).expect("save settings");

        let args = Args::try_parse_from(argv(&[
            "kreator".as_ref(),
            page.as_os_str(),
            missing.as_os_str(),
            "--no-rectify".as_ref(),
            "--config".as_ref(),
            settings.as_os_str(),
            "-o".as_ref(),
            output.as_os_str(),
        ]))
        .expect("valid arguments");

        assert_eq!(run(&args).expect("run"), Outcome::ReportWritten);
        let written = std::fs::read(&output).expect("report written");
        assert!(written.starts_with(b"%PDF"));
    }

    #[test]
    fn run_without_any_good_page_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.png");
        let output = dir.path().join("report.pdf");
        let settings = dir.path().join("settings.json");
        kreator_core::AppConfig::default().save(&settings).expect("save settings");

        let args = Args::try_parse_from(argv(&[
            "kreator".as_ref(),
            missing.as_os_str(),
            "--config".as_ref(),
            settings.as_os_str(),
            "-o".as_ref(),
            output.as_os_str(),
        ]))
        .expect("valid arguments");

        assert_eq!(run(&args).expect("run"), Outcome::NothingProcessed);
        assert!(!output.exists());
    }

    #[test]
    fn save_config_writes_effective_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("source.json");
        let target = dir.path().join("target.json");
        kreator_core::AppConfig::default().save(&source).expect("save settings");

        let args = Args::try_parse_from(argv(&[
            "kreator".as_ref(),
            "--config".as_ref(),
            source.as_os_str(),
            "--dpi".as_ref(),
            "200".as_ref(),
            "--save-config".as_ref(),
            target.as_os_str(),
        ]))
        .expect("valid arguments");

        assert_eq!(run(&args).expect("run"), Outcome::SettingsSaved);
        let saved = kreator_core::AppConfig::load(&target).expect("load");
        assert_eq!(saved.render_dpi, 200.0);
    }
}
