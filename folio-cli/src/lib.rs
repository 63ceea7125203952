//! # Folio CLI
//!
//! Command-line host for the Folio import engine.
//!
//! Loads a PDF from disk, renders it with PDFium, imports the pages into a
//! fresh canvas scene and writes the resulting scene as JSON.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p folio-cli -- report.pdf --resolution 2 --output scene.json
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `CliConfig` - Resolved paths, viewport and overrides
//! - `ImportSummary` - What gets reported once the import finishes

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::path::{Path, PathBuf};

use clap::Parser;
use folio_import::{DevicePolicy, ImportConfig, ImportError, ImportSession};
use serde::Serialize;
use thiserror::Error;

/// Errors raised while preparing an import from the command line.
#[derive(Debug, Error)]
pub enum CliError {
    /// A file could not be read or written.
    #[error("{path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file or an override is invalid.
    #[error(transparent)]
    Config(#[from] ImportError),
}

/// Command-line arguments for folio-cli.
#[derive(Debug, Clone, Parser)]
#[command(name = "folio-cli")]
#[command(about = "Import a PDF into a Folio canvas scene")]
#[command(version)]
pub struct CliArgs {
    /// PDF file to import
    pub input: PathBuf,

    /// Resolution multiplier (0.5 to 10)
    #[arg(long, env = "FOLIO_RESOLUTION")]
    pub resolution: Option<f32>,

    /// Device pixel ratio of the target display
    #[arg(long, env = "FOLIO_DPR")]
    pub dpr: Option<f32>,

    /// Treat the device as memory constrained
    #[arg(long)]
    pub constrained: bool,

    /// Viewport width in pixels
    #[arg(long, default_value = "1280")]
    pub viewport_width: f32,

    /// Viewport height in pixels
    #[arg(long, default_value = "800")]
    pub viewport_height: f32,

    /// Where to write the scene JSON (stdout when omitted)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Path to the PDFium shared library
    #[arg(long, env = "PDFIUM_DYNAMIC_LIB_PATH")]
    pub pdfium_lib: Option<PathBuf>,

    /// JSON file with import settings
    #[arg(long, env = "FOLIO_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Resolved command-line configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    /// PDF file to import.
    pub input: PathBuf,
    /// Scene JSON destination; stdout when `None`.
    pub output: Option<PathBuf>,
    /// Viewport `(width, height)` in pixels.
    pub viewport: (f32, f32),
    /// PDFium library override.
    pub pdfium_lib: Option<PathBuf>,
    /// Settings file.
    pub config_path: Option<PathBuf>,
    /// Resolution override.
    pub resolution: Option<f32>,
    /// Device pixel ratio override.
    pub device_pixel_ratio: Option<f32>,
    /// Force the constrained device profile.
    pub constrained: bool,
}

impl From<CliArgs> for CliConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            input: args.input,
            output: args.output,
            viewport: (args.viewport_width, args.viewport_height),
            pdfium_lib: args.pdfium_lib,
            config_path: args.config,
            resolution: args.resolution,
            device_pixel_ratio: args.dpr,
            constrained: args.constrained,
        }
    }
}

impl CliConfig {
    /// Build the import settings: the settings file (if any), then the
    /// command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be read or a value is out
    /// of range.
    pub fn import_config(&self) -> Result<ImportConfig, CliError> {
        let base = match &self.config_path {
            Some(path) => ImportConfig::from_json(&read_to_string(path)?)?,
            None => ImportConfig::default(),
        };
        let config = self.apply_overrides(base);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, mut config: ImportConfig) -> ImportConfig {
        if let Some(resolution) = self.resolution {
            config.resolution = resolution;
        }
        let dpr = self
            .device_pixel_ratio
            .unwrap_or(config.device.device_pixel_ratio);
        let detected = DevicePolicy::from_viewport_width(self.viewport.0, dpr);
        config.device = DevicePolicy {
            device_pixel_ratio: dpr,
            constrained: self.constrained || config.device.constrained || detected.constrained,
        };
        config
    }

    /// Display name of the input document.
    #[must_use]
    pub fn document_name(&self) -> String {
        self.input.file_name().map_or_else(
            || self.input.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
    }
}

/// Read a file, tagging errors with the path.
///
/// # Errors
///
/// Returns [`CliError::Io`] if the file cannot be read.
pub fn read_to_string(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Outcome of one command-line import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    /// Document name.
    pub name: String,
    /// Pages placed on the canvas.
    pub imported_pages: usize,
    /// 1-based numbers of pages that failed to render.
    pub failed_pages: Vec<u32>,
    /// Combined page bounds `[x, y, width, height]`.
    pub bounds: Option<[f32; 4]>,
}

impl ImportSummary {
    /// Summarize an open session.
    #[must_use]
    pub fn from_session(session: &ImportSession) -> Self {
        let result = session.result();
        Self {
            name: result.map(|r| r.name.clone()).unwrap_or_default(),
            imported_pages: session.objects().len(),
            failed_pages: result.map(|r| r.failed_pages.clone()).unwrap_or_default(),
            bounds: result
                .and_then(folio_import::ImportResult::bounds)
                .map(|b| [b.x, b.y, b.width, b.height]),
        }
    }
}
