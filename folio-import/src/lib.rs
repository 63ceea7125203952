//! # Folio Import
//!
//! Imports paginated documents into a live Folio canvas and keeps the
//! imported pages consistent while the user edits around them.
//!
//! ## Data Flow
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌────────────────┐
//! │ source bytes │──▶│ ImportPipeline│──▶│  ReadinessGate │
//! └──────────────┘   │ PageRasterizer│   └───────┬────────┘
//!                    └───────────────┘           ▼
//!                                      ┌──────────────────────┐
//!                                      │ DocumentMaterializer │
//!                                      └──────────┬───────────┘
//!                          ┌──────────────────────┴──────────┐
//!                          ▼                                 ▼
//!                 ┌─────────────────┐              ┌────────────────────┐
//!                 │ InvariantEngine │              │ QualityTierManager │
//!                 └─────────────────┘              └────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bitmap;
pub mod config;
pub mod decoder;
pub mod error;
pub mod importer;
pub mod invariants;
pub mod materializer;
pub mod pipeline;
pub mod quality;
pub mod rasterizer;
pub mod readiness;
pub mod surface;

#[cfg(feature = "pdfium")]
pub mod pdfium;

pub use bitmap::{EncodingPolicy, ImageFormat, RasterBlob};
pub use config::ImportConfig;
pub use decoder::{DocumentDecoder, PageHandle, PageSource};
pub use error::{ImportError, PipelineResult};
pub use importer::{ImportSession, PdfImporter};
pub use invariants::{enforce_z_order, CameraPolicy, EngineState, InvariantEngine};
pub use materializer::{DocumentMaterializer, ImportedObjectSet};
pub use pipeline::{ImportPipeline, ImportResult, PageLayout, PageRecord, SourceDocument};
pub use quality::{observe_zoom, tier_for_zoom, QualityConfig, QualityTierManager};
pub use rasterizer::{DevicePolicy, PageRasterizer, RasterizedPage, RenderPlan};
pub use readiness::{await_condition, CollaboratorSlot, EditorSlot, ReadinessGate, RetryPolicy};
pub use surface::{DrawingSurface, SurfaceLease};

#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumDecoder;

/// Folio import version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
