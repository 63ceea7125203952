//! # Folio CLI
//!
//! Imports a PDF into a fresh canvas scene and writes the scene as JSON.

use std::sync::Arc;

use clap::Parser;
use folio_cli::{CliArgs, CliConfig, ImportSummary};
use folio_core::{Editor, Scene};
use folio_import::{EditorSlot, PdfImporter, PdfiumDecoder, SourceDocument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,folio_import=debug,folio_core=info).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,folio_import=debug,folio_core=info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = CliConfig::from(CliArgs::parse());
    let import_config = config.import_config()?;
    tracing::info!(
        input = %config.input.display(),
        resolution = import_config.resolution,
        dpr = import_config.device.device_pixel_ratio,
        constrained = import_config.device.constrained,
        "Starting import"
    );

    let bytes = std::fs::read(&config.input)
        .map_err(|e| anyhow::anyhow!("{}: {e}", config.input.display()))?;
    let source = SourceDocument::new(config.document_name(), Arc::<[u8]>::from(bytes));

    let decoder = PdfiumDecoder::load(config.pdfium_lib.as_deref())
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    // The editor is mounted by a separate task, as a host UI would.
    let slot = EditorSlot::new();
    let host = slot.clone();
    let (width, height) = config.viewport;
    tokio::spawn(async move {
        host.set(Editor::new(Scene::new(width, height)));
    });

    let mut importer = PdfImporter::new(Box::new(decoder), slot, import_config)?;
    let mut session = match importer.import(&source).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "Import failed");
            anyhow::bail!(e.user_message());
        }
    };

    let summary = ImportSummary::from_session(&session);
    tracing::info!(
        pages = summary.imported_pages,
        failed = summary.failed_pages.len(),
        "Import finished"
    );

    let scene_json = session.editor().scene().to_json()?;
    session.close();

    match &config.output {
        Some(path) => {
            std::fs::write(path, scene_json)
                .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        None => println!("{scene_json}"),
    }
    Ok(())
}
