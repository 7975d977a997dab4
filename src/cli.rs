///
/// This module implements the CLI interface for wp-parser-json: command parsing,
/// wiring of the configured collaborators, and user-visible output.
///
/// All export logic lives in the library modules; this module is strictly glue.
///
/// ## How To Use
/// - For command-line users: `wp-parser-json generate --config export.yaml [--type=a,b]`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// ## Exit behaviour
/// - Success prints `Success: JSON files generated` followed by per-kind statistics.
/// - Requested kinds that do not exist print one `Warning:` line each and the run
///   ends with an error, even though the remaining files were generated.
/// - Fatal errors (no filesystem access, write or archive failures) end the run
///   with a single error.
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::archive::ZipArchiver;
use crate::config::{ExportConfig, SourceConfig};
use crate::contract::RecordSource;
use crate::export::{export, ExportReport};
use crate::load_config::load_config;
use crate::reference::kinds_for;
use crate::source::{HttpRecordSource, JsonRecordSource};
use crate::store::LocalGate;

/// CLI for wp-parser-json: export reference content as paginated JSON files.
#[derive(Parser)]
#[clap(
    name = "wp-parser-json",
    version,
    about = "Export documentation reference content into paginated JSON files and a zip archive"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate the JSON files and the zip archive
    Generate {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Comma separated post types to generate JSON files for
        #[clap(long = "type", value_name = "TYPES")]
        types: Option<String>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Generate { config, types } => {
            let config = load_config(config)?;
            println!("Generating JSON files...");

            match &config.source {
                SourceConfig::File { path } => {
                    let source = JsonRecordSource::from_path(path)
                        .map_err(|e| anyhow::anyhow!("Failed to load record dump {:?}: {e}", path))?;
                    generate(&config, &source, types.as_deref()).await
                }
                SourceConfig::Http { base_url, token } => {
                    let source = HttpRecordSource::new(base_url.as_str(), token.clone());
                    generate(&config, &source, types.as_deref()).await
                }
            }
        }
    }
}

async fn generate<S>(config: &ExportConfig, source: &S, types: Option<&str>) -> Result<()>
where
    S: RecordSource,
{
    let kinds = kinds_for(types, source)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to query content types: {e}"))?;
    tracing::info!(command = "generate", kinds = kinds.len(), "Starting export");

    let archiver = ZipArchiver::from_config(&config.archive)
        .map_err(|e| anyhow::anyhow!("Invalid archive variable pattern: {e}"))?;
    let gate = LocalGate::new(config.output_dir.clone());

    match export(config, source, &archiver, &gate, &kinds).await {
        Ok(report) => {
            print_report(&report);
            if report.is_complete() {
                tracing::info!(command = "generate", "Export complete");
                Ok(())
            } else {
                tracing::error!(command = "generate", "Export incomplete");
                Err(anyhow::anyhow!("Not all JSON files are created"))
            }
        }
        Err(e) => {
            tracing::error!(command = "generate", error = %e, "Export failed");
            Err(anyhow::Error::new(e))
        }
    }
}

fn print_report(report: &ExportReport) {
    for warning in &report.warnings {
        eprintln!("Warning: {warning}");
    }
    for kind in &report.kinds {
        println!("{}: {} ({} files)", kind.label, kind.stats, kind.files.len());
    }
    if report.is_complete() {
        println!("Success: JSON files generated in {}", report.output_dir.display());
    }
    println!("Archive: {}", report.archive.display());
}
