/// `load_config` module: reads the YAML export config and applies environment overrides.
///
/// This is the only place where user-supplied YAML is parsed. Secrets (the content
/// service token) and per-machine values are injected from the environment so the
/// file itself can be committed.
///
/// # Environment
/// - `WP_PARSER_JSON_OUTPUT_DIR`: replaces `output_dir`
/// - `WP_PARSER_JSON_VERSION`: replaces `reference.version`
/// - `CONTENT_STORE_TOKEN`: bearer token for an `http` source
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use std::fs;
use std::path::Path;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::config::{ExportConfig, SourceConfig};

pub const OUTPUT_DIR_ENV: &str = "WP_PARSER_JSON_OUTPUT_DIR";
pub const VERSION_ENV: &str = "WP_PARSER_JSON_VERSION";
pub const TOKEN_ENV: &str = "CONTENT_STORE_TOKEN";

/// Loads the YAML config at `path` and merges environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ExportConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let mut config: ExportConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if let Ok(output_dir) = std::env::var(OUTPUT_DIR_ENV) {
        info!(output_dir = %output_dir, "{OUTPUT_DIR_ENV} overrides output_dir");
        config.output_dir = output_dir.into();
    }

    if let Ok(version) = std::env::var(VERSION_ENV) {
        info!(version = %version, "{VERSION_ENV} overrides reference.version");
        config.reference.version = version;
    }

    if let SourceConfig::Http { token, .. } = &mut config.source {
        match std::env::var(TOKEN_ENV) {
            Ok(value) => {
                info!("{TOKEN_ENV} found in env");
                *token = Some(value);
            }
            Err(_) if token.is_none() => {
                warn!("{TOKEN_ENV} not set, querying the content service anonymously");
            }
            Err(_) => {}
        }
    }

    if config.archive.name.trim().is_empty() {
        error!("archive.name is empty");
        anyhow::bail!("archive.name must not be empty");
    }

    config.trace_loaded();
    Ok(config)
}
