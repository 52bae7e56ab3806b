//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};

use super::defaults::{config_file_names, STREAM_OUTPUT_ENV};
use super::types::WorkspaceConfig;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<WorkspaceConfig> {
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => "TOML",
        Some("json") => "JSON",
        _ => "YAML",
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let mut config: WorkspaceConfig = match format {
        "TOML" => toml::from_str(&content).map_err(ConfigError::TomlError)?,
        "JSON" => serde_json::from_str(&content).map_err(ConfigError::JsonError)?,
        _ => serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?,
    };

    apply_env_overrides(&mut config, std::env::var(STREAM_OUTPUT_ENV).ok().as_deref());
    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Apply environment overrides to a loaded configuration.
///
/// Only the literal value `true` of the stream-output variable enables
/// streaming; anything else leaves the configured value untouched.
pub fn apply_env_overrides(config: &mut WorkspaceConfig, stream_output: Option<&str>) {
    if stream_output == Some("true") {
        debug!(env = STREAM_OUTPUT_ENV, "forcing output streaming");
        config.tasks_runner.stream_output = true;
    }
}

/// Find configuration file in directory or parent directories.
///
/// The first match wins. Parents are walked until the filesystem root.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.exists() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration from directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(WorkspaceConfig, PathBuf)> {
    let config_path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;

    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

/// Load configuration or use defaults
pub fn load_config_or_default(dir: &Path) -> (WorkspaceConfig, Option<PathBuf>) {
    match load_config_from_dir(dir) {
        Ok((config, path)) => (config, Some(path)),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "no usable config found, using defaults");
            let mut config = WorkspaceConfig::default();
            apply_env_overrides(&mut config, std::env::var(STREAM_OUTPUT_ENV).ok().as_deref());
            (config, None)
        }
    }
}
