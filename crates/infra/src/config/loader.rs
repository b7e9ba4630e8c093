//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required variable is missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `STEWARD_API_BASE_URL`: Backend base URL (required)
//! - `STEWARD_API_TIMEOUT_MS`: Per-request timeout in milliseconds
//! - `STEWARD_CLIENT_TYPE`: Value of the client-type marker header
//! - `STEWARD_SESSION_PATH`: Session file location
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./steward.json` or `./steward.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. `../steward.json` or `../steward.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};

use steward_domain::{ApiConfig, Result, SessionConfig, StewardConfig, StewardError};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the base URL is
/// not set there, falls back to loading from a config file.
///
/// # Errors
/// Returns `StewardError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<StewardConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only the base URL is required; the rest fall back to defaults.
///
/// # Errors
/// Returns `StewardError::Config` if the base URL is missing or a numeric
/// variable does not parse.
pub fn load_from_env() -> Result<StewardConfig> {
    let base_url = env_var("STEWARD_API_BASE_URL")?;
    let defaults = ApiConfig::default();

    let timeout_ms = match std::env::var("STEWARD_API_TIMEOUT_MS") {
        Ok(s) => s
            .parse::<u64>()
            .map_err(|e| StewardError::Config(format!("Invalid API timeout: {}", e)))?,
        Err(_) => defaults.timeout_ms,
    };
    let client_type = std::env::var("STEWARD_CLIENT_TYPE").unwrap_or(defaults.client_type);

    let session = std::env::var("STEWARD_SESSION_PATH")
        .map(|storage_path| SessionConfig { storage_path })
        .unwrap_or_default();

    Ok(StewardConfig {
        api: ApiConfig { base_url, timeout_ms, client_type },
        auth: Default::default(),
        session,
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `StewardError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<StewardConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(StewardError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            StewardError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| StewardError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content, format by file extension
fn parse_config(contents: &str, path: &Path) -> Result<StewardConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| StewardError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| StewardError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(StewardError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
        candidates.extend(candidates_in(&cwd.join("..")));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> [PathBuf; 4] {
    [
        dir.join("steward.json"),
        dir.join("steward.toml"),
        dir.join("config.json"),
        dir.join("config.toml"),
    ]
}

/// Get required environment variable
///
/// # Errors
/// Returns `StewardError::Config` if the variable is not set or empty.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty()).ok_or_else(|| {
        StewardError::Config(format!("Missing required environment variable: {}", key))
    })
}
