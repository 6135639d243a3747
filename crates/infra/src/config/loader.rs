//! Configuration loader
//!
//! Loads application configuration from a file and environment variables.
//!
//! ## Loading Strategy
//! 1. Probes for a config file; uses built-in defaults when there is none
//! 2. Applies `AGENTDODO_*` environment overrides on top
//! 3. Validates the result
//!
//! ## Environment Variables
//! - `AGENTDODO_API_BASE_URL`, `AGENTDODO_UPLOAD_BASE_URL`
//! - `AGENTDODO_AUTHORIZE_URL`, `AGENTDODO_TOKEN_URL`, `AGENTDODO_REVOKE_URL`
//! - `AGENTDODO_REDIRECT_URI`
//! - `AGENTDODO_SCOPES`: space or comma separated
//! - `AGENTDODO_AUTH_SCHEME`: `oauth1` or `oauth2`
//! - `AGENTDODO_CLIENT_ID`: built-in OAuth 2.0 client id
//! - `AGENTDODO_REQUEST_TIMEOUT_SECS`, `AGENTDODO_UPLOAD_TIMEOUT_SECS`
//! - `AGENTDODO_KEYCHAIN_SERVICE`
//! - `AGENTDODO_LOG_FILTER`, `AGENTDODO_LOG_JSON` (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `$AGENTDODO_CONFIG`
//! 2. `./agentdodo.toml`, `./config/agentdodo.toml`, `./agentdodo.json`
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};

use agentdodo_domain::{Config, DodoError, Result};

/// Variable naming an explicit config file.
pub const CONFIG_PATH_VAR: &str = "AGENTDODO_CONFIG";

const FILE_NAMES: [&str; 3] = ["agentdodo.toml", "config/agentdodo.toml", "agentdodo.json"];

/// Load configuration: discovered file (or defaults), then environment
/// overrides, then validation.
///
/// # Errors
/// Returns `DodoError::Config` if:
/// - A discovered file cannot be read or parsed
/// - An environment variable has an invalid value
/// - The merged configuration fails validation
pub fn load() -> Result<Config> {
    let base = match probe_config_paths() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::debug!("No config file found, using defaults");
            Config::default()
        }
    };
    let config = apply_env_overrides(base)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from defaults and environment variables only.
///
/// # Errors
/// Returns `DodoError::Config` if a variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let config = apply_env_overrides(Config::default())?;
    config.validate()?;
    tracing::info!("Configuration loaded from environment variables");
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. The format is chosen
/// by extension (`.toml` or `.json`); keys missing from the file keep their
/// defaults.
///
/// # Errors
/// Returns `DodoError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(DodoError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            DodoError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| DodoError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| DodoError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| DodoError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(DodoError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a config file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(explicit) = std::env::var_os(CONFIG_PATH_VAR) {
        candidates.push(PathBuf::from(explicit));
    }

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(FILE_NAMES.iter().map(|name| cwd.join(name)));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(FILE_NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn apply_env_overrides(mut config: Config) -> Result<Config> {
    let x = &mut config.x;
    override_string("AGENTDODO_API_BASE_URL", &mut x.api_base_url);
    override_string("AGENTDODO_UPLOAD_BASE_URL", &mut x.upload_base_url);
    override_string("AGENTDODO_AUTHORIZE_URL", &mut x.authorize_url);
    override_string("AGENTDODO_TOKEN_URL", &mut x.token_url);
    override_string("AGENTDODO_REVOKE_URL", &mut x.revoke_url);
    override_string("AGENTDODO_REDIRECT_URI", &mut x.redirect_uri);
    if let Some(scopes) = env_var("AGENTDODO_SCOPES") {
        x.scopes = split_scopes(&scopes);
    }
    if let Some(scheme) = env_var("AGENTDODO_AUTH_SCHEME") {
        x.auth_scheme = scheme.parse()?;
    }
    if let Some(client_id) = env_var("AGENTDODO_CLIENT_ID") {
        x.default_client_id = Some(client_id);
    }

    if let Some(secs) = env_u64("AGENTDODO_REQUEST_TIMEOUT_SECS")? {
        config.http.request_timeout_secs = secs;
    }
    if let Some(secs) = env_u64("AGENTDODO_UPLOAD_TIMEOUT_SECS")? {
        config.http.upload_timeout_secs = secs;
    }
    override_string("AGENTDODO_KEYCHAIN_SERVICE", &mut config.keychain.service);
    override_string("AGENTDODO_LOG_FILTER", &mut config.logging.filter);
    config.logging.json = env_bool("AGENTDODO_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Non-blank value of an environment variable.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn override_string(key: &str, target: &mut String) {
    if let Some(value) = env_var(key) {
        *target = value;
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    env_var(key)
        .map(|s| s.parse::<u64>().map_err(|e| DodoError::Config(format!("Invalid {key}: {e}"))))
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    env_var(key)
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn split_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
