//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Loads `.env` from the working directory, if present
//! 2. Attempts to load from environment variables
//! 3. If a required variable is missing, falls back to a file: the path
//!    in `OUTPOST_CONFIG`, otherwise the first probed location. A present but
//!    malformed variable is an error, never a reason to fall back
//! 4. Secrets from the environment (`OUTPOST_DEVICE_TOKEN`,
//!    `OUTPOST_DB_ENCRYPTION_KEY`) override whatever the file says
//! 5. The result is validated
//!
//! ## Environment Variables
//! - `OUTPOST_DB_PATH`: Database file path (required for env loading)
//! - `OUTPOST_UPLOAD_URL`: Ingest base URL (required for env loading)
//! - `OUTPOST_DB_POOL_SIZE`: Connection pool size
//! - `OUTPOST_DB_ENCRYPTION_KEY`: SQLCipher key
//! - `OUTPOST_DEVICE_ID`, `OUTPOST_DEVICE_SOURCE`, `OUTPOST_DEVICE_TOKEN`
//! - `OUTPOST_UPLOAD_INTERVAL`: Seconds between upload cycles
//! - `OUTPOST_UPLOAD_ENABLED`: Whether uploads run (true/false)
//! - `OUTPOST_UPLOAD_BATCH_SIZE`: Entries per stream per cycle
//! - `OUTPOST_STREAMS`: Comma-separated stream names
//! - `OUTPOST_SAMPLE_INTERVAL`: Sampling interval for those streams
//! - `OUTPOST_HEALTH_INTERVAL`: Seconds between health polls
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./outpost.toml` or `./outpost.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names next to the executable

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use outpost_domain::{Config, OutpostError, Result, StreamConfig};

const CONFIG_PATH_VAR: &str = "OUTPOST_CONFIG";
const REQUIRED_ENV_VARS: [&str; 2] = ["OUTPOST_DB_PATH", "OUTPOST_UPLOAD_URL"];
const CANDIDATE_NAMES: [&str; 4] = ["outpost.toml", "outpost.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `OutpostError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    let mut config = if let Some(missing) = missing_required_env() {
        tracing::debug!(missing, "Required environment variable not set, trying file");
        let explicit = std::env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from);
        load_from_file(explicit)?
    } else {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        config
    };

    apply_secret_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// `OUTPOST_DB_PATH` and `OUTPOST_UPLOAD_URL` must be present; every other
/// field falls back to its default.
///
/// # Errors
/// Returns `OutpostError::Config` if required variables are missing or a
/// value does not parse.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.database.path = env_var("OUTPOST_DB_PATH")?;
    config.upload.base_url = env_var("OUTPOST_UPLOAD_URL")?;

    if let Some(pool_size) = env_parse::<u32>("OUTPOST_DB_POOL_SIZE")? {
        config.database.pool_size = pool_size;
    }
    config.database.encryption_key = std::env::var("OUTPOST_DB_ENCRYPTION_KEY").ok();

    if let Ok(id) = std::env::var("OUTPOST_DEVICE_ID") {
        config.device.id = id;
    }
    if let Ok(source) = std::env::var("OUTPOST_DEVICE_SOURCE") {
        config.device.source = source;
    }
    config.device.token = std::env::var("OUTPOST_DEVICE_TOKEN").ok();

    if let Some(interval) = env_parse::<u64>("OUTPOST_UPLOAD_INTERVAL")? {
        config.upload.interval_secs = interval;
    }
    config.upload.enabled = env_bool("OUTPOST_UPLOAD_ENABLED", config.upload.enabled);
    if let Some(batch_size) = env_parse::<usize>("OUTPOST_UPLOAD_BATCH_SIZE")? {
        config.upload.batch_size = batch_size;
    }

    if let Some(interval) = env_parse::<u64>("OUTPOST_HEALTH_INTERVAL")? {
        config.health.interval_secs = interval;
    }

    let sample_interval = env_parse::<u64>("OUTPOST_SAMPLE_INTERVAL")?;
    if let Ok(names) = std::env::var("OUTPOST_STREAMS") {
        config.streams = names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                let mut stream = StreamConfig::new(name);
                if let Some(interval) = sample_interval {
                    stream.interval_secs = interval;
                }
                stream
            })
            .collect();
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is detected
/// by extension (`.toml` or `.json`).
///
/// # Errors
/// Returns `OutpostError::Config` if the file is missing, unreadable or
/// malformed, or if no file is found when probing.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(OutpostError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            OutpostError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| OutpostError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| OutpostError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| OutpostError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(OutpostError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe the standard locations for a configuration file
///
/// Returns the first existing candidate, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CANDIDATE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Environment secrets win over file values so tokens never need to be
/// written to disk.
fn apply_secret_overrides(config: &mut Config) {
    if let Some(token) = non_empty_env("OUTPOST_DEVICE_TOKEN") {
        config.device.token = Some(token);
    }
    if let Some(key) = non_empty_env("OUTPOST_DB_ENCRYPTION_KEY") {
        config.database.encryption_key = Some(key);
    }
}

/// Reject values the engine cannot run with.
///
/// # Errors
/// Returns `OutpostError::Config` describing the first problem found.
pub fn validate(config: &Config) -> Result<()> {
    if config.database.path.trim().is_empty() {
        return Err(OutpostError::Config("database.path must not be empty".into()));
    }
    if config.database.pool_size == 0 {
        return Err(OutpostError::Config("database.pool_size must be at least 1".into()));
    }
    if config.upload.base_url.trim().is_empty() {
        return Err(OutpostError::Config("upload.base_url must not be empty".into()));
    }
    if config.upload.batch_size == 0 {
        return Err(OutpostError::Config("upload.batch_size must be at least 1".into()));
    }
    if config.upload.interval_secs == 0 || config.health.interval_secs == 0 {
        return Err(OutpostError::Config("intervals must be at least one second".into()));
    }
    if config.enqueue.max_attempts == 0 {
        return Err(OutpostError::Config("enqueue.max_attempts must be at least 1".into()));
    }

    let mut seen = HashSet::new();
    for stream in &config.streams {
        if stream.name.trim().is_empty() {
            return Err(OutpostError::Config("stream name must not be empty".into()));
        }
        if stream.interval_secs == 0 {
            return Err(OutpostError::Config(format!(
                "stream '{}' interval must be at least one second",
                stream.name
            )));
        }
        if !seen.insert(stream.name.as_str()) {
            return Err(OutpostError::Config(format!("duplicate stream '{}'", stream.name)));
        }
    }

    Ok(())
}

fn missing_required_env() -> Option<&'static str> {
    REQUIRED_ENV_VARS.into_iter().find(|key| std::env::var_os(key).is_none())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        OutpostError::Config(format!("Missing required environment variable: {}", key))
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| OutpostError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
