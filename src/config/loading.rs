//! Configuration loading: file discovery, `.env` and environment overrides.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::Config;
use super::validation::validate_config;
use crate::common::constants::*;
use crate::common::utils::private_path;

/// Global configuration directory, set once at startup
static CONFIG_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Set the configuration directory for the current process.
/// This can only be called once, typically at startup.
pub fn set_config_dir(dir: Option<String>) -> Result<()> {
    CONFIG_DIR
        .set(dir.map(PathBuf::from))
        .map_err(|_| anyhow::anyhow!("Configuration directory already set"))
}

/// Get the custom configuration directory if one was set.
/// Returns None if using the default directory.
pub fn get_custom_config_dir() -> Option<PathBuf> {
    CONFIG_DIR.get().and_then(|d| d.clone())
}

/// Directory holding `baywake.toml` and, by default, `bays.json`.
pub fn get_config_base_dir() -> Result<PathBuf> {
    if let Some(custom_dir) = get_custom_config_dir() {
        return Ok(custom_dir);
    }
    let config_dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config_dir.join(CONFIG_DIR_NAME))
}

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_base_dir()?.join(CONFIG_FILE_NAME))
}

/// Resolve the mapping file path. Relative paths are taken from the config directory.
pub fn resolve_mapping_path(configured: Option<&str>) -> Result<PathBuf> {
    let configured = configured
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .unwrap_or(DEFAULT_BAY_MAPPING_FILE);

    let path = PathBuf::from(configured);
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(get_config_base_dir()?.join(path))
    }
}

/// Load configuration using automatic path detection.
///
/// Creates a commented default file if none exists, then applies `.env` and
/// the process environment.
pub fn load() -> Result<Config> {
    let config_path = get_config_path()?;

    if !config_path.exists() {
        super::builder::create_default_config(&config_path)
            .context("Failed to create default config during load")?;
        log_block_start!(
            "Created default configuration at {}",
            private_path(&config_path)
        );
    }

    load_from_path(&config_path)
}

/// Load configuration from a specific path. Does not create a default file.
pub fn load_from_path(path: &Path) -> Result<Config> {
    let mut config = read_config_file(path)?;

    load_dotenv()?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    validate_config(&config)?;

    Ok(config)
}

/// Parse a config file without applying any overrides.
pub(crate) fn read_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!(
            "Configuration file not found at {}",
            private_path(path)
        );
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", private_path(path)))?;

    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", private_path(path)))
}

/// Load `.env` from the working directory without overriding existing variables.
fn load_dotenv() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e).context("Failed to load .env file"),
    }
}

/// Overlay environment variables onto the file's values.
///
/// `lookup` returns the raw value for a variable name. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(value) = get("API_ROOT") {
        config.api_root = Some(value.trim().to_string());
    }
    if let Some(value) = get("API_KEY") {
        config.api_key = Some(value.trim().to_string());
    }
    if let Some(value) = get("PRE_BOOKING_MINUTES") {
        config.pre_booking_minutes = Some(parse_env("PRE_BOOKING_MINUTES", &value)?);
    }
    if let Some(value) = get("POST_BOOKING_MINUTES") {
        config.post_booking_minutes = Some(parse_env("POST_BOOKING_MINUTES", &value)?);
    }
    if let Some(value) = get("BAY_FETCH_INTERVAL_MINUTES") {
        config.bay_fetch_interval_minutes =
            Some(parse_env("BAY_FETCH_INTERVAL_MINUTES", &value)?);
    }
    if let Some(value) = get("BOOKING_FETCH_INTERVAL_MINUTES") {
        config.booking_fetch_interval_minutes =
            Some(parse_env("BOOKING_FETCH_INTERVAL_MINUTES", &value)?);
    }

    Ok(())
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Environment variable {key} is not a valid number: {value:?}"))
}
