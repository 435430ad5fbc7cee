//! Configuration loading for s-talk.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use crate::core::DEFAULT_QUEUE_CAPACITY;
use crate::error::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Get the s-talk home directory (~/.s-talk).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".s-talk"))
}

/// Get the default settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings.
///
/// An explicit path must exist. Without one, ~/.s-talk/settings.json is
/// read if present and defaults are used otherwise.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        return load_settings_from(path);
    }

    let path = get_settings_path()?;
    if !path.exists() {
        tracing::debug!("No settings at {}, using defaults", path.display());
        return Ok(Settings::default());
    }
    load_settings_from(&path)
}

/// Load and validate a settings file.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Settings file not found at {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let settings: Settings = serde_json::from_str(&content)?;
    validate_settings(&settings)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.queue_capacity == 0 {
        return Err(Error::Config(
            "queue_capacity must be at least 1".to_string(),
        ));
    }
    if tracing_subscriber::EnvFilter::try_new(&settings.log_level).is_err() {
        return Err(Error::Config(format!(
            "log_level '{}' is not a valid filter",
            settings.log_level
        )));
    }
    Ok(())
}

/// s-talk settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Settings {
    /// Capacity of the outbound and inbound queues.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Local address the UDP socket binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Log filter used when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Also write a daily log file.
    #[serde(default = "default_log_to_file")]
    pub log_to_file: bool,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_to_file() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            bind_address: default_bind_address(),
            log_level: default_log_level(),
            log_to_file: default_log_to_file(),
        }
    }
}
