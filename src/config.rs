//! Configuration management.
//!
//! Two kinds of persisted configuration exist:
//!
//! - [`Settings`]: tunable runtime parameters loaded from an optional
//!   `config/default.toml` via the `config` crate. Every empirically-tuned
//!   constant of the acquisition loop and the display policy lives here so
//!   it can be adjusted per instrument model without a rebuild.
//! - [`AddressCache`]: a single-key JSON file remembering the last
//!   successfully connected instrument address, read at startup to skip
//!   rediscovery.

use crate::error::{AppResult, PanelError};
use config::Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tunables for the background acquisition loop.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AcquisitionSettings {
    /// Poll interval while the sweep point count is still changing, in ms.
    pub fast_poll_ms: u64,
    /// Poll interval after the point count has been stable for a while, in ms.
    pub slow_poll_ms: u64,
    /// Upper bound on the adaptive poll interval, in ms.
    pub max_poll_ms: u64,
    /// Consecutive stable polls before stepping from fast to slow.
    pub stable_polls_before_slowdown: u32,
    /// Back-off sleep after a failed trace read, in ms.
    pub failure_backoff_ms: u64,
    /// Consecutive read failures before a one-time warning is surfaced.
    pub failure_warn_threshold: u32,
    /// Stable polls with no new data before a single sweep is declared
    /// ended by timeout. At the slowest interval this is on the order of
    /// a minute of real time.
    pub idle_poll_limit: u32,
    /// Per-call read timeout on the instrument link, in ms.
    pub read_timeout_ms: u64,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            fast_poll_ms: 200,
            slow_poll_ms: 500,
            max_poll_ms: 2000,
            stable_polls_before_slowdown: 5,
            failure_backoff_ms: 500,
            failure_warn_threshold: 5,
            idle_poll_limit: 40,
            read_timeout_ms: 2000,
        }
    }
}

/// Tunables for the live display's axis-limit policy.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplaySettings {
    /// Fixed X-axis display range, matching the instrument's own sweep
    /// display rather than the data extent.
    pub x_min_hz: f64,
    pub x_max_hz: f64,
    /// Instrument-reported Y spans narrower than this are treated as
    /// placeholder values and never locked.
    pub trivial_span_width: f64,
    /// Fractional padding applied when auto-scaling from visible data.
    pub autoscale_pad_fraction: f64,
    /// Absolute padding used when the visible data window is flat.
    pub flat_pad: f64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            x_min_hz: 100.0,
            x_max_hz: 12_000.0,
            trivial_span_width: 0.5,
            autoscale_pad_fraction: 0.05,
            flat_pad: 0.1,
        }
    }
}

/// Top-level application settings.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub log_level: Option<String>,
    pub acquisition: AcquisitionSettings,
    pub display: DisplaySettings,
}

impl Settings {
    /// Load settings from `config/<name>.toml`, falling back to built-in
    /// defaults when the file does not exist.
    pub fn new(config_name: Option<&str>) -> AppResult<Self> {
        let config_path = format!("config/{}", config_name.unwrap_or("default"));
        let s = Config::builder()
            .add_source(config::File::with_name(&config_path).required(false))
            .build()
            .map_err(PanelError::Config)?;

        s.try_deserialize().map_err(PanelError::Config)
    }
}

/// Cache of the last instrument address that answered `*IDN?`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AddressCache {
    pub address: String,
}

impl AddressCache {
    /// Read the cached address, returning `None` when the cache file is
    /// missing or unreadable. A stale or corrupt cache only costs a
    /// rediscovery pass, so it is never an error.
    pub fn load(path: &Path) -> Option<Self> {
        let text = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Persist the address for the next startup.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Default location of the address cache file.
pub fn default_cache_path() -> PathBuf {
    PathBuf::from("config/address.json")
}
