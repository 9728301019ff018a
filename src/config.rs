//! Runtime configuration loaded from `~/.config/slideprint/config.toml`.
//!
//! Every value has a default, so the file is optional and may set only the
//! keys it cares about:
//!
//! ```toml
//! [capture]
//! settle_ms = 800
//! advance_timeout_ms = 8000
//!
//! [messaging]
//! timeout_ms = 15000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Timing of the auto-capture loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureTiming {
    /// Wait after `next()` when the adapter does not specify its own.
    pub settle_ms: u64,
    /// Interval between counter reads while waiting for an advance.
    pub poll_ms: u64,
    /// Give up on an advance after this long.
    pub advance_timeout_ms: u64,
}

impl Default for CaptureTiming {
    fn default() -> Self {
        Self {
            settle_ms: 600,
            poll_ms: 120,
            advance_timeout_ms: 5_000,
        }
    }
}

impl CaptureTiming {
    #[must_use]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    #[must_use]
    pub fn advance_timeout(&self) -> Duration {
        Duration::from_millis(self.advance_timeout_ms)
    }
}

/// Cross-context messaging limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Round-trip bound for a single request.
    pub timeout_ms: u64,
    /// Ping attempts before a tab's content context is considered absent.
    pub ready_retries: u32,
    /// Pause between ping attempts.
    pub ready_delay_ms: u64,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            ready_retries: 8,
            ready_delay_ms: 150,
        }
    }
}

impl MessagingConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn ready_delay(&self) -> Duration {
        Duration::from_millis(self.ready_delay_ms)
    }
}

/// Screenshot settings of the capture relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// JPEG quality (0-100) of visible-tab screenshots.
    pub jpeg_quality: u8,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { jpeg_quality: 90 }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureTiming,
    pub messaging: MessagingConfig,
    pub relay: RelayConfig,
}

impl Config {
    /// Load from the default location.
    ///
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load from an explicit path, falling back to defaults when absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    /// Render as TOML, e.g. for `slideprint config`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }
}

/// Return the path to the config file.
#[must_use]
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slideprint")
        .join("config.toml")
}
