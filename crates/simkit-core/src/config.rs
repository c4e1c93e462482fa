//! Persistent configuration for simkit.
//!
//! Stores user settings in `~/.simkit/config.json`. Every field is optional;
//! unset fields fall back to what the system reports (`xcode-select -p`, the
//! standard CoreSimulator directories) or to the built-in polling defaults.
//!
//! # Example
//!
//! ```no_run
//! use simkit_core::config::SimkitConfig;
//!
//! // Load (returns defaults if file doesn't exist)
//! let config = SimkitConfig::load();
//!
//! println!("waiting up to {:?}", config.wait_timeout());
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::poller::PollOptions;
use crate::resolver::SYSTEM_RUNTIMES_DIR;

const CONFIG_FILENAME: &str = "config.json";

/// Returns the simkit data directory (`~/.simkit`), creating it if needed.
///
/// Falls back to the current directory when no home directory is known.
pub fn simkit_dir() -> PathBuf {
    let dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".simkit");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Persistent simkit configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SimkitConfig {
    /// Developer directory to use instead of `xcode-select -p`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_dir: Option<PathBuf>,

    /// Fallback directory searched for runtime bundles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_runtimes_dir: Option<PathBuf>,

    /// Directory holding device home directories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices_dir: Option<PathBuf>,

    /// Delay between device listings while waiting (default: 1000).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,

    /// How long to wait for a device state by default (default: 30).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_timeout_secs: Option<u64>,
}

impl SimkitConfig {
    /// Load config from `~/.simkit/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        let path = simkit_dir().join(CONFIG_FILENAME);
        std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save config to `~/.simkit/config.json`.
    pub fn save(&self) -> std::io::Result<()> {
        let path = simkit_dir().join(CONFIG_FILENAME);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }

    /// Effective fallback runtimes directory.
    pub fn system_runtimes_dir(&self) -> PathBuf {
        self.system_runtimes_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(SYSTEM_RUNTIMES_DIR))
    }

    /// Effective devices directory, if one can be determined.
    pub fn devices_dir(&self) -> Option<PathBuf> {
        self.devices_dir
            .clone()
            .or_else(crate::device::default_devices_dir)
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| PollOptions::default().interval)
    }

    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| PollOptions::default().timeout)
    }

    /// Polling options from this config, optionally overriding the timeout.
    pub fn poll_options(&self, timeout: Option<Duration>) -> PollOptions {
        PollOptions {
            timeout: timeout.unwrap_or_else(|| self.wait_timeout()),
            interval: self.poll_interval(),
        }
    }
}
