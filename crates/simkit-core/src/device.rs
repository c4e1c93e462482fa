//! Simulator device records and their on-disk layout.
//!
//! A [`Device`] is a value snapshot of one simulator as reported by
//! `xcrun simctl list devices -j`. It is not a live handle: observing a newer
//! state means listing again (see [`crate::poller`]).
//!
//! Each device also owns a directory under
//! `~/Library/Developer/CoreSimulator/Devices/<udid>` holding its
//! `device.plist` and data container.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The state string simctl reports for a running device.
pub const BOOTED: &str = "Booted";

/// The state string simctl reports for a stopped device.
pub const SHUTDOWN: &str = "Shutdown";

/// Represents a simulator device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// The unique device identifier (UDID). Never changes for a device.
    pub udid: String,

    /// The human-readable name of the device (e.g., "iPhone 15 Pro").
    pub name: String,

    /// The current state of the device (e.g., "Booted", "Shutdown").
    pub state: String,

    /// Availability summary, e.g. `(unavailable, runtime profile not found)`.
    #[serde(default)]
    pub availability: String,

    /// Why the device is unavailable. Empty when it is available.
    #[serde(default)]
    pub availability_error: String,

    /// Whether the device can be used. Absent when simctl does not say.
    #[serde(default)]
    pub is_available: Option<bool>,

    /// The device type identifier (e.g., "com.apple.CoreSimulator.SimDeviceType.iPhone-15-Pro").
    #[serde(rename = "deviceTypeIdentifier", default)]
    pub device_type: Option<String>,

    /// The runtime the device belongs to, taken from the key it was listed
    /// under (e.g. "iOS 12.1" or "com.apple.CoreSimulator.SimRuntime.iOS-17-0").
    #[serde(default)]
    pub runtime_name: String,
}

impl Device {
    /// Returns `true` if the device is running.
    pub fn is_booted(&self) -> bool {
        self.state == BOOTED
    }

    /// Overwrites every observable field with those of `fresh`.
    ///
    /// The UDID is kept; `fresh` is expected to describe the same device.
    pub(crate) fn refresh_from(&mut self, fresh: Device) {
        debug_assert_eq!(self.udid, fresh.udid);
        let udid = std::mem::take(&mut self.udid);
        *self = Device { udid, ..fresh };
    }

    /// The device's home directory inside `devices_dir`.
    pub fn home_path(&self, devices_dir: &Path) -> PathBuf {
        devices_dir.join(&self.udid)
    }

    /// Path to the device's `device.plist`.
    pub fn device_plist_path(&self, devices_dir: &Path) -> PathBuf {
        self.home_path(devices_dir).join("device.plist")
    }

    /// Path to the device's global preferences plist.
    pub fn global_preferences_plist_path(&self, devices_dir: &Path) -> PathBuf {
        self.home_path(devices_dir)
            .join("data/Library/Preferences/.GlobalPreferences.plist")
    }
}

/// The default directory holding every device's home directory,
/// `~/Library/Developer/CoreSimulator/Devices`.
///
/// Returns `None` if the home directory cannot be determined.
pub fn default_devices_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join("Library/Developer/CoreSimulator/Devices"))
}

/// Contents of a device's `device.plist`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePlist {
    #[serde(rename = "UDID")]
    pub udid: String,

    /// Device type identifier.
    #[serde(rename = "deviceType")]
    pub device_type: String,

    /// Runtime identifier, e.g. `com.apple.CoreSimulator.SimRuntime.iOS-17-0`.
    pub runtime: String,

    pub name: String,

    /// CoreSimulator's numeric state (1 = shutdown, 3 = booted).
    #[serde(default)]
    pub state: Option<u64>,
}

/// The parts of a device's `.GlobalPreferences.plist` this crate exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalPreferences {
    #[serde(rename = "AppleLocale", default)]
    pub locale: Option<String>,

    #[serde(rename = "AppleLanguages", default)]
    pub languages: Vec<String>,
}
