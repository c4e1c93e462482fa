//! Installed simulator runtimes.
//!
//! A runtime is an OS image (e.g. "iOS 17.0") that simulator devices boot
//! from. Runtimes are listed by `xcrun simctl list runtimes -j`; see
//! [`crate::simctl::Simctl::list_runtimes`].

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Operating system family of a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "iOS")]
    Ios,
    #[serde(rename = "watchOS")]
    WatchOs,
    #[serde(rename = "tvOS")]
    TvOs,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Platform {
    /// Derives the platform from a runtime's display name.
    ///
    /// Only the leading whitespace-separated token is considered, so
    /// `"watchOS 10.0"` maps to [`Platform::WatchOs`]. Anything unrecognised
    /// is [`Platform::Unknown`].
    pub fn from_runtime_name(name: &str) -> Self {
        match name.split_whitespace().next() {
            Some("iOS") => Platform::Ios,
            Some("watchOS") => Platform::WatchOs,
            Some("tvOS") => Platform::TvOs,
            _ => Platform::Unknown,
        }
    }

    /// Parses a user-supplied platform name, ignoring case.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "ios" => Platform::Ios,
            "watchos" => Platform::WatchOs,
            "tvos" => Platform::TvOs,
            _ => Platform::Unknown,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Ios => "iOS",
            Platform::WatchOs => "watchOS",
            Platform::TvOs => "tvOS",
            Platform::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// An installed simulator runtime, as reported by `simctl list runtimes -j`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runtime {
    /// Stable identifier, e.g. `com.apple.CoreSimulator.SimRuntime.watchOS-10-0`.
    pub identifier: String,

    /// Display name, e.g. `watchOS 10.0`.
    pub name: String,

    /// Marketing version, e.g. `10.0`.
    pub version: String,

    /// Build number, e.g. `21R355`.
    #[serde(rename = "buildversion", default)]
    pub build_version: String,

    /// Where the runtime bundle is installed, when simctl reports it.
    #[serde(default)]
    pub bundle_path: Option<PathBuf>,

    /// Availability summary, e.g. `(available)`. Newer Xcodes omit it.
    #[serde(default)]
    pub availability: String,

    /// Why the runtime is unavailable. Empty when it is available.
    #[serde(default)]
    pub availability_error: String,

    /// Whether the runtime can be used. Absent on older Xcodes.
    #[serde(default)]
    pub is_available: Option<bool>,
}

impl Runtime {
    /// The platform this runtime belongs to, from the leading token of its name.
    pub fn platform(&self) -> Platform {
        Platform::from_runtime_name(&self.name)
    }

    /// Compares two runtimes by their dotted version, numerically.
    ///
    /// `"17.10"` sorts after `"17.2"`; missing components count as zero.
    pub fn cmp_version(&self, other: &Runtime) -> Ordering {
        compare_versions(&self.version, &other.version)
    }
}

/// Returns the runtime of `platform` with the highest version, if any.
pub fn latest(runtimes: &[Runtime], platform: Platform) -> Option<&Runtime> {
    runtimes
        .iter()
        .filter(|r| r.platform() == platform)
        .max_by(|a, b| a.cmp_version(b))
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|part| part.trim().parse::<u64>().unwrap_or(0))
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}
