//! Locations inside the active Xcode installation.
//!
//! The developer directory comes from `xcode-select -p` unless one is
//! configured explicitly. Everything else is derived from it by path
//! arithmetic.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::runtime::Platform;
use crate::shell::{Shell, ShellError};

const XCODE_SELECT: &str = "/usr/bin/xcode-select";

/// Errors that can occur when locating the developer directory.
#[derive(Error, Debug)]
pub enum XcodeError {
    /// `xcode-select -p` exited non-zero or printed nothing usable.
    #[error("xcode-select failed: {0}")]
    CommandFailed(String),

    /// `xcode-select` could not be launched.
    #[error(transparent)]
    Shell(#[from] ShellError),
}

/// Read-only view of the active Xcode installation.
#[derive(Debug, Clone)]
pub struct Xcode<S> {
    shell: S,
    developer_dir: Option<PathBuf>,
}

impl<S: Shell> Xcode<S> {
    /// Resolves the developer directory through `xcode-select -p` on demand.
    pub fn new(shell: S) -> Self {
        Self {
            shell,
            developer_dir: None,
        }
    }

    /// Uses `dir` as the developer directory instead of asking `xcode-select`.
    pub fn with_developer_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.developer_dir = dir;
        self
    }

    /// The active developer directory, e.g.
    /// `/Applications/Xcode.app/Contents/Developer`.
    ///
    /// # Errors
    ///
    /// - [`XcodeError::Shell`] if `xcode-select` cannot be launched
    /// - [`XcodeError::CommandFailed`] if it exits non-zero or prints nothing
    pub fn developer_dir(&self) -> Result<PathBuf, XcodeError> {
        if let Some(dir) = &self.developer_dir {
            return Ok(dir.clone());
        }

        let output = self.shell.run(XCODE_SELECT, &["-p"])?;
        if !output.is_success() {
            return Err(XcodeError::CommandFailed(output.stderr));
        }

        match output.stdout_trimmed() {
            Some(path) if !path.trim().is_empty() => {
                debug!(path, "resolved developer directory");
                Ok(PathBuf::from(path.trim()))
            }
            _ => Err(XcodeError::CommandFailed(
                "empty or non-UTF-8 output from xcode-select -p".to_string(),
            )),
        }
    }

    /// Directory holding runtime bundles shipped inside Xcode for `platform`.
    ///
    /// Returns `Ok(None)` for [`Platform::Unknown`] without consulting
    /// `xcode-select`.
    pub fn runtime_profiles_path(&self, platform: Platform) -> Result<Option<PathBuf>, XcodeError> {
        let Some(device_platform) = device_platform(platform) else {
            return Ok(None);
        };
        let developer = self.developer_dir()?;
        Ok(Some(platform_dir(&developer, device_platform).join(
            "Developer/Library/CoreSimulator/Profiles/Runtimes",
        )))
    }

    /// The simulator SDK for `platform`, e.g.
    /// `.../Platforms/iPhoneSimulator.platform/Developer/SDKs/iPhoneSimulator.sdk`.
    ///
    /// Returns `Ok(None)` for [`Platform::Unknown`].
    pub fn simulator_sdk_path(&self, platform: Platform) -> Result<Option<PathBuf>, XcodeError> {
        let Some(simulator) = simulator_platform(platform) else {
            return Ok(None);
        };
        let developer = self.developer_dir()?;
        Ok(Some(
            platform_dir(&developer, simulator)
                .join("Developer/SDKs")
                .join(format!("{simulator}.sdk")),
        ))
    }

    /// Location of `Simulator.app` inside the developer directory.
    pub fn simulator_app_path(&self) -> Result<PathBuf, XcodeError> {
        Ok(self.developer_dir()?.join("Applications/Simulator.app"))
    }
}

fn platform_dir(developer: &Path, name: &str) -> PathBuf {
    developer.join("Platforms").join(format!("{name}.platform"))
}

/// Xcode's device platform directory name (`iPhoneOS`, `WatchOS`, `AppleTVOS`).
pub fn device_platform(platform: Platform) -> Option<&'static str> {
    match platform {
        Platform::Ios => Some("iPhoneOS"),
        Platform::WatchOs => Some("WatchOS"),
        Platform::TvOs => Some("AppleTVOS"),
        Platform::Unknown => None,
    }
}

/// Xcode's simulator platform directory name
/// (`iPhoneSimulator`, `WatchSimulator`, `AppleTVSimulator`).
pub fn simulator_platform(platform: Platform) -> Option<&'static str> {
    match platform {
        Platform::Ios => Some("iPhoneSimulator"),
        Platform::WatchOs => Some("WatchSimulator"),
        Platform::TvOs => Some("AppleTVSimulator"),
        Platform::Unknown => None,
    }
}
