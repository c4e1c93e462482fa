//! Interface to Apple's `xcrun simctl` command-line tool.
//!
//! This module provides a typed wrapper around the simulator control tool:
//! listing devices and runtimes, and driving a device through boot,
//! shutdown, erase, install, launch and spawn.
//!
//! # Requirements
//!
//! Xcode must be installed for `xcrun simctl` to be available.
//!
//! # Example
//!
//! ```no_run
//! use simkit_core::shell::SystemShell;
//! use simkit_core::simctl::Simctl;
//!
//! let simctl = Simctl::new(SystemShell);
//!
//! // List all simulators
//! let devices = simctl.list_devices().unwrap();
//! for device in &devices {
//!     println!("{}: {} ({})", device.name, device.udid, device.state);
//! }
//!
//! // Boot the first one
//! if let Some(device) = devices.first() {
//!     simctl.boot(&device.udid).unwrap();
//! }
//! ```

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::device::{Device, BOOTED};
use crate::runtime::Runtime;
use crate::shell::{Shell, ShellError, ShellOutput};

const XCRUN: &str = "/usr/bin/xcrun";

/// Errors that can occur when interacting with simctl.
#[derive(Error, Debug)]
pub enum SimctlError {
    /// A simctl command exited with a non-zero status.
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    /// No simulator is currently in the "Booted" state.
    #[error("No booted simulator found")]
    NoBootedSimulator,

    /// simctl printed something that is not UTF-8 where text was expected.
    #[error("simctl output is not valid UTF-8")]
    NonUtf8Output,

    /// Failed to parse JSON output from simctl.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The simctl process could not be launched.
    #[error(transparent)]
    Shell(#[from] ShellError),
}

#[derive(Debug, Deserialize)]
struct DeviceList {
    devices: HashMap<String, Vec<Device>>,
}

#[derive(Debug, Deserialize)]
struct RuntimeList {
    runtimes: Vec<Runtime>,
}

/// Wrapper for `xcrun simctl` commands.
///
/// All methods are synchronous and block on the underlying process.
#[derive(Debug, Clone)]
pub struct Simctl<S> {
    shell: S,
    xcrun: String,
}

impl<S: Shell> Simctl<S> {
    /// Creates a wrapper that runs `/usr/bin/xcrun simctl` through `shell`.
    pub fn new(shell: S) -> Self {
        Self {
            shell,
            xcrun: XCRUN.to_string(),
        }
    }

    /// Uses a different `xcrun` executable.
    pub fn with_xcrun(mut self, xcrun: impl Into<String>) -> Self {
        self.xcrun = xcrun.into();
        self
    }

    /// The shell commands are run through.
    pub fn shell(&self) -> &S {
        &self.shell
    }

    /// Runs `xcrun simctl <args>` and returns the raw output, whatever the
    /// exit status.
    pub fn run(&self, args: &[&str]) -> Result<ShellOutput, SimctlError> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push("simctl");
        full.extend_from_slice(args);
        debug!(args = ?full, "invoking simctl");
        Ok(self.shell.run(&self.xcrun, &full)?)
    }

    /// Runs `xcrun simctl <args>`, failing on a non-zero exit status.
    fn run_checked(&self, args: &[&str]) -> Result<ShellOutput, SimctlError> {
        let output = self.run(args)?;
        if !output.is_success() {
            return Err(SimctlError::CommandFailed(output.stderr));
        }
        Ok(output)
    }

    /// Lists all simulator devices.
    ///
    /// Queries `xcrun simctl list devices -j` and returns a flat list of all
    /// devices across all runtimes, each stamped with the runtime key it was
    /// listed under.
    ///
    /// # Errors
    ///
    /// - [`SimctlError::Shell`] if the command fails to launch
    /// - [`SimctlError::CommandFailed`] if simctl returns a non-zero exit code
    /// - [`SimctlError::JsonParse`] if the output cannot be parsed as JSON
    pub fn list_devices(&self) -> Result<Vec<Device>, SimctlError> {
        let output = self.run_checked(&["list", "devices", "-j"])?;
        Self::parse_device_list(&output.stdout)
    }

    /// Lists all installed runtimes via `xcrun simctl list runtimes -j`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::list_devices`].
    pub fn list_runtimes(&self) -> Result<Vec<Runtime>, SimctlError> {
        let output = self.run_checked(&["list", "runtimes", "-j"])?;
        Self::parse_runtime_list(&output.stdout)
    }

    /// Returns the first booted device.
    ///
    /// # Errors
    ///
    /// - [`SimctlError::NoBootedSimulator`] if no simulator is currently booted
    /// - Any errors from [`Self::list_devices`]
    pub fn booted_device(&self) -> Result<Device, SimctlError> {
        let devices = self.list_devices()?;
        devices
            .into_iter()
            .find(|d| d.state == BOOTED)
            .ok_or(SimctlError::NoBootedSimulator)
    }

    /// Boots a simulator device.
    ///
    /// If the simulator is already booted, this method returns successfully
    /// (the "already booted" state is not treated as an error).
    ///
    /// # Errors
    ///
    /// - [`SimctlError::Shell`] if the command fails to launch
    /// - [`SimctlError::CommandFailed`] if simctl returns an error (except for "already booted")
    pub fn boot(&self, udid: &str) -> Result<(), SimctlError> {
        let output = self.run(&["boot", udid])?;

        if !output.is_success() {
            // Already booted is not an error
            if !output.stderr.contains("current state: Booted") {
                return Err(SimctlError::CommandFailed(output.stderr));
            }
        }
        Ok(())
    }

    /// Shuts a simulator device down. A device that is already shut down is
    /// not an error.
    pub fn shutdown(&self, udid: &str) -> Result<(), SimctlError> {
        let output = self.run(&["shutdown", udid])?;

        if !output.is_success() && !output.stderr.contains("current state: Shutdown") {
            return Err(SimctlError::CommandFailed(output.stderr));
        }
        Ok(())
    }

    /// Erases a device's contents and settings. The device must be shut down.
    pub fn erase(&self, udid: &str) -> Result<(), SimctlError> {
        self.run_checked(&["erase", udid])?;
        Ok(())
    }

    /// Installs an `.app` bundle onto a booted device.
    pub fn install(&self, udid: &str, app_path: &str) -> Result<(), SimctlError> {
        self.run_checked(&["install", udid, app_path])?;
        Ok(())
    }

    /// Launches an installed app by bundle identifier.
    ///
    /// Returns whatever simctl prints, normally `<bundle id>: <pid>`.
    pub fn launch(&self, udid: &str, bundle_id: &str) -> Result<String, SimctlError> {
        let output = self.run_checked(&["launch", udid, bundle_id])?;
        output
            .stdout_trimmed()
            .map(str::to_string)
            .ok_or(SimctlError::NonUtf8Output)
    }

    /// Runs `program` inside a booted device with `xcrun simctl spawn` and
    /// returns its standard output.
    pub fn spawn(&self, udid: &str, program: &str, args: &[&str]) -> Result<String, SimctlError> {
        let mut full = vec!["spawn", udid, program];
        full.extend_from_slice(args);
        let output = self.run_checked(&full)?;
        String::from_utf8(output.stdout).map_err(|_| SimctlError::NonUtf8Output)
    }

    /// Parses device list JSON into a flat vector of devices.
    ///
    /// Takes raw JSON bytes (as returned by `simctl list devices -j`) and
    /// returns every device, with [`Device::runtime_name`] set to the key
    /// the device appeared under.
    ///
    /// # Errors
    ///
    /// - [`SimctlError::JsonParse`] if the JSON is invalid or has unexpected structure
    pub fn parse_device_list(json: &[u8]) -> Result<Vec<Device>, SimctlError> {
        let device_list: DeviceList = serde_json::from_slice(json)?;
        let devices = device_list
            .devices
            .into_iter()
            .flat_map(|(runtime, devices)| {
                devices.into_iter().map(move |mut device| {
                    device.runtime_name = runtime.clone();
                    device
                })
            })
            .collect();
        Ok(devices)
    }

    /// Parses runtime list JSON (as returned by `simctl list runtimes -j`).
    pub fn parse_runtime_list(json: &[u8]) -> Result<Vec<Runtime>, SimctlError> {
        let runtime_list: RuntimeList = serde_json::from_slice(json)?;
        Ok(runtime_list.runtimes)
    }

    /// Finds the first booted device in a list.
    pub fn find_booted_device(devices: &[Device]) -> Option<&Device> {
        devices.iter().find(|d| d.state == BOOTED)
    }
}
