//! High-level access to simulator devices.
//!
//! [`Simulator`] owns one [`Shell`] and one [`SimkitConfig`] and exposes the
//! operations callers usually want: finding devices, resolving a device's
//! runtime and its on-disk root, reading device metadata, listing services,
//! and booting or launching a device and waiting for it.
//!
//! # Example
//!
//! ```no_run
//! use simkit_core::config::SimkitConfig;
//! use simkit_core::shell::SystemShell;
//! use simkit_core::simulator::Simulator;
//!
//! let simulator = Simulator::new(SystemShell, &SimkitConfig::load());
//! let mut device = simulator.find_device("B9AC1102-025F-4921-B39D-45E18D484FC4").unwrap();
//!
//! simulator.boot(&mut device, None).unwrap();
//! println!("launchctl at {}", simulator.launchctl_path(&device).unwrap().display());
//! for service in simulator.services(&device).unwrap() {
//!     println!("{:?}\t{}", service.pid, service.label);
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::SimkitConfig;
use crate::device::{Device, DevicePlist, GlobalPreferences, SHUTDOWN};
use crate::metadata::{read_metadata, MetadataError};
use crate::poller::{DevicePoller, PollError, PollOptions};
use crate::resolver::{ResolveError, RuntimePathResolver};
use crate::runtime::{self, Platform, Runtime};
use crate::service::{parse_launchctl_list, Service, ServiceError};
use crate::shell::{Shell, ShellError};
use crate::simctl::{Simctl, SimctlError};
use crate::xcode::{Xcode, XcodeError};

const OPEN: &str = "/usr/bin/open";

/// Prefix of runtime identifiers, used to recognise simctl listings keyed by
/// identifier rather than by display name.
const RUNTIME_IDENTIFIER_PREFIX: &str = "com.apple.CoreSimulator.SimRuntime.";

/// Errors returned by [`Simulator`] operations.
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error(transparent)]
    Simctl(#[from] SimctlError),

    #[error(transparent)]
    Xcode(#[from] XcodeError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Shell(#[from] ShellError),

    /// A metadata file could not be decoded.
    #[error("failed to read {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: MetadataError,
    },

    /// An auxiliary command (e.g. `open`) exited non-zero.
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    /// No device with this UDID is listed.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The device's runtime is not among the installed runtimes.
    #[error("runtime not found: {0}")]
    RuntimeNotFound(String),

    /// No devices directory is configured and no home directory is known.
    #[error("could not determine the CoreSimulator devices directory")]
    NoDevicesDirectory,
}

impl SimulatorError {
    /// Returns `true` for the "waited too long" failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SimulatorError::Poll(PollError::Timeout(_)))
    }

    /// Returns `true` when a device, runtime or runtime profile does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SimulatorError::DeviceNotFound(_)
                | SimulatorError::RuntimeNotFound(_)
                | SimulatorError::Resolve(ResolveError::RuntimeProfileNotFound { .. })
        )
    }
}

/// Entry point for querying and controlling simulators.
#[derive(Debug, Clone)]
pub struct Simulator<S> {
    shell: S,
    simctl: Simctl<S>,
    xcode: Xcode<S>,
    resolver: RuntimePathResolver<S>,
    devices_dir: Option<PathBuf>,
    poll_options: PollOptions,
}

impl<S: Shell + Clone> Simulator<S> {
    /// Builds a simulator facade running every command through `shell`.
    pub fn new(shell: S, config: &SimkitConfig) -> Self {
        let xcode = Xcode::new(shell.clone()).with_developer_dir(config.developer_dir.clone());
        let resolver = RuntimePathResolver::new(xcode.clone())
            .with_system_runtimes_dir(config.system_runtimes_dir());

        Self {
            simctl: Simctl::new(shell.clone()),
            shell,
            xcode,
            resolver,
            devices_dir: config.devices_dir(),
            poll_options: config.poll_options(None),
        }
    }

    pub fn simctl(&self) -> &Simctl<S> {
        &self.simctl
    }

    pub fn xcode(&self) -> &Xcode<S> {
        &self.xcode
    }

    pub fn resolver(&self) -> &RuntimePathResolver<S> {
        &self.resolver
    }

    fn poller(&self) -> DevicePoller<&Simctl<S>> {
        DevicePoller::new(&self.simctl)
    }

    fn poll_options(&self, timeout: Option<Duration>) -> PollOptions {
        PollOptions {
            timeout: timeout.unwrap_or(self.poll_options.timeout),
            ..self.poll_options
        }
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    pub fn devices(&self) -> Result<Vec<Device>, SimulatorError> {
        Ok(self.simctl.list_devices()?)
    }

    pub fn runtimes(&self) -> Result<Vec<Runtime>, SimulatorError> {
        Ok(self.simctl.list_runtimes()?)
    }

    /// Looks a device up by UDID.
    pub fn find_device(&self, udid: &str) -> Result<Device, SimulatorError> {
        self.devices()?
            .into_iter()
            .find(|d| d.udid == udid)
            .ok_or_else(|| SimulatorError::DeviceNotFound(udid.to_string()))
    }

    /// The newest installed runtime for `platform`, if any.
    pub fn latest_runtime(&self, platform: Platform) -> Result<Option<Runtime>, SimulatorError> {
        let runtimes = self.runtimes()?;
        Ok(runtime::latest(&runtimes, platform).cloned())
    }

    // -----------------------------------------------------------------------
    // Device metadata
    // -----------------------------------------------------------------------

    pub fn devices_dir(&self) -> Result<PathBuf, SimulatorError> {
        self.devices_dir
            .clone()
            .ok_or(SimulatorError::NoDevicesDirectory)
    }

    pub fn home_path(&self, device: &Device) -> Result<PathBuf, SimulatorError> {
        Ok(device.home_path(&self.devices_dir()?))
    }

    /// Reads the device's `device.plist`.
    pub fn device_plist(&self, device: &Device) -> Result<DevicePlist, SimulatorError> {
        let path = device.device_plist_path(&self.devices_dir()?);
        read_metadata(&path).map_err(|source| SimulatorError::Metadata { path, source })
    }

    /// The device type identifier, e.g. `com.apple.CoreSimulator.SimDeviceType.iPhone-XR`.
    pub fn device_type(&self, device: &Device) -> Result<String, SimulatorError> {
        if let Some(device_type) = &device.device_type {
            return Ok(device_type.clone());
        }
        Ok(self.device_plist(device)?.device_type)
    }

    /// Reads locale and language settings from the device's global preferences.
    pub fn global_preferences(&self, device: &Device) -> Result<GlobalPreferences, SimulatorError> {
        let path = device.global_preferences_plist_path(&self.devices_dir()?);
        read_metadata(&path).map_err(|source| SimulatorError::Metadata { path, source })
    }

    /// The identifier of the runtime the device was created with.
    ///
    /// Taken from the listing key when simctl keys devices by runtime
    /// identifier; otherwise read from `device.plist`.
    pub fn runtime_identifier(&self, device: &Device) -> Result<String, SimulatorError> {
        if device.runtime_name.starts_with(RUNTIME_IDENTIFIER_PREFIX) {
            return Ok(device.runtime_name.clone());
        }
        Ok(self.device_plist(device)?.runtime)
    }

    /// The installed runtime the device runs.
    pub fn runtime(&self, device: &Device) -> Result<Runtime, SimulatorError> {
        let identifier = self.runtime_identifier(device)?;
        self.runtimes()?
            .into_iter()
            .find(|r| r.identifier == identifier)
            .ok_or(SimulatorError::RuntimeNotFound(identifier))
    }

    /// Root directory of the device's runtime payload (`RuntimeRoot`).
    pub fn runtime_path(&self, device: &Device) -> Result<PathBuf, SimulatorError> {
        let runtime = self.runtime(device)?;
        debug!(udid = %device.udid, runtime = %runtime.identifier, "resolving runtime root");
        Ok(self.resolver.resolve(runtime.platform(), &runtime.identifier)?)
    }

    /// The `launchctl` binary inside the device's runtime.
    pub fn launchctl_path(&self, device: &Device) -> Result<PathBuf, SimulatorError> {
        Ok(self.runtime_path(device)?.join("bin/launchctl"))
    }

    /// Services known to launchd inside a booted device.
    pub fn services(&self, device: &Device) -> Result<Vec<Service>, SimulatorError> {
        let output = self.simctl.spawn(&device.udid, "launchctl", &["list"])?;
        Ok(parse_launchctl_list(&output)?)
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    /// Refreshes `device` from a new listing. See [`DevicePoller::reload`].
    pub fn reload(&self, device: &mut Device) -> Result<bool, SimulatorError> {
        Ok(self.poller().reload(device)?)
    }

    /// Blocks until `until` holds for `device`. See [`DevicePoller::wait`].
    ///
    /// `timeout` defaults to the configured wait timeout.
    pub fn wait<F>(&self, device: &mut Device, timeout: Option<Duration>, until: F) -> Result<(), SimulatorError>
    where
        F: FnMut(&Device) -> bool,
    {
        Ok(self.poller().wait(device, self.poll_options(timeout), until)?)
    }

    /// Blocks until the device reports `state`.
    pub fn wait_for_state(
        &self,
        device: &mut Device,
        state: &str,
        timeout: Option<Duration>,
    ) -> Result<(), SimulatorError> {
        self.wait(device, timeout, |d| d.state == state)
    }

    /// Boots the device headlessly and waits until it is booted.
    pub fn boot(&self, device: &mut Device, timeout: Option<Duration>) -> Result<(), SimulatorError> {
        info!(udid = %device.udid, "booting device");
        self.simctl.boot(&device.udid)?;
        self.wait(device, timeout, Device::is_booted)
    }

    /// Shuts the device down and waits until it reports `Shutdown`.
    pub fn shutdown(&self, device: &mut Device, timeout: Option<Duration>) -> Result<(), SimulatorError> {
        info!(udid = %device.udid, "shutting down device");
        self.simctl.shutdown(&device.udid)?;
        self.wait_for_state(device, SHUTDOWN, timeout)
    }

    /// Opens `Simulator.app` on the device and waits until it is booted.
    pub fn launch(&self, device: &mut Device, timeout: Option<Duration>) -> Result<(), SimulatorError> {
        let app = self.xcode.simulator_app_path()?;
        let app = app.to_string_lossy();
        info!(udid = %device.udid, app = %app, "launching Simulator.app");

        let output = self.shell.run(
            OPEN,
            &["-Fgn", &*app, "--args", "-CurrentDeviceUDID", device.udid.as_str()],
        )?;
        if !output.is_success() {
            return Err(SimulatorError::CommandFailed(output.stderr));
        }

        self.wait(device, timeout, Device::is_booted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(SimulatorError::Poll(PollError::Timeout(Duration::from_secs(1))).is_timeout());
        assert!(!SimulatorError::DeviceNotFound("X".into()).is_timeout());

        assert!(SimulatorError::DeviceNotFound("X".into()).is_not_found());
        assert!(SimulatorError::RuntimeNotFound("X".into()).is_not_found());
        assert!(SimulatorError::Resolve(ResolveError::RuntimeProfileNotFound {
            identifier: "X".into()
        })
        .is_not_found());
        assert!(!SimulatorError::CommandFailed("boom".into()).is_not_found());
    }
}
