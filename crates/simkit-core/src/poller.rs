//! Waiting for a device to reach a state.
//!
//! simctl offers no notifications, so observing a device means listing every
//! device again and picking out the one of interest. [`DevicePoller`] does
//! that on a fixed interval until a caller-supplied predicate holds or a
//! deadline passes.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use simkit_core::poller::{DevicePoller, PollOptions};
//! use simkit_core::shell::SystemShell;
//! use simkit_core::simctl::Simctl;
//!
//! let simctl = Simctl::new(SystemShell);
//! let mut device = simctl.list_devices().unwrap().remove(0);
//! simctl.boot(&device.udid).unwrap();
//!
//! let poller = DevicePoller::new(&simctl);
//! poller
//!     .wait(&mut device, PollOptions::with_timeout(Duration::from_secs(60)), |d| d.is_booted())
//!     .unwrap();
//! ```

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::device::Device;
use crate::shell::Shell;
use crate::simctl::{Simctl, SimctlError};

/// Errors that can occur while polling a device.
#[derive(Error, Debug)]
pub enum PollError {
    /// The predicate did not hold before the deadline.
    #[error("timed out after {0:?} waiting for device")]
    Timeout(Duration),

    /// Listing devices failed during a tick.
    #[error("failed to list devices: {0}")]
    Listing(#[from] SimctlError),
}

/// Source of fresh device listings.
pub trait DeviceListing {
    /// Lists every device currently known to the system.
    fn list_devices(&self) -> Result<Vec<Device>, SimctlError>;
}

impl<S: Shell> DeviceListing for Simctl<S> {
    fn list_devices(&self) -> Result<Vec<Device>, SimctlError> {
        Simctl::list_devices(self)
    }
}

impl<L: DeviceListing + ?Sized> DeviceListing for &L {
    fn list_devices(&self) -> Result<Vec<Device>, SimctlError> {
        (**self).list_devices()
    }
}

/// Timing for [`DevicePoller::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Maximum time to wait for the predicate (default: 30s).
    pub timeout: Duration,
    /// Sleep before each listing (default: 1s).
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            interval: Duration::from_secs(1),
        }
    }
}

impl PollOptions {
    /// Default interval with the given timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

/// Refreshes device snapshots from a [`DeviceListing`].
#[derive(Debug, Clone)]
pub struct DevicePoller<L> {
    listing: L,
}

impl<L: DeviceListing> DevicePoller<L> {
    pub fn new(listing: L) -> Self {
        Self { listing }
    }

    /// Replaces `device`'s fields with a freshly listed copy.
    ///
    /// Returns `Ok(false)` and leaves `device` untouched if the listing no
    /// longer contains its UDID.
    ///
    /// # Errors
    ///
    /// Returns [`SimctlError`] if listing fails.
    pub fn reload(&self, device: &mut Device) -> Result<bool, SimctlError> {
        let fresh = self
            .listing
            .list_devices()?
            .into_iter()
            .find(|d| d.udid == device.udid);

        match fresh {
            Some(fresh) => {
                device.refresh_from(fresh);
                Ok(true)
            }
            None => {
                debug!(udid = %device.udid, "device missing from listing, keeping snapshot");
                Ok(false)
            }
        }
    }

    /// Blocks until `until` holds for `device`, refreshing it every
    /// `options.interval`.
    ///
    /// Each tick sleeps, reloads `device` in place, then evaluates `until`.
    /// The predicate is only checked after a successful refresh, so the
    /// snapshot passed in is never accepted as is. A tick on which the device
    /// is missing from the listing only checks the deadline.
    ///
    /// A timeout too large to represent as a deadline waits indefinitely.
    ///
    /// # Errors
    ///
    /// - [`PollError::Listing`] as soon as a listing fails (no retry)
    /// - [`PollError::Timeout`] if the deadline passes with `until` still false;
    ///   `device` then holds the last state observed
    pub fn wait<F>(&self, device: &mut Device, options: PollOptions, mut until: F) -> Result<(), PollError>
    where
        F: FnMut(&Device) -> bool,
    {
        let deadline = Instant::now().checked_add(options.timeout);
        let mut ticks: u32 = 0;

        loop {
            std::thread::sleep(options.interval);
            ticks = ticks.saturating_add(1);

            let found = self.reload(device)?;
            debug!(udid = %device.udid, state = %device.state, found, ticks, "polled device");

            if found && until(&*device) {
                return Ok(());
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(PollError::Timeout(options.timeout));
            }
        }
    }
}
