//! # simkit-core
//!
//! Core library for querying and controlling Xcode simulators on macOS.
//!
//! This crate wraps the tools that ship with Xcode (`xcrun simctl`,
//! `xcode-select`, `open`) and turns their output into typed records. On top
//! of that it adds the two pieces that need actual decisions: finding where a
//! runtime is installed, and waiting for a device to reach a state.
//!
//! ## Modules
//!
//! - [`shell`] - The process-execution capability every other module runs through
//! - [`simctl`] - Wrapper around `xcrun simctl` for listing and controlling devices
//! - [`device`] - Device records and their on-disk layout
//! - [`runtime`] - Runtime records, platforms, and version ordering
//! - [`xcode`] - Paths inside the active Xcode installation
//! - [`metadata`] - Typed decoding of property lists and JSON metadata files
//! - [`resolver`] - Locating a runtime's installed root directory
//! - [`poller`] - Refreshing a device snapshot until a condition holds
//! - [`service`] - Parsing `launchctl list` output from inside a device
//! - [`simulator`] - High-level facade tying the above together
//! - [`config`] - Persistent user configuration
//!
//! ## External Dependencies
//!
//! - **Xcode** (for `xcrun simctl` and `xcode-select`)
//!
//! ## Example
//!
//! ```no_run
//! use simkit_core::config::SimkitConfig;
//! use simkit_core::shell::SystemShell;
//! use simkit_core::simulator::Simulator;
//!
//! let simulator = Simulator::new(SystemShell, &SimkitConfig::load());
//!
//! let mut device = simulator
//!     .devices()
//!     .expect("simctl failed")
//!     .into_iter()
//!     .find(|d| d.name == "iPhone 15" && d.is_available == Some(true))
//!     .expect("no iPhone 15");
//!
//! simulator.boot(&mut device, None).expect("boot failed");
//! let root = simulator.runtime_path(&device).expect("runtime root not found");
//! println!("{} runs from {}", device.name, root.display());
//! ```

pub mod config;
pub mod device;
pub mod metadata;
pub mod poller;
pub mod resolver;
pub mod runtime;
pub mod service;
pub mod shell;
pub mod simctl;
pub mod simulator;
pub mod xcode;
