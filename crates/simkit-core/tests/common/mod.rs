//! Shared test helpers for simkit-core integration tests.
//!
//! Provides a scripted [`MockShell`] that answers commands with canned
//! output, plus builders for simctl JSON and on-disk runtime bundles.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use serde_json::json;

use simkit_core::shell::{Shell, ShellError, ShellOutput};

pub const XCRUN: &str = "/usr/bin/xcrun";
pub const XCODE_SELECT: &str = "/usr/bin/xcode-select";
pub const OPEN: &str = "/usr/bin/open";

pub const LIST_DEVICES: &[&str] = &[XCRUN, "simctl", "list", "devices", "-j"];
pub const LIST_RUNTIMES: &[&str] = &[XCRUN, "simctl", "list", "runtimes", "-j"];

// ---------------------------------------------------------------------------
// MockShell
// ---------------------------------------------------------------------------

/// A [`Shell`] that replays scripted output keyed by the full command line.
///
/// Each command has a queue of outputs. Calls pop from the queue until one
/// entry is left, which is then repeated. Unstubbed commands exit with
/// status 1.
#[derive(Default)]
pub struct MockShell {
    stubs: RefCell<HashMap<Vec<String>, VecDeque<ShellOutput>>>,
    calls: RefCell<Vec<Vec<String>>>,
}

fn key(command: &[&str]) -> Vec<String> {
    command.iter().map(|s| s.to_string()).collect()
}

impl MockShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `output` to the queue for `command` (program first).
    pub fn stub(&self, command: &[&str], output: ShellOutput) -> &Self {
        self.stubs
            .borrow_mut()
            .entry(key(command))
            .or_default()
            .push_back(output);
        self
    }

    /// Stubs `xcode-select -p` to print `dir`.
    pub fn stub_developer_dir(&self, dir: &Path) -> &Self {
        self.stub(
            &[XCODE_SELECT, "-p"],
            ShellOutput::success(format!("{}\n", dir.display())),
        )
    }

    /// Queues one `simctl list devices -j` response.
    pub fn stub_devices(&self, json: serde_json::Value) -> &Self {
        self.stub(LIST_DEVICES, ShellOutput::success(json.to_string()))
    }

    /// Queues one `simctl list runtimes -j` response.
    pub fn stub_runtimes(&self, json: serde_json::Value) -> &Self {
        self.stub(LIST_RUNTIMES, ShellOutput::success(json.to_string()))
    }

    /// Number of times `command` has been run.
    pub fn call_count(&self, command: &[&str]) -> usize {
        let wanted = key(command);
        self.calls.borrow().iter().filter(|c| **c == wanted).count()
    }

    /// Every command run so far, program first.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }
}

impl Shell for MockShell {
    fn run(&self, program: &str, args: &[&str]) -> Result<ShellOutput, ShellError> {
        let mut command = vec![program.to_string()];
        command.extend(args.iter().map(|a| a.to_string()));
        self.calls.borrow_mut().push(command.clone());

        let mut stubs = self.stubs.borrow_mut();
        let output = match stubs.get_mut(&command) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        Ok(output.unwrap_or_else(|| {
            ShellOutput::failure(1, format!("no stub for {}", command.join(" ")))
        }))
    }
}

// ---------------------------------------------------------------------------
// simctl JSON builders
// ---------------------------------------------------------------------------

/// A single device entry as simctl prints it.
pub fn device_json(udid: &str, name: &str, state: &str) -> serde_json::Value {
    json!({
        "udid": udid,
        "name": name,
        "state": state,
        "isAvailable": true,
        "deviceTypeIdentifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-15",
    })
}

/// A `list devices -j` document with all devices under one runtime key.
pub fn device_list(runtime_key: &str, devices: Vec<serde_json::Value>) -> serde_json::Value {
    json!({ "devices": { runtime_key: devices } })
}

/// A runtime entry as simctl prints it.
pub fn runtime_json(identifier: &str, name: &str, version: &str) -> serde_json::Value {
    json!({
        "identifier": identifier,
        "name": name,
        "version": version,
        "buildversion": "21A328",
        "isAvailable": true,
    })
}

pub fn runtime_list(runtimes: Vec<serde_json::Value>) -> serde_json::Value {
    json!({ "runtimes": runtimes })
}

// ---------------------------------------------------------------------------
// On-disk fixtures
// ---------------------------------------------------------------------------

/// Where Xcode keeps runtime bundles for `device_platform` under `developer`.
pub fn xcode_runtimes_dir(developer: &Path, device_platform: &str) -> PathBuf {
    developer
        .join("Platforms")
        .join(format!("{device_platform}.platform"))
        .join("Developer/Library/CoreSimulator/Profiles/Runtimes")
}

/// Creates `<dir>/<name>` with an `Info.plist` naming `identifier` and a
/// `RuntimeRoot` directory. Returns the `RuntimeRoot` path.
pub fn write_runtime_bundle(dir: &Path, name: &str, identifier: &str) -> PathBuf {
    let bundle = dir.join(name);
    let root = bundle.join("Contents/Resources/RuntimeRoot");
    std::fs::create_dir_all(&root).unwrap();

    let mut dict = plist::Dictionary::new();
    dict.insert(
        "CFBundleIdentifier".to_string(),
        plist::Value::String(identifier.to_string()),
    );
    plist::Value::Dictionary(dict)
        .to_file_xml(bundle.join("Contents/Info.plist"))
        .unwrap();
    root
}

/// Creates `<dir>/<name>/Contents/Info.plist` with raw `contents`.
pub fn write_raw_info_plist(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let bundle = dir.join(name);
    std::fs::create_dir_all(bundle.join("Contents/Resources/RuntimeRoot")).unwrap();
    std::fs::write(bundle.join("Contents/Info.plist"), contents).unwrap();
    bundle
}

/// Writes a `device.plist` for `udid` under `devices_dir`.
pub fn write_device_plist(devices_dir: &Path, udid: &str, runtime: &str, device_type: &str) {
    let home = devices_dir.join(udid);
    std::fs::create_dir_all(&home).unwrap();

    let mut dict = plist::Dictionary::new();
    dict.insert("UDID".to_string(), plist::Value::String(udid.to_string()));
    dict.insert("deviceType".to_string(), plist::Value::String(device_type.to_string()));
    dict.insert("runtime".to_string(), plist::Value::String(runtime.to_string()));
    dict.insert("name".to_string(), plist::Value::String("iPhone XR".to_string()));
    dict.insert("state".to_string(), plist::Value::from(1u64));
    plist::Value::Dictionary(dict)
        .to_file_binary(home.join("device.plist"))
        .unwrap();
}
