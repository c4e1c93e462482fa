//! Services running inside a booted simulator.
//!
//! Services are read from `launchctl list`, run inside the device with
//! `xcrun simctl spawn`. The output is a tab-separated table:
//!
//! ```text
//! PID	Status	Label
//! -	0	com.apple.storedownloadd.daemon
//! 3187	0	com.apple.storeagent.daemon
//! ```

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Errors that can occur while parsing `launchctl list` output.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The output does not start with the `PID Status Label` header.
    #[error("invalid launchctl list output: {0}")]
    InvalidLaunchctlOutput(String),
}

/// A launchd job inside a simulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
    /// Process id, `None` when the job is not running.
    pub pid: Option<u32>,
    /// Last exit status (0 when never exited or exited cleanly).
    pub status: i32,
    /// Job label, e.g. `com.apple.storeagent.daemon`.
    pub label: String,
}

impl Service {
    pub fn is_running(&self) -> bool {
        self.pid.is_some()
    }
}

/// Parses `launchctl list` output.
///
/// Rows that do not have three tab-separated fields, or whose PID or status
/// is not numeric, are logged and skipped. Only a missing header fails.
pub fn parse_launchctl_list(output: &str) -> Result<Vec<Service>, ServiceError> {
    let mut lines = output.lines().filter(|line| !line.trim().is_empty());

    match lines.next() {
        Some(header) if header.split_whitespace().next() == Some("PID") => {}
        Some(other) => return Err(ServiceError::InvalidLaunchctlOutput(other.to_string())),
        None => return Err(ServiceError::InvalidLaunchctlOutput("empty output".to_string())),
    }

    Ok(lines.filter_map(parse_row).collect())
}

fn parse_row(line: &str) -> Option<Service> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    let [pid, status, label] = fields.as_slice() else {
        warn!(line, "skipping launchctl row with unexpected field count");
        return None;
    };

    let pid = match *pid {
        "-" => None,
        value => match value.parse() {
            Ok(pid) => Some(pid),
            Err(_) => {
                warn!(line, "skipping launchctl row with non-numeric PID");
                return None;
            }
        },
    };

    let Ok(status) = status.parse() else {
        warn!(line, "skipping launchctl row with non-numeric status");
        return None;
    };

    Some(Service {
        pid,
        status,
        label: label.to_string(),
    })
}
