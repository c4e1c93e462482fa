//! Process execution capability.
//!
//! Every external tool this crate talks to (`xcrun simctl`, `xcode-select`,
//! `open`) goes through the [`Shell`] trait. The production implementation,
//! [`SystemShell`], spawns real processes; tests substitute a scripted shell
//! that returns canned output.
//!
//! A [`Shell`] only reports what happened. Interpreting a non-zero exit code
//! is left to the caller, since some tools (e.g. `simctl boot` on an already
//! booted device) fail in ways that are not errors.

use std::process::Command;

use thiserror::Error;
use tracing::debug;

/// Errors that can occur while launching an external program.
#[derive(Error, Debug)]
pub enum ShellError {
    /// The program could not be started at all (missing binary, permissions).
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    /// Exit code. `-1` when the process was terminated by a signal.
    pub status: i32,
    /// Raw standard output.
    pub stdout: Vec<u8>,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

impl ShellOutput {
    /// Successful output with the given stdout.
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns `true` if the process exited with code zero.
    pub fn is_success(&self) -> bool {
        self.status == 0
    }

    /// Standard output as UTF-8 with trailing newlines removed.
    ///
    /// Returns `None` if the output is not valid UTF-8.
    pub fn stdout_trimmed(&self) -> Option<&str> {
        std::str::from_utf8(&self.stdout)
            .ok()
            .map(|s| s.trim_end_matches(|c| c == '\n' || c == '\r'))
    }
}

/// Runs external programs and captures their output.
pub trait Shell {
    /// Runs `program` with `args` to completion.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Spawn`] if the process cannot be started. A
    /// process that starts and exits non-zero is reported through
    /// [`ShellOutput::status`], not as an error.
    fn run(&self, program: &str, args: &[&str]) -> Result<ShellOutput, ShellError>;
}

impl<S: Shell + ?Sized> Shell for &S {
    fn run(&self, program: &str, args: &[&str]) -> Result<ShellOutput, ShellError> {
        (**self).run(program, args)
    }
}

/// [`Shell`] backed by [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShell;

impl Shell for SystemShell {
    fn run(&self, program: &str, args: &[&str]) -> Result<ShellOutput, ShellError> {
        debug!(program, ?args, "running command");

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| ShellError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let status = output.status.code().unwrap_or(-1);
        debug!(program, status, "command finished");

        Ok(ShellOutput {
            status,
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
