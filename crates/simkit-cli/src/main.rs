//! Command-line front end for simulator devices and runtimes.
//!
//! # Usage
//!
//! ```bash
//! # List devices (optionally only booted ones)
//! simkit list-devices
//! simkit list-devices --booted -f json
//!
//! # List runtimes and pick the newest for a platform
//! simkit list-runtimes
//! simkit latest-runtime ios
//!
//! # Boot headlessly, or open Simulator.app, and wait for the device
//! simkit boot B9AC1102-025F-4921-B39D-45E18D484FC4
//! simkit launch B9AC1102-025F-4921-B39D-45E18D484FC4 -t 120
//!
//! # Wait for an arbitrary state
//! simkit wait B9AC1102-025F-4921-B39D-45E18D484FC4 --state Shutdown
//!
//! # Inspect a device
//! simkit info B9AC1102-025F-4921-B39D-45E18D484FC4
//! simkit runtime-path B9AC1102-025F-4921-B39D-45E18D484FC4
//! simkit services B9AC1102-025F-4921-B39D-45E18D484FC4
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use simkit_core::config::SimkitConfig;
use simkit_core::device::{Device, BOOTED};
use simkit_core::runtime::Platform;
use simkit_core::shell::SystemShell;
use simkit_core::simulator::{Simulator, SimulatorError};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Query and control Xcode simulator devices.
#[derive(Parser)]
#[command(name = "simkit")]
#[command(about = "Query and control Xcode simulator devices and runtimes")]
#[command(version)]
struct Cli {
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Developer directory to use instead of `xcode-select -p`
    #[arg(long, env = "SIMKIT_DEVELOPER_DIR")]
    developer_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List simulator devices
    ListDevices {
        /// Only show booted devices
        #[arg(long)]
        booted: bool,
    },

    /// List installed runtimes
    ListRuntimes,

    /// Show the newest installed runtime for a platform
    LatestRuntime {
        /// Platform: ios, watchos, tvos
        platform: String,
    },

    /// Boot a device headlessly and wait until it is booted
    Boot {
        /// Device UDID
        udid: String,
        /// Timeout in seconds
        #[arg(short, long, env = "SIMKIT_TIMEOUT")]
        timeout: Option<u64>,
    },

    /// Shut a device down and wait until it is shut down
    Shutdown {
        /// Device UDID
        udid: String,
        /// Timeout in seconds
        #[arg(short, long, env = "SIMKIT_TIMEOUT")]
        timeout: Option<u64>,
    },

    /// Erase a device's contents and settings
    Erase {
        /// Device UDID
        udid: String,
    },

    /// Open Simulator.app on a device and wait until it is booted
    Launch {
        /// Device UDID
        udid: String,
        /// Timeout in seconds
        #[arg(short, long, env = "SIMKIT_TIMEOUT")]
        timeout: Option<u64>,
    },

    /// Wait until a device reports a state
    Wait {
        /// Device UDID
        udid: String,
        /// State to wait for
        #[arg(short, long, default_value = BOOTED)]
        state: String,
        /// Timeout in seconds
        #[arg(short, long, env = "SIMKIT_TIMEOUT")]
        timeout: Option<u64>,
    },

    /// Print the root directory of a device's runtime
    RuntimePath {
        /// Device UDID
        udid: String,
    },

    /// List launchd services inside a booted device
    Services {
        /// Device UDID
        udid: String,
    },

    /// Show everything known about a device
    Info {
        /// Device UDID
        udid: String,
    },

    /// Show or change persistent configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Persist a developer directory to use instead of `xcode-select -p`
    SetDeveloperDir {
        /// Path to a `.../Contents/Developer` directory
        path: PathBuf,
    },
    /// Persist the default wait timeout in seconds
    SetTimeout {
        seconds: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn init_logging(log_file: Option<&std::path::Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let name = path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "simkit.log".into());
            let appender = tracing_appender::rolling::never(dir.unwrap_or(std::path::Path::new(".")), name);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(appender)
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

#[derive(Debug)]
enum CliError {
    Failed(String),
    Timeout(String),
    NotFound(String),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Failed(_) => ExitCode::from(1),
            CliError::Timeout(_) => ExitCode::from(2),
            CliError::NotFound(_) => ExitCode::from(3),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Failed(msg) => write!(f, "{}", msg),
            CliError::Timeout(msg) => write!(f, "Timed out: {}", msg),
            CliError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl From<SimulatorError> for CliError {
    fn from(e: SimulatorError) -> Self {
        if e.is_timeout() {
            CliError::Timeout(e.to_string())
        } else if e.is_not_found() {
            CliError::NotFound(e.to_string())
        } else {
            CliError::Failed(e.to_string())
        }
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::Failed(e.to_string()))
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = SimkitConfig::load();
    let command = match cli.command {
        Command::Config { action } => return run_config(&action, config, cli.format),
        other => other,
    };
    // A one-off override is never persisted.
    if cli.developer_dir.is_some() {
        config.developer_dir = cli.developer_dir;
    }

    let simulator = Simulator::new(SystemShell, &config);
    let json = cli.format == OutputFormat::Json;
    let timeout = |secs: Option<u64>| secs.map(Duration::from_secs);

    match command {
        Command::ListDevices { booted } => {
            let devices: Vec<Device> = simulator
                .devices()?
                .into_iter()
                .filter(|d| !booted || d.is_booted())
                .collect();
            if json {
                println!("{}", to_json(&devices)?);
            } else if devices.is_empty() {
                eprintln!("No simulator devices found");
            } else {
                for device in &devices {
                    let state = if device.is_booted() { " (Booted)" } else { "" };
                    println!("{} -- {} [{}]{}", device.udid, device.name, device.runtime_name, state);
                }
            }
        }
        Command::ListRuntimes => {
            let runtimes = simulator.runtimes()?;
            if json {
                println!("{}", to_json(&runtimes)?);
            } else {
                for runtime in &runtimes {
                    let available = if runtime.is_available == Some(false) { " (unavailable)" } else { "" };
                    println!("{} ({}) -- {}{}", runtime.name, runtime.build_version, runtime.identifier, available);
                }
            }
        }
        Command::LatestRuntime { ref platform } => {
            let parsed = Platform::parse(platform);
            if parsed == Platform::Unknown {
                return Err(CliError::Failed(format!(
                    "Unknown platform '{}': expected ios, watchos or tvos",
                    platform
                )));
            }
            let runtime = simulator
                .latest_runtime(parsed)?
                .ok_or_else(|| CliError::NotFound(format!("no {} runtime installed", parsed)))?;
            if json {
                println!("{}", to_json(&runtime)?);
            } else {
                println!("{} -- {}", runtime.name, runtime.identifier);
            }
        }
        Command::Boot { ref udid, timeout: secs } => {
            let mut device = simulator.find_device(udid)?;
            simulator.boot(&mut device, timeout(secs))?;
            report_state(&device, json)?;
        }
        Command::Shutdown { ref udid, timeout: secs } => {
            let mut device = simulator.find_device(udid)?;
            simulator.shutdown(&mut device, timeout(secs))?;
            report_state(&device, json)?;
        }
        Command::Erase { ref udid } => {
            simulator.simctl().erase(udid).map_err(SimulatorError::from)?;
            if json {
                println!("{}", serde_json::json!({ "success": true, "udid": udid }));
            } else {
                eprintln!("Erased device {}", udid);
            }
        }
        Command::Launch { ref udid, timeout: secs } => {
            let mut device = simulator.find_device(udid)?;
            simulator.launch(&mut device, timeout(secs))?;
            report_state(&device, json)?;
        }
        Command::Wait { ref udid, ref state, timeout: secs } => {
            let mut device = simulator.find_device(udid)?;
            info!(udid = %udid, state = %state, "waiting for device state");
            simulator.wait_for_state(&mut device, state, timeout(secs))?;
            report_state(&device, json)?;
        }
        Command::RuntimePath { ref udid } => {
            let device = simulator.find_device(udid)?;
            let path = simulator.runtime_path(&device)?;
            if json {
                println!("{}", serde_json::json!({ "udid": udid, "runtime_path": path }));
            } else {
                println!("{}", path.display());
            }
        }
        Command::Services { ref udid } => {
            let device = simulator.find_device(udid)?;
            let services = simulator.services(&device)?;
            if json {
                println!("{}", to_json(&services)?);
            } else {
                for service in &services {
                    let pid = service.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
                    println!("{}\t{}\t{}", pid, service.status, service.label);
                }
            }
        }
        Command::Info { ref udid } => {
            let device = simulator.find_device(udid)?;
            print_info(&simulator, &device, json)?;
        }
        Command::Config { .. } => {}
    }

    Ok(())
}

fn report_state(device: &Device, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", to_json(device)?);
    } else {
        eprintln!("Device {} is {}", device.udid, device.state);
    }
    Ok(())
}

/// Prints a device with whatever of its runtime and paths can be resolved.
/// Lookups that fail are shown as unavailable rather than aborting.
fn print_info(simulator: &Simulator<SystemShell>, device: &Device, json: bool) -> Result<(), CliError> {
    let runtime = simulator.runtime(device).ok();
    let runtime_path = simulator.runtime_path(device).ok();
    let home = simulator.home_path(device).ok();
    let device_type = simulator.device_type(device).ok();

    if json {
        let value = serde_json::json!({
            "device": device,
            "device_type": device_type,
            "runtime": runtime,
            "runtime_path": runtime_path,
            "home_path": home,
        });
        println!("{}", to_json(&value)?);
        return Ok(());
    }

    let or_unknown = |value: Option<String>| value.unwrap_or_else(|| "(unavailable)".to_string());
    println!("Name:          {}", device.name);
    println!("UDID:          {}", device.udid);
    println!("State:         {}", device.state);
    println!("Device type:   {}", or_unknown(device_type));
    println!("Runtime:       {}", or_unknown(runtime.map(|r| format!("{} ({})", r.name, r.identifier))));
    println!("Runtime root:  {}", or_unknown(runtime_path.map(|p| p.display().to_string())));
    println!("Home:          {}", or_unknown(home.map(|p| p.display().to_string())));
    if !device.availability_error.is_empty() {
        println!("Unavailable:   {}", device.availability_error);
    }
    Ok(())
}

fn run_config(action: &ConfigAction, mut config: SimkitConfig, format: OutputFormat) -> Result<(), CliError> {
    match action {
        ConfigAction::Show => {
            if format == OutputFormat::Json {
                println!("{}", to_json(&config)?);
            } else {
                let developer = config
                    .developer_dir
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(xcode-select -p)".to_string());
                println!("developer_dir:        {}", developer);
                println!("system_runtimes_dir:  {}", config.system_runtimes_dir().display());
                println!(
                    "devices_dir:          {}",
                    config
                        .devices_dir()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(unknown)".to_string())
                );
                println!("poll_interval:        {:?}", config.poll_interval());
                println!("wait_timeout:         {:?}", config.wait_timeout());
            }
            return Ok(());
        }
        ConfigAction::SetDeveloperDir { path } => {
            if !path.is_dir() {
                return Err(CliError::NotFound(format!("{} is not a directory", path.display())));
            }
            config.developer_dir = Some(path.clone());
        }
        ConfigAction::SetTimeout { seconds } => {
            config.wait_timeout_secs = Some(*seconds);
        }
    }

    config
        .save()
        .map_err(|e| CliError::Failed(format!("Failed to save config: {}", e)))?;
    eprintln!("Configuration saved");
    Ok(())
}
