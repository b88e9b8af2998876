//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(name = "switcher", version, about = "Multi-port filament switcher CLI")]
pub struct Cli {
    /// Path to config TOML (a missing file means stock defaults)
    #[arg(long, value_name = "FILE", default_value = "etc/switcher.toml")]
    pub config: PathBuf,

    /// Optional port table CSV (strict header), overrides [ports]
    #[arg(long, value_name = "FILE")]
    pub ports: Option<PathBuf>,

    /// Print responses and logs as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Treat this port as active before running the command
    #[arg(long = "start-port", value_name = "N")]
    pub start_port: Option<usize>,

    /// Let simulated dwells and moves take real time
    #[arg(long, action = ArgAction::SetTrue)]
    pub realtime: bool,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show current port, last port and sensor state
    Status,
    /// Forget the current and last port
    Reset,
    /// Make a port current without moving filament
    Select {
        #[arg(long)]
        port: usize,
        /// Seat the port's clutch (1) or release all clutches (0)
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
        servo: u8,
    },
    /// Feed the current port (configured distance unless --dist)
    Feed {
        #[arg(long, allow_negative_numbers = true)]
        dist: Option<f64>,
    },
    /// Nudge the current port by its small-feed distance
    SmallFeed,
    /// Move the feeder stepper directly; clutches are left alone
    MoveStepper {
        #[arg(long, allow_negative_numbers = true)]
        dist: i64,
        #[arg(long, action = ArgAction::SetTrue)]
        slow: bool,
    },
    /// Read the filament sensor
    Sensor,
    /// Unload the current filament and load another port
    Switch {
        #[arg(long)]
        port: usize,
    },
    /// Quick health check (hardware presence / sim ok)
    SelfCheck,
    /// Read FS_* commands from stdin against one controller
    Console,
}
