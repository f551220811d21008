//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(
    name = "packpilot",
    version,
    about = "Battery pack monitor and thermal auto-pilot"
)]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/packpilot.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Monitor the pack and drive the relays
    Run {
        /// Serial port override
        #[arg(long, value_name = "PORT")]
        port: Option<String>,

        /// Use the built-in pack simulator instead of hardware
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,

        /// Engage auto-pilot immediately at startup
        #[arg(long, action = ArgAction::SetTrue)]
        auto: bool,

        /// Target battery temperature override (°C)
        #[arg(long, value_name = "CELSIUS")]
        setpoint: Option<f64>,

        /// Session CSV directory override
        #[arg(long, value_name = "DIR")]
        log_dir: Option<PathBuf>,

        /// Stop after this many seconds (0 = run until Ctrl-C)
        #[arg(long, value_name = "SECS", default_value_t = 0)]
        run_for: u64,
    },
    /// Quick health check (simulator pipeline end to end)
    SelfCheck,
}
