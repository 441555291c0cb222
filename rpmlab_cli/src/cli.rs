//! CLI argument definitions.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rpmlab", version, about = "Motor speed bench rig")]
pub struct Cli {
    /// Path to config TOML; the built-in simulator config is used when absent
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and report errors as JSON instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging] level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive console: PWM <n>, START <n>, STOP, f/r, or a bare duty
    Console,
    /// Run one ascending-then-descending duty staircase and print the capture
    Staircase {
        /// Duty increment per level (1..=100)
        #[arg(long, allow_negative_numbers = true)]
        step: i32,
        /// Override capture.step_duration_ms
        #[arg(long, value_name = "MS")]
        step_ms: Option<u32>,
    },
    /// Capture at a fixed duty for a fixed time
    Hold {
        /// Duty percentage (0..=100)
        #[arg(long, allow_negative_numbers = true)]
        duty: i32,
        /// Override capture.hold_duration_ms
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u32>,
    },
    /// Copy device output to a file until the capture completes
    Record {
        /// Device or file to read; stdin when absent or "-"
        #[arg(long, value_name = "PATH")]
        input: Option<PathBuf>,
        /// File the lines are written to (truncated first)
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Per-level mean and max RPM of a recorded capture
    Summarize {
        /// Recorded capture file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Spin briefly at half duty and confirm encoder pulses arrive
    SelfCheck,
}
