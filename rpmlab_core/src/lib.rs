#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core measurement logic for the motor bench rig (hardware-agnostic).
//!
//! All hardware interaction goes through `rpmlab_traits::Motor` and
//! `rpmlab_traits::Clock`; encoder edges arrive through an
//! [`counter::EdgeHandle`] from whatever thread the platform delivers them on.
//!
//! ## Architecture
//!
//! - **Counting**: lock-free pulse counter with a single consumer (`counter`)
//! - **Estimation**: pulse-window and edge-period RPM, linear speed (`estimator`)
//! - **Actuation**: duty and H-bridge direction (`actuator`)
//! - **Sampling**: fixed-cadence cooperative scheduler into a bounded buffer
//!   (`scheduler`, `buffer`)
//! - **Stimulus**: staircase and hold captures (`staircase`)
//! - **Surface**: console commands and the text report protocol
//!   (`command`, `report`)
//! - **Orchestration**: the owned `Rig` context and the loops that drive it
//!   (`rig`, `runner`)
//!
//! ## Time
//!
//! Ticks are `u32` milliseconds that wrap; every interval is computed with
//! `wrapping_sub`, so a run may straddle the wrap point.

pub mod actuator;
pub mod buffer;
pub mod command;
pub mod config;
pub mod conversions;
pub mod counter;
pub mod error;
pub mod estimator;
pub mod hw_error;
pub mod mocks;
pub mod report;
pub mod rig;
pub mod runner;
pub mod scheduler;
pub mod staircase;
pub mod summary;
pub mod util;

pub use actuator::{Direction, MotorDriver, MotorState};
pub use buffer::{Sample, SampleBuffer};
pub use command::{Command, parse_command};
pub use config::{CaptureCfg, EncoderCfg, ReportCfg};
pub use counter::{EdgeHandle, PulseCounter};
pub use error::{BuildError, RigError, RigResult};
pub use estimator::{MeasurementMode, RateEstimator, linear_speed_kmh};
pub use report::{ReportSink, StatusLine, TextReport};
pub use rig::{Reply, Rig, RigBuilder, RigStatus, RunReport};
pub use runner::{
    ChannelLines, ConsoleSummary, LinePoll, LineSource, RunOutcome, run_console, run_hold,
    run_staircase, spawn_line_reader,
};
pub use scheduler::{SamplingScheduler, TickOutcome};
pub use staircase::{CapturePlan, Sequencer, SequencerState, staircase_levels};
pub use summary::{LevelSummary, summarize_levels};
