//! Motor and encoder backends: a simulator for development and tests, and
//! Raspberry Pi GPIO behind the `hardware` feature.
pub mod error;
pub mod sim;

#[cfg(feature = "hardware")]
pub mod hardware;

pub use sim::{MotorModel, SimMotorHandle, SimulatedEncoder, SimulatedMotor};
