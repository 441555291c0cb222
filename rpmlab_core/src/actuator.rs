//! H-bridge actuation: duty percentage plus complementary direction pins.

use rpmlab_traits::{BridgeLevels, Motor};

use crate::error::{RigError, RigResult};
use crate::hw_error::map_hw_error_dyn;
use crate::util::{clamp_percent, percent_to_u16};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Forward,
    Reverse,
    #[default]
    Unset,
}

impl Direction {
    /// Bridge input levels for this direction. Forward and Reverse drive
    /// exactly one input high; Unset leaves both low.
    pub fn levels(self) -> BridgeLevels {
        match self {
            Direction::Forward => BridgeLevels {
                in1: true,
                in2: false,
            },
            Direction::Reverse => BridgeLevels {
                in1: false,
                in2: true,
            },
            Direction::Unset => BridgeLevels::COAST,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
            Direction::Unset => "unset",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = RigError;

    /// Accepts the console tokens `f`/`r` (any case) and the long names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "f" | "forward" => Ok(Direction::Forward),
            "r" | "reverse" => Ok(Direction::Reverse),
            other => Err(RigError::invalid(format!(
                "direction must be 'f' or 'r', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorState {
    pub duty_percent: u8,
    pub direction: Direction,
}

/// Owns the motor and the last committed state.
pub struct MotorDriver<M: Motor> {
    motor: M,
    state: MotorState,
}

impl<M: Motor> core::fmt::Debug for MotorDriver<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MotorDriver")
            .field("state", &self.state)
            .finish()
    }
}

impl<M: Motor> MotorDriver<M> {
    pub fn new(motor: M) -> Self {
        Self {
            motor,
            state: MotorState::default(),
        }
    }

    pub fn state(&self) -> MotorState {
        self.state
    }

    pub fn duty_percent(&self) -> u8 {
        self.state.duty_percent
    }

    /// Apply a duty percentage, clamped to `0..=100`.
    ///
    /// If no direction has been chosen yet, Forward is committed first so the
    /// bridge never receives duty with both inputs low. State only changes
    /// after the hardware accepted the write.
    pub fn set_duty(&mut self, percent: i32) -> RigResult<u8> {
        let pct = clamp_percent(percent);
        if self.state.direction == Direction::Unset {
            self.write_bridge(Direction::Forward)?;
            self.state.direction = Direction::Forward;
        }
        let raw = percent_to_u16(pct);
        self.motor
            .set_duty_u16(raw)
            .map_err(|e| map_hw_error_dyn(&*e))?;
        self.state.duty_percent = pct;
        tracing::trace!(duty_percent = pct, raw, "duty applied");
        Ok(pct)
    }

    /// Select the bridge direction.
    ///
    /// Re-selecting the current direction is a no-op. Switching to the other
    /// direction is only allowed while the duty is 0.
    pub fn set_direction(&mut self, dir: Direction) -> RigResult<()> {
        if dir == self.state.direction {
            return Ok(());
        }
        if self.state.duty_percent > 0 && self.state.direction != Direction::Unset {
            return Err(RigError::invalid(format!(
                "cannot switch to {} while running at {}%",
                dir.as_str(),
                self.state.duty_percent
            )));
        }
        self.write_bridge(dir)?;
        self.state.direction = dir;
        tracing::debug!(direction = dir.as_str(), "direction set");
        Ok(())
    }

    /// Duty to 0; the direction is kept.
    pub fn stop(&mut self) -> RigResult<()> {
        self.motor
            .set_duty_u16(0)
            .map_err(|e| map_hw_error_dyn(&*e))?;
        self.state.duty_percent = 0;
        Ok(())
    }

    fn write_bridge(&mut self, dir: Direction) -> RigResult<()> {
        self.motor
            .set_bridge(dir.levels())
            .map_err(|e| map_hw_error_dyn(&*e))
    }
}
