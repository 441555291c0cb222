pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Logic levels for the two H-bridge direction inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BridgeLevels {
    pub in1: bool,
    pub in2: bool,
}

impl BridgeLevels {
    /// Both inputs low: the bridge coasts.
    pub const COAST: Self = Self {
        in1: false,
        in2: false,
    };
}

pub trait Motor {
    /// Write a raw duty value in the 16-bit range `0..=65535`.
    fn set_duty_u16(&mut self, duty: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn set_bridge(
        &mut self,
        levels: BridgeLevels,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<M: Motor + ?Sized> Motor for Box<M> {
    fn set_duty_u16(&mut self, duty: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_duty_u16(duty)
    }

    fn set_bridge(
        &mut self,
        levels: BridgeLevels,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_bridge(levels)
    }
}
