//! Test and helper motors for rpmlab_core

use std::sync::{Arc, Mutex};

use rpmlab_traits::{BridgeLevels, Motor};

/// A motor that accepts every command and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMotor;

impl Motor for NullMotor {
    fn set_duty_u16(&mut self, _duty: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
    fn set_bridge(
        &mut self,
        _levels: BridgeLevels,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// What a [`RecordingMotor`] has been told so far.
#[derive(Debug, Default, Clone)]
pub struct MotorLog {
    pub duty_u16: Option<u16>,
    pub bridge: Option<BridgeLevels>,
    pub duty_writes: Vec<u16>,
}

/// A motor that records every write; the log stays readable after the
/// motor has been moved into a rig.
#[derive(Debug, Default, Clone)]
pub struct RecordingMotor {
    log: Arc<Mutex<MotorLog>>,
}

impl RecordingMotor {
    pub fn log(&self) -> Arc<Mutex<MotorLog>> {
        Arc::clone(&self.log)
    }
}

impl Motor for RecordingMotor {
    fn set_duty_u16(&mut self, duty: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| std::io::Error::other("motor log poisoned"))?;
        log.duty_u16 = Some(duty);
        log.duty_writes.push(duty);
        Ok(())
    }
    fn set_bridge(
        &mut self,
        levels: BridgeLevels,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| std::io::Error::other("motor log poisoned"))?;
        log.bridge = Some(levels);
        Ok(())
    }
}

/// A motor whose every write fails, for error-path tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingMotor;

impl Motor for FailingMotor {
    fn set_duty_u16(&mut self, _duty: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err("pwm channel unavailable".into())
    }
    fn set_bridge(
        &mut self,
        _levels: BridgeLevels,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err("bridge pins unavailable".into())
    }
}
