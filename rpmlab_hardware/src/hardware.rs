//! Raspberry Pi backend: software PWM on the bridge enable pin, two
//! direction outputs, and a pulled-up encoder input counted on rising edges.
use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use rpmlab_traits::clock::{Clock, MonotonicClock};
use rpmlab_traits::{BridgeLevels, Motor};

use crate::error::{HwError, Result};

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

pub struct HardwareMotor {
    ena: OutputPin,
    in1: OutputPin,
    in2: OutputPin,
    frequency_hz: f64,
}

impl HardwareMotor {
    pub fn try_new(ena: u8, in1: u8, in2: u8, frequency_hz: f64) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let mut ena = gpio.get(ena).map_err(gpio_err)?.into_output_low();
        let in1 = gpio.get(in1).map_err(gpio_err)?.into_output_low();
        let in2 = gpio.get(in2).map_err(gpio_err)?.into_output_low();
        ena.set_pwm_frequency(frequency_hz, 0.0)
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        tracing::info!(frequency_hz, "h-bridge ready");
        Ok(Self {
            ena,
            in1,
            in2,
            frequency_hz,
        })
    }
}

fn write_pin(pin: &mut OutputPin, high: bool) {
    if high {
        pin.set_high();
    } else {
        pin.set_low();
    }
}

impl Motor for HardwareMotor {
    fn set_duty_u16(&mut self, duty: u16) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let fraction = f64::from(duty) / f64::from(u16::MAX);
        self.ena
            .set_pwm_frequency(self.frequency_hz, fraction)
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        Ok(())
    }

    fn set_bridge(
        &mut self,
        levels: BridgeLevels,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Drop the active side first so both inputs are never high together.
        if !levels.in1 {
            write_pin(&mut self.in1, false);
        }
        if !levels.in2 {
            write_pin(&mut self.in2, false);
        }
        write_pin(&mut self.in1, levels.in1);
        write_pin(&mut self.in2, levels.in2);
        Ok(())
    }
}

impl Drop for HardwareMotor {
    fn drop(&mut self) {
        if let Err(e) = self.ena.clear_pwm() {
            tracing::warn!(error = %e, "clear pwm on drop failed");
        }
        self.ena.set_low();
        self.in1.set_low();
        self.in2.set_low();
    }
}

/// Encoder input; the interrupt stays armed while this value lives.
pub struct HardwareEncoder {
    _pin: InputPin,
}

impl HardwareEncoder {
    /// `on_edge` runs on the rppal interrupt thread with the edge time in
    /// wrapping microseconds.
    pub fn try_new<F>(pin: u8, on_edge: F) -> Result<Self>
    where
        F: Fn(u32) + Send + 'static,
    {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let mut input = gpio.get(pin).map_err(gpio_err)?.into_input_pullup();
        let clock = MonotonicClock::new();
        input
            .set_async_interrupt(Trigger::RisingEdge, move |_level| on_edge(clock.ticks_us()))
            .map_err(gpio_err)?;
        tracing::info!(pin, "encoder interrupt armed");
        Ok(Self { _pin: input })
    }
}
