#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and capture-file parsing for the motor bench rig.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - The capture loader pulls the CSV block out of a recorded session,
//!   skipping whatever the device printed before the header and after the
//!   last row.
use std::path::Path;

use serde::Deserialize;

/// Header line of a capture block.
pub const CAPTURE_HEADER: &str = "timestamp_ms,pwm_percent,rpm";

/// One row of a recorded capture.
///
/// ```text
/// timestamp_ms,pwm_percent,rpm
/// 4,0,0.00
/// 2004,20,187.50
/// ```
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct CaptureRow {
    pub timestamp_ms: u32,
    pub pwm_percent: u8,
    pub rpm: f32,
}

/// GPIO assignment (BCM numbering on a Raspberry Pi).
#[derive(Debug, Deserialize)]
pub struct Pins {
    /// PWM output feeding the bridge enable input.
    pub ena: u8,
    pub in1: u8,
    pub in2: u8,
    /// Encoder channel, pulled up, counted on rising edges.
    pub encoder: u8,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EncoderMode {
    /// Count pulses over each sampling window.
    #[default]
    Window,
    /// Derive speed from the time between the two latest edges.
    Period,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EncoderCfg {
    pub pulses_per_rev: u32,
    pub wheel_radius_m: f32,
    pub mode: EncoderMode,
}

impl Default for EncoderCfg {
    fn default() -> Self {
        Self {
            pulses_per_rev: 20,
            wheel_radius_m: 0.03,
            mode: EncoderMode::Window,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CaptureCfg {
    /// Sampling period while a capture runs (ms).
    pub interval_ms: u32,
    /// Dwell per staircase level (ms).
    pub step_duration_ms: u32,
    /// Length of a fixed-duty hold capture (ms).
    pub hold_duration_ms: u32,
    pub max_samples: usize,
}

impl Default for CaptureCfg {
    fn default() -> Self {
        Self {
            interval_ms: 4,
            step_duration_ms: 2_000,
            hold_duration_ms: 15_000,
            max_samples: 5_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReportCfg {
    /// Period of the `RPM: .. | Velocidad: ..` status line (ms).
    pub interval_ms: u32,
}

impl Default for ReportCfg {
    fn default() -> Self {
        Self { interval_ms: 500 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PwmCfg {
    pub frequency_hz: f64,
}

impl Default for PwmCfg {
    fn default() -> Self {
        Self {
            frequency_hz: 1_000.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// First-order motor model used when no hardware is attached.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    /// Steady-state speed at 100 % duty.
    pub max_rpm: f32,
    /// Time constant of the speed response (ms).
    pub time_constant_ms: u32,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            max_rpm: 600.0,
            time_constant_ms: 150,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub encoder: EncoderCfg,
    #[serde(default)]
    pub capture: CaptureCfg,
    #[serde(default)]
    pub report: ReportCfg,
    #[serde(default)]
    pub pwm: PwmCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        let p = &self.pins;
        let used = [p.ena, p.in1, p.in2, p.encoder];
        for (i, a) in used.iter().enumerate() {
            if used[i + 1..].contains(a) {
                eyre::bail!("pins must be distinct, GPIO {a} is assigned twice");
            }
        }

        // Encoder
        if self.encoder.pulses_per_rev == 0 {
            eyre::bail!("encoder.pulses_per_rev must be >= 1");
        }
        if !(self.encoder.wheel_radius_m.is_finite() && self.encoder.wheel_radius_m > 0.0) {
            eyre::bail!("encoder.wheel_radius_m must be > 0");
        }

        // Capture
        if self.capture.interval_ms == 0 {
            eyre::bail!("capture.interval_ms must be >= 1");
        }
        if self.capture.step_duration_ms < self.capture.interval_ms {
            eyre::bail!("capture.step_duration_ms must be >= capture.interval_ms");
        }
        if self.capture.hold_duration_ms == 0 {
            eyre::bail!("capture.hold_duration_ms must be >= 1");
        }
        if self.capture.max_samples == 0 {
            eyre::bail!("capture.max_samples must be >= 1");
        }
        if self.capture.max_samples > 1_000_000 {
            eyre::bail!("capture.max_samples is unreasonably large (>1e6)");
        }

        // Report
        if self.report.interval_ms == 0 {
            eyre::bail!("report.interval_ms must be >= 1");
        }

        // PWM
        if !(self.pwm.frequency_hz.is_finite() && self.pwm.frequency_hz > 0.0) {
            eyre::bail!("pwm.frequency_hz must be > 0");
        }

        // Simulator
        if !(self.sim.max_rpm.is_finite() && self.sim.max_rpm >= 0.0) {
            eyre::bail!("sim.max_rpm must be >= 0");
        }
        if self.sim.time_constant_ms == 0 {
            eyre::bail!("sim.time_constant_ms must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got '{rot}'");
        }

        Ok(())
    }
}

/// Extract the capture rows from a recorded session.
///
/// Lines before the header are ignored; the block ends at the first line
/// that is not a three-field row (typically `Secuencia completada.`).
pub fn parse_capture(text: &str) -> eyre::Result<Vec<CaptureRow>> {
    let mut lines = text.lines().map(str::trim);
    if !lines.by_ref().any(|l| l == CAPTURE_HEADER) {
        eyre::bail!("capture has no '{CAPTURE_HEADER}' header line");
    }
    let mut block = String::from(CAPTURE_HEADER);
    block.push('\n');
    for line in lines.take_while(|l| l.split(',').count() == 3) {
        block.push_str(line);
        block.push('\n');
    }

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(block.as_bytes());
    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CaptureRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => eyre::bail!("invalid capture row {}: {}", idx + 1, e),
        }
    }
    Ok(rows)
}

pub fn load_capture_csv(path: &Path) -> eyre::Result<Vec<CaptureRow>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("open capture file {:?}: {}", path, e))?;
    parse_capture(&text)
}
