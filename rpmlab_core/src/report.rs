//! Text report protocol written to the console/serial stream.
//!
//! ```text
//! timestamp_ms,pwm_percent,rpm          once per capture run
//! 1204,40,312.50                        one row per sample
//! RPM: 312.50 | Velocidad: 3.53 km/h    continuous status
//! Secuencia completada.                 end of a completed capture
//! ```

use std::io::{self, Write};

use crate::buffer::Sample;
use crate::error::RigError;

pub const CSV_HEADER: &str = "timestamp_ms,pwm_percent,rpm";
/// Emitted exactly once when a capture finishes; recorders stop on it.
pub const COMPLETED_MARKER: &str = "Secuencia completada.";
/// Emitted instead of the completion marker when a run is cancelled.
pub const CANCELLED_MARKER: &str = "Secuencia cancelada.";

/// One continuous-mode status reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusLine {
    pub duty_percent: u8,
    pub rpm: f32,
    pub speed_kmh: f32,
}

/// Consumer of everything the rig reports.
pub trait ReportSink {
    fn header(&mut self) -> io::Result<()>;
    fn sample(&mut self, sample: &Sample) -> io::Result<()>;
    fn status(&mut self, status: &StatusLine) -> io::Result<()>;
    fn notice(&mut self, message: &str) -> io::Result<()>;
    fn error(&mut self, err: &RigError) -> io::Result<()>;
    fn completed(&mut self) -> io::Result<()>;
    fn cancelled(&mut self) -> io::Result<()>;
}

/// Format a sample as a CSV row (rpm to two decimals).
pub fn format_sample(sample: &Sample) -> String {
    format!(
        "{},{},{:.2}",
        sample.timestamp_ms, sample.duty_percent, sample.rpm
    )
}

pub fn format_status(status: &StatusLine) -> String {
    format!(
        "RPM: {:.2} | Velocidad: {:.2} km/h",
        status.rpm, status.speed_kmh
    )
}

/// Writes the line protocol to any `Write`, flushing after each line so a
/// serial reader sees it immediately.
#[derive(Debug)]
pub struct TextReport<W: Write> {
    out: W,
}

impl<W: Write> TextReport<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }
}

impl<W: Write> ReportSink for TextReport<W> {
    fn header(&mut self) -> io::Result<()> {
        self.line(CSV_HEADER)
    }

    fn sample(&mut self, sample: &Sample) -> io::Result<()> {
        // Rows are written back to back; flushing per row would dominate a
        // 5000-row dump on a slow link.
        writeln!(self.out, "{}", format_sample(sample))
    }

    fn status(&mut self, status: &StatusLine) -> io::Result<()> {
        self.line(&format_status(status))
    }

    fn notice(&mut self, message: &str) -> io::Result<()> {
        self.line(message)
    }

    fn error(&mut self, err: &RigError) -> io::Result<()> {
        self.line(&format!("ERROR: {err}"))
    }

    fn completed(&mut self) -> io::Result<()> {
        self.line(COMPLETED_MARKER)
    }

    fn cancelled(&mut self) -> io::Result<()> {
        self.line(CANCELLED_MARKER)
    }
}
