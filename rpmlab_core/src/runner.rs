//! Loops that drive a [`Rig`]: the interactive console and single captures.
//!
//! Input arrives through a [`LineSource`] that is polled, never blocked on,
//! so sampling keeps its cadence while the operator types.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;
use eyre::WrapErr;

use crate::command::parse_command;
use crate::error::{Result, RigError};
use crate::report::ReportSink;
use crate::rig::{Rig, RigStatus, RunReport};

/// Pause between cooperative ticks.
pub const LOOP_PERIOD: Duration = Duration::from_millis(1);

/// Result of one non-blocking poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinePoll {
    Line(String),
    /// Nothing pending right now.
    Empty,
    /// The input has ended; no more lines will arrive.
    Closed,
}

pub trait LineSource {
    fn try_line(&mut self) -> LinePoll;
}

/// Lines delivered over a channel, typically by [`spawn_line_reader`].
#[derive(Debug)]
pub struct ChannelLines {
    rx: xch::Receiver<String>,
}

impl ChannelLines {
    pub fn new(rx: xch::Receiver<String>) -> Self {
        Self { rx }
    }
}

impl LineSource for ChannelLines {
    fn try_line(&mut self) -> LinePoll {
        match self.rx.try_recv() {
            Ok(line) => LinePoll::Line(line),
            Err(xch::TryRecvError::Empty) => LinePoll::Empty,
            Err(xch::TryRecvError::Disconnected) => LinePoll::Closed,
        }
    }
}

/// Read `reader` line by line on a background thread.
///
/// The thread exits at end of input, on a read error, or once the returned
/// source is dropped and the next line fails to send.
pub fn spawn_line_reader<R: BufRead + Send + 'static>(reader: R) -> ChannelLines {
    let (tx, rx) = xch::unbounded();
    std::thread::spawn(move || {
        for line in reader.lines() {
            match line {
                Ok(l) => {
                    if tx.send(l).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "input read failed");
                    break;
                }
            }
        }
        tracing::trace!("input reader exiting");
    });
    ChannelLines::new(rx)
}

/// Counters accumulated by [`run_console`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsoleSummary {
    pub commands: usize,
    pub errors: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl ConsoleSummary {
    fn tally(&mut self, status: &RigStatus) {
        match status {
            RigStatus::Completed(_) => self.completed += 1,
            RigStatus::Cancelled(_) => self.cancelled += 1,
            _ => {}
        }
    }
}

/// How a single capture ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunReport),
    Cancelled(RunReport),
}

fn dispatch(
    rig: &mut Rig,
    line: &str,
    sink: &mut dyn ReportSink,
    summary: &mut ConsoleSummary,
) -> Result<()> {
    let handled = parse_command(line).and_then(|cmd| rig.handle(cmd));
    match handled {
        Ok(reply) => {
            if let Some(msg) = reply.message() {
                sink.notice(&msg).wrap_err("write notice")?;
            }
            summary.commands += 1;
        }
        Err(e) => {
            tracing::warn!(error = %e, line, "command rejected");
            sink.error(&e).wrap_err("write error line")?;
            summary.errors += 1;
        }
    }
    Ok(())
}

/// One `rig.step`, reporting errors other than sink failures instead of
/// failing.
fn step_reporting(
    rig: &mut Rig,
    sink: &mut dyn ReportSink,
    summary: &mut ConsoleSummary,
) -> Result<()> {
    match rig.step(sink) {
        Ok(status) => summary.tally(&status),
        Err(e @ RigError::Sink(_)) => return Err(eyre::Report::new(e)).wrap_err("report sink"),
        Err(e) => {
            tracing::error!(error = %e, "step failed");
            sink.error(&e).wrap_err("write error line")?;
            summary.errors += 1;
        }
    }
    Ok(())
}

/// Interactive loop: one polled line and one tick per iteration.
///
/// Ends when the input has closed and no capture is running, or when
/// `shutdown` is raised; a running capture is cancelled (and flushed) first.
/// The motor is stopped on the way out.
pub fn run_console(
    rig: &mut Rig,
    lines: &mut dyn LineSource,
    sink: &mut dyn ReportSink,
    shutdown: &AtomicBool,
) -> Result<ConsoleSummary> {
    let mut summary = ConsoleSummary::default();
    let mut input_open = true;
    tracing::info!("console start");
    loop {
        if shutdown.load(Ordering::SeqCst) {
            if rig.is_capturing() {
                rig.cancel();
                step_reporting(rig, sink, &mut summary)?;
            }
            tracing::info!("shutdown requested");
            break;
        }
        if input_open {
            match lines.try_line() {
                LinePoll::Line(line) => dispatch(rig, &line, sink, &mut summary)?,
                LinePoll::Empty => {}
                LinePoll::Closed => {
                    tracing::debug!("input closed");
                    input_open = false;
                }
            }
        }
        step_reporting(rig, sink, &mut summary)?;
        if !input_open && !rig.is_capturing() {
            break;
        }
        rig.pause(LOOP_PERIOD);
    }
    if let Err(e) = rig.stop_motor() {
        tracing::warn!(error = %e, "motor stop failed on exit");
    }
    tracing::info!(
        commands = summary.commands,
        errors = summary.errors,
        completed = summary.completed,
        cancelled = summary.cancelled,
        "console end"
    );
    Ok(summary)
}

/// Step a capture that has already been started until it ends.
fn drive(rig: &mut Rig, sink: &mut dyn ReportSink) -> Result<RunOutcome> {
    loop {
        match rig.step(sink).wrap_err("capture step")? {
            RigStatus::Completed(r) => return Ok(RunOutcome::Completed(r)),
            RigStatus::Cancelled(r) => return Ok(RunOutcome::Cancelled(r)),
            _ => rig.pause(LOOP_PERIOD),
        }
    }
}

/// Run one staircase capture to completion (or cancellation via
/// [`Rig::cancel_handle`]).
pub fn run_staircase(rig: &mut Rig, step: i32, sink: &mut dyn ReportSink) -> Result<RunOutcome> {
    let reply = rig
        .start_capture(step)
        .wrap_err_with(|| format!("start staircase with step {step}"))?;
    if let Some(msg) = reply.message() {
        sink.notice(&msg).wrap_err("write notice")?;
    }
    drive(rig, sink)
}

/// Run one fixed-duty capture.
pub fn run_hold(
    rig: &mut Rig,
    duty: i32,
    duration_ms: Option<u32>,
    sink: &mut dyn ReportSink,
) -> Result<RunOutcome> {
    let reply = rig
        .start_hold(duty, duration_ms)
        .wrap_err_with(|| format!("start hold at {duty}%"))?;
    if let Some(msg) = reply.message() {
        sink.notice(&msg).wrap_err("write notice")?;
    }
    drive(rig, sink)
}
