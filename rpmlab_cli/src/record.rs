//! Copies a rig's text output into a file until the completion marker.

use eyre::WrapErr;
use rpmlab_core::report::{CANCELLED_MARKER, COMPLETED_MARKER};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordEnd {
    Completed,
    /// The input closed before any marker arrived.
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    pub lines: usize,
    pub end: RecordEnd,
}

/// Open `input` (stdin for `None` or "-") and write its lines to `output`,
/// replacing any previous recording.
pub fn record_path(input: Option<&Path>, output: &Path) -> eyre::Result<Recorded> {
    let reader: Box<dyn BufRead> = match input {
        Some(p) if p != Path::new("-") => Box::new(BufReader::new(
            File::open(p).wrap_err_with(|| format!("open input {}", p.display()))?,
        )),
        _ => Box::new(BufReader::new(io::stdin())),
    };
    let out = File::create(output)
        .wrap_err_with(|| format!("open output {}", output.display()))?;
    let stdout = io::stdout();
    record(reader, out, stdout.lock())
}

/// Echo each non-empty line and write it to `out`, flushing per line.
///
/// The completion marker ends the recording and is not written. A cancel
/// marker is written, and recording continues so a later run can follow.
pub fn record<R: BufRead, W: Write, E: Write>(
    reader: R,
    mut out: W,
    mut echo: E,
) -> eyre::Result<Recorded> {
    let mut lines = 0usize;
    for line in reader.lines() {
        let line = line.wrap_err("read input")?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        writeln!(echo, "{line}").wrap_err("echo line")?;
        if line == COMPLETED_MARKER {
            tracing::info!(lines, "capture complete");
            return Ok(Recorded {
                lines,
                end: RecordEnd::Completed,
            });
        }
        writeln!(out, "{line}").wrap_err("write output")?;
        out.flush().wrap_err("flush output")?;
        lines += 1;
        if line == CANCELLED_MARKER {
            tracing::warn!(lines, "capture was cancelled on the device");
        }
    }
    tracing::warn!(lines, "input closed before the capture completed");
    Ok(Recorded {
        lines,
        end: RecordEnd::Eof,
    })
}
