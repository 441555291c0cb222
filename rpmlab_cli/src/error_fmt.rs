//! Human-readable error descriptions and structured JSON error formatting.

use rpmlab_core::error::{BuildError, RigError};

/// Map an eyre::Report to an explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingMotor => {
                "What happened: No motor driver was wired into the rig.\nLikely causes: Motor pins failed to open or the builder skipped with_motor(...).\nHow to fix: Check the [pins] section and GPIO permissions.".to_string()
            }
            BuildError::MissingClock => {
                "What happened: No clock was wired into the rig.\nLikely causes: The builder skipped with_clock(...).\nHow to fix: This is a programming error; report it with the command you ran.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in [encoder], [capture] or [report].\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(re) = err.downcast_ref::<RigError>() {
        return match re {
            RigError::InvalidArgument(msg) => format!(
                "What happened: Invalid argument ({msg}).\nLikely causes: Duty outside 0..=100 or a staircase step outside 1..=100.\nHow to fix: Pass a value inside the allowed range."
            ),
            RigError::CaptureInProgress => {
                "What happened: A capture is already running.\nLikely causes: START was sent twice.\nHow to fix: Wait for 'Secuencia completada.' or send STOP first.".to_string()
            }
            RigError::BufferFull => {
                "What happened: The sample buffer is full.\nLikely causes: capture.max_samples is smaller than the run needs.\nHow to fix: Raise capture.max_samples or use a larger step.".to_string()
            }
            RigError::UnknownCommand(cmd) => format!(
                "What happened: Unknown command '{cmd}'.\nLikely causes: Typo.\nHow to fix: Use PWM <n>, START <n>, STOP, f, r or a bare duty."
            ),
            RigError::Hardware(msg) | RigError::HardwareFault(msg) => format!(
                "What happened: Hardware error ({msg}).\nLikely causes: Wrong pin numbers, missing GPIO permissions or a wiring fault.\nHow to fix: Check [pins] and the wiring, then rerun."
            ),
            RigError::Sink(msg) => format!(
                "What happened: Output failed ({msg}).\nLikely causes: The reader of stdout went away.\nHow to fix: Keep the reading side open until the run ends."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("open motor pins") || lower.contains("open encoder pin") {
        return "What happened: Failed to initialize GPIO pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process may access /dev/gpiomem.".to_string();
    }

    if lower.contains("invalid configuration") {
        let cause = err
            .chain()
            .nth(1)
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        return format!(
            "What happened: Configuration is invalid or incomplete{cause}.\nLikely causes: Missing [pins] (ena, in1, in2, encoder) or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("header line") || lower.contains("invalid capture row") {
        return format!(
            "What happened: The capture file could not be parsed ({msg}).\nLikely causes: The file was not written by `rpmlab record` or was truncated.\nHow to fix: Expect a 'timestamp_ms,pwm_percent,rpm' header followed by rows."
        );
    }

    let cause = err
        .chain()
        .nth(1)
        .map(|src| format!(" Cause: {src}"))
        .unwrap_or_default();
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Error: {msg}"
    )
}

/// Process exit code for a failed command.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(re) = err.downcast_ref::<RigError>() {
        return match re {
            RigError::InvalidArgument(_) | RigError::UnknownCommand(_) => 3,
            RigError::CaptureInProgress => 4,
            RigError::BufferFull => 4,
            RigError::Hardware(_) | RigError::HardwareFault(_) => 5,
            RigError::Sink(_) => 6,
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    let lower = err.to_string().to_ascii_lowercase();
    if lower.contains("invalid configuration") || lower.contains("read config") {
        return 2;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(re) = err.downcast_ref::<RigError>() {
        return match re {
            RigError::InvalidArgument(_) => "invalid_argument",
            RigError::CaptureInProgress => "capture_in_progress",
            RigError::BufferFull => "buffer_full",
            RigError::UnknownCommand(_) => "unknown_command",
            RigError::Hardware(_) => "hardware",
            RigError::HardwareFault(_) => "hardware_fault",
            RigError::Sink(_) => "sink",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "build";
    }
    match exit_code_for_error(err) {
        2 => "config",
        _ => "error",
    }
}

/// One-line JSON error for `--json` mode.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "message": err.to_string(),
        "code": exit_code_for_error(err),
    })
    .to_string()
}
