#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod bench;
mod cli;
mod error_fmt;
mod logging;
mod record;

use std::io::{self, BufReader};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use rpmlab_config::Config;
use rpmlab_core::{
    Command, RigError, RunOutcome, RunReport, Sample, TextReport, run_console, run_hold,
    run_staircase, spawn_line_reader, summarize_levels,
};
use rpmlab_core::staircase::CaptureKind;

use crate::bench::{Overrides, assemble};
use crate::cli::{Cli, Commands};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::record::{RecordEnd, record_path};

/// Configuration used when `--config` is not given.
const DEFAULT_CONFIG: &str = include_str!("../../etc/rpmlab.toml");

const SELF_CHECK_DUTY: i32 = 50;
const SELF_CHECK_SPIN: Duration = Duration::from_millis(500);

/// Exit code of a run stopped by Ctrl-C or STOP.
const EXIT_CANCELLED: u8 = 130;

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: failed to install color-eyre: {e}");
    }

    let config = load_config(cli.config.as_deref());
    let log_cfg = config.as_ref().ok().map(|c| &c.logging);
    // Held until exit so the file writer drains.
    let _guard = match logging::init_tracing(cli.json, cli.log_level.as_deref(), log_cfg) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("warning: logging disabled: {e:#}");
            None
        }
    };

    let result = config.and_then(|cfg| run(cli.cmd, &cfg, cli.json));
    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            if cli.json {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            ExitCode::from(u8::try_from(exit_code_for_error(&e)).unwrap_or(1))
        }
    }
}

fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let text = match path {
        Some(p) => std::fs::read_to_string(p)
            .wrap_err_with(|| format!("read config {}", p.display()))?,
        None => DEFAULT_CONFIG.to_string(),
    };
    let cfg = rpmlab_config::load_toml(&text).wrap_err("invalid configuration: parse TOML")?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

fn set_on_ctrlc(flag: Arc<AtomicBool>) -> eyre::Result<()> {
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .wrap_err("install Ctrl-C handler")
}

fn run(cmd: Commands, cfg: &Config, json: bool) -> eyre::Result<u8> {
    match cmd {
        Commands::Console => {
            let mut bench = assemble(cfg, Overrides::default())?;
            let shutdown = Arc::new(AtomicBool::new(false));
            set_on_ctrlc(Arc::clone(&shutdown))?;
            let mut lines = spawn_line_reader(BufReader::new(io::stdin()));
            let stdout = io::stdout();
            let mut sink = TextReport::new(stdout.lock());
            let summary = run_console(&mut bench.rig, &mut lines, &mut sink, &shutdown)?;
            tracing::info!(
                commands = summary.commands,
                errors = summary.errors,
                completed = summary.completed,
                cancelled = summary.cancelled,
                "console closed"
            );
            Ok(0)
        }
        Commands::Staircase { step, step_ms } => {
            let mut bench = assemble(
                cfg,
                Overrides {
                    step_duration_ms: step_ms,
                },
            )?;
            set_on_ctrlc(bench.rig.cancel_handle())?;
            let stdout = io::stdout();
            let mut sink = TextReport::new(stdout.lock());
            let outcome = run_staircase(&mut bench.rig, step, &mut sink)?;
            Ok(finish(outcome, json))
        }
        Commands::Hold { duty, duration_ms } => {
            let mut bench = assemble(cfg, Overrides::default())?;
            set_on_ctrlc(bench.rig.cancel_handle())?;
            let stdout = io::stdout();
            let mut sink = TextReport::new(stdout.lock());
            let outcome = run_hold(&mut bench.rig, duty, duration_ms, &mut sink)?;
            Ok(finish(outcome, json))
        }
        Commands::Record { input, output } => {
            let rec = record_path(input.as_deref(), &output)?;
            match rec.end {
                RecordEnd::Completed => Ok(0),
                RecordEnd::Eof => {
                    eprintln!(
                        "input closed before the capture completed; {} lines kept in {}",
                        rec.lines,
                        output.display()
                    );
                    Ok(1)
                }
            }
        }
        Commands::Summarize { file } => {
            let rows = rpmlab_config::load_capture_csv(&file)?;
            let samples: Vec<Sample> = rows.iter().map(Sample::from).collect();
            let levels = summarize_levels(&samples);
            if json {
                let arr: Vec<_> = levels
                    .iter()
                    .map(|l| {
                        serde_json::json!({
                            "pwm_percent": l.duty_percent,
                            "start_ms": l.start_ms,
                            "samples": l.samples,
                            "mean_rpm": l.mean_rpm,
                            "max_rpm": l.max_rpm,
                        })
                    })
                    .collect();
                println!("{}", serde_json::Value::Array(arr));
            } else {
                println!(
                    "{:>5} {:>9} {:>8} {:>10} {:>10}",
                    "pwm", "start_ms", "samples", "mean_rpm", "max_rpm"
                );
                for l in &levels {
                    println!(
                        "{:>5} {:>9} {:>8} {:>10.2} {:>10.2}",
                        l.duty_percent, l.start_ms, l.samples, l.mean_rpm, l.max_rpm
                    );
                }
            }
            Ok(0)
        }
        Commands::SelfCheck => {
            let mut bench = assemble(cfg, Overrides::default())?;
            let before = bench.rig.total_pulses();
            bench.rig.handle(Command::Pwm(SELF_CHECK_DUTY))?;
            bench.rig.pause(SELF_CHECK_SPIN);
            let pulses = bench.rig.total_pulses().wrapping_sub(before);
            bench.rig.stop_motor()?;
            if pulses == 0 {
                return Err(RigError::HardwareFault(format!(
                    "no encoder pulses in {} ms at {SELF_CHECK_DUTY} % duty",
                    SELF_CHECK_SPIN.as_millis()
                ))
                .into());
            }
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ok": true,
                        "backend": bench.backend(),
                        "pulses": pulses,
                    })
                );
            } else {
                println!(
                    "self-check ok: {} backend, {pulses} pulses in {} ms at {SELF_CHECK_DUTY} % duty",
                    bench.backend(),
                    SELF_CHECK_SPIN.as_millis()
                );
            }
            Ok(0)
        }
    }
}

fn finish(outcome: RunOutcome, json: bool) -> u8 {
    let (report, code, label) = match outcome {
        RunOutcome::Completed(r) => (r, 0, "completed"),
        RunOutcome::Cancelled(r) => (r, EXIT_CANCELLED, "cancelled"),
    };
    log_run(&report, label);
    if json {
        let (kind, value) = match report.kind {
            CaptureKind::Staircase { step } => ("staircase", step),
            CaptureKind::Hold { duty } => ("hold", duty),
        };
        println!(
            "{}",
            serde_json::json!({
                "outcome": label,
                "kind": kind,
                "value": value,
                "samples": report.samples,
                "dropped": report.dropped,
                "elapsed_ms": report.elapsed_ms,
            })
        );
    }
    code
}

fn log_run(report: &RunReport, label: &str) {
    tracing::info!(
        outcome = label,
        kind = ?report.kind,
        samples = report.samples,
        dropped = report.dropped,
        elapsed_ms = report.elapsed_ms,
        "run finished"
    );
    if report.dropped > 0 {
        tracing::warn!(
            dropped = report.dropped,
            "sample buffer filled; raise capture.max_samples to keep the whole run"
        );
    }
}
