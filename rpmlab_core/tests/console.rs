use std::sync::atomic::AtomicBool;

use crossbeam_channel as xch;
use rpmlab_core::mocks::NullMotor;
use rpmlab_core::report::{CANCELLED_MARKER, COMPLETED_MARKER, TextReport};
use rpmlab_core::{CaptureCfg, ChannelLines, ConsoleSummary, LinePoll, LineSource, Rig, run_console};
use rpmlab_traits::ManualClock;
use rstest::rstest;

fn scripted(lines: &[&str]) -> ChannelLines {
    let (tx, rx) = xch::unbounded();
    for l in lines {
        tx.send((*l).to_string()).unwrap();
    }
    ChannelLines::new(rx)
}

fn rig(clock: &ManualClock) -> Rig {
    Rig::builder()
        .with_motor(NullMotor)
        .with_clock(clock.clone())
        .with_capture(CaptureCfg {
            step_duration_ms: 10,
            ..CaptureCfg::default()
        })
        .build()
        .unwrap()
}

#[rstest]
fn channel_lines_report_closed_after_drain() {
    let mut src = scripted(&["PWM 10"]);
    assert_eq!(src.try_line(), LinePoll::Line("PWM 10".into()));
    assert_eq!(src.try_line(), LinePoll::Closed);
}

#[rstest]
fn console_session_reports_errors_and_continues() {
    let clock = ManualClock::new();
    let mut rig = rig(&clock);
    let mut lines = scripted(&["f", "PWM 40", "START 150", "HELLO", "", "START 100"]);
    let mut sink = TextReport::new(Vec::new());
    let shutdown = AtomicBool::new(false);

    let summary = run_console(&mut rig, &mut lines, &mut sink, &shutdown).unwrap();
    assert_eq!(
        summary,
        ConsoleSummary {
            commands: 4,
            errors: 2,
            completed: 1,
            cancelled: 0,
        }
    );

    let out = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "Dirección: adelante.");
    assert_eq!(lines[1], "PWM ajustado a: 40 %");
    assert_eq!(
        lines[2],
        "ERROR: invalid argument: step increment must be in 1..=100, got 150"
    );
    assert_eq!(lines[3], "ERROR: unknown command: HELLO");
    assert_eq!(lines[4], "Iniciando captura con incremento de PWM: 100");
    assert_eq!(out.matches(COMPLETED_MARKER).count(), 1);
    assert_eq!(rig.motor_state().duty_percent, 0);
    assert!(!rig.is_capturing());
}

#[rstest]
fn shutdown_cancels_running_capture() {
    let clock = ManualClock::new();
    let mut rig = rig(&clock);
    rig.start_capture(10).unwrap();
    let (_tx, rx) = xch::unbounded::<String>();
    let mut lines = ChannelLines::new(rx);
    let mut sink = TextReport::new(Vec::new());
    let shutdown = AtomicBool::new(true);

    let summary = run_console(&mut rig, &mut lines, &mut sink, &shutdown).unwrap();
    assert_eq!(summary.cancelled, 1);
    assert!(!rig.is_capturing());
    let out = String::from_utf8(sink.into_inner()).unwrap();
    assert!(out.ends_with(&format!("{CANCELLED_MARKER}\n")));
}

#[rstest]
fn stop_line_cancels_capture_from_console() {
    let clock = ManualClock::new();
    let mut rig = rig(&clock);
    let mut lines = scripted(&["START 5", "stop"]);
    let mut sink = TextReport::new(Vec::new());
    let shutdown = AtomicBool::new(false);

    let summary = run_console(&mut rig, &mut lines, &mut sink, &shutdown).unwrap();
    assert_eq!(summary.cancelled, 1);
    assert_eq!(summary.completed, 0);
    let out = String::from_utf8(sink.into_inner()).unwrap();
    assert!(out.contains("Deteniendo captura."));
    assert!(!out.contains(COMPLETED_MARKER));
}

#[cfg(feature = "hardware-errors")]
#[rstest]
fn hardware_io_error_mid_run_is_reported_and_console_continues() {
    use rpmlab_core::Command;
    use rpmlab_hardware::error::HwError;
    use rpmlab_traits::{BridgeLevels, Motor};

    // Fails the second duty write: the first staircase level change.
    struct GlitchyMotor {
        writes: u32,
    }

    impl Motor for GlitchyMotor {
        fn set_duty_u16(
            &mut self,
            _duty: u16,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.writes += 1;
            if self.writes == 2 {
                return Err(Box::new(HwError::Io(std::io::Error::other("spi glitch"))));
            }
            Ok(())
        }

        fn set_bridge(
            &mut self,
            _levels: BridgeLevels,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Ok(())
        }
    }

    let clock = ManualClock::new();
    let mut rig = Rig::builder()
        .with_motor(GlitchyMotor { writes: 0 })
        .with_clock(clock.clone())
        .with_capture(CaptureCfg {
            step_duration_ms: 10,
            ..CaptureCfg::default()
        })
        .build()
        .unwrap();
    let mut lines = scripted(&["START 50"]);
    let mut sink = TextReport::new(Vec::new());
    let shutdown = AtomicBool::new(false);

    let summary = run_console(&mut rig, &mut lines, &mut sink, &shutdown).unwrap();
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.completed, 0);
    assert!(!rig.is_capturing());

    let out = String::from_utf8(sink.into_inner()).unwrap();
    assert!(
        out.contains("ERROR: hardware fault: io: spi glitch"),
        "{out}"
    );
    assert!(!out.contains(COMPLETED_MARKER));

    // The rig stays usable after the fault.
    rig.handle(Command::Pwm(10)).unwrap();
    assert_eq!(rig.motor_state().duty_percent, 10);
}
