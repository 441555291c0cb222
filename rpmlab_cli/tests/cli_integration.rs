use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Short dwell times so a full staircase finishes in well under a second.
fn write_sim_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[pins]
# unused by the simulator but required
ena = 12
in1 = 5
in2 = 6
encoder = 17

[capture]
interval_ms = 4
step_duration_ms = 20
hold_duration_ms = 40
max_samples = 5000

[sim]
max_rpm = 600.0
time_constant_ms = 20
"#;
    let path = dir.path().join("rig.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn rpmlab(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("rpmlab").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["staircase", "--step", "50"], 0, "Secuencia completada.", "stdout")]
#[case(&["staircase", "--step", "0"], 3, "Invalid argument", "stderr")]
#[case(&["staircase", "--step", "-5"], 3, "Invalid argument", "stderr")]
#[case(&["staircase"], 2, "required", "stderr")]
#[case(&["staircase", "--step", "50", "--step-ms", "1"], 2, "Invalid configuration", "stderr")]
#[case(&["hold", "--duty", "60", "--duration-ms", "40"], 0, "Iniciando captura a PWM fijo: 60 %", "stdout")]
#[case(&["hold", "--duty", "150"], 3, "Invalid argument", "stderr")]
#[case(&["self-check"], 0, "self-check ok: sim backend", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);

    let assert = rpmlab(&cfg).args(args).assert().code(exit_code);
    let out = assert.get_output();
    let text = if stream == "stdout" {
        String::from_utf8_lossy(&out.stdout).to_string()
    } else {
        String::from_utf8_lossy(&out.stderr).to_string()
    };
    assert!(text.contains(needle), "missing {needle:?} in {stream}:\n{text}");
}

#[test]
fn staircase_prints_header_rows_and_marker() {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);

    let out = rpmlab(&cfg)
        .args(["staircase", "--step", "50"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines[0], "Iniciando captura con incremento de PWM: 50");
    assert_eq!(lines[1], "timestamp_ms,pwm_percent,rpm");
    assert_eq!(*lines.last().unwrap(), "Secuencia completada.");
    let rows = &lines[2..lines.len() - 1];
    assert!(!rows.is_empty());
    for row in rows {
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), 3, "bad row {row}");
        let duty: u8 = fields[1].parse().unwrap();
        assert!([0, 50, 100].contains(&duty), "unexpected duty {duty}");
        let rpm: f32 = fields[2].parse().unwrap();
        assert!(rpm >= 0.0);
    }
    // The staircase reaches full duty.
    assert!(rows.iter().any(|r| r.split(',').nth(1) == Some("100")));
}

#[test]
fn staircase_json_summary_follows_marker() {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);

    let out = rpmlab(&cfg)
        .args(["--json", "staircase", "--step", "100"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let last = stdout.lines().last().unwrap();
    let v: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(v["outcome"], "completed");
    assert_eq!(v["kind"], "staircase");
    assert_eq!(v["value"], 100);
    assert_eq!(v["dropped"], 0);
    assert!(v["samples"].as_u64().unwrap() > 0);
}

#[test]
fn json_errors_carry_reason_and_code() {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);

    let out = rpmlab(&cfg)
        .args(["--json", "hold", "--duty", "101"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    let stderr = String::from_utf8(out.stderr).unwrap();
    let line = stderr
        .lines()
        .find(|l| l.contains("\"reason\""))
        .expect("json error line");
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "invalid_argument");
    assert_eq!(v["code"], 3);
}

#[test]
fn console_session_runs_commands_from_stdin() {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);

    assert_cmd::Command::from_std(rpmlab(&cfg))
        .arg("console")
        .write_stdin("f\nPWM 40\nFOO\nSTART 50\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dirección: adelante."))
        .stdout(predicate::str::contains("PWM ajustado a: 40 %"))
        .stdout(predicate::str::contains("ERROR: unknown command: FOO"))
        .stdout(predicate::str::contains("Iniciando captura con incremento de PWM: 50"))
        .stdout(predicate::str::contains("Secuencia completada."));
}

#[test]
fn shared_pins_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[pins]\nena = 5\nin1 = 5\nin2 = 6\nencoder = 17\n").unwrap();

    rpmlab(&path)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration is invalid"))
        .stderr(predicate::str::contains("GPIO 5 is assigned twice"));
}

#[test]
fn missing_config_file_is_reported() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    rpmlab(&missing)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope.toml"));
}

#[test]
fn record_then_summarize() {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);
    let device = dir.path().join("device.txt");
    let capture = dir.path().join("capture.txt");
    fs::write(
        &device,
        "RPM: 0.00 | Velocidad: 0.00 km/h\n\
         Iniciando captura con incremento de PWM: 50\n\
         timestamp_ms,pwm_percent,rpm\n\
         4,0,0.00\n\
         8,50,120.00\n\
         12,50,180.00\n\
         16,100,300.00\n\
         Secuencia completada.\n\
         RPM: 290.00 | Velocidad: 3.28 km/h\n",
    )
    .unwrap();

    rpmlab(&cfg)
        .args(["record", "--input"])
        .arg(&device)
        .arg("--output")
        .arg(&capture)
        .assert()
        .success()
        .stdout(predicate::str::contains("Secuencia completada."));

    let saved = fs::read_to_string(&capture).unwrap();
    assert!(saved.ends_with("16,100,300.00\n"));
    assert!(!saved.contains("Secuencia completada."));

    let out = rpmlab(&cfg)
        .args(["--json", "summarize"])
        .arg(&capture)
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let levels = v.as_array().unwrap();
    assert_eq!(levels.len(), 3);
    assert_eq!(levels[1]["pwm_percent"], 50);
    assert_eq!(levels[1]["samples"], 2);
    assert_eq!(levels[1]["mean_rpm"], 150.0);
    assert_eq!(levels[2]["max_rpm"], 300.0);
}

#[test]
fn record_without_marker_exits_nonzero() {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);
    let device = dir.path().join("device.txt");
    fs::write(&device, "timestamp_ms,pwm_percent,rpm\n4,0,0.00\n").unwrap();

    rpmlab(&cfg)
        .args(["record", "--input"])
        .arg(&device)
        .arg("--output")
        .arg(dir.path().join("out.txt"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("input closed before the capture completed"));
}

#[test]
fn summarize_rejects_file_without_header() {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);
    let path = dir.path().join("junk.txt");
    fs::write(&path, "hello\n").unwrap();

    rpmlab(&cfg)
        .arg("summarize")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not be parsed"));
}

#[test]
fn record_replaces_previous_capture() {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);
    let first = dir.path().join("first.txt");
    let second = dir.path().join("second.txt");
    let capture = dir.path().join("capture.txt");
    fs::write(
        &first,
        "timestamp_ms,pwm_percent,rpm\n4,20,50.00\nSecuencia completada.\n",
    )
    .unwrap();
    fs::write(
        &second,
        "timestamp_ms,pwm_percent,rpm\n4,80,400.00\n8,80,420.00\nSecuencia completada.\n",
    )
    .unwrap();

    for input in [&first, &second] {
        rpmlab(&cfg)
            .args(["record", "--input"])
            .arg(input)
            .arg("--output")
            .arg(&capture)
            .assert()
            .success();
    }

    let saved = fs::read_to_string(&capture).unwrap();
    assert_eq!(saved, "timestamp_ms,pwm_percent,rpm\n4,80,400.00\n8,80,420.00\n");

    let out = rpmlab(&cfg)
        .args(["--json", "summarize"])
        .arg(&capture)
        .output()
        .unwrap();
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let levels = v.as_array().unwrap();
    assert_eq!(levels.len(), 1);
    assert_eq!(levels[0]["pwm_percent"], 80);
    assert_eq!(levels[0]["samples"], 2);
}
