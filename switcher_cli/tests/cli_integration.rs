use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Stock two-port feeder with short dwells
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[ports]
retract_distance    = [95, 95]
feed_distance       = [98, 98]
small_feed_distance = [2, 2]
slower_margin       = [10, 10]
servo_on_deg        = [29, 157]
servo_off_deg       = [90, 90]

[timing]
servo_settle_ms = 10
settle_ms = 1
sensor_poll_ms = 1
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["status"], 0, "Filament Switch: ABSENT", "stdout")]
#[case(&["--start-port", "1", "status"], 0, "Port: 1", "stdout")]
#[case(&["--start-port", "0", "switch", "--port", "1"], 0, "Switched to port: 1", "stdout")]
#[case(&["--start-port", "0", "feed"], 0, "Feeding: 98 at 50 with 50", "stdout")]
#[case(&["--start-port", "1", "feed", "--dist", "12.7"], 0, "Feeding: 12 at 50 with 50", "stdout")]
#[case(&["--start-port", "1", "small-feed"], 0, "Feeding: -2 at 5 with 50", "stdout")]
#[case(&["small-feed"], 0, "Feeding: 0 at 0 with 0", "stdout")]
#[case(&["move-stepper", "--dist", "-40", "--slow"], 0, "moving: -40 at 5 with 50", "stdout")]
#[case(&["--start-port", "0", "sensor"], 0, "Filament Sensor: PRESENT", "stdout")]
#[case(&["select", "--port", "1", "--servo", "1"], 0, "Port selected: 1", "stdout")]
#[case(&["select", "--port", "2"], 2, "outside configured range", "stderr")]
#[case(&["select", "--port", "0", "--servo", "2"], 2, "servo", "stderr")]
#[case(&["switch"], 2, "required", "stderr")]
#[case(&["self-check"], 0, "ok: sim backend, 2 ports", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("switcher_cli").unwrap();

    // Always include a valid config to avoid relying on default path
    cmd.arg("--config").arg(&cfg);
    cmd.env_remove("SWITCHER_SIM_SENSOR");

    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);

    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn switch_prints_progress_in_order() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("switcher_cli")
        .unwrap()
        .env_remove("SWITCHER_SIM_SENSOR")
        .arg("--config")
        .arg(&cfg)
        .args(["--start-port", "0", "switch", "--port", "1"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let stages = [
        "Unloading to sensor",
        "Unloading to gear",
        "Switching filament",
        "Retracting",
        "Feeding",
        "Slow feeding",
        "Loading to sensor",
        "Switched to port: 1",
    ];
    let mut at = 0;
    for stage in stages {
        let found = stdout[at..]
            .find(stage)
            .unwrap_or_else(|| panic!("missing {stage:?} in:\n{stdout}"));
        at += found + stage.len();
    }
    assert!(!stdout.contains("Failed to load to sensor"));
}

#[rstest]
fn missing_config_file_uses_defaults() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("switcher_cli").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("self-check");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("4 ports"));
}

#[rstest]
#[case("[speeds]\nunload_speed = 0\n", "speeds.unload_speed must be > 0")]
#[case("[ports]\nretract_distance = [95]\n", "ports.feed_distance has 4 entries")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation")]
#[case("[speeds]\nunload_speed = \"fast\"\n", "parse config")]
fn invalid_config_exits_with_config_code(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, toml).unwrap();

    let mut cmd = Command::cargo_bin("switcher_cli").unwrap();
    cmd.arg("--config").arg(&path).arg("status");
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains(needle));
}

#[rstest]
fn cli_reports_bad_port_table_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    // Write a bad-header CSV
    let bad_csv = dir.path().join("ports.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "port,retract,feed").unwrap();
    writeln!(f, "0,95,98").unwrap();

    let mut cmd = Command::cargo_bin("switcher_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--ports")
        .arg(&bad_csv)
        .arg("self-check");
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("must have headers"));
}

#[rstest]
fn port_table_csv_overrides_config() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let csv = dir.path().join("ports.csv");
    fs::write(
        &csv,
        "port,retract,feed,small_feed,slower_margin,servo_on,servo_off\n\
         0,95,60,3,10,29,90\n\
         1,95,98,2,10,157,90\n\
         2,95,98,2,10,29,90\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("switcher_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--ports")
        .arg(&csv)
        .args(["--start-port", "0", "feed"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Feeding: 60 at 50 with 50"));
}

#[rstest]
fn json_mode_prints_one_object_per_response() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("switcher_cli")
        .unwrap()
        .env_remove("SWITCHER_SIM_SENSOR")
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .args(["--start-port", "0", "switch", "--port", "1"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let objs: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).expect("every stdout line is JSON"))
        .collect();
    assert!(objs.iter().any(|v| v["progress"] == "Retracting"));
    let last = objs.last().unwrap();
    assert_eq!(last["command"], "switch");
    assert_eq!(last["port"], 1);
    assert_eq!(last["outcome"], "loaded");
}

#[rstest]
fn json_error_has_reason() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("switcher_cli")
        .unwrap()
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .args(["switch", "--port", "5"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8(out.stderr).unwrap();
    let line = stderr
        .lines()
        .rev()
        .find(|l| l.contains("\"reason\""))
        .expect("JSON error line on stderr");
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "Config");
}
