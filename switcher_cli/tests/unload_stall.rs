use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use assert_cmd::Command;
use tempfile::tempdir;

fn switch_with_sensor(sensor: &str, toml: &str) -> assert_cmd::assert::Assert {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, toml).unwrap();
    let mut cmd = Command::cargo_bin("switcher_cli").unwrap();
    cmd.env("SWITCHER_SIM_SENSOR", sensor)
        .arg("--config")
        .arg(&cfg)
        .args(["--start-port", "0", "switch", "--port", "1"]);
    cmd.assert()
}

#[rstest]
#[case("", 150)]
#[case("[safety]\nmax_unload_distance = 20\n", 20)]
fn stuck_present_sensor_aborts_switch(#[case] toml: &str, #[case] cap: u32) {
    switch_with_sensor("present", toml)
        .code(3)
        .stdout(predicate::str::contains("Switched to port").not())
        .stderr(predicate::str::contains(format!(
            "still at the sensor after retracting {cap} mm"
        )));
}

#[rstest]
fn stuck_absent_sensor_reports_failure_but_switches() {
    switch_with_sensor("absent", "")
        .success()
        .stdout(predicate::str::contains("Retrying"))
        .stdout(predicate::str::contains("Failed to load to sensor"))
        .stdout(predicate::str::contains("Switched to port: 1"));
}

#[rstest]
fn unknown_sensor_override_is_a_config_error() {
    switch_with_sensor("maybe", "")
        .code(2)
        .stderr(predicate::str::contains("SWITCHER_SIM_SENSOR"));
}

#[rstest]
fn console_stall_sets_exit_code_but_keeps_going() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("switcher_cli").unwrap();
    cmd.env("SWITCHER_SIM_SENSOR", "present")
        .arg("--config")
        .arg(dir.path().join("none.toml"))
        .args(["--start-port", "0", "console"])
        .write_stdin("FS_SWITCH PORT=1\nFS_STATUS\n");
    cmd.assert()
        .code(3)
        .stdout(predicate::str::contains("!! Error on 'FS_SWITCH PORT=1'"))
        .stdout(predicate::str::contains("  Port: 0\n  Last Port: -1"));
}
