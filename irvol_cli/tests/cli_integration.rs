mod common;

use assert_cmd::prelude::*;
use common::{FULL_TOML, RELATIVE_ONLY_TOML, irvol, stdout_json, write_config};
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use tempfile::tempdir;

#[rstest]
#[case(&["status"], "device: Test Amp")]
#[case(&["status"], "volume: unknown")]
#[case(&["status"], "sources: tv")]
#[case(&["self-check"], "config ok")]
#[case(&["volume", "set", "0.6"], "volume set: target 0.600, 20 pulse(s)")]
#[case(&["mute", "on"], "muted: true")]
#[case(&["source", "tv"], "source: tv")]
fn successful_commands_print_summary(#[case] args: &[&str], #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), FULL_TOML);
    irvol(&cfg)
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains(needle));
}

#[test]
fn help_lists_subcommands() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), FULL_TOML);
    irvol(&cfg)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:").and(predicate::str::contains("volume")));
}

#[test]
fn missing_subcommand_is_usage_error() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), FULL_TOML);
    irvol(&cfg).assert().code(2);
}

#[test]
fn volume_set_without_calibration_is_unconfigured() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), RELATIVE_ONLY_TOML);
    irvol(&cfg)
        .args(["volume", "set", "0.5"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("volume_set"));
}

#[test]
fn relative_step_works_without_calibration() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), RELATIVE_ONLY_TOML);
    irvol(&cfg)
        .args(["volume", "up"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sent 1 command(s)"));
}

#[rstest]
#[case("[volume]\nmin = 10\nmax = 0\nstep = 1\nlevels = [[0, \"A\"]]\n", "volume.max must be > volume.min")]
#[case("[volume]\nmin = 0\nmax = 1\nstep = 0\nlevels = [[0, \"A\"]]\n", "volume.step must be > 0")]
#[case("[codes]\npower_on = \"\"\n", "codes.power_on must not be empty")]
#[case("[device\n", "cannot parse")]
fn invalid_config_exits_with_config_code(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), toml);
    irvol(&cfg)
        .arg("status")
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Invalid configuration").and(predicate::str::contains(needle)));
}

#[test]
fn missing_config_file_exits_with_config_code() {
    let dir = tempdir().unwrap();
    irvol(&dir.path().join("absent.toml"))
        .arg("status")
        .assert()
        .code(5)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn levels_csv_with_wrong_headers_is_rejected() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("levels.csv"), "lvl,code\n0,A\n").unwrap();
    let cfg = write_config(
        dir.path(),
        "[volume]\nmin = 0\nmax = 1\nstep = 0.02\nlevels_csv = \"levels.csv\"\n",
    );
    irvol(&cfg)
        .arg("self-check")
        .assert()
        .code(5)
        .stderr(predicate::str::contains("level,code"));
}

#[test]
fn levels_csv_relative_to_config_dir_is_merged() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("levels.csv"), "level,code\n1.0,B\n").unwrap();
    let cfg = write_config(
        dir.path(),
        "[volume]\nmin = 0\nmax = 1\nstep = 0.02\nlevels = [[0.0, \"A\"]]\nlevels_csv = \"levels.csv\"\n\n[codes]\nvolume_up = \"UP\"\nvolume_down = \"DN\"\n",
    );
    let v = stdout_json(irvol(&cfg).args(["--json", "volume", "set", "0.9"]));
    assert_eq!(v["sent"][0], "B");
    assert_eq!(v["adjustment"]["pulses"], 5);
}

#[test]
fn transmit_failure_exits_with_transmit_code_and_keeps_partial_estimate() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), FULL_TOML);
    let state = dir.path().join("state.json");

    // Send 1 is the "B" anchor, sends 2-4 are pulses, send 5 fails.
    irvol(&cfg)
        .env("IRVOL_SIM_FAIL_ON", "5")
        .arg("--state")
        .arg(&state)
        .args(["volume", "set", "0.6"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("simulated failure on send 5"));

    let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&state).unwrap()).unwrap();
    let volume = saved["volume"].as_f64().unwrap();
    assert!((volume - 0.94).abs() < 1e-9, "volume = {volume}");
}

#[test]
fn state_file_carries_estimate_between_runs() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), FULL_TOML);
    let state = dir.path().join("state.json");

    irvol(&cfg)
        .arg("--state")
        .arg(&state)
        .args(["volume", "set", "0.6"])
        .assert()
        .success();

    // Known estimate 0.6 beats both anchors: pulses only, no anchor code.
    let v = stdout_json(
        irvol(&cfg)
            .arg("--state")
            .arg(&state)
            .args(["--json", "volume", "set", "0.7"]),
    );
    assert_eq!(v["sent"].as_array().unwrap().len(), 5);
    assert!(v["sent"].as_array().unwrap().iter().all(|s| s == "UP"));

    let v = stdout_json(irvol(&cfg).arg("--state").arg(&state).args(["--json", "status"]));
    assert!((v["state"]["volume"].as_f64().unwrap() - 0.7).abs() < 1e-9);
}

#[test]
fn status_does_not_write_state() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), FULL_TOML);
    let state = dir.path().join("state.json");
    irvol(&cfg)
        .arg("--state")
        .arg(&state)
        .arg("status")
        .assert()
        .success();
    assert!(!state.exists());
}

#[rstest]
#[case(&["digits", "a1"], 1, "'a' is not a digit")]
#[case(&["digits", "12"], 3, "digit '1'")]
#[case(&["source", "radio"], 3, "radio")]
#[case(&["previous-track"], 3, "previous_track")]
fn rejected_requests_map_to_exit_codes(
    #[case] args: &[&str],
    #[case] code: i32,
    #[case] needle: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), FULL_TOML);
    irvol(&cfg)
        .args(args)
        .assert()
        .code(code)
        .stderr(predicate::str::contains(needle));
}

#[test]
fn blaster_timeout_exits_with_transmit_code() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), FULL_TOML);
    irvol(&cfg)
        .env("IRVOL_SIM_TIMEOUT_ON", "1")
        .args(["source", "tv"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("timed out"));
}
