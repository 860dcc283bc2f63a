#![allow(dead_code)]

use assert_cmd::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Anchors at both ends of a 0..1 scale with 50 pulses end to end, no
/// pacing window and no digit delay so runs stay fast.
pub const FULL_TOML: &str = r#"
[device]
name = "Test Amp"

[volume]
min = 0.0
max = 1.0
step = 0.02
restore = 0.4
levels = [[0.0, "A"], [1.0, "B"]]

[digits]
delay_ms = 0

[codes]
power_on = "PON"
power_off = "POFF"
volume_up = "UP"
volume_down = "DN"
mute_on = "MON"
mute_off = "MOFF"
next_track = "NEXT"

[codes.sources]
tv = "SRC_TV"

[codes.sound_modes]
stereo = "SM_ST"
"#;

/// Relative controls only: no `[volume]` section.
pub const RELATIVE_ONLY_TOML: &str = r#"
[codes]
volume_up = "UP"
volume_down = "DN"
"#;

pub fn write_config(dir: &Path, toml: &str) -> PathBuf {
    let path = dir.join("irvol.toml");
    fs::write(&path, toml).unwrap();
    path
}

pub fn irvol(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("irvol").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("IRVOL_SIM_FAIL_ON")
        .env_remove("IRVOL_SIM_TIMEOUT_ON")
        .env_remove("IRVOL_SIM_LATENCY_MS")
        .arg("--config")
        .arg(config);
    cmd
}

pub fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.output().unwrap();
    assert!(
        out.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).unwrap()
}
