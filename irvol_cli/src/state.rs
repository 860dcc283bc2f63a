//! Session snapshot persisted between CLI invocations.

use std::fs;
use std::io::Write;
use std::path::Path;

use eyre::{Result, WrapErr};
use irvol_core::DeviceState;

/// Load a snapshot; a missing file means a fresh, all-unknown state.
pub fn load(path: &Path) -> Result<DeviceState> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no state snapshot yet");
            return Ok(DeviceState::default());
        }
        Err(e) => {
            return Err(e).wrap_err_with(|| format!("reading state file {}", path.display()));
        }
    };
    serde_json::from_str(&text).wrap_err_with(|| format!("parsing state file {}", path.display()))
}

pub fn save(path: &Path, state: &DeviceState) -> Result<()> {
    let json = serde_json::to_vec_pretty(state).wrap_err("serializing state")?;
    write_atomic(path, &json).wrap_err_with(|| format!("writing state file {}", path.display()))
}

/// Write `bytes` next to `path` and rename over it, so readers never see a
/// half-written snapshot.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("state.json");
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)
}
