#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and calibration loading for the IR media player.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Volume calibration levels can be given inline or through a strict
//!   `level,code` CSV file that is merged in by `Config::resolve_levels`.
use serde::Deserialize;
use serde::de::Deserializer;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default post-send spacing between dialed digits.
pub const DEFAULT_DIGIT_DELAY_MS: u64 = 500;
/// Default width of the duplicate-pulse band at the tail of the pacing window.
pub const DEFAULT_DUPLICATE_BAND_MS: u64 = 500;
/// Default device name when `[device] name` is absent.
pub const DEFAULT_NAME: &str = "IR Media Player";

/// One IR code as written in the config.
///
/// Accepts either a bare string or a table with an optional post-send delay:
/// - `power_on = "JgBQAAAB..."`
/// - `power_on = { code = "JgBQAAAB...", delay_ms = 250 }`
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum CodeEntry {
    Plain(String),
    Detailed {
        code: String,
        #[serde(default)]
        delay_ms: u64,
    },
}

impl CodeEntry {
    pub fn code(&self) -> &str {
        match self {
            CodeEntry::Plain(c) => c,
            CodeEntry::Detailed { code, .. } => code,
        }
    }

    pub fn delay_ms(&self) -> u64 {
        match self {
            CodeEntry::Plain(_) => 0,
            CodeEntry::Detailed { delay_ms, .. } => *delay_ms,
        }
    }
}

/// Level calibration CSV schema.
///
/// Expected headers:
/// level,code
///
/// Example:
/// level,code
/// 0,JgBQAAAB...
/// 50,JgBQAAAC...
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LevelRow {
    pub level: f64,
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Device {
    pub name: String,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VolumeCfg {
    /// Absolute level reported by the device at its quietest.
    pub min: f64,
    /// Absolute level reported by the device at its loudest.
    pub max: f64,
    /// Absolute level change produced by one up/down pulse.
    pub step: f64,
    /// Absolute level to restore after power-on.
    #[serde(default)]
    pub restore: Option<f64>,
    /// Pacing window between relative pulses (ms). Absent disables pacing.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Tail of the pacing window in which a duplicate pulse is sent.
    #[serde(default = "default_duplicate_band_ms")]
    pub duplicate_band_ms: u64,
    /// Calibration anchors. Accepts either:
    /// - array of tuples: [[0, "A"], [50, "B"]]
    /// - array of tables: [{ level = 0, code = "A" }, ...]
    #[serde(default, deserialize_with = "de_levels")]
    pub levels: Vec<(f64, CodeEntry)>,
    /// Optional CSV with more anchors (relative paths resolve against the config dir).
    #[serde(default)]
    pub levels_csv: Option<PathBuf>,
}

fn default_duplicate_band_ms() -> u64 {
    DEFAULT_DUPLICATE_BAND_MS
}

impl VolumeCfg {
    /// Width of the absolute range; must be > 0 for a valid config.
    pub fn scale(&self) -> f64 {
        self.max - self.min
    }

    /// Map an absolute device level onto the 0..1 range (not clamped).
    pub fn normalize(&self, absolute: f64) -> f64 {
        (absolute - self.min) / self.scale()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DigitsCfg {
    /// Delay after each dialed digit (ms).
    pub delay_ms: u64,
}

impl Default for DigitsCfg {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DIGIT_DELAY_MS,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Codes {
    pub power_on: Option<CodeEntry>,
    pub power_off: Option<CodeEntry>,
    pub volume_up: Option<CodeEntry>,
    pub volume_down: Option<CodeEntry>,
    pub mute: Option<CodeEntry>,
    pub mute_on: Option<CodeEntry>,
    pub mute_off: Option<CodeEntry>,
    pub next_track: Option<CodeEntry>,
    pub previous_track: Option<CodeEntry>,
    pub sources: BTreeMap<String, CodeEntry>,
    pub sound_modes: BTreeMap<String, CodeEntry>,
    /// Either empty or exactly the keys "0".."9".
    pub digits: BTreeMap<String, CodeEntry>,
}

impl Codes {
    fn named(&self) -> [(&'static str, Option<&CodeEntry>); 9] {
        [
            ("power_on", self.power_on.as_ref()),
            ("power_off", self.power_off.as_ref()),
            ("volume_up", self.volume_up.as_ref()),
            ("volume_down", self.volume_down.as_ref()),
            ("mute", self.mute.as_ref()),
            ("mute_on", self.mute_on.as_ref()),
            ("mute_off", self.mute_off.as_ref()),
            ("next_track", self.next_track.as_ref()),
            ("previous_track", self.previous_track.as_ref()),
        ]
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: Device,
    /// Presence of this section declares the volume-set capability.
    #[serde(default)]
    pub volume: Option<VolumeCfg>,
    #[serde(default)]
    pub digits: DigitsCfg,
    #[serde(default)]
    pub codes: Codes,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LevelToml {
    Tuple((f64, CodeEntry)),
    Table { level: f64, code: CodeEntry },
}

fn de_levels<'de, D>(deserializer: D) -> Result<Vec<(f64, CodeEntry)>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Vec<LevelToml>> = Option::deserialize(deserializer)?;
    let mut out = Vec::new();
    if let Some(items) = opt {
        for l in items {
            match l {
                LevelToml::Tuple((level, code)) => out.push((level, code)),
                LevelToml::Table { level, code } => out.push((level, code)),
            }
        }
    }
    Ok(out)
}

pub fn load_levels_csv(path: &Path) -> eyre::Result<Vec<LevelRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open levels CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["level", "code"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "levels CSV must have headers 'level,code', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<LevelRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    if rows.is_empty() {
        eyre::bail!("levels CSV {:?} has no rows", path);
    }
    Ok(rows)
}

impl Config {
    /// Merge `volume.levels_csv` (if any) into `volume.levels`.
    ///
    /// Relative CSV paths are resolved against `base_dir`, normally the
    /// directory holding the TOML file.
    pub fn resolve_levels(&mut self, base_dir: &Path) -> eyre::Result<()> {
        let Some(vol) = self.volume.as_mut() else {
            return Ok(());
        };
        let Some(csv_path) = vol.levels_csv.take() else {
            return Ok(());
        };
        let path = if csv_path.is_absolute() {
            csv_path
        } else {
            base_dir.join(csv_path)
        };
        let rows = load_levels_csv(&path)?;
        vol.levels
            .extend(rows.into_iter().map(|r| (r.level, CodeEntry::Plain(r.code))));
        Ok(())
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Volume
        if let Some(vol) = &self.volume {
            if !(vol.min.is_finite() && vol.max.is_finite() && vol.step.is_finite()) {
                eyre::bail!("volume.min, volume.max and volume.step must be finite");
            }
            if vol.max <= vol.min {
                eyre::bail!("volume.max must be > volume.min");
            }
            if vol.step <= 0.0 {
                eyre::bail!("volume.step must be > 0");
            }
            if let Some(r) = vol.restore
                && !(r.is_finite() && (vol.min..=vol.max).contains(&r))
            {
                eyre::bail!("volume.restore must be within [volume.min, volume.max]");
            }
            if vol.levels.is_empty() && vol.levels_csv.is_none() {
                eyre::bail!("volume.levels must not be empty when [volume] is configured");
            }
            let mut seen: Vec<f64> = Vec::with_capacity(vol.levels.len());
            for (level, code) in &vol.levels {
                if !(level.is_finite() && (vol.min..=vol.max).contains(level)) {
                    eyre::bail!("volume.levels entry {level} is outside [volume.min, volume.max]");
                }
                if seen.contains(level) {
                    eyre::bail!("volume.levels has duplicate level {level}");
                }
                seen.push(*level);
                if code.code().trim().is_empty() {
                    eyre::bail!("volume.levels entry {level} has an empty code");
                }
            }
            if let Some(window) = vol.timeout_ms {
                if window == 0 {
                    eyre::bail!("volume.timeout_ms must be >= 1");
                }
                if vol.duplicate_band_ms >= window {
                    eyre::bail!("volume.duplicate_band_ms must be < volume.timeout_ms");
                }
            }
        }

        // Codes
        for (key, entry) in self.codes.named() {
            if let Some(e) = entry
                && e.code().trim().is_empty()
            {
                eyre::bail!("codes.{key} must not be empty");
            }
        }
        for (name, entry) in &self.codes.sources {
            if entry.code().trim().is_empty() {
                eyre::bail!("codes.sources.{name} must not be empty");
            }
        }
        for (name, entry) in &self.codes.sound_modes {
            if entry.code().trim().is_empty() {
                eyre::bail!("codes.sound_modes.{name} must not be empty");
            }
        }
        if !self.codes.digits.is_empty() {
            for d in '0'..='9' {
                match self.codes.digits.get(d.to_string().as_str()) {
                    Some(e) if !e.code().trim().is_empty() => {}
                    Some(_) => eyre::bail!("codes.digits.{d} must not be empty"),
                    None => eyre::bail!("codes.digits is missing digit {d}"),
                }
            }
            if self.codes.digits.len() != 10 {
                eyre::bail!("codes.digits must only contain the keys 0-9");
            }
        }

        // Digits
        if self.digits.delay_ms > 10_000 {
            eyre::bail!("digits.delay_ms is unreasonably large (>10s)");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
