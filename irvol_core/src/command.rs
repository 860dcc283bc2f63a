//! Commands and the semantic actions that resolve to them.

use std::fmt;
use std::time::Duration;

/// An opaque IR payload plus the pause the device needs after receiving it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    payload: String,
    delay: Duration,
}

impl Command {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl From<&irvol_config::CodeEntry> for Command {
    fn from(e: &irvol_config::CodeEntry) -> Self {
        Command::new(e.code()).with_delay(Duration::from_millis(e.delay_ms()))
    }
}

/// Whether a send moves the volume by one step or sets something outright.
///
/// Only relative sends are paced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendKind {
    Absolute,
    Relative,
}

/// Semantic actions a codebook can resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    PowerOn,
    PowerOff,
    VolumeUp,
    VolumeDown,
    Mute,
    MuteOn,
    MuteOff,
    NextTrack,
    PreviousTrack,
    Source(String),
    SoundMode(String),
    Digit(char),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::PowerOn => f.write_str("power_on"),
            Action::PowerOff => f.write_str("power_off"),
            Action::VolumeUp => f.write_str("volume_up"),
            Action::VolumeDown => f.write_str("volume_down"),
            Action::Mute => f.write_str("mute"),
            Action::MuteOn => f.write_str("mute_on"),
            Action::MuteOff => f.write_str("mute_off"),
            Action::NextTrack => f.write_str("next_track"),
            Action::PreviousTrack => f.write_str("previous_track"),
            Action::Source(name) => write!(f, "source '{name}'"),
            Action::SoundMode(name) => write!(f, "sound mode '{name}'"),
            Action::Digit(d) => write!(f, "digit '{d}'"),
        }
    }
}
