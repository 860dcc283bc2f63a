//! Resolution of semantic actions to IR commands, and the capability flags
//! derived from what is configured.

use std::collections::{BTreeMap, HashMap};

use crate::command::{Action, Command};

/// Looks up the command for an action.
///
/// Implementations must be cheap to query; the session resolves on every call.
pub trait Codebook: Send + Sync {
    fn resolve(&self, action: &Action) -> Option<Command>;

    /// Selectable source names, in display order.
    fn sources(&self) -> Vec<String> {
        Vec::new()
    }

    /// Selectable sound mode names, in display order.
    fn sound_modes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Codebook backed by the `[codes]` table of the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigCodebook {
    fixed: HashMap<Action, Command>,
    sources: BTreeMap<String, Command>,
    sound_modes: BTreeMap<String, Command>,
}

impl ConfigCodebook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command for a fixed action or a digit.
    pub fn insert(&mut self, action: Action, command: Command) {
        match action {
            Action::Source(name) => {
                self.sources.insert(name, command);
            }
            Action::SoundMode(name) => {
                self.sound_modes.insert(name, command);
            }
            other => {
                self.fixed.insert(other, command);
            }
        }
    }

    pub fn with(mut self, action: Action, command: Command) -> Self {
        self.insert(action, command);
        self
    }
}

impl Codebook for ConfigCodebook {
    fn resolve(&self, action: &Action) -> Option<Command> {
        match action {
            Action::Source(name) => self.sources.get(name).cloned(),
            Action::SoundMode(name) => self.sound_modes.get(name).cloned(),
            other => self.fixed.get(other).cloned(),
        }
    }

    fn sources(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    fn sound_modes(&self) -> Vec<String> {
        self.sound_modes.keys().cloned().collect()
    }
}

impl From<&irvol_config::Codes> for ConfigCodebook {
    fn from(c: &irvol_config::Codes) -> Self {
        let mut book = ConfigCodebook::new();
        let fixed = [
            (Action::PowerOn, c.power_on.as_ref()),
            (Action::PowerOff, c.power_off.as_ref()),
            (Action::VolumeUp, c.volume_up.as_ref()),
            (Action::VolumeDown, c.volume_down.as_ref()),
            (Action::Mute, c.mute.as_ref()),
            (Action::MuteOn, c.mute_on.as_ref()),
            (Action::MuteOff, c.mute_off.as_ref()),
            (Action::NextTrack, c.next_track.as_ref()),
            (Action::PreviousTrack, c.previous_track.as_ref()),
        ];
        for (action, entry) in fixed {
            if let Some(e) = entry {
                book.insert(action, Command::from(e));
            }
        }
        for (name, e) in &c.sources {
            book.insert(Action::Source(name.clone()), Command::from(e));
        }
        for (name, e) in &c.sound_modes {
            book.insert(Action::SoundMode(name.clone()), Command::from(e));
        }
        for (key, e) in &c.digits {
            let mut chars = key.chars();
            if let (Some(d), None) = (chars.next(), chars.next())
                && d.is_ascii_digit()
            {
                book.insert(Action::Digit(d), Command::from(e));
            }
        }
        book
    }
}

/// Which operations a session can perform, computed once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct Capabilities {
    pub turn_on: bool,
    pub turn_off: bool,
    pub volume_step: bool,
    pub volume_set: bool,
    pub volume_mute: bool,
    pub next_track: bool,
    pub previous_track: bool,
    pub select_source: bool,
    pub select_sound_mode: bool,
    pub play_digits: bool,
}

impl Capabilities {
    pub fn detect(codebook: &dyn Codebook, has_calibration: bool) -> Self {
        let has = |a: Action| codebook.resolve(&a).is_some();
        let volume_step = has(Action::VolumeUp) && has(Action::VolumeDown);
        Self {
            turn_on: has(Action::PowerOn),
            turn_off: has(Action::PowerOff),
            volume_step,
            volume_set: volume_step && has_calibration,
            volume_mute: has(Action::Mute) || has(Action::MuteOn) || has(Action::MuteOff),
            next_track: has(Action::NextTrack),
            previous_track: has(Action::PreviousTrack),
            select_source: !codebook.sources().is_empty(),
            select_sound_mode: !codebook.sound_modes().is_empty(),
            play_digits: ('0'..='9').all(|d| has(Action::Digit(d))),
        }
    }
}
