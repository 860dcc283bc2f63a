//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "irvol", version, about = "Absolute volume control over an IR link")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/irvol.toml")]
    pub config: PathBuf,

    /// Session snapshot (JSON) to seed from and write back after the command
    #[arg(long, value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// Print results and errors as JSON, and log as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        self == Switch::On
    }
}

#[derive(Subcommand, Debug)]
pub enum VolumeCmd {
    /// Move to an absolute normalized level (0.0 = min, 1.0 = max)
    Set {
        #[arg(value_name = "LEVEL", allow_negative_numbers = true)]
        level: f64,
    },
    /// Send one volume-up pulse
    Up,
    /// Send one volume-down pulse
    Down,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the last-known device state and capabilities
    Status,
    /// Power the device on or off (on also restores the configured volume)
    Power {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Volume control
    Volume {
        #[command(subcommand)]
        cmd: VolumeCmd,
    },
    /// Mute or unmute
    Mute {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Select an input source by name
    Source { name: String },
    /// Select a sound mode by name
    SoundMode { name: String },
    /// Dial a sequence of digits (e.g. a channel number)
    Digits { digits: String },
    /// Skip to the next track
    NextTrack,
    /// Go back to the previous track
    PreviousTrack,
    /// Validate config and calibration without sending anything
    SelfCheck,
}

impl Commands {
    /// Stable name used in JSON output and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Status => "status",
            Commands::Power { .. } => "power",
            Commands::Volume { cmd } => match cmd {
                VolumeCmd::Set { .. } => "volume_set",
                VolumeCmd::Up => "volume_up",
                VolumeCmd::Down => "volume_down",
            },
            Commands::Mute { .. } => "mute",
            Commands::Source { .. } => "source",
            Commands::SoundMode { .. } => "sound_mode",
            Commands::Digits { .. } => "digits",
            Commands::NextTrack => "next_track",
            Commands::PreviousTrack => "previous_track",
            Commands::SelfCheck => "self_check",
        }
    }

    /// Whether the command can change device state.
    pub fn mutates(&self) -> bool {
        !matches!(self, Commands::Status | Commands::SelfCheck)
    }
}
