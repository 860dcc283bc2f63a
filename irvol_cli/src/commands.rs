//! Subcommand dispatch and result rendering.

use irvol_core::{Adjustment, Capabilities, DeviceSession, DeviceState, Outcome, Power};
use serde::Serialize;

use crate::cli::{Commands, VolumeCmd};

/// What a subcommand did, rendered as text or JSON by `main`.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub command: &'static str,
    pub device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<Adjustment>,
    pub state: DeviceState,
    /// Payloads accepted by the transmitter during this invocation.
    pub sent: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Capabilities>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sound_modes: Vec<String>,
}

/// Execute one subcommand against the session.
///
/// Returns the volume adjustment, if the command made one (including the
/// restore that follows power-on).
pub fn run(cmd: &Commands, session: &DeviceSession) -> eyre::Result<Option<Adjustment>> {
    tracing::info!(command = cmd.name(), device = session.name(), "running");
    match cmd {
        Commands::Status | Commands::SelfCheck => Ok(None),
        Commands::Power { state } if state.is_on() => match session.turn_on()? {
            Some(restore) => {
                let adj = restore
                    .join()
                    .map_err(|_| eyre::eyre!("volume restore thread panicked"))??;
                Ok(Some(adj))
            }
            None => Ok(None),
        },
        Commands::Power { .. } => session.turn_off().map(|()| None),
        Commands::Volume { cmd } => match cmd {
            VolumeCmd::Set { level } => session.set_volume(*level).map(Some),
            VolumeCmd::Up => session.step_volume_up().map(|()| None),
            VolumeCmd::Down => session.step_volume_down().map(|()| None),
        },
        Commands::Mute { state } => session.mute(state.is_on()).map(|()| None),
        Commands::Source { name } => session.select_source(name).map(|()| None),
        Commands::SoundMode { name } => session.select_sound_mode(name).map(|()| None),
        Commands::Digits { digits } => session.send_digits(digits).map(|()| None),
        Commands::NextTrack => session.next_track().map(|()| None),
        Commands::PreviousTrack => session.previous_track().map(|()| None),
    }
}

pub fn summarize(
    cmd: &Commands,
    session: &DeviceSession,
    adjustment: Option<Adjustment>,
    sent: Vec<String>,
) -> Summary {
    let detailed = matches!(cmd, Commands::Status | Commands::SelfCheck);
    Summary {
        command: cmd.name(),
        device: session.name().to_string(),
        adjustment,
        state: session.state(),
        sent,
        capabilities: detailed.then(|| session.capabilities()),
        sources: if detailed {
            session.source_list()
        } else {
            Vec::new()
        },
        sound_modes: if detailed {
            session.sound_mode_list()
        } else {
            Vec::new()
        },
    }
}

fn fmt_opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

fn fmt_level(v: Option<f64>) -> String {
    v.map_or_else(|| "unknown".to_string(), |v| format!("{v:.3}"))
}

/// Plain-text rendering for the terminal.
pub fn render_text(s: &Summary) -> String {
    let mut out = Vec::new();
    if let Some(adj) = &s.adjustment {
        let verb = match adj.outcome {
            Outcome::Completed => "volume set",
            Outcome::Superseded => "volume request superseded",
        };
        out.push(format!(
            "{verb}: target {:.3}, {} pulse(s), {} duplicate(s), estimate {}",
            adj.target,
            adj.pulses,
            adj.duplicates,
            fmt_level(adj.estimate)
        ));
    }
    if s.command == "self_check" {
        out.push("config ok".to_string());
    }
    out.push(format!("device: {}", s.device));
    out.push(format!(
        "power: {}",
        match s.state.power {
            Power::On => "on",
            Power::Off => "off",
        }
    ));
    out.push(format!("volume: {}", fmt_level(s.state.volume)));
    out.push(format!("muted: {}", fmt_opt(s.state.muted)));
    out.push(format!("source: {}", fmt_opt(s.state.source.as_deref())));
    out.push(format!("sound mode: {}", fmt_opt(s.state.sound_mode.as_deref())));
    if let Some(caps) = &s.capabilities {
        let names = [
            ("turn_on", caps.turn_on),
            ("turn_off", caps.turn_off),
            ("volume_step", caps.volume_step),
            ("volume_set", caps.volume_set),
            ("volume_mute", caps.volume_mute),
            ("next_track", caps.next_track),
            ("previous_track", caps.previous_track),
            ("select_source", caps.select_source),
            ("select_sound_mode", caps.select_sound_mode),
            ("play_digits", caps.play_digits),
        ];
        let on: Vec<&str> = names.iter().filter(|(_, b)| *b).map(|(n, _)| *n).collect();
        out.push(format!("capabilities: {}", on.join(", ")));
    }
    if !s.sources.is_empty() {
        out.push(format!("sources: {}", s.sources.join(", ")));
    }
    if !s.sound_modes.is_empty() {
        out.push(format!("sound modes: {}", s.sound_modes.join(", ")));
    }
    if !s.sent.is_empty() {
        out.push(format!("sent {} command(s)", s.sent.len()));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use irvol_core::Outcome;

    #[test]
    fn text_render_includes_adjustment_and_state() {
        let s = Summary {
            command: "volume_set",
            device: "Den".into(),
            adjustment: Some(Adjustment {
                outcome: Outcome::Completed,
                target: 0.6,
                pulses: 20,
                duplicates: 1,
                estimate: Some(0.6),
                generation: 1,
            }),
            state: DeviceState {
                volume: Some(0.6),
                ..DeviceState::default()
            },
            sent: vec!["B".into(); 22],
            capabilities: None,
            sources: Vec::new(),
            sound_modes: Vec::new(),
        };
        let text = render_text(&s);
        assert!(text.contains("volume set: target 0.600, 20 pulse(s), 1 duplicate(s)"));
        assert!(text.contains("volume: 0.600"));
        assert!(text.contains("muted: unknown"));
        assert!(text.contains("sent 22 command(s)"));
    }
}
