//! Human-readable error descriptions and structured JSON error formatting.

use irvol_core::error::{BuildError, IrError};

/// Exit code for errors that are not one of the typed cases below.
pub const EXIT_GENERIC: i32 = 1;
pub const EXIT_UNCONFIGURED: i32 = 3;
pub const EXIT_TRANSMIT: i32 = 4;
pub const EXIT_CONFIG: i32 = 5;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: The session could not be built ({be}).\nLikely causes: The transmitter or codebook was not wired in.\nHow to fix: Check the [codes] table and rerun self-check."
        );
    }

    if let Some(ie) = err.downcast_ref::<IrError>() {
        return match ie {
            IrError::Config(msg) => {
                let cause = err.root_cause().to_string();
                let detail = if cause == ie.to_string() {
                    String::new()
                } else {
                    format!(" Cause: {cause}.")
                };
                format!(
                    "What happened: Invalid configuration ({msg}).{detail}\nLikely causes: Missing or out-of-range values in the TOML or the levels CSV.\nHow to fix: Edit the config file, then run `irvol self-check`."
                )
            }
            IrError::Unconfigured(what) => format!(
                "What happened: '{what}' is not available for this device.\nLikely causes: No IR code for it under [codes], or no [volume] calibration.\nHow to fix: Add the code (and [volume] levels for absolute volume) to the config."
            ),
            IrError::Timeout => "What happened: The IR transmitter timed out.\nLikely causes: Blaster offline or unreachable.\nHow to fix: Check power and network of the blaster, then retry. The volume estimate reflects the pulses that were sent.".to_string(),
            IrError::Transmit(msg) => format!(
                "What happened: Sending an IR command failed ({msg}).\nLikely causes: Blaster offline or rejecting the payload.\nHow to fix: Check the blaster and the code in the config, then retry. The volume estimate reflects the pulses that were sent."
            ),
            IrError::State(msg) => format!(
                "What happened: The request was rejected ({msg}).\nLikely causes: Invalid argument.\nHow to fix: See `irvol --help` for accepted values."
            ),
        };
    }

    // String-based heuristics for errors coming from outside the core
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("state file") {
        return format!(
            "What happened: The session snapshot could not be used ({msg}).\nLikely causes: The file is corrupt or not writable.\nHow to fix: Delete the state file to start from an unknown state."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error category.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return EXIT_CONFIG;
    }
    match err.downcast_ref::<IrError>() {
        Some(IrError::Config(_)) => EXIT_CONFIG,
        Some(IrError::Unconfigured(_)) => EXIT_UNCONFIGURED,
        Some(e) if e.is_transmit() => EXIT_TRANSMIT,
        _ => EXIT_GENERIC,
    }
}

/// Stable reason name for JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<IrError>() {
        Some(IrError::Config(_)) => "Config",
        Some(IrError::Unconfigured(_)) => "Unconfigured",
        Some(IrError::Transmit(_)) => "Transmit",
        Some(IrError::Timeout) => "Timeout",
        Some(IrError::State(_)) => "InvalidRequest",
        None if err.downcast_ref::<BuildError>().is_some() => "Config",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let mut obj = json!({
        "reason": reason_name(err),
        "message": humanize(err),
        "exit_code": exit_code_for_error(err),
    });
    if let Some(IrError::Unconfigured(what)) = err.downcast_ref::<IrError>() {
        obj["details"] = json!({ "action": what });
    }
    obj.to_string()
}
