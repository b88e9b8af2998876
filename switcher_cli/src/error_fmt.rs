//! Human-readable error descriptions and structured JSON error formatting.

use switcher_core::error::{BuildError, SwitchError};

/// Exit code for configuration problems.
pub const EXIT_CONFIG: i32 = 2;
/// Exit code when filament never cleared the sensor during unload.
pub const EXIT_UNLOAD_STALL: i32 = 3;
/// Exit code for actuator and sensor failures.
pub const EXIT_HARDWARE: i32 = 4;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingClutches
            | BuildError::MissingFeeder
            | BuildError::MissingAxis
            | BuildError::MissingBarrier
            | BuildError::MissingSensor => format!(
                "What happened: The switcher could not be assembled ({be}).\nLikely causes: A backend failed to initialize or was not wired into the builder.\nHow to fix: Check the [pins] section and GPIO permissions, or run without the hardware feature to use the simulator."
            ),
            BuildError::ClutchBankTooSmall { clutches, ports } => format!(
                "What happened: {ports} ports are configured but only {clutches} clutch servos exist.\nLikely causes: [ports] lists more entries than [pins].servos.\nHow to fix: Make the port lists and the servo pin list the same length."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/switcher.toml for a sample."
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<SwitchError>() {
        return match se {
            SwitchError::Config(msg) => format!(
                "What happened: Configuration error: {msg}.\nLikely causes: A port outside the configured table, or invalid values in the TOML/CSV.\nHow to fix: Check the port number against [ports], fix the config file, then rerun."
            ),
            SwitchError::UnloadStall { travelled_mm } => format!(
                "What happened: Filament was still at the sensor after retracting {travelled_mm} mm.\nLikely causes: Filament jammed or snapped in the print head, or a stuck sensor switch.\nHow to fix: Clear the print head by hand, check the sensor, or raise safety.max_unload_distance."
            ),
            SwitchError::Hardware(msg) | SwitchError::HardwareFault(msg) => format!(
                "What happened: Hardware error: {msg}.\nLikely causes: Wiring, power or driver problems on a servo, the feeder stepper or the sensor.\nHow to fix: Check the wiring and [pins] values; re-run with --log-level=debug for the failing operation."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("port table csv must have headers") {
        return "Invalid headers in port table CSV. Expected 'port,retract,feed,small_feed,slower_margin,servo_on,servo_off'.".to_string();
    }

    if lower.contains("open gpio") || lower.contains("gpio error") {
        return "What happened: Failed to initialize hardware pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO.".to_string();
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

/// Stable exit codes: 2 configuration, 3 unload stall, 4 hardware, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return EXIT_CONFIG;
    }
    match err.downcast_ref::<SwitchError>() {
        Some(SwitchError::Config(_)) => EXIT_CONFIG,
        Some(SwitchError::UnloadStall { .. }) => EXIT_UNLOAD_STALL,
        Some(SwitchError::Hardware(_) | SwitchError::HardwareFault(_)) => EXIT_HARDWARE,
        None => 1,
    }
}

pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(_) | BuildError::ClutchBankTooSmall { .. } => "Config",
            _ => "Build",
        };
    }
    match err.downcast_ref::<SwitchError>() {
        Some(SwitchError::Config(_)) => "Config",
        Some(SwitchError::UnloadStall { .. }) => "UnloadStall",
        Some(SwitchError::Hardware(_)) => "Hardware",
        Some(SwitchError::HardwareFault(_)) => "HardwareFault",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let msg = humanize(err);
    if let Some(SwitchError::UnloadStall { travelled_mm }) = err.downcast_ref::<SwitchError>() {
        return json!({
            "reason": reason_name(err),
            "details": { "travelled_mm": travelled_mm },
            "message": msg,
        })
        .to_string();
    }
    json!({ "reason": reason_name(err), "message": msg }).to_string()
}
