//! Results reported back to the command layer.

use switcher_traits::FilamentState;

use crate::ports::Port;

/// How a `switch_port` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// No port was active; the target was assigned without moving filament.
    Assigned,
    /// The target was already active; nothing moved.
    Unchanged,
    /// New filament confirmed at the sensor.
    Loaded,
    /// Filament never reached the sensor, even after the retry. The port
    /// assignment was still committed.
    LoadFailed,
}

impl SwitchOutcome {
    pub fn name(self) -> &'static str {
        match self {
            SwitchOutcome::Assigned => "assigned",
            SwitchOutcome::Unchanged => "unchanged",
            SwitchOutcome::Loaded => "loaded",
            SwitchOutcome::LoadFailed => "load_failed",
        }
    }
}

/// Distance, speed and acceleration of a feeder move, as reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeedReport {
    pub distance: f64,
    pub speed: f64,
    pub accel: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub current_port: Option<Port>,
    pub last_port: Option<Port>,
    pub sensor: FilamentState,
    /// Outcome of the most recent switch since start or reset.
    pub last_switch: Option<SwitchOutcome>,
}
