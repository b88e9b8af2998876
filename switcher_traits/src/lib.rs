//! Collaborator traits for the filament switcher.
//!
//! The sequencer in `switcher_core` only ever talks to hardware through these
//! traits. Errors cross the boundary boxed so backends can use their own types.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use std::fmt;
use std::time::Duration;

pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Index of the filament-feed coordinate in a motion-axis position vector.
pub const E_AXIS: usize = 3;

/// Snapshot of the presence sensor near the print head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilamentState {
    Present,
    Absent,
}

impl FilamentState {
    #[inline]
    pub fn is_present(self) -> bool {
        matches!(self, FilamentState::Present)
    }
}

impl fmt::Display for FilamentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilamentState::Present => f.write_str("PRESENT"),
            FilamentState::Absent => f.write_str("ABSENT"),
        }
    }
}

/// One servo-driven clutch per port.
pub trait ClutchBank {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn set_angle(&mut self, index: usize, degrees: f64) -> HwResult<()>;
}

/// The shared feeder stepper.
///
/// `move_distance` is relative to the last `set_zero`; forward is positive.
/// With `sync == false` the move may be queued and only joined by the next
/// barrier.
pub trait Feeder {
    fn enable(&mut self, on: bool) -> HwResult<()>;
    fn set_zero(&mut self) -> HwResult<()>;
    fn move_distance(&mut self, distance: f64, speed: f64, accel: f64, sync: bool)
    -> HwResult<()>;
}

/// The print-head motion system. Position is `[x, y, z, e]`.
pub trait MotionAxis {
    fn position(&mut self) -> HwResult<[f64; 4]>;
    fn move_to(&mut self, position: [f64; 4], speed: f64) -> HwResult<()>;
}

/// Settling delay plus a hard join on all queued motion.
pub trait Barrier {
    fn dwell(&mut self, d: Duration) -> HwResult<()>;
    fn wait_moves(&mut self) -> HwResult<()>;
}

pub trait PresenceSensor {
    fn state(&mut self) -> HwResult<FilamentState>;
}
