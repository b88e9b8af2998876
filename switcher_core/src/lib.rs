#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Filament-switching sequencer (hardware-agnostic).
//!
//! All hardware interaction goes through the `switcher_traits` collaborators:
//! one clutch per port, a shared feeder stepper, the print-head motion axis
//! with its barrier, and the presence sensor near the print head.
//!
//! ## Architecture
//!
//! - **Ports**: per-port parameters and the parity sign rule (`ports` module)
//! - **Actuators**: typed facade over the collaborators (`actuators` module)
//! - **Motion**: feeder moves and clutch engagement with servo settling
//! - **Feedback**: stepwise advance-until-sensed and retract-until-clear
//! - **Sequencer**: `Switcher::switch_port` and the simpler operations
//!
//! Distances are in mm, speeds in mm/s. Every stored distance is a magnitude;
//! signs come from [`ports::adjusted_value`] alone.

pub mod actuators;
pub mod builder;
pub mod config;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod ports;
pub mod progress;
pub mod state;
pub mod status;
pub mod switcher;

mod feedback;
mod motion;

pub use builder::SwitcherBuilder;
pub use config::{GeometryCfg, SafetyCfg, SpeedCfg, SwitchCfg, TimingCfg};
pub use error::{BuildError, Result, SwitchError};
pub use feedback::SENSOR_STEP_MM;
pub use ports::{Port, PortConfig, PortTable, adjusted_value};
pub use progress::{NullSink, ProgressSink};
pub use state::ControllerState;
pub use status::{FeedReport, Status, SwitchOutcome};
pub use switcher::Switcher;
pub use switcher_traits::FilamentState;
