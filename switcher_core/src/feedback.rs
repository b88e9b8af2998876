//! Sensor-driven loops around the print-head presence sensor.

use switcher_traits::FilamentState;

use crate::error::{Report, Result, SwitchError};
use crate::switcher::Switcher;

/// Axis travel per polling step.
pub const SENSOR_STEP_MM: f64 = 1.0;

impl Switcher {
    /// Advance the axis by `initial`, then one step at a time until the
    /// sensor sees filament or the `initial` budget is spent.
    ///
    /// Never errors on a missing filament; the caller inspects the returned
    /// state.
    pub(crate) fn advance_until_sensed(
        &mut self,
        initial: f64,
        speed: f64,
    ) -> Result<FilamentState> {
        let poll = self.cfg.timing.sensor_poll;
        self.hw.axis_advance(initial, speed)?;
        self.hw.settle(poll)?;

        let mut budget = initial;
        let mut state = self.hw.sensor_state()?;
        while state == FilamentState::Absent && budget > 0.0 {
            budget -= SENSOR_STEP_MM;
            self.hw.axis_advance(SENSOR_STEP_MM, speed)?;
            self.hw.settle(poll)?;
            state = self.hw.sensor_state()?;
        }
        tracing::debug!(%state, remaining_mm = budget.max(0.0), "advance until sensed");
        Ok(state)
    }

    /// Retract one step at a time until the sensor clears.
    ///
    /// Bounded by `safety.max_unload_distance`; past that the switch aborts
    /// with [`SwitchError::UnloadStall`]. Returns the distance retracted.
    pub(crate) fn retract_until_clear(&mut self, speed: f64) -> Result<f64> {
        let cap = self.cfg.safety.max_unload_distance;
        let settle = self.cfg.timing.settle;

        let mut travelled = 0.0;
        let mut state = self.hw.sensor_state()?;
        self.progress(&format!("Filament: {state}"));
        while state == FilamentState::Present {
            if travelled >= cap {
                tracing::error!(travelled_mm = travelled, "filament never cleared the sensor");
                return Err(Report::new(SwitchError::UnloadStall {
                    travelled_mm: travelled,
                }));
            }
            self.hw.axis_advance(-SENSOR_STEP_MM, speed)?;
            self.hw.settle(settle)?;
            travelled += SENSOR_STEP_MM;
            state = self.hw.sensor_state()?;
        }
        self.progress(&format!("Filament: {state}"));
        Ok(travelled)
    }
}
