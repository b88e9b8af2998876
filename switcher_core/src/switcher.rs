//! The switching sequencer and its user-facing operations.

use switcher_traits::FilamentState;

use crate::actuators::Actuators;
use crate::builder::SwitcherBuilder;
use crate::config::SwitchCfg;
use crate::error::{Report, Result, SwitchError};
use crate::ports::{Port, PortTable, adjusted_value};
use crate::progress::ProgressSink;
use crate::state::ControllerState;
use crate::status::{FeedReport, Status, SwitchOutcome};

/// Drives the shared feeder, clutches and print-head axis through the
/// port-switching sequence.
///
/// Operations run to completion on the caller's thread; there is no
/// concurrent access.
pub struct Switcher {
    pub(crate) hw: Actuators,
    pub(crate) ports: PortTable,
    pub(crate) cfg: SwitchCfg,
    pub(crate) state: ControllerState,
    pub(crate) sink: Box<dyn ProgressSink>,
    pub(crate) last_switch: Option<SwitchOutcome>,
}

impl core::fmt::Debug for Switcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Switcher")
            .field("ports", &self.ports.len())
            .field("state", &self.state)
            .field("last_switch", &self.last_switch)
            .finish()
    }
}

impl Switcher {
    pub fn builder() -> SwitcherBuilder {
        SwitcherBuilder::default()
    }

    pub fn ports(&self) -> &PortTable {
        &self.ports
    }

    pub fn config(&self) -> &SwitchCfg {
        &self.cfg
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub(crate) fn progress(&self, line: &str) {
        tracing::info!(target: "switcher::progress", "{line}");
        self.sink.report(line);
    }

    /// Make `port` current without moving filament.
    ///
    /// With `engage` the port's clutch is seated and all others released;
    /// otherwise every clutch is released.
    pub fn select_port(&mut self, port: Port, engage: bool) -> Result<()> {
        self.ports.check(port)?;
        self.state.assign(port);
        tracing::info!(%port, engage, "port selected");
        if engage {
            self.activate_clutch(port)
        } else {
            self.deactivate_all_clutches()
        }
    }

    /// Unload the current filament and load `target` up to the sensor.
    ///
    /// A failed load still commits `target` as current and is reported as
    /// [`SwitchOutcome::LoadFailed`]. An unload stall aborts before commit.
    pub fn switch_port(&mut self, target: Port) -> Result<SwitchOutcome> {
        self.ports.check(target)?;
        let Some(old) = self.state.current() else {
            // Nothing is loaded that we know of; take the port as given.
            self.select_port(target, false)?;
            self.last_switch = Some(SwitchOutcome::Assigned);
            return Ok(SwitchOutcome::Assigned);
        };
        if old == target {
            tracing::debug!(%target, "already on port");
            return Ok(SwitchOutcome::Unchanged);
        }

        let span = tracing::info_span!("switch", from = %old, to = %target);
        let _guard = span.enter();

        let unload = self.cfg.speeds.unload;
        let settle = self.cfg.timing.settle;

        self.progress("Unloading to sensor");
        self.retract_until_clear(unload)?;

        self.progress("Unloading to gear");
        self.hw.axis_advance(-self.cfg.geometry.sensor_to_gear, unload)?;
        self.hw.settle(settle)?;

        self.with_safe_stop("switch", |s| s.exchange(old, target))?;

        self.progress("Loading to sensor");
        let mut sensed = self.load_to_sensor()?;
        if sensed == FilamentState::Absent {
            self.progress("Retrying");
            self.small_feed_port(target)?;
            self.hw.settle(settle)?;
            sensed = self.load_to_sensor()?;
        }

        let outcome = if sensed.is_present() {
            SwitchOutcome::Loaded
        } else {
            self.progress("Failed to load to sensor");
            tracing::warn!(%target, "filament did not reach the sensor");
            SwitchOutcome::LoadFailed
        };

        self.state.assign(target);
        self.last_switch = Some(outcome);
        tracing::info!(outcome = outcome.name(), "switch finished");
        Ok(outcome)
    }

    /// Retract `old` to its parking spot and feed `target` into the extruder
    /// gear. Ends with the feeder disabled and both clutches released.
    fn exchange(&mut self, old: Port, target: Port) -> Result<()> {
        let settle = self.cfg.timing.settle;

        self.progress("Switching filament");
        self.hw.feeder_enable(true)?;

        self.progress("Retracting");
        let retract = self.ports.get(old)?.retract_distance;
        self.activate_clutch(old)?;
        self.queue_feeder_move(adjusted_value(old, -retract), false, false)?;
        self.release_clutch(old)?;
        self.hw.settle(settle)?;

        self.progress("Feeding");
        let new = *self.ports.get(target)?;
        self.activate_clutch(target)?;
        self.queue_feeder_move(
            adjusted_value(target, new.feed_distance - new.slower_margin),
            false,
            false,
        )?;
        self.hw.settle(settle)?;

        self.progress("Slow feeding");
        self.slow_feed(target, new.slower_margin)?;
        self.catch_filament(new.slower_margin)?;

        self.release_clutch(target)?;
        self.hw.feeder_enable(false)?;
        self.hw.settle(settle)
    }

    /// Run `f`; if it fails, disable the feeder and release every clutch
    /// before handing back the error.
    fn with_safe_stop<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let result = f(self);
        if result.is_err() {
            self.stop_feeder(op);
            if let Err(e) = self.deactivate_all_clutches() {
                tracing::warn!(op, error = %format!("{e:#}"), "clutch release after failure");
            }
        }
        result
    }

    fn stop_feeder(&mut self, op: &'static str) {
        if let Err(e) = self.hw.feeder_enable(false) {
            tracing::warn!(op, error = %format!("{e:#}"), "feeder disable after failure");
        }
    }

    /// Slow feeder move through the slower margin plus the overrun. Queued,
    /// so it runs alongside the catch move.
    fn slow_feed(&mut self, port: Port, margin: f64) -> Result<()> {
        let overrun = self.cfg.geometry.slow_feed_overrun;
        self.queue_feeder_move(adjusted_value(port, margin + overrun), true, false)?;
        Ok(())
    }

    /// Pull the arriving filament into the extruder gear.
    fn catch_filament(&mut self, margin: f64) -> Result<()> {
        let distance = margin.abs() + self.cfg.geometry.catching_margin;
        self.hw.axis_advance(distance, self.cfg.speeds.slow)
    }

    fn load_to_sensor(&mut self) -> Result<FilamentState> {
        let g = &self.cfg.geometry;
        let initial = g.sensor_to_gear - g.sensor_to_gear_margin;
        self.advance_until_sensed(initial, self.cfg.speeds.unload)
    }

    /// Feed the current port by `distance`, or by its configured feed
    /// distance. Without a current port nothing moves.
    pub fn feed(&mut self, distance: Option<f64>) -> Result<FeedReport> {
        let Some(port) = self.state.current() else {
            tracing::debug!("feed without a current port");
            return Ok(FeedReport::default());
        };
        if let Some(d) = distance {
            if !d.is_finite() {
                return Err(Report::new(SwitchError::Config(format!(
                    "feed distance must be finite, got {d}"
                ))));
            }
        }

        let distance = match distance {
            Some(d) => d,
            None => adjusted_value(port, self.ports.get(port)?.feed_distance),
        };
        self.with_safe_stop("feed", |s| s.clutched_feed(port, distance, false))
    }

    /// Nudge the current port forward by its small-feed distance at slow
    /// speed. Without a current port nothing moves.
    pub fn small_feed(&mut self) -> Result<FeedReport> {
        match self.state.current() {
            Some(port) => self.small_feed_port(port),
            None => {
                tracing::debug!("small feed without a current port");
                Ok(FeedReport::default())
            }
        }
    }

    pub(crate) fn small_feed_port(&mut self, port: Port) -> Result<FeedReport> {
        let distance = adjusted_value(port, self.ports.get(port)?.small_feed_distance);
        self.with_safe_stop("small feed", |s| s.clutched_feed(port, distance, true))
    }

    /// Seat `port`, run the feeder by `distance` and release again.
    fn clutched_feed(&mut self, port: Port, distance: f64, slow: bool) -> Result<FeedReport> {
        self.activate_clutch(port)?;
        self.hw.feeder_enable(true)?;
        let (speed, accel) = self.queue_feeder_move(distance, slow, false)?;
        self.hw.feeder_enable(false)?;
        self.release_clutch(port)?;
        Ok(FeedReport {
            distance,
            speed,
            accel,
        })
    }

    /// Run the feeder by a raw signed distance. Clutches are left as they are,
    /// also when the move fails.
    pub fn move_feeder(&mut self, distance: f64, slow: bool) -> Result<(f64, f64)> {
        if !distance.is_finite() {
            return Err(Report::new(SwitchError::Config(format!(
                "feeder distance must be finite, got {distance}"
            ))));
        }
        let moved = self
            .hw
            .feeder_enable(true)
            .and_then(|()| self.queue_feeder_move(distance, slow, false));
        match moved {
            Ok(used) => {
                self.hw.feeder_enable(false)?;
                Ok(used)
            }
            Err(e) => {
                self.stop_feeder("move feeder");
                Err(e)
            }
        }
    }

    pub fn sensor_state(&mut self) -> Result<FilamentState> {
        self.hw.sensor_state()
    }

    pub fn status(&mut self) -> Result<Status> {
        Ok(Status {
            current_port: self.state.current(),
            last_port: self.state.last(),
            sensor: self.hw.sensor_state()?,
            last_switch: self.last_switch,
        })
    }

    /// Forget the current and previous port. No hardware is touched.
    pub fn reset(&mut self) {
        self.state.reset();
        self.last_switch = None;
        tracing::info!("controller state reset");
    }
}
