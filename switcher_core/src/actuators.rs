//! Typed facade over the collaborator traits.
//!
//! Only the operations the sequencer needs are exposed. Every trait error is
//! mapped to a `SwitchError` and tagged with the operation that failed.

use std::time::Duration;

use eyre::WrapErr;
use switcher_traits::{
    Barrier, ClutchBank, E_AXIS, Feeder, FilamentState, HwResult, MotionAxis, PresenceSensor,
};

use crate::error::{Report, Result};
use crate::hw_error::map_hw_error;
use crate::ports::Port;

fn hw<T>(r: HwResult<T>, op: &'static str) -> Result<T> {
    r.map_err(|e| {
        let mapped = map_hw_error(&*e);
        tracing::error!(op, error = %mapped, "actuator call failed");
        Report::new(mapped)
    })
    .wrap_err(op)
}

pub struct Actuators {
    clutches: Box<dyn ClutchBank>,
    feeder: Box<dyn Feeder>,
    axis: Box<dyn MotionAxis>,
    barrier: Box<dyn Barrier>,
    sensor: Box<dyn PresenceSensor>,
}

impl Actuators {
    pub fn new(
        clutches: Box<dyn ClutchBank>,
        feeder: Box<dyn Feeder>,
        axis: Box<dyn MotionAxis>,
        barrier: Box<dyn Barrier>,
        sensor: Box<dyn PresenceSensor>,
    ) -> Self {
        Self {
            clutches,
            feeder,
            axis,
            barrier,
            sensor,
        }
    }

    pub fn clutch_count(&self) -> usize {
        self.clutches.len()
    }

    pub fn set_clutch(&mut self, port: Port, degrees: f64) -> Result<()> {
        hw(self.clutches.set_angle(port.index(), degrees), "set clutch angle")
    }

    /// Put every other clutch at its off-angle, then seat `port` at `on_deg`.
    pub fn engage(&mut self, port: Port, on_deg: f64, off_deg: &[f64]) -> Result<()> {
        for (i, off) in off_deg.iter().enumerate() {
            if i != port.index() {
                self.set_clutch(Port::new(i), *off)?;
            }
        }
        self.set_clutch(port, on_deg)
    }

    pub fn disengage_all(&mut self, off_deg: &[f64]) -> Result<()> {
        for (i, off) in off_deg.iter().enumerate() {
            self.set_clutch(Port::new(i), *off)?;
        }
        Ok(())
    }

    pub fn feeder_enable(&mut self, on: bool) -> Result<()> {
        hw(self.feeder.enable(on), "enable feeder")
    }

    pub fn feeder_set_zero(&mut self) -> Result<()> {
        hw(self.feeder.set_zero(), "zero feeder")
    }

    pub fn feeder_move(&mut self, distance: f64, speed: f64, accel: f64, sync: bool) -> Result<()> {
        hw(
            self.feeder.move_distance(distance, speed, accel, sync),
            "move feeder",
        )
    }

    pub fn axis_position(&mut self) -> Result<[f64; 4]> {
        hw(self.axis.position(), "read axis position")
    }

    pub fn axis_move_to(&mut self, position: [f64; 4], speed: f64) -> Result<()> {
        hw(self.axis.move_to(position, speed), "move axis")
    }

    /// Move the filament-feed coordinate by `delta`, leaving x/y/z untouched.
    pub fn axis_advance(&mut self, delta: f64, speed: f64) -> Result<()> {
        let mut pos = self.axis_position()?;
        pos[E_AXIS] += delta;
        self.axis_move_to(pos, speed)
    }

    pub fn sensor_state(&mut self) -> Result<FilamentState> {
        hw(self.sensor.state(), "read presence sensor")
    }

    pub fn dwell(&mut self, d: Duration) -> Result<()> {
        hw(self.barrier.dwell(d), "dwell")
    }

    pub fn wait_moves(&mut self) -> Result<()> {
        hw(self.barrier.wait_moves(), "wait for moves")
    }

    /// Dwell, then join all queued motion.
    pub fn settle(&mut self, d: Duration) -> Result<()> {
        self.dwell(d)?;
        self.wait_moves()
    }
}
