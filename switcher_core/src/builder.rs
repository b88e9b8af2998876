//! Builder for [`Switcher`].
//!
//! Every collaborator is required; configuration and the port table fall back
//! to their defaults. All checks run in `build()`.

use switcher_traits::{Barrier, ClutchBank, Feeder, MotionAxis, PresenceSensor};

use crate::actuators::Actuators;
use crate::config::SwitchCfg;
use crate::error::{BuildError, Report, Result};
use crate::ports::PortTable;
use crate::progress::{NullSink, ProgressSink};
use crate::state::ControllerState;
use crate::switcher::Switcher;

#[derive(Default)]
pub struct SwitcherBuilder {
    clutches: Option<Box<dyn ClutchBank>>,
    feeder: Option<Box<dyn Feeder>>,
    axis: Option<Box<dyn MotionAxis>>,
    barrier: Option<Box<dyn Barrier>>,
    sensor: Option<Box<dyn PresenceSensor>>,
    ports: Option<PortTable>,
    cfg: Option<SwitchCfg>,
    sink: Option<Box<dyn ProgressSink>>,
}

impl SwitcherBuilder {
    pub fn with_clutches(mut self, clutches: impl ClutchBank + 'static) -> Self {
        self.clutches = Some(Box::new(clutches));
        self
    }

    pub fn with_feeder(mut self, feeder: impl Feeder + 'static) -> Self {
        self.feeder = Some(Box::new(feeder));
        self
    }

    pub fn with_axis(mut self, axis: impl MotionAxis + 'static) -> Self {
        self.axis = Some(Box::new(axis));
        self
    }

    pub fn with_barrier(mut self, barrier: impl Barrier + 'static) -> Self {
        self.barrier = Some(Box::new(barrier));
        self
    }

    pub fn with_sensor(mut self, sensor: impl PresenceSensor + 'static) -> Self {
        self.sensor = Some(Box::new(sensor));
        self
    }

    pub fn with_ports(mut self, ports: PortTable) -> Self {
        self.ports = Some(ports);
        self
    }

    pub fn with_config(mut self, cfg: SwitchCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Receive the human-readable progress lines of long sequences.
    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn build(self) -> Result<Switcher> {
        let clutches = self
            .clutches
            .ok_or_else(|| Report::new(BuildError::MissingClutches))?;
        let feeder = self
            .feeder
            .ok_or_else(|| Report::new(BuildError::MissingFeeder))?;
        let axis = self
            .axis
            .ok_or_else(|| Report::new(BuildError::MissingAxis))?;
        let barrier = self
            .barrier
            .ok_or_else(|| Report::new(BuildError::MissingBarrier))?;
        let sensor = self
            .sensor
            .ok_or_else(|| Report::new(BuildError::MissingSensor))?;

        let ports = self.ports.unwrap_or_default();
        if clutches.len() < ports.len() {
            return Err(Report::new(BuildError::ClutchBankTooSmall {
                clutches: clutches.len(),
                ports: ports.len(),
            }));
        }

        let cfg = self.cfg.unwrap_or_default();
        cfg.check()
            .map_err(|msg| Report::new(BuildError::InvalidConfig(msg)))?;

        tracing::debug!(ports = ports.len(), clutches = clutches.len(), "switcher built");
        Ok(Switcher {
            hw: Actuators::new(clutches, feeder, axis, barrier, sensor),
            ports,
            cfg,
            state: ControllerState::new(),
            sink: self.sink.unwrap_or_else(|| Box::new(NullSink)),
            last_switch: None,
        })
    }
}
