//! Backends for the switcher collaborator traits.
//!
//! The default build ships a simulated filament rig; the `hardware` feature
//! adds GPIO drivers for a Raspberry Pi class controller.

pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use switcher_traits::{
    Barrier, ClutchBank, Clock, E_AXIS, Feeder, FilamentState, HwResult, MotionAxis,
    PresenceSensor,
};

use crate::error::HwError;

/// Tip position of a filament that sits loaded in the print head.
pub const LOADED_TIP_MM: f64 = 10.0;

/// Angles closer than this count as the same servo position.
const ANGLE_TOLERANCE_DEG: f64 = 0.5;

/// Geometry of the simulated feeder.
///
/// Tip positions are measured along the filament path relative to the
/// presence sensor: `>= 0` is at or past the sensor, negative is behind it.
#[derive(Debug, Clone)]
pub struct SimSettings {
    /// Clutch angle at which each port's filament is pressed onto the feeder gear.
    pub on_angles: Vec<f64>,
    /// Tips at or beyond this position are driven by the extruder.
    pub extruder_grip_mm: f64,
    /// Resting tip position of filament that is not loaded.
    pub parked_mm: f64,
}

impl SimSettings {
    pub fn new(on_angles: Vec<f64>, sensor_to_gear_mm: f64, parked_mm: f64) -> Self {
        Self {
            on_angles,
            extruder_grip_mm: -sensor_to_gear_mm,
            parked_mm,
        }
    }
}

impl Default for SimSettings {
    fn default() -> Self {
        Self::new(vec![29.0, 157.0, 29.0, 157.0], 35.0, -130.0)
    }
}

/// Observable state of the rig, for assertions and CLI diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct RigSnapshot {
    pub tips_mm: Vec<f64>,
    pub angles: Vec<Option<f64>>,
    pub feeder_enabled: bool,
    pub extruder_e: f64,
}

impl RigSnapshot {
    /// Ports whose clutch currently sits at its on-angle.
    pub fn engaged(&self, on_angles: &[f64]) -> Vec<usize> {
        self.angles
            .iter()
            .zip(on_angles)
            .enumerate()
            .filter(|(_, (a, on))| a.is_some_and(|a| (a - **on).abs() < ANGLE_TOLERANCE_DEG))
            .map(|(i, _)| i)
            .collect()
    }
}

#[derive(Debug)]
struct RigState {
    settings: SimSettings,
    angles: Vec<Option<f64>>,
    tips: Vec<f64>,
    feeder_enabled: bool,
    feeder_pos: f64,
    position: [f64; 4],
    pending: Duration,
    forced_sensor: Option<FilamentState>,
}

impl RigState {
    fn engaged(&self, index: usize) -> bool {
        match (self.angles[index], self.settings.on_angles.get(index)) {
            (Some(a), Some(on)) => (a - on).abs() < ANGLE_TOLERANCE_DEG,
            _ => false,
        }
    }

    fn queue_travel(&mut self, distance: f64, speed: f64) {
        if speed > 0.0 && distance.is_finite() {
            self.pending += Duration::from_secs_f64(distance.abs() / speed);
        }
    }

    fn sensor(&self) -> FilamentState {
        if let Some(forced) = self.forced_sensor {
            return forced;
        }
        if self.tips.iter().any(|t| *t >= 0.0) {
            FilamentState::Present
        } else {
            FilamentState::Absent
        }
    }
}

/// Mirrored mounting: odd ports travel backwards for a forward feeder move.
#[inline]
fn mount_sign(index: usize) -> f64 {
    if index % 2 == 0 { 1.0 } else { -1.0 }
}

/// Simulated feeder with one shared filament model behind every handle.
///
/// Handles are single-threaded (`Rc`) like the rest of the simulation.
#[derive(Clone)]
pub struct SimRig {
    state: Rc<RefCell<RigState>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl SimRig {
    pub fn new(settings: SimSettings, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let n = settings.on_angles.len();
        let parked = settings.parked_mm;
        Self {
            state: Rc::new(RefCell::new(RigState {
                settings,
                angles: vec![None; n],
                tips: vec![parked; n],
                feeder_enabled: false,
                feeder_pos: 0.0,
                position: [0.0; 4],
                pending: Duration::ZERO,
                forced_sensor: None,
            })),
            clock,
        }
    }

    /// Place `port`'s filament in the print head, past the sensor.
    pub fn load(&self, port: usize) {
        let mut st = self.state.borrow_mut();
        if let Some(tip) = st.tips.get_mut(port) {
            *tip = LOADED_TIP_MM;
        }
    }

    /// Force the sensor to a fixed reading (`None` restores the model).
    pub fn force_sensor(&self, state: Option<FilamentState>) {
        self.state.borrow_mut().forced_sensor = state;
    }

    pub fn snapshot(&self) -> RigSnapshot {
        let st = self.state.borrow();
        RigSnapshot {
            tips_mm: st.tips.clone(),
            angles: st.angles.clone(),
            feeder_enabled: st.feeder_enabled,
            extruder_e: st.position[E_AXIS],
        }
    }

    pub fn clutches(&self) -> SimClutches {
        SimClutches {
            state: Rc::clone(&self.state),
        }
    }

    pub fn feeder(&self) -> SimFeeder {
        SimFeeder {
            state: Rc::clone(&self.state),
        }
    }

    pub fn toolhead(&self) -> SimToolhead {
        SimToolhead {
            state: Rc::clone(&self.state),
            clock: Arc::clone(&self.clock),
        }
    }

    pub fn sensor(&self) -> SimSensor {
        SimSensor {
            state: Rc::clone(&self.state),
        }
    }
}

pub struct SimClutches {
    state: Rc<RefCell<RigState>>,
}

impl ClutchBank for SimClutches {
    fn len(&self) -> usize {
        self.state.borrow().angles.len()
    }

    fn set_angle(&mut self, index: usize, degrees: f64) -> HwResult<()> {
        let mut st = self.state.borrow_mut();
        let len = st.angles.len();
        let slot = st
            .angles
            .get_mut(index)
            .ok_or(HwError::InvalidIndex { index, len })?;
        *slot = Some(degrees);
        tracing::debug!(index, degrees, "sim clutch");
        Ok(())
    }
}

pub struct SimFeeder {
    state: Rc<RefCell<RigState>>,
}

impl Feeder for SimFeeder {
    fn enable(&mut self, on: bool) -> HwResult<()> {
        self.state.borrow_mut().feeder_enabled = on;
        Ok(())
    }

    fn set_zero(&mut self) -> HwResult<()> {
        self.state.borrow_mut().feeder_pos = 0.0;
        Ok(())
    }

    fn move_distance(
        &mut self,
        distance: f64,
        speed: f64,
        _accel: f64,
        _sync: bool,
    ) -> HwResult<()> {
        let mut st = self.state.borrow_mut();
        if !st.feeder_enabled {
            return Err(Box::new(HwError::Disabled("feeder stepper")));
        }
        let delta = distance - st.feeder_pos;
        st.feeder_pos = distance;
        for i in 0..st.tips.len() {
            if st.engaged(i) {
                st.tips[i] += delta * mount_sign(i);
            }
        }
        st.queue_travel(delta, speed);
        tracing::debug!(distance, speed, "sim feeder move");
        Ok(())
    }
}

/// Print-head motion axis and motion-queue barrier in one handle.
#[derive(Clone)]
pub struct SimToolhead {
    state: Rc<RefCell<RigState>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl MotionAxis for SimToolhead {
    fn position(&mut self) -> HwResult<[f64; 4]> {
        Ok(self.state.borrow().position)
    }

    fn move_to(&mut self, position: [f64; 4], speed: f64) -> HwResult<()> {
        let mut st = self.state.borrow_mut();
        let delta = position[E_AXIS] - st.position[E_AXIS];
        let grip = st.settings.extruder_grip_mm;
        for tip in st.tips.iter_mut() {
            if *tip >= grip {
                *tip += delta;
            }
        }
        st.position = position;
        st.queue_travel(delta, speed);
        Ok(())
    }
}

impl Barrier for SimToolhead {
    fn dwell(&mut self, d: Duration) -> HwResult<()> {
        self.clock.sleep(d);
        Ok(())
    }

    fn wait_moves(&mut self) -> HwResult<()> {
        let pending = std::mem::take(&mut self.state.borrow_mut().pending);
        self.clock.sleep(pending);
        Ok(())
    }
}

pub struct SimSensor {
    state: Rc<RefCell<RigState>>,
}

impl PresenceSensor for SimSensor {
    fn state(&mut self) -> HwResult<FilamentState> {
        Ok(self.state.borrow().sensor())
    }
}

/// Barrier for backends whose moves block until done: dwell sleeps on the
/// clock, the join is a no-op.
pub struct ClockBarrier<C: Clock> {
    clock: C,
}

impl<C: Clock> ClockBarrier<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> Barrier for ClockBarrier<C> {
    fn dwell(&mut self, d: Duration) -> HwResult<()> {
        self.clock.sleep(d);
        Ok(())
    }

    fn wait_moves(&mut self) -> HwResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switcher_traits::ManualClock;

    fn rig() -> (SimRig, ManualClock) {
        let clock = ManualClock::new();
        (SimRig::new(SimSettings::default(), Arc::new(clock.clone())), clock)
    }

    #[test]
    fn feeder_moves_only_engaged_port_with_mirrored_sign() {
        let (rig, _) = rig();
        let mut clutches = rig.clutches();
        let mut feeder = rig.feeder();
        clutches.set_angle(1, 157.0).unwrap();
        clutches.set_angle(0, 90.0).unwrap();
        feeder.enable(true).unwrap();
        feeder.set_zero().unwrap();
        feeder.move_distance(-88.0, 50.0, 50.0, false).unwrap();

        let snap = rig.snapshot();
        assert_eq!(snap.tips_mm[0], -130.0);
        assert_eq!(snap.tips_mm[1], -42.0);
        assert_eq!(snap.engaged(&[29.0, 157.0, 29.0, 157.0]), vec![1]);
    }

    #[test]
    fn disabled_feeder_rejects_moves() {
        let (rig, _) = rig();
        let err = rig
            .feeder()
            .move_distance(10.0, 50.0, 50.0, false)
            .expect_err("feeder disabled");
        assert!(err.to_string().contains("disabled"));
    }

    #[test]
    fn extruder_drives_only_gripped_tips() {
        let (rig, _) = rig();
        rig.load(2);
        let mut th = rig.toolhead();
        let mut sensor = rig.sensor();
        assert_eq!(sensor.state().unwrap(), FilamentState::Present);

        let mut pos = th.position().unwrap();
        pos[E_AXIS] -= 45.0;
        th.move_to(pos, 20.0).unwrap();
        assert_eq!(sensor.state().unwrap(), FilamentState::Absent);

        let snap = rig.snapshot();
        assert_eq!(snap.tips_mm[2], LOADED_TIP_MM - 45.0);
        assert_eq!(snap.tips_mm[0], -130.0);
        assert_eq!(snap.extruder_e, -45.0);
    }

    #[test]
    fn wait_moves_sleeps_queued_travel() {
        let (rig, clock) = rig();
        let mut th = rig.toolhead();
        th.move_to([0.0, 0.0, 0.0, 40.0], 20.0).unwrap();
        th.dwell(Duration::from_millis(100)).unwrap();
        th.wait_moves().unwrap();
        assert_eq!(clock.elapsed(), Duration::from_millis(2100));
        th.wait_moves().unwrap();
        assert_eq!(clock.elapsed(), Duration::from_millis(2100));
    }

    #[test]
    fn forced_sensor_overrides_model() {
        let (rig, _) = rig();
        rig.load(0);
        rig.force_sensor(Some(FilamentState::Absent));
        assert_eq!(rig.sensor().state().unwrap(), FilamentState::Absent);
        rig.force_sensor(None);
        assert_eq!(rig.sensor().state().unwrap(), FilamentState::Present);
    }

    #[test]
    fn clutch_index_out_of_range_is_typed() {
        let (rig, _) = rig();
        let err = rig.clutches().set_angle(7, 90.0).expect_err("bad index");
        assert!(matches!(
            err.downcast_ref::<HwError>(),
            Some(HwError::InvalidIndex { index: 7, len: 4 })
        ));
    }
}
