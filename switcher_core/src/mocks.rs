//! Test and helper mocks for switcher_core
//!
//! [`SpyRig`] hands out one handle per collaborator trait. All handles share a
//! single ordered call log, so a test can assert the exact choreography of a
//! sequence across clutches, feeder, axis, barrier and sensor.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use switcher_traits::{
    Barrier, ClutchBank, E_AXIS, Feeder, FilamentState, HwResult, MotionAxis, PresenceSensor,
};

use crate::builder::SwitcherBuilder;
use crate::ports::PortTable;
use crate::progress::ProgressSink;
use crate::switcher::Switcher;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Clutch { index: usize, degrees: f64 },
    FeederEnable(bool),
    FeederZero,
    FeederMove {
        distance: f64,
        speed: f64,
        accel: f64,
        sync: bool,
    },
    /// Change of the filament-feed coordinate only.
    AxisMove { delta: f64, speed: f64 },
    Dwell(Duration),
    WaitMoves,
    SensorRead(FilamentState),
}

impl Call {
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            Call::Clutch { .. } | Call::FeederMove { .. } | Call::AxisMove { .. }
        )
    }
}

/// Collaborator call a [`SpyRig`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Clutch,
    FeederEnable,
    FeederMove,
    Axis,
    Sensor,
}

struct Inner {
    calls: Vec<Call>,
    script: VecDeque<FilamentState>,
    fallback: FilamentState,
    e: f64,
    failure: Option<(FailAt, Box<dyn std::error::Error + Send + Sync>)>,
}

impl Inner {
    fn take_failure(&mut self, at: FailAt) -> HwResult<()> {
        match self.failure.take() {
            Some((kind, err)) if kind == at => Err(err),
            other => {
                self.failure = other;
                Ok(())
            }
        }
    }
}

#[derive(Clone)]
pub struct SpyRig {
    inner: Rc<RefCell<Inner>>,
    clutches: usize,
}

impl SpyRig {
    /// Rig with `clutches` servos and a sensor that always reads `fallback`.
    pub fn new(clutches: usize, fallback: FilamentState) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                calls: Vec::new(),
                script: VecDeque::new(),
                fallback,
                e: 0.0,
                failure: None,
            })),
            clutches,
        }
    }

    /// Queue sensor readings returned before the fallback.
    pub fn script_sensor(&self, states: impl IntoIterator<Item = FilamentState>) {
        self.inner.borrow_mut().script.extend(states);
    }

    pub fn set_fallback(&self, state: FilamentState) {
        self.inner.borrow_mut().fallback = state;
    }

    /// Fail the next call of kind `at` with `err`. One-shot.
    pub fn fail_next(&self, at: FailAt, err: impl std::error::Error + Send + Sync + 'static) {
        self.inner.borrow_mut().failure = Some((at, Box::new(err)));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.borrow().calls.clone()
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().calls.clear();
    }

    /// Current filament-feed coordinate of the spy axis.
    pub fn e_position(&self) -> f64 {
        self.inner.borrow().e
    }

    pub fn clutch_bank(&self) -> SpyClutches {
        SpyClutches(self.clone())
    }

    pub fn feeder(&self) -> SpyFeeder {
        SpyFeeder(self.clone())
    }

    pub fn axis(&self) -> SpyAxis {
        SpyAxis(self.clone())
    }

    pub fn barrier(&self) -> SpyBarrier {
        SpyBarrier(self.clone())
    }

    pub fn sensor(&self) -> SpySensor {
        SpySensor(self.clone())
    }

    /// Builder wired to every handle of this rig, with the given port table.
    pub fn switcher(&self, ports: PortTable) -> SwitcherBuilder {
        Switcher::builder()
            .with_clutches(self.clutch_bank())
            .with_feeder(self.feeder())
            .with_axis(self.axis())
            .with_barrier(self.barrier())
            .with_sensor(self.sensor())
            .with_ports(ports)
    }

    fn record(&self, call: Call) {
        self.inner.borrow_mut().calls.push(call);
    }

    fn fail(&self, at: FailAt) -> HwResult<()> {
        self.inner.borrow_mut().take_failure(at)
    }
}

pub struct SpyClutches(SpyRig);
pub struct SpyFeeder(SpyRig);
pub struct SpyAxis(SpyRig);
pub struct SpyBarrier(SpyRig);
pub struct SpySensor(SpyRig);

impl ClutchBank for SpyClutches {
    fn len(&self) -> usize {
        self.0.clutches
    }

    fn set_angle(&mut self, index: usize, degrees: f64) -> HwResult<()> {
        self.0.fail(FailAt::Clutch)?;
        self.0.record(Call::Clutch { index, degrees });
        Ok(())
    }
}

impl Feeder for SpyFeeder {
    fn enable(&mut self, on: bool) -> HwResult<()> {
        self.0.fail(FailAt::FeederEnable)?;
        self.0.record(Call::FeederEnable(on));
        Ok(())
    }

    fn set_zero(&mut self) -> HwResult<()> {
        self.0.record(Call::FeederZero);
        Ok(())
    }

    fn move_distance(&mut self, distance: f64, speed: f64, accel: f64, sync: bool) -> HwResult<()> {
        self.0.fail(FailAt::FeederMove)?;
        self.0.record(Call::FeederMove {
            distance,
            speed,
            accel,
            sync,
        });
        Ok(())
    }
}

impl MotionAxis for SpyAxis {
    fn position(&mut self) -> HwResult<[f64; 4]> {
        let mut pos = [0.0; 4];
        pos[E_AXIS] = self.0.e_position();
        Ok(pos)
    }

    fn move_to(&mut self, position: [f64; 4], speed: f64) -> HwResult<()> {
        self.0.fail(FailAt::Axis)?;
        let delta = {
            let mut inner = self.0.inner.borrow_mut();
            let delta = position[E_AXIS] - inner.e;
            inner.e = position[E_AXIS];
            delta
        };
        self.0.record(Call::AxisMove { delta, speed });
        Ok(())
    }
}

impl Barrier for SpyBarrier {
    fn dwell(&mut self, d: Duration) -> HwResult<()> {
        self.0.record(Call::Dwell(d));
        Ok(())
    }

    fn wait_moves(&mut self) -> HwResult<()> {
        self.0.record(Call::WaitMoves);
        Ok(())
    }
}

impl PresenceSensor for SpySensor {
    fn state(&mut self) -> HwResult<FilamentState> {
        self.0.fail(FailAt::Sensor)?;
        let state = {
            let mut inner = self.0.inner.borrow_mut();
            let fallback = inner.fallback;
            inner.script.pop_front().unwrap_or(fallback)
        };
        self.0.record(Call::SensorRead(state));
        Ok(state)
    }
}

/// Progress sink that keeps every line; clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink(Rc<RefCell<Vec<String>>>);

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn report(&self, line: &str) {
        self.0.borrow_mut().push(line.to_owned());
    }
}
