//! GPIO drivers: software-PWM servos, presence switch, step/dir steppers.
//!
//! Moves are executed inline and block until the last step pulse, so the
//! matching barrier is [`crate::ClockBarrier`].

use std::thread::sleep;
use std::time::Duration;

use rppal::gpio::{Gpio, InputPin, OutputPin};
use switcher_traits::{
    ClutchBank, E_AXIS, Feeder, FilamentState, HwResult, MotionAxis, PresenceSensor,
};
use tracing::{debug, trace};

use crate::error::{HwError, Result};

/// Servo frame period at 50 Hz.
const SERVO_PERIOD_US: f64 = 20_000.0;

pub fn open() -> Result<Gpio> {
    Ok(Gpio::new()?)
}

pub struct ServoBank {
    pins: Vec<OutputPin>,
    min_pulse_us: u32,
    max_pulse_us: u32,
}

impl ServoBank {
    pub fn new(gpio: &Gpio, pins: &[u8], min_pulse_us: u32, max_pulse_us: u32) -> Result<Self> {
        let pins = pins
            .iter()
            .map(|p| Ok(gpio.get(*p)?.into_output_low()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            pins,
            min_pulse_us,
            max_pulse_us,
        })
    }

    fn duty_for(&self, degrees: f64) -> f64 {
        let span = f64::from(self.max_pulse_us - self.min_pulse_us);
        let pulse = f64::from(self.min_pulse_us) + span * degrees.clamp(0.0, 180.0) / 180.0;
        pulse / SERVO_PERIOD_US
    }
}

impl ClutchBank for ServoBank {
    fn len(&self) -> usize {
        self.pins.len()
    }

    fn set_angle(&mut self, index: usize, degrees: f64) -> HwResult<()> {
        let duty = self.duty_for(degrees);
        let len = self.pins.len();
        let pin = self
            .pins
            .get_mut(index)
            .ok_or(HwError::InvalidIndex { index, len })?;
        pin.set_pwm_frequency(50.0, duty).map_err(HwError::from)?;
        debug!(index, degrees, duty, "servo angle");
        Ok(())
    }
}

pub struct GpioSensor {
    pin: InputPin,
    active_low: bool,
}

impl GpioSensor {
    pub fn new(gpio: &Gpio, pin: u8, active_low: bool) -> Result<Self> {
        Ok(Self {
            pin: gpio.get(pin)?.into_input_pullup(),
            active_low,
        })
    }
}

impl PresenceSensor for GpioSensor {
    fn state(&mut self) -> HwResult<FilamentState> {
        let pressed = self.pin.is_low() == self.active_low;
        Ok(if pressed {
            FilamentState::Present
        } else {
            FilamentState::Absent
        })
    }
}

/// Bit-banged step/dir driver tracking its own position in millimetres.
pub struct StepDir {
    step: OutputPin,
    dir: OutputPin,
    en: Option<OutputPin>,
    steps_per_mm: f64,
    position_mm: f64,
}

impl StepDir {
    pub fn new(
        gpio: &Gpio,
        step: u8,
        dir: u8,
        en: Option<u8>,
        steps_per_mm: f64,
    ) -> Result<Self> {
        let en = match en {
            // Enable is active low on the usual drivers; start disabled.
            Some(p) => Some(gpio.get(p)?.into_output_high()),
            None => None,
        };
        Ok(Self {
            step: gpio.get(step)?.into_output_low(),
            dir: gpio.get(dir)?.into_output_low(),
            en,
            steps_per_mm,
            position_mm: 0.0,
        })
    }

    fn set_enabled(&mut self, on: bool) {
        if let Some(en) = self.en.as_mut() {
            if on { en.set_low() } else { en.set_high() }
        }
    }

    fn step_to(&mut self, target_mm: f64, speed: f64) {
        let steps = ((target_mm - self.position_mm) * self.steps_per_mm).round() as i64;
        if steps == 0 || speed <= 0.0 {
            return;
        }
        if steps > 0 {
            self.dir.set_high();
        } else {
            self.dir.set_low();
        }
        let half = Duration::from_secs_f64(0.5 / (speed * self.steps_per_mm));
        for _ in 0..steps.unsigned_abs() {
            self.step.set_high();
            sleep(half);
            self.step.set_low();
            sleep(half);
        }
        self.position_mm += steps as f64 / self.steps_per_mm;
        trace!(steps, position_mm = self.position_mm, "stepper move");
    }
}

pub struct GpioFeeder {
    stepper: StepDir,
    enabled: bool,
}

impl GpioFeeder {
    pub fn new(stepper: StepDir) -> Self {
        Self {
            stepper,
            enabled: false,
        }
    }
}

impl Feeder for GpioFeeder {
    fn enable(&mut self, on: bool) -> HwResult<()> {
        self.stepper.set_enabled(on);
        self.enabled = on;
        Ok(())
    }

    fn set_zero(&mut self) -> HwResult<()> {
        self.stepper.position_mm = 0.0;
        Ok(())
    }

    fn move_distance(
        &mut self,
        distance: f64,
        speed: f64,
        _accel: f64,
        _sync: bool,
    ) -> HwResult<()> {
        if !self.enabled {
            return Err(Box::new(HwError::Disabled("feeder stepper")));
        }
        self.stepper.step_to(distance, speed);
        Ok(())
    }
}

/// Extruder stepper exposed as the print-head axis; only `e` is driven.
pub struct GpioExtruder {
    stepper: StepDir,
    position: [f64; 4],
}

impl GpioExtruder {
    pub fn new(mut stepper: StepDir) -> Self {
        stepper.set_enabled(true);
        Self {
            stepper,
            position: [0.0; 4],
        }
    }
}

impl MotionAxis for GpioExtruder {
    fn position(&mut self) -> HwResult<[f64; 4]> {
        Ok(self.position)
    }

    fn move_to(&mut self, position: [f64; 4], speed: f64) -> HwResult<()> {
        self.stepper.step_to(position[E_AXIS], speed);
        self.position = position;
        Ok(())
    }
}
