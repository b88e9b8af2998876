//! Runtime configuration types for the switching sequencer.
//!
//! These are separate from the TOML-deserialized config in `switcher_config`;
//! see `conversions` for the mapping.

use std::time::Duration;

/// Speeds and acceleration in mm/s and mm/s².
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedCfg {
    /// Motion-axis speed for every move around the sensor.
    pub unload: f64,
    /// Feeder fast speed.
    pub fast: f64,
    /// Feeder slow speed; also the extruder catch speed.
    pub slow: f64,
    pub accel: f64,
}

impl Default for SpeedCfg {
    fn default() -> Self {
        Self {
            unload: 20.0,
            fast: 50.0,
            slow: 5.0,
            accel: 50.0,
        }
    }
}

/// Fixed distances of the filament path, in mm.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryCfg {
    /// Sensor to the extruder gear.
    pub sensor_to_gear: f64,
    /// Subtracted from `sensor_to_gear` for the first load move.
    pub sensor_to_gear_margin: f64,
    /// Added to the slower margin for the extruder catch move.
    pub catching_margin: f64,
    /// Added to the slower margin during the slow feed.
    pub slow_feed_overrun: f64,
}

impl Default for GeometryCfg {
    fn default() -> Self {
        Self {
            sensor_to_gear: 35.0,
            sensor_to_gear_margin: 5.0,
            catching_margin: 2.0,
            slow_feed_overrun: 5.0,
        }
    }
}

/// Dwell lengths inserted before each motion-complete join.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingCfg {
    /// After any clutch change; covers the servo's travel time.
    pub servo_settle: Duration,
    /// After each sequencer step and each unload step.
    pub settle: Duration,
    /// Between sensor polls while advancing to the sensor.
    pub sensor_poll: Duration,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            servo_settle: Duration::from_secs(1),
            settle: Duration::from_millis(100),
            sensor_poll: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SafetyCfg {
    /// Longest retraction the unload-to-sensor loop may perform (mm).
    pub max_unload_distance: f64,
}

impl Default for SafetyCfg {
    fn default() -> Self {
        Self {
            max_unload_distance: 150.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwitchCfg {
    pub speeds: SpeedCfg,
    pub geometry: GeometryCfg,
    pub timing: TimingCfg,
    pub safety: SafetyCfg,
}

impl SwitchCfg {
    /// Reject values the sequencer cannot run with.
    pub(crate) fn check(&self) -> Result<(), &'static str> {
        let s = &self.speeds;
        if ![s.unload, s.fast, s.slow, s.accel]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
        {
            return Err("speeds must be finite and > 0");
        }
        let g = &self.geometry;
        if ![
            g.sensor_to_gear,
            g.sensor_to_gear_margin,
            g.catching_margin,
            g.slow_feed_overrun,
        ]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0)
        {
            return Err("geometry distances must be finite and >= 0");
        }
        if g.sensor_to_gear_margin > g.sensor_to_gear {
            return Err("sensor_to_gear_margin exceeds sensor_to_gear");
        }
        let cap = self.safety.max_unload_distance;
        if !(cap.is_finite() && cap > 0.0) {
            return Err("max_unload_distance must be finite and > 0");
        }
        Ok(())
    }
}
