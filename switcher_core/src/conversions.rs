//! `From` implementations bridging `switcher_config` types to `switcher_core` types.

use std::time::Duration;

use crate::config::{GeometryCfg, SafetyCfg, SpeedCfg, SwitchCfg, TimingCfg};
use crate::error::{Report, Result, SwitchError};
use crate::ports::{PortConfig, PortTable};

// ── SpeedCfg ─────────────────────────────────────────────────────────────────

impl From<&switcher_config::Speeds> for SpeedCfg {
    fn from(c: &switcher_config::Speeds) -> Self {
        Self {
            unload: c.unload_speed,
            fast: c.stepper_speed,
            slow: c.stepper_slower_speed,
            accel: c.stepper_accel,
        }
    }
}

// ── GeometryCfg ──────────────────────────────────────────────────────────────

impl From<&switcher_config::Geometry> for GeometryCfg {
    fn from(c: &switcher_config::Geometry) -> Self {
        Self {
            sensor_to_gear: c.sensor_to_gear_distance,
            sensor_to_gear_margin: c.sensor_to_gear_margin,
            catching_margin: c.filament_catching_margin,
            slow_feed_overrun: c.slow_feed_overrun,
        }
    }
}

// ── TimingCfg ────────────────────────────────────────────────────────────────

impl From<&switcher_config::Timing> for TimingCfg {
    fn from(c: &switcher_config::Timing) -> Self {
        Self {
            servo_settle: Duration::from_millis(c.servo_settle_ms),
            settle: Duration::from_millis(c.settle_ms),
            sensor_poll: Duration::from_millis(c.sensor_poll_ms),
        }
    }
}

impl From<&switcher_config::Safety> for SafetyCfg {
    fn from(c: &switcher_config::Safety) -> Self {
        Self {
            max_unload_distance: c.max_unload_distance,
        }
    }
}

impl From<&switcher_config::Config> for SwitchCfg {
    fn from(c: &switcher_config::Config) -> Self {
        Self {
            speeds: (&c.speeds).into(),
            geometry: (&c.geometry).into(),
            timing: (&c.timing).into(),
            safety: (&c.safety).into(),
        }
    }
}

// ── PortTable ────────────────────────────────────────────────────────────────

impl TryFrom<&switcher_config::PortsCfg> for PortTable {
    type Error = Report;

    fn try_from(c: &switcher_config::PortsCfg) -> Result<Self> {
        let n = c.len();
        let columns = [
            c.feed_distance.len(),
            c.small_feed_distance.len(),
            c.slower_margin.len(),
            c.servo_on_deg.len(),
            c.servo_off_deg.len(),
        ];
        if columns.iter().any(|len| *len != n) {
            return Err(Report::new(SwitchError::Config(
                "port lists have unequal lengths".into(),
            )));
        }
        let ports = (0..n)
            .map(|i| PortConfig {
                retract_distance: c.retract_distance[i],
                feed_distance: c.feed_distance[i],
                small_feed_distance: c.small_feed_distance[i],
                slower_margin: c.slower_margin[i],
                servo_on_deg: c.servo_on_deg[i],
                servo_off_deg: c.servo_off_deg[i],
            })
            .collect();
        PortTable::new(ports)
    }
}
