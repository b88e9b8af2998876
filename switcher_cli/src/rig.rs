//! Backend assembly: the simulated rig by default, GPIO drivers with the
//! `hardware` feature and a `[pins]` section.

use std::sync::Arc;

use eyre::{Report, Result};
use switcher_config::Config;
use switcher_core::error::SwitchError;
use switcher_core::{PortTable, SwitchCfg, Switcher, SwitcherBuilder};
use switcher_hardware::{SimRig, SimSettings};
use switcher_traits::{Clock, FilamentState, ManualClock, MonotonicClock};

/// Simulator hook: force the presence sensor to `present` or `absent`.
pub const SIM_SENSOR_ENV: &str = "SWITCHER_SIM_SENSOR";

pub struct RigOptions {
    pub realtime: bool,
    /// Port whose filament starts loaded in the simulator.
    pub loaded_port: Option<usize>,
    pub json: bool,
}

fn config_err(msg: impl Into<String>) -> Report {
    Report::new(SwitchError::Config(msg.into()))
}

fn progress_sink(json: bool) -> impl Fn(&str) {
    move |line: &str| {
        if json {
            println!("{}", serde_json::json!({ "progress": line }));
        } else {
            println!("{line}");
        }
    }
}

fn forced_sensor() -> Result<Option<FilamentState>> {
    match std::env::var(SIM_SENSOR_ENV) {
        Ok(v) => match v.to_ascii_lowercase().as_str() {
            "present" => Ok(Some(FilamentState::Present)),
            "absent" => Ok(Some(FilamentState::Absent)),
            other => Err(config_err(format!(
                "{SIM_SENSOR_ENV} must be 'present' or 'absent', got '{other}'"
            ))),
        },
        Err(_) => Ok(None),
    }
}

fn sim_builder(cfg: &Config, opts: &RigOptions) -> Result<SwitcherBuilder> {
    let clock: Arc<dyn Clock + Send + Sync> = if opts.realtime {
        Arc::new(MonotonicClock::new())
    } else {
        Arc::new(ManualClock::new())
    };
    let settings = SimSettings::new(
        cfg.ports.servo_on_deg.clone(),
        cfg.geometry.sensor_to_gear_distance,
        SimSettings::default().parked_mm,
    );
    let rig = SimRig::new(settings, clock);
    if let Some(port) = opts.loaded_port {
        rig.load(port);
    }
    rig.force_sensor(forced_sensor()?);

    let th = rig.toolhead();
    Ok(Switcher::builder()
        .with_clutches(rig.clutches())
        .with_feeder(rig.feeder())
        .with_axis(th.clone())
        .with_barrier(th)
        .with_sensor(rig.sensor()))
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn gpio_builder(cfg: &Config, pins: &switcher_config::Pins) -> Result<SwitcherBuilder> {
    use switcher_hardware::ClockBarrier;
    use switcher_hardware::gpio::{self, GpioExtruder, GpioFeeder, GpioSensor, ServoBank, StepDir};

    fn fault(e: switcher_hardware::error::HwError) -> Report {
        Report::new(SwitchError::HardwareFault(format!("open gpio: {e}")))
    }

    let hw = &cfg.hardware;
    let gpio = gpio::open().map_err(fault)?;
    let servos = ServoBank::new(&gpio, &pins.servos, hw.servo_min_pulse_us, hw.servo_max_pulse_us)
        .map_err(fault)?;
    let feeder = StepDir::new(
        &gpio,
        pins.feeder_step,
        pins.feeder_dir,
        pins.feeder_en,
        hw.feeder_steps_per_mm,
    )
    .map_err(fault)?;
    let extruder = StepDir::new(
        &gpio,
        pins.extruder_step,
        pins.extruder_dir,
        None,
        hw.extruder_steps_per_mm,
    )
    .map_err(fault)?;
    let sensor = GpioSensor::new(&gpio, pins.sensor, hw.sensor_active_low).map_err(fault)?;
    tracing::info!(servos = ?pins.servos, sensor = pins.sensor, "GPIO backend ready");

    Ok(Switcher::builder()
        .with_clutches(servos)
        .with_feeder(GpioFeeder::new(feeder))
        .with_axis(GpioExtruder::new(extruder))
        .with_barrier(ClockBarrier::new(MonotonicClock::new()))
        .with_sensor(sensor))
}

/// Name of the backend `build_switcher` will pick for `cfg`.
pub fn backend_name(cfg: &Config) -> &'static str {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        if cfg.pins.is_some() {
            return "gpio";
        }
    }
    let _ = cfg;
    "sim"
}

pub fn build_switcher(cfg: &Config, opts: &RigOptions) -> Result<Switcher> {
    let builder = match backend_name(cfg) {
        #[cfg(all(feature = "hardware", target_os = "linux"))]
        "gpio" => match cfg.pins.as_ref() {
            Some(pins) => gpio_builder(cfg, pins)?,
            None => return Err(config_err("missing [pins] section")),
        },
        _ => {
            if cfg!(feature = "hardware") {
                tracing::warn!("no [pins] section; using the simulated rig");
            }
            sim_builder(cfg, opts)?
        }
    };
    let ports = PortTable::try_from(&cfg.ports)?;
    builder
        .with_ports(ports)
        .with_config(SwitchCfg::from(cfg))
        .with_progress(progress_sink(opts.json))
        .build()
}
