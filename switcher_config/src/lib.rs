#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and port-table parsing for the filament switcher.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section is optional; missing keys fall back to the stock feeder.
//! - The port-table CSV loader enforces headers and port ordering so a
//!   table can be maintained outside the TOML.
use serde::Deserialize;

/// Upper bound on ports a single feeder can carry.
pub const MAX_PORTS: usize = 8;

/// Per-port parameters, one list entry per port.
///
/// All distances are non-negative magnitudes; the sign for odd ports is
/// derived at runtime.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PortsCfg {
    pub retract_distance: Vec<f64>,
    pub feed_distance: Vec<f64>,
    pub small_feed_distance: Vec<f64>,
    pub slower_margin: Vec<f64>,
    pub servo_on_deg: Vec<f64>,
    pub servo_off_deg: Vec<f64>,
}

impl Default for PortsCfg {
    fn default() -> Self {
        Self {
            retract_distance: vec![95.0; 4],
            feed_distance: vec![98.0; 4],
            small_feed_distance: vec![2.0; 4],
            slower_margin: vec![10.0; 4],
            servo_on_deg: vec![29.0, 157.0, 29.0, 157.0],
            servo_off_deg: vec![90.0; 4],
        }
    }
}

impl PortsCfg {
    /// Number of ports described by the table (length of `retract_distance`).
    pub fn len(&self) -> usize {
        self.retract_distance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retract_distance.is_empty()
    }

    /// Build a table from CSV rows (already checked for ordering).
    pub fn from_rows(rows: &[PortRow]) -> Self {
        Self {
            retract_distance: rows.iter().map(|r| r.retract).collect(),
            feed_distance: rows.iter().map(|r| r.feed).collect(),
            small_feed_distance: rows.iter().map(|r| r.small_feed).collect(),
            slower_margin: rows.iter().map(|r| r.slower_margin).collect(),
            servo_on_deg: rows.iter().map(|r| r.servo_on).collect(),
            servo_off_deg: rows.iter().map(|r| r.servo_off).collect(),
        }
    }

    fn columns(&self) -> [(&'static str, &[f64]); 6] {
        [
            ("retract_distance", &self.retract_distance),
            ("feed_distance", &self.feed_distance),
            ("small_feed_distance", &self.small_feed_distance),
            ("slower_margin", &self.slower_margin),
            ("servo_on_deg", &self.servo_on_deg),
            ("servo_off_deg", &self.servo_off_deg),
        ]
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Speeds {
    /// Motion-axis speed for moves around the sensor (mm/s)
    pub unload_speed: f64,
    /// Feeder fast speed (mm/s)
    pub stepper_speed: f64,
    /// Feeder slow speed, also used for the extruder catch move (mm/s)
    pub stepper_slower_speed: f64,
    pub stepper_accel: f64,
}

impl Default for Speeds {
    fn default() -> Self {
        Self {
            unload_speed: 20.0,
            stepper_speed: 50.0,
            stepper_slower_speed: 5.0,
            stepper_accel: 50.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Geometry {
    pub sensor_to_gear_distance: f64,
    pub sensor_to_gear_margin: f64,
    pub filament_catching_margin: f64,
    /// Extra travel added to the slower margin during the slow feed
    pub slow_feed_overrun: f64,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            sensor_to_gear_distance: 35.0,
            sensor_to_gear_margin: 5.0,
            filament_catching_margin: 2.0,
            slow_feed_overrun: 5.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Timing {
    /// Dwell after any clutch change so the servo is seated
    pub servo_settle_ms: u64,
    /// Dwell after each sequencer step
    pub settle_ms: u64,
    /// Dwell between sensor polls while loading
    pub sensor_poll_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            servo_settle_ms: 1000,
            settle_ms: 100,
            sensor_poll_ms: 50,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Safety {
    /// Abort the unload-to-sensor loop after retracting this far (mm)
    pub max_unload_distance: f64,
}

impl Default for Safety {
    fn default() -> Self {
        Self {
            max_unload_distance: 150.0,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: daily)
    pub rotation: Option<String>,
    /// Rotated files to keep (default: 5)
    pub max_files: Option<usize>,
}

/// Backend tuning used by the GPIO implementation only.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Hardware {
    pub feeder_steps_per_mm: f64,
    pub extruder_steps_per_mm: f64,
    pub servo_min_pulse_us: u32,
    pub servo_max_pulse_us: u32,
    /// Treat low level on the sensor pin as filament present
    pub sensor_active_low: bool,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            feeder_steps_per_mm: 100.0,
            extruder_steps_per_mm: 400.0,
            servo_min_pulse_us: 500,
            servo_max_pulse_us: 2500,
            sensor_active_low: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Pins {
    pub servos: Vec<u8>,
    pub sensor: u8,
    pub feeder_step: u8,
    pub feeder_dir: u8,
    pub feeder_en: Option<u8>,
    pub extruder_step: u8,
    pub extruder_dir: u8,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub ports: PortsCfg,
    pub speeds: Speeds,
    pub geometry: Geometry,
    pub timing: Timing,
    pub safety: Safety,
    pub logging: Logging,
    pub hardware: Hardware,
    /// GPIO assignment; only the hardware backend requires it.
    pub pins: Option<Pins>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Port-table CSV schema.
///
/// Expected headers:
/// port,retract,feed,small_feed,slower_margin,servo_on,servo_off
///
/// Example:
/// port,retract,feed,small_feed,slower_margin,servo_on,servo_off
/// 0,95,98,2,10,29,90
/// 1,95,98,2,10,157,90
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct PortRow {
    pub port: usize,
    pub retract: f64,
    pub feed: f64,
    pub small_feed: f64,
    pub slower_margin: f64,
    pub servo_on: f64,
    pub servo_off: f64,
}

const PORT_CSV_HEADERS: [&str; 7] = [
    "port",
    "retract",
    "feed",
    "small_feed",
    "slower_margin",
    "servo_on",
    "servo_off",
];

pub fn load_ports_csv(path: &std::path::Path) -> eyre::Result<Vec<PortRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open port table CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != PORT_CSV_HEADERS {
        eyre::bail!(
            "port table CSV must have headers '{}', got: {}",
            PORT_CSV_HEADERS.join(","),
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<PortRow>().enumerate() {
        match rec {
            Ok(row) => {
                if row.port != rows.len() {
                    eyre::bail!(
                        "port table CSV row {} lists port {}, expected port {}",
                        idx + 2,
                        row.port,
                        rows.len()
                    );
                }
                rows.push(row);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    if rows.is_empty() {
        eyre::bail!("port table CSV {:?} has no rows", path);
    }
    Ok(rows)
}

fn require_positive(key: &str, v: f64) -> eyre::Result<()> {
    if !(v.is_finite() && v > 0.0) {
        eyre::bail!("{key} must be > 0");
    }
    Ok(())
}

fn require_non_negative(key: &str, v: f64) -> eyre::Result<()> {
    if !(v.is_finite() && v >= 0.0) {
        eyre::bail!("{key} must be >= 0");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Ports
        let n = self.ports.len();
        if n == 0 {
            eyre::bail!("ports.retract_distance must list at least one port");
        }
        if n > MAX_PORTS {
            eyre::bail!("ports lists {n} ports; at most {MAX_PORTS} are supported");
        }
        for (key, col) in self.ports.columns() {
            if col.len() != n {
                eyre::bail!(
                    "ports.{key} has {} entries but ports.retract_distance has {n}",
                    col.len()
                );
            }
        }
        for (key, col) in self.ports.columns().into_iter().take(4) {
            for (i, v) in col.iter().enumerate() {
                require_non_negative(&format!("ports.{key}[{i}]"), *v)?;
            }
        }
        for (key, col) in self.ports.columns().into_iter().skip(4) {
            for (i, v) in col.iter().enumerate() {
                if !(0.0..=180.0).contains(v) {
                    eyre::bail!("ports.{key}[{i}] must be in [0, 180] degrees");
                }
            }
        }
        for i in 0..n {
            if self.ports.slower_margin[i] > self.ports.feed_distance[i] {
                eyre::bail!("ports.slower_margin[{i}] must not exceed ports.feed_distance[{i}]");
            }
        }

        // Speeds
        require_positive("speeds.unload_speed", self.speeds.unload_speed)?;
        require_positive("speeds.stepper_speed", self.speeds.stepper_speed)?;
        require_positive(
            "speeds.stepper_slower_speed",
            self.speeds.stepper_slower_speed,
        )?;
        require_positive("speeds.stepper_accel", self.speeds.stepper_accel)?;

        // Geometry
        let g = &self.geometry;
        require_non_negative("geometry.sensor_to_gear_distance", g.sensor_to_gear_distance)?;
        require_non_negative("geometry.sensor_to_gear_margin", g.sensor_to_gear_margin)?;
        require_non_negative(
            "geometry.filament_catching_margin",
            g.filament_catching_margin,
        )?;
        require_non_negative("geometry.slow_feed_overrun", g.slow_feed_overrun)?;
        if g.sensor_to_gear_margin > g.sensor_to_gear_distance {
            eyre::bail!(
                "geometry.sensor_to_gear_margin must not exceed geometry.sensor_to_gear_distance"
            );
        }

        // Timing
        if self.timing.servo_settle_ms > 10_000 {
            eyre::bail!("timing.servo_settle_ms is unreasonably large (>10s)");
        }
        if self.timing.settle_ms > 10_000 || self.timing.sensor_poll_ms > 10_000 {
            eyre::bail!("timing.settle_ms and timing.sensor_poll_ms must be <= 10000");
        }

        // Safety
        require_positive("safety.max_unload_distance", self.safety.max_unload_distance)?;

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }
        if self.logging.max_files == Some(0) {
            eyre::bail!("logging.max_files must be >= 1");
        }

        // Hardware
        require_positive(
            "hardware.feeder_steps_per_mm",
            self.hardware.feeder_steps_per_mm,
        )?;
        require_positive(
            "hardware.extruder_steps_per_mm",
            self.hardware.extruder_steps_per_mm,
        )?;
        if self.hardware.servo_min_pulse_us >= self.hardware.servo_max_pulse_us {
            eyre::bail!("hardware.servo_min_pulse_us must be < hardware.servo_max_pulse_us");
        }

        // Pins
        if let Some(pins) = &self.pins
            && pins.servos.len() != n
        {
            eyre::bail!(
                "pins.servos has {} entries but {n} ports are configured",
                pins.servos.len()
            );
        }

        Ok(())
    }
}
