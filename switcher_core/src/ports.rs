//! Port identifiers, the per-port parameter table and the parity sign rule.

use std::fmt;

use crate::error::{Report, Result, SwitchError};

/// One filament feed path, `0..N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Port(usize);

impl Port {
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn is_even(self) -> bool {
        self.0 % 2 == 0
    }
}

impl From<usize> for Port {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Apply the mounting sign convention to a distance magnitude.
///
/// Ports are mounted in mirrored pairs, so the same feeder direction moves
/// odd-port filament the other way. Every signed feeder distance goes
/// through here.
#[inline]
pub fn adjusted_value(port: Port, magnitude: f64) -> f64 {
    if port.is_even() { magnitude } else { -magnitude }
}

/// Parameters of one port. Distances are unsigned magnitudes in mm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortConfig {
    pub retract_distance: f64,
    pub feed_distance: f64,
    pub small_feed_distance: f64,
    pub slower_margin: f64,
    pub servo_on_deg: f64,
    pub servo_off_deg: f64,
}

impl PortConfig {
    /// Stock parameters; the on-angle alternates with parity.
    pub fn stock(port: Port) -> Self {
        Self {
            retract_distance: 95.0,
            feed_distance: 98.0,
            small_feed_distance: 2.0,
            slower_margin: 10.0,
            servo_on_deg: if port.is_even() { 29.0 } else { 157.0 },
            servo_off_deg: 90.0,
        }
    }

    fn magnitudes(&self) -> [f64; 4] {
        [
            self.retract_distance,
            self.feed_distance,
            self.small_feed_distance,
            self.slower_margin,
        ]
    }
}

/// Immutable table of port parameters, indexed by [`Port`].
#[derive(Debug, Clone, PartialEq)]
pub struct PortTable {
    ports: Vec<PortConfig>,
}

impl Default for PortTable {
    fn default() -> Self {
        Self {
            ports: (0..4).map(|i| PortConfig::stock(Port::new(i))).collect(),
        }
    }
}

impl PortTable {
    pub fn new(ports: Vec<PortConfig>) -> Result<Self> {
        if ports.is_empty() {
            return Err(Report::new(SwitchError::Config(
                "port table must contain at least one port".into(),
            )));
        }
        for (i, p) in ports.iter().enumerate() {
            if p.magnitudes().iter().any(|m| !m.is_finite() || *m < 0.0) {
                return Err(Report::new(SwitchError::Config(format!(
                    "port {i}: distances must be finite non-negative magnitudes"
                ))));
            }
        }
        Ok(Self { ports })
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn get(&self, port: Port) -> Result<&PortConfig> {
        self.ports.get(port.index()).ok_or_else(|| {
            Report::new(SwitchError::Config(format!(
                "port {port} outside configured range 0..{}",
                self.ports.len()
            )))
        })
    }

    /// Fail with a configuration error unless `port` is in range.
    pub fn check(&self, port: Port) -> Result<()> {
        self.get(port).map(|_| ())
    }

    pub fn off_angles(&self) -> Vec<f64> {
        self.ports.iter().map(|p| p.servo_off_deg).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Port, &PortConfig)> {
        self.ports.iter().enumerate().map(|(i, p)| (Port::new(i), p))
    }
}
