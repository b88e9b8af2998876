use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SwitchError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("unload stalled: filament still at the sensor after retracting {travelled_mm} mm")]
    UnloadStall { travelled_mm: f64 },
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing clutch bank")]
    MissingClutches,
    #[error("missing feeder")]
    MissingFeeder,
    #[error("missing motion axis")]
    MissingAxis,
    #[error("missing motion barrier")]
    MissingBarrier,
    #[error("missing presence sensor")]
    MissingSensor,
    #[error("clutch bank has {clutches} clutches but the port table has {ports} ports")]
    ClutchBankTooSmall { clutches: usize, ports: usize },
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
