pub mod system;

use thiserror::Error;

use crate::stats::rate::NetTotals;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("host statistics unavailable: {0}")]
    Unavailable(String),
}

/// One tick's worth of raw host readings. Fields the platform cannot provide
/// carry their "no data" sentinel (`None`, or zero for the fractions) rather
/// than failing the whole sample.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub load_avg: f64,
    pub mem_used_fraction: f64,
    pub swap_used_fraction: f64,
    pub net: Option<NetSample>,
    pub battery: Option<Battery>,
    pub uptime_secs: u64,
}

/// Raw cumulative counters for one network interface.
#[derive(Debug, Clone)]
pub struct NetSample {
    pub iface: String,
    pub totals: NetTotals,
}

#[derive(Debug, Clone)]
pub struct Battery {
    pub life_percent: u8,
    pub minutes_left: Option<u32>,
    pub state_label: String,
}

/// Where the raw readings come from. Implementations must be safe to call
/// once per tick; only a genuinely fatal environment problem may error.
pub trait MetricSampler {
    /// Read the host once. `iface` names the interface to report counters
    /// for; `None` lets the sampler pick one (first non-loopback).
    fn sample(&mut self, iface: Option<&str>) -> Result<Snapshot, SampleError>;
}
