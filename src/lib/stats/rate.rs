use tracing::*;

use super::movavg::{self, MovingAvg};

/// Cumulative interface counters as reported by the sampler. Monotonically
/// increasing for the lifetime of one interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetTotals {
    pub in_bytes: u64,
    pub out_bytes: u64,
    pub in_packets: u64,
    pub out_packets: u64,
}

/// Turns successive raw counter samples into smoothed per-second rates.
///
/// Each tick's counter delta goes through a moving average before being
/// divided by the elapsed wall time, so a single bursty tick does not make
/// the display jump. Deltas are clamped at zero: a counter that went
/// backwards (wraparound, interface restart) must never yield a negative
/// rate.
#[derive(Debug)]
pub struct RateEngine {
    baseline: Option<NetTotals>,
    in_bytes_avg: MovingAvg,
    out_bytes_avg: MovingAvg,
    in_packets_avg: MovingAvg,
    out_packets_avg: MovingAvg,
    in_bps: f64,
    out_bps: f64,
    in_pps: f64,
    out_pps: f64,
    peak_bps: f64,
    peak_pps: f64,
}

impl RateEngine {
    pub fn new(window: usize) -> Result<Self, movavg::Error> {
        Ok(Self {
            baseline: None,
            in_bytes_avg: MovingAvg::new(window)?,
            out_bytes_avg: MovingAvg::new(window)?,
            in_packets_avg: MovingAvg::new(window)?,
            out_packets_avg: MovingAvg::new(window)?,
            in_bps: 0.0,
            out_bps: 0.0,
            in_pps: 0.0,
            out_pps: 0.0,
            peak_bps: 0.0,
            peak_pps: 0.0,
        })
    }

    /// Fold one tick of raw counters in.
    ///
    /// The first call after `new`/`reset` only seeds the baseline: there is
    /// no previous value to delta against, and comparing against zero would
    /// report the interface's whole lifetime as one tick of traffic. A zero
    /// `delta_t_ms` also leaves every rate untouched.
    pub fn update(&mut self, delta_t_ms: u64, totals: NetTotals) {
        let Some(baseline) = self.baseline.replace(totals) else {
            return;
        };
        if delta_t_ms == 0 {
            return;
        }
        let dt = delta_t_ms as f64 / 1000.0;
        let delta_in_b = totals.in_bytes.saturating_sub(baseline.in_bytes);
        let delta_out_b = totals.out_bytes.saturating_sub(baseline.out_bytes);
        let delta_in_p = totals.in_packets.saturating_sub(baseline.in_packets);
        let delta_out_p = totals.out_packets.saturating_sub(baseline.out_packets);

        self.in_bps = self.in_bytes_avg.add(delta_in_b as f64) / dt;
        self.out_bps = self.out_bytes_avg.add(delta_out_b as f64) / dt;
        self.in_pps = self.in_packets_avg.add(delta_in_p as f64) / dt;
        self.out_pps = self.out_packets_avg.add(delta_out_p as f64) / dt;

        self.peak_bps = self.peak_bps.max(self.in_bps + self.out_bps);
        self.peak_pps = self.peak_pps.max(self.in_pps + self.out_pps);

        trace!(
            "net bytes in += {delta_in_b} -> {:.2} / {dt} secs => {:.2}",
            self.in_bytes_avg.value(),
            self.in_bps
        );
        trace!(
            "net bytes out += {delta_out_b} -> {:.2} / {dt} secs => {:.2}",
            self.out_bytes_avg.value(),
            self.out_bps
        );
    }

    /// Forget everything learned about the current interface. Required when
    /// the measured entity changes identity, otherwise the first delta would
    /// be computed against a stale baseline from a different interface.
    pub fn reset(&mut self) {
        self.baseline = None;
        self.in_bytes_avg.clear();
        self.out_bytes_avg.clear();
        self.in_packets_avg.clear();
        self.out_packets_avg.clear();
        self.in_bps = 0.0;
        self.out_bps = 0.0;
        self.in_pps = 0.0;
        self.out_pps = 0.0;
        self.peak_bps = 0.0;
        self.peak_pps = 0.0;
    }

    pub fn in_bps(&self) -> f64 {
        self.in_bps
    }

    pub fn out_bps(&self) -> f64 {
        self.out_bps
    }

    pub fn in_pps(&self) -> f64 {
        self.in_pps
    }

    pub fn out_pps(&self) -> f64 {
        self.out_pps
    }

    /// Highest combined byte rate observed since the last reset.
    pub fn peak_bps(&self) -> f64 {
        self.peak_bps
    }

    pub fn peak_pps(&self) -> f64 {
        self.peak_pps
    }
}
