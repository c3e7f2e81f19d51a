use sysinfo::{NetworkExt, NetworksExt, System, SystemExt};

use super::{MetricSampler, NetSample, SampleError, Snapshot};
use crate::stats::rate::NetTotals;

/// Host sampler backed by the `sysinfo` crate.
///
/// Battery state is not exposed by `sysinfo`, so that field stays at its
/// "no data" sentinel here; a dedicated power-supply sampler can replace
/// this one where batteries matter.
pub struct SystemSampler {
    system: System,
}

impl SystemSampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSampler for SystemSampler {
    fn sample(&mut self, iface: Option<&str>) -> Result<Snapshot, SampleError> {
        self.system.refresh_memory();
        // The full list every tick, so freshly appeared interfaces can be
        // picked up after a `-i` switch.
        self.system.refresh_networks_list();

        let mem_total = self.system.total_memory();
        let mem_used_fraction = if mem_total > 0 {
            self.system.used_memory() as f64 / mem_total as f64
        } else {
            0.0
        };
        let swap_total = self.system.total_swap();
        let swap_used_fraction = if swap_total > 0 {
            self.system.used_swap() as f64 / swap_total as f64
        } else {
            0.0
        };

        let net = self
            .system
            .networks()
            .iter()
            .find(|(name, _)| match iface {
                Some(wanted) => name.as_str() == wanted,
                None => !name.starts_with("lo"),
            })
            .map(|(name, data)| NetSample {
                iface: name.clone(),
                totals: NetTotals {
                    in_bytes: data.total_received(),
                    out_bytes: data.total_transmitted(),
                    in_packets: data.total_packets_received(),
                    out_packets: data.total_packets_transmitted(),
                },
            });

        Ok(Snapshot {
            load_avg: self.system.load_average().one,
            mem_used_fraction,
            swap_used_fraction,
            net,
            battery: None,
            uptime_secs: self.system.uptime(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_yields_sane_fractions() {
        let mut sampler = SystemSampler::new();
        let snapshot = sampler.sample(None).unwrap();
        assert!((0.0..=1.0).contains(&snapshot.mem_used_fraction));
        assert!((0.0..=1.0).contains(&snapshot.swap_used_fraction));
    }

    #[test]
    fn unknown_interface_is_a_no_data_sentinel() {
        let mut sampler = SystemSampler::new();
        let snapshot = sampler.sample(Some("no-such-iface0")).unwrap();
        assert!(snapshot.net.is_none());
    }
}
