use std::time::Instant;

use chrono::format::{Item, StrftimeItems};
use chrono::Local;

use super::Severity;
use crate::sampler::Snapshot;
use crate::session::SessionState;
use crate::stats::rate::RateEngine;

const KILO: f64 = 1024.0;
const MEGA: f64 = KILO * KILO;

const SECS_PER_MIN: u64 = 60;
const SECS_PER_HOUR: u64 = SECS_PER_MIN * 60;
const SECS_PER_DAY: u64 = SECS_PER_HOUR * 24;

const TXT_QUIET: &str = "-quiet-";
const TXT_STUCK: &str = "-stuck-";
const TXT_ALERT: &str = "-alert-";
const TXT_TIME_UNKNOWN: &str = "time unknown";

/// One display line: plain text, or text plus a percentage bar colored by
/// severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRecord {
    Text(String),
    Gauge {
        text: String,
        percent: u16,
        severity: Severity,
    },
}

/// Everything the render sink paints for one tick: the main lines top to
/// bottom, plus the small status line at the bottom edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub lines: Vec<LineRecord>,
    pub status: Option<String>,
}

/// Compose one tick's frame. Consumes the pending one-shot message, so the
/// same alert text is painted exactly once.
pub fn compose(
    state: &mut SessionState,
    rates: &RateEngine,
    snapshot: &Snapshot,
    hostname: &str,
    now: Instant,
) -> Frame {
    let mut lines = Vec::new();
    push_uptime(&mut lines, hostname, snapshot);
    push_load(&mut lines, state, snapshot);
    push_mem(&mut lines, snapshot);
    push_swap(&mut lines, state, snapshot);
    push_net(&mut lines, state, rates);
    push_battery(&mut lines, snapshot);
    if let Some(message) = state.take_message() {
        lines.push(LineRecord::Text(message));
    }
    Frame {
        lines,
        status: status_line(state, now),
    }
}

fn safe_fraction(value: f64, ceiling: f64) -> f64 {
    if ceiling > 0.0 {
        value / ceiling
    } else {
        0.0
    }
}

fn ipercent(fraction: f64) -> u16 {
    (fraction * 100.0).clamp(0.0, 999.0) as u16
}

fn push_uptime(lines: &mut Vec<LineRecord>, hostname: &str, snapshot: &Snapshot) {
    if snapshot.uptime_secs > 0 {
        lines.push(LineRecord::Text(format!(
            "{hostname} up {}",
            elapsed_text(snapshot.uptime_secs)
        )));
    }
}

fn push_load(lines: &mut Vec<LineRecord>, state: &SessionState, snapshot: &Snapshot) {
    let fraction = safe_fraction(snapshot.load_avg, state.alerts.max_load_avg);
    lines.push(LineRecord::Gauge {
        text: format!("load: {:.2}", snapshot.load_avg),
        percent: ipercent(fraction),
        severity: Severity::from_fraction(fraction),
    });
}

fn push_mem(lines: &mut Vec<LineRecord>, snapshot: &Snapshot) {
    lines.push(LineRecord::Gauge {
        text: format!("mem: {}%", ipercent(snapshot.mem_used_fraction)),
        percent: ipercent(snapshot.mem_used_fraction),
        severity: Severity::from_fraction(snapshot.mem_used_fraction),
    });
}

fn push_swap(lines: &mut Vec<LineRecord>, state: &SessionState, snapshot: &Snapshot) {
    if !state.show_swap {
        return;
    }
    lines.push(LineRecord::Gauge {
        text: format!("swap: {}%", ipercent(snapshot.swap_used_fraction)),
        percent: ipercent(snapshot.swap_used_fraction),
        severity: Severity::from_fraction(snapshot.swap_used_fraction),
    });
}

fn push_net(lines: &mut Vec<LineRecord>, state: &SessionState, rates: &RateEngine) {
    let iface = state.net_iface.as_deref().unwrap_or("-");
    let total_bps = rates.in_bps() + rates.out_bps();
    let total_pps = rates.in_pps() + rates.out_pps();
    // Bytes per second the link could carry, when the speed is known.
    let max_bps = f64::from(state.net_speed_mbits) / 8.0 * MEGA;
    let fraction = safe_fraction(total_bps, max_bps);

    let label = if state.net_speed_mbits > 0 {
        format!("net ({iface} {}mb/s):", state.net_speed_mbits)
    } else {
        format!("net ({iface}):")
    };

    let kbps = total_bps / KILO;
    let details = if kbps as u64 > 0 {
        // Switch units if there are megabytes or gigabytes flying by.
        let (unit, divisor) = if kbps > MEGA {
            ('g', MEGA)
        } else if kbps > KILO {
            ('m', KILO)
        } else {
            ('k', 1.0)
        };
        let mut details = String::new();
        let percent = ipercent(fraction);
        if max_bps > 0.0 && percent > 0 {
            if percent <= 100 {
                details.push_str(&format!("{percent:3}% "));
            } else {
                // The configured link speed must be wrong.
                details.push_str("> 100%(!) ");
            }
        }
        details.push_str(&format!(
            "{} {unit}B/s ({} px/s)",
            (kbps / divisor) as u64,
            total_pps as u64
        ));
        details
    } else {
        TXT_QUIET.to_string()
    };

    lines.push(LineRecord::Gauge {
        text: format!("{label} {details}"),
        percent: ipercent(fraction),
        severity: Severity::from_fraction(fraction),
    });
}

fn push_battery(lines: &mut Vec<LineRecord>, snapshot: &Snapshot) {
    let Some(battery) = &snapshot.battery else {
        return;
    };
    let minutes = match battery.minutes_left {
        Some(minutes) => elapsed_text(u64::from(minutes) * 60),
        None => TXT_TIME_UNKNOWN.to_string(),
    };
    // Color by how much is used up, not how much remains.
    let used = 1.0 - f64::from(battery.life_percent) / 100.0;
    lines.push(LineRecord::Gauge {
        text: format!(
            "battery: {}, {}% charged ({minutes})",
            battery.state_label, battery.life_percent
        ),
        percent: u16::from(battery.life_percent),
        severity: Severity::from_fraction(used),
    });
}

/// Bottom line: the clock, plus whichever of the stuck/alert marker or the
/// hide countdown applies.
fn status_line(state: &SessionState, now: Instant) -> Option<String> {
    let clock = state.time_fmt.as_deref().and_then(format_clock);
    let marker = if state.stuck {
        if state.message.is_some() && state.alerts_mode {
            Some(TXT_ALERT.to_string())
        } else {
            Some(TXT_STUCK.to_string())
        }
    } else if state.countdown {
        let left_secs = (state.duration_remaining_msecs(now) + 500) / 1000;
        Some(format!("hud down in {left_secs}"))
    } else {
        None
    };
    match (clock, marker) {
        (Some(clock), Some(marker)) => Some(format!("{clock} [{marker}]")),
        (Some(clock), None) => Some(clock),
        (None, Some(marker)) => Some(format!("[{marker}]")),
        (None, None) => None,
    }
}

fn format_clock(fmt: &str) -> Option<String> {
    let items: Vec<Item> = StrftimeItems::new(fmt).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }
    Some(Local::now().format_with_items(items.iter()).to_string())
}

/// Whether chrono can do anything useful with a user-supplied strftime
/// string. Rejecting these early keeps a bad `-T` from blanking the clock.
pub fn valid_time_fmt(fmt: &str) -> bool {
    !StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error))
}

/// Render a number of seconds as "10 days 1 hour 23 mins 2 secs", skipping
/// zero-valued parts.
pub fn elapsed_text(total_secs: u64) -> String {
    let days = total_secs / SECS_PER_DAY;
    let hours = (total_secs % SECS_PER_DAY) / SECS_PER_HOUR;
    let mins = (total_secs % SECS_PER_HOUR) / SECS_PER_MIN;
    let secs = total_secs % SECS_PER_MIN;

    let mut parts = Vec::new();
    for (value, unit) in [
        (days, "day"),
        (hours, "hour"),
        (mins, "min"),
        (secs, "sec"),
    ] {
        if value > 0 {
            let plural = if value == 1 { "" } else { "s" };
            parts.push(format!("{value} {unit}{plural}"));
        }
    }
    if parts.is_empty() {
        "0 secs".to_string()
    } else {
        parts.join(" ")
    }
}
