use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::sampler::Snapshot;

pub const DEFAULT_DISPLAY_MSECS: u64 = 2000;
pub const DEFAULT_SHORT_PAUSE_MSECS: u64 = 80;
pub const DEFAULT_LONG_PAUSE_MSECS: u64 = 80;
pub const DEFAULT_MOVAVG_WINDOW: usize = 6;
pub const DEFAULT_TIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub const TXT_ALERT_BATTERY_LOW: &str = "BATTERY LOW";
pub const TXT_ALERT_LOAD_HIGH: &str = "HIGH LOAD";
pub const TXT_ALERT_MEM_LOW: &str = "MEMORY PRESSURE";

/// Thresholds that, with alert mode on, force the HUD up when crossed.
/// These are configuration, never hard-coded: they live in the settings
/// file and ride along inside the session.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AlertThresholds {
    /// Battery life percentage below which the battery alert trips.
    pub min_battery_life_percent: u8,
    /// Load-average high-water mark; 0 disables the load alert.
    pub max_load_avg: f64,
    /// Memory-used fraction ceiling; 0 disables the memory alert.
    pub max_mem_used_fraction: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            min_battery_life_percent: 10,
            max_load_avg: 0.0,
            max_mem_used_fraction: 0.9,
        }
    }
}

/// Live daemon state: whether the HUD is up, why it is staying up, and every
/// tunable a control message may override.
///
/// Mutated only by control-message merges and by the event loop's timeout
/// evaluation; the daemon is single-threaded so nothing else can see it
/// half-written.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub hud_is_up: bool,
    /// Suppresses hide-on-expiry until unstuck.
    pub stuck: bool,
    /// Server started with `-t`: the HUD only comes down on an explicit
    /// toggle, never on a timer.
    pub toggle_mode: bool,
    pub countdown: bool,
    pub alerts_mode: bool,
    pub server_quit: bool,
    pub quiet_at_start: bool,
    pub show_swap: bool,
    /// How much visible time one activation buys.
    pub display_msecs: u64,
    /// Total visible time granted so far; repeated activations accumulate
    /// into this rather than restarting the clock.
    pub duration_msecs: u64,
    pub shown_at: Option<Instant>,
    pub short_pause_msecs: u64,
    pub long_pause_msecs: u64,
    pub net_movavg_window: usize,
    pub font: Option<String>,
    pub net_iface: Option<String>,
    pub net_speed_mbits: u32,
    pub time_fmt: Option<String>,
    pub alerts: AlertThresholds,
    pub message: Option<String>,
    pub message_seen: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            hud_is_up: false,
            stuck: false,
            toggle_mode: false,
            countdown: false,
            alerts_mode: false,
            server_quit: false,
            quiet_at_start: false,
            show_swap: true,
            display_msecs: DEFAULT_DISPLAY_MSECS,
            duration_msecs: 0,
            shown_at: None,
            short_pause_msecs: DEFAULT_SHORT_PAUSE_MSECS,
            long_pause_msecs: DEFAULT_LONG_PAUSE_MSECS,
            net_movavg_window: DEFAULT_MOVAVG_WINDOW,
            font: None,
            net_iface: None,
            net_speed_mbits: 0,
            time_fmt: Some(DEFAULT_TIME_FMT.to_string()),
            alerts: AlertThresholds::default(),
            message: None,
            message_seen: false,
        }
    }
}

impl SessionState {
    /// The HUD just became visible: start a fresh display clock.
    pub fn hud_up(&mut self, now: Instant) {
        self.hud_is_up = true;
        self.shown_at = Some(now);
        self.duration_msecs = self.display_msecs;
    }

    pub fn hud_down(&mut self) {
        self.hud_is_up = false;
        self.shown_at = None;
    }

    pub fn extend_duration(&mut self, by_msecs: u64) {
        self.duration_msecs = self.duration_msecs.saturating_add(by_msecs);
    }

    pub fn elapsed_shown_msecs(&self, now: Instant) -> u64 {
        self.shown_at
            .map(|shown_at| now.duration_since(shown_at).as_millis() as u64)
            .unwrap_or(0)
    }

    pub fn duration_remaining_msecs(&self, now: Instant) -> u64 {
        self.duration_msecs
            .saturating_sub(self.elapsed_shown_msecs(now))
    }

    /// Hide-on-expiry decision. Only meaningful on timer ticks: a message
    /// arriving mid-pause never hides the HUD through this path.
    pub fn expired(&self, now: Instant) -> bool {
        self.hud_is_up
            && !self.toggle_mode
            && !self.stuck
            && self.elapsed_shown_msecs(now) >= self.duration_msecs
    }

    /// The inter-sample pause for the current visibility.
    pub fn pause_msecs(&self) -> u64 {
        if self.hud_is_up {
            self.short_pause_msecs
        } else {
            self.long_pause_msecs
        }
    }

    /// Evaluate the alert thresholds against the latest readings. Returns
    /// whether at least one alert is active; a newly composed message is
    /// armed for one display, an unchanged one stays consumed.
    pub fn check_alerts(&mut self, snapshot: &Snapshot) -> bool {
        if !self.alerts_mode {
            return false;
        }
        let mut alerts: Vec<&str> = Vec::new();
        if let Some(battery) = &snapshot.battery {
            if battery.life_percent < self.alerts.min_battery_life_percent {
                alerts.push(TXT_ALERT_BATTERY_LOW);
            }
        }
        if self.alerts.max_load_avg > 0.0 && snapshot.load_avg >= self.alerts.max_load_avg {
            alerts.push(TXT_ALERT_LOAD_HIGH);
        }
        if self.alerts.max_mem_used_fraction > 0.0
            && snapshot.mem_used_fraction > self.alerts.max_mem_used_fraction
        {
            alerts.push(TXT_ALERT_MEM_LOW);
        }
        if alerts.is_empty() {
            self.message = None;
            self.message_seen = false;
            return false;
        }
        let message = alerts.join(", ");
        if self.message.as_deref() != Some(message.as_str()) {
            self.message = Some(message);
            self.message_seen = false;
        }
        true
    }

    /// One-shot consumption of the pending message line: the first caller
    /// after it was armed gets it, everyone after that gets nothing.
    pub fn take_message(&mut self) -> Option<String> {
        if self.message_seen {
            return None;
        }
        let message = self.message.clone()?;
        self.message_seen = true;
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::sampler::Battery;

    fn shown_for(state: &mut SessionState, elapsed: Duration) -> Instant {
        let now = Instant::now();
        state.hud_is_up = true;
        state.shown_at = Some(now - elapsed);
        now
    }

    #[test]
    fn expiry_fires_after_the_duration() {
        let mut state = SessionState {
            duration_msecs: 2000,
            ..Default::default()
        };
        let now = shown_for(&mut state, Duration::from_millis(2500));
        assert!(state.expired(now));
    }

    #[test]
    fn stuck_suppresses_expiry() {
        let mut state = SessionState {
            duration_msecs: 2000,
            stuck: true,
            ..Default::default()
        };
        let now = shown_for(&mut state, Duration::from_millis(9000));
        assert!(!state.expired(now));
    }

    #[test]
    fn toggle_mode_suppresses_expiry() {
        let mut state = SessionState {
            duration_msecs: 2000,
            toggle_mode: true,
            ..Default::default()
        };
        let now = shown_for(&mut state, Duration::from_millis(9000));
        assert!(!state.expired(now));
    }

    #[test]
    fn remaining_time_never_goes_negative() {
        let mut state = SessionState {
            duration_msecs: 1000,
            ..Default::default()
        };
        let now = shown_for(&mut state, Duration::from_millis(5000));
        assert_eq!(state.duration_remaining_msecs(now), 0);
    }

    #[test]
    fn pause_follows_visibility() {
        let mut state = SessionState {
            short_pause_msecs: 100,
            long_pause_msecs: 900,
            ..Default::default()
        };
        assert_eq!(state.pause_msecs(), 900);
        state.hud_is_up = true;
        assert_eq!(state.pause_msecs(), 100);
    }

    #[test]
    fn alerts_require_alert_mode() {
        let mut state = SessionState {
            alerts: AlertThresholds {
                max_load_avg: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let snapshot = Snapshot {
            load_avg: 5.0,
            ..Default::default()
        };
        assert!(!state.check_alerts(&snapshot));
        state.alerts_mode = true;
        assert!(state.check_alerts(&snapshot));
        assert_eq!(state.message.as_deref(), Some(TXT_ALERT_LOAD_HIGH));
    }

    #[test]
    fn alert_message_is_consumed_exactly_once() {
        let mut state = SessionState {
            alerts_mode: true,
            alerts: AlertThresholds {
                max_load_avg: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let snapshot = Snapshot {
            load_avg: 5.0,
            ..Default::default()
        };
        assert!(state.check_alerts(&snapshot));
        assert_eq!(state.take_message().as_deref(), Some(TXT_ALERT_LOAD_HIGH));
        assert_eq!(state.take_message(), None);
        // The condition still holds but the unchanged message stays consumed.
        assert!(state.check_alerts(&snapshot));
        assert_eq!(state.take_message(), None);
    }

    #[test]
    fn multiple_alerts_compose_one_message() {
        let mut state = SessionState {
            alerts_mode: true,
            alerts: AlertThresholds {
                min_battery_life_percent: 20,
                max_load_avg: 1.0,
                max_mem_used_fraction: 0.5,
            },
            ..Default::default()
        };
        let snapshot = Snapshot {
            load_avg: 3.0,
            mem_used_fraction: 0.8,
            battery: Some(Battery {
                life_percent: 5,
                minutes_left: Some(12),
                state_label: "discharging".to_string(),
            }),
            ..Default::default()
        };
        assert!(state.check_alerts(&snapshot));
        assert_eq!(
            state.message.as_deref(),
            Some("BATTERY LOW, HIGH LOAD, MEMORY PRESSURE")
        );
    }

    #[test]
    fn clearing_conditions_clears_the_message() {
        let mut state = SessionState {
            alerts_mode: true,
            alerts: AlertThresholds {
                max_load_avg: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let busy = Snapshot {
            load_avg: 5.0,
            ..Default::default()
        };
        let idle = Snapshot::default();
        assert!(state.check_alerts(&busy));
        assert!(!state.check_alerts(&idle));
        assert_eq!(state.message, None);
    }
}
