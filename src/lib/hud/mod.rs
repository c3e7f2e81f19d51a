pub mod frame;

use tracing::*;

pub use frame::{Frame, LineRecord};

/// Severity tier for a gauged reading, mapped onto the overlay's colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Low,
    Guarded,
    Elevated,
    High,
    Critical,
}

impl Severity {
    /// Map a usage fraction onto the five display tiers. Values above 1.0
    /// happen when a configured ceiling turns out to be wrong; they get the
    /// loudest tier.
    pub fn from_fraction(fraction: f64) -> Self {
        if fraction <= 0.25 {
            Self::Low
        } else if fraction <= 0.5 {
            Self::Guarded
        } else if fraction <= 0.75 {
            Self::Elevated
        } else if fraction <= 1.0 {
            Self::High
        } else {
            Self::Critical
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Low => "green",
            Self::Guarded => "yellow",
            Self::Elevated => "orange",
            Self::High => "red",
            Self::Critical => "violet",
        }
    }
}

/// Where composed frames go. The actual on-screen overlay lives outside this
/// crate; the in-tree sink narrates through the log for foreground runs and
/// tests substitute a recording one.
pub trait RenderSink {
    fn show(&mut self);
    fn hide(&mut self);
    fn draw(&mut self, frame: &Frame);
}

#[derive(Debug, Default)]
pub struct LogSink;

impl RenderSink for LogSink {
    fn show(&mut self) {
        debug!("HUD coming up");
    }

    fn hide(&mut self) {
        debug!("HUD coming down");
    }

    fn draw(&mut self, frame: &Frame) {
        for line in &frame.lines {
            match line {
                LineRecord::Text(text) => debug!("hud: {text}"),
                LineRecord::Gauge {
                    text,
                    percent,
                    severity,
                } => debug!("hud: {text} [{percent}% {}]", severity.color()),
            }
        }
        if let Some(status) = &frame.status {
            debug!("hud: {status}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_tiers_match_the_quartiles() {
        assert_eq!(Severity::from_fraction(0.0), Severity::Low);
        assert_eq!(Severity::from_fraction(0.25), Severity::Low);
        assert_eq!(Severity::from_fraction(0.26), Severity::Guarded);
        assert_eq!(Severity::from_fraction(0.5), Severity::Guarded);
        assert_eq!(Severity::from_fraction(0.75), Severity::Elevated);
        assert_eq!(Severity::from_fraction(1.0), Severity::High);
        assert_eq!(Severity::from_fraction(1.01), Severity::Critical);
    }
}
