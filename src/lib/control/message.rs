use clap::Parser;
use thiserror::Error;
use tracing::*;

use super::{MAX_MSG_SIZE, MAX_TOKENS};
use crate::cli::manager::CommandLine;
use crate::hud::frame::valid_time_fmt;
use crate::session::SessionState;

#[derive(Debug, Error)]
pub enum Error {
    #[error("control line exceeds {MAX_MSG_SIZE} bytes")]
    Oversized,
    #[error("unparseable control message: {0}")]
    Parse(#[from] clap::Error),
}

/// Parse one newline-terminated control line into a scratch command line,
/// using the exact startup grammar. Tokens beyond the cap are dropped with a
/// warning; an option error rejects the whole line so a bad message can
/// never half-apply.
pub fn parse_line(line: &str) -> Result<CommandLine, Error> {
    if line.len() > MAX_MSG_SIZE {
        return Err(Error::Oversized);
    }
    let mut tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() > MAX_TOKENS {
        warn!(
            "control line has {} tokens, keeping the first {MAX_TOKENS}",
            tokens.len()
        );
        tokens.truncate(MAX_TOKENS);
    }
    let argv = std::iter::once(env!("CARGO_PKG_NAME")).chain(tokens);
    Ok(CommandLine::try_parse_from(argv)?)
}

/// What a merge asks the event loop to do next.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Interrupt the current wait and re-evaluate visibility now.
    pub wake: bool,
    /// The watched interface changed identity; rate statistics must be
    /// cleared before the next sample.
    pub iface_changed: bool,
}

/// Fold a parsed control message into the session, returning the next state
/// and what the event loop should do about it. The input state is left
/// untouched, so a rejected or half-considered message can never corrupt it.
#[must_use]
pub fn merge(current: &SessionState, msg: &CommandLine) -> (SessionState, MergeOutcome) {
    let mut next = current.clone();
    let mut out = MergeOutcome::default();

    // A kill trumps everything else in the same message.
    if msg.kill {
        next.server_quit = true;
        out.wake = true;
        return (next, out);
    }

    if let Some(msecs) = msg.display_msecs {
        next.display_msecs = msecs;
    }
    if !next.hud_is_up || next.toggle_mode {
        out.wake = true;
    } else if msg.display_msecs.is_some() || msg.up || msg.stick {
        // Repeated activation while visible buys more visible time instead
        // of restarting the clock.
        next.extend_duration(next.display_msecs);
    }

    if let Some(msecs) = msg.short_pause_msecs {
        next.short_pause_msecs = msecs;
    }
    if let Some(msecs) = msg.long_pause_msecs {
        next.long_pause_msecs = msecs;
    }
    if let Some(font) = &msg.font {
        if next.font.as_deref() != Some(font.as_str()) {
            next.font = Some(font.clone());
        }
    }
    if let Some(fmt) = &msg.time_fmt {
        if !valid_time_fmt(fmt) {
            warn!("ignoring unusable time format {fmt:?}");
        } else if next.time_fmt.as_deref() != Some(fmt.as_str()) {
            next.time_fmt = Some(fmt.clone());
        }
    }
    if let Some(iface) = &msg.net_iface {
        if next.net_iface.as_deref() != Some(iface.as_str()) {
            next.net_iface = Some(iface.clone());
            // The old link-speed estimate belongs to the old interface.
            next.net_speed_mbits = 0;
            out.iface_changed = true;
        }
    }

    // An explicit visibility request decides the wake on its own terms,
    // replacing the any-message-wakes default above.
    if msg.toggle {
        // A toggle overrides stick/unstick in the same message.
        out.wake = true;
        next.stuck = !next.stuck;
    } else if msg.up || msg.stick {
        out.wake = !next.hud_is_up;
        next.stuck = msg.stick;
    } else if msg.down {
        // A stuck HUD ignores plain down requests; unstick it first.
        out.wake = next.hud_is_up && !next.stuck;
    } else if msg.unstick {
        next.stuck = false;
    }

    if msg.countdown {
        next.countdown = true;
    }
    if msg.cancel_alerts {
        next.alerts_mode = false;
    } else if msg.alerts {
        next.alerts_mode = true;
    }
    if let Some(mbits) = msg.net_speed_mbits {
        next.net_speed_mbits = mbits;
    }

    (next, out)
}
