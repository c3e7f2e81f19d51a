use std::io::{self, BufRead, BufReader, Read};
use std::os::fd::AsRawFd;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use scopeguard::defer;
use tracing::*;

use super::signals;
use crate::control::{self, message};
use crate::helper;
use crate::hud::{frame, LogSink, RenderSink};
use crate::sampler::{system::SystemSampler, MetricSampler, Snapshot};
use crate::session::SessionState;
use crate::stats::rate::RateEngine;

/// What one bounded wait on the control listener produced.
enum Wait {
    Ready,
    TimedOut,
}

/// The whole daemon: session state, rate statistics, the probe source, the
/// render sink and the control listener, driven by one single-threaded loop.
pub struct Daemon<S, R> {
    state: SessionState,
    rates: RateEngine,
    sampler: S,
    sink: R,
    listener: UnixListener,
    snapshot: Snapshot,
    hostname: String,
    last_tick: Instant,
}

impl<S: MetricSampler, R: RenderSink> Daemon<S, R> {
    /// Bind the control socket and take the first sample. Failures here are
    /// fatal by design: a daemon without its listener or its probes has no
    /// useful degraded mode.
    pub fn try_new(state: SessionState, mut sampler: S, sink: R, sock_path: &Path) -> Result<Self> {
        if let Some(parent) = sock_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating socket directory {parent:?}"))?;
        }
        let listener = UnixListener::bind(sock_path)
            .with_context(|| format!("binding control socket {sock_path:?}"))?;
        let mut permissions = std::fs::metadata(sock_path)
            .with_context(|| format!("inspecting control socket {sock_path:?}"))?
            .permissions();
        permissions.set_mode(0o600);
        std::fs::set_permissions(sock_path, permissions)
            .with_context(|| format!("restricting control socket {sock_path:?}"))?;

        let mut rates =
            RateEngine::new(state.net_movavg_window).context("building the rate windows")?;
        let snapshot = sampler
            .sample(state.net_iface.as_deref())
            .context("first host sample")?;
        if let Some(net) = &snapshot.net {
            // Seed the baseline so the first tick never deltas against zero.
            rates.update(0, net.totals);
        }

        Ok(Self {
            state,
            rates,
            sampler,
            sink,
            listener,
            snapshot,
            hostname: helper::hostname(),
            last_tick: Instant::now(),
        })
    }

    /// Serve until told to quit: sample, draw while visible, wait out the
    /// pause folding in control traffic and signals, flip visibility as
    /// decided.
    pub fn run(&mut self) -> Result<()> {
        signals::install().context("installing signal handlers")?;
        info!(
            "server starting; pauses {}ms/{}ms, display {}ms",
            self.state.short_pause_msecs, self.state.long_pause_msecs, self.state.display_msecs
        );
        if !self.state.quiet_at_start {
            self.raise();
        }
        loop {
            self.probe();
            if self.state.hud_is_up {
                self.draw();
            }
            let flip = self.check()?;
            if !self.state.server_quit && flip {
                if self.state.hud_is_up {
                    self.lower();
                } else {
                    self.raise();
                }
            }
            if self.state.server_quit {
                break;
            }
        }
        info!("server exiting");
        if self.state.hud_is_up {
            self.lower();
        }
        Ok(())
    }

    fn raise(&mut self) {
        self.sink.show();
        self.state.hud_up(Instant::now());
    }

    fn lower(&mut self) {
        self.sink.hide();
        self.state.hud_down();
    }

    /// Gather this tick's readings and fold the counters into the rates.
    fn probe(&mut self) {
        let now = Instant::now();
        let delta_t_ms = now.duration_since(self.last_tick).as_millis() as u64;
        self.last_tick = now;

        match self.sampler.sample(self.state.net_iface.as_deref()) {
            Ok(snapshot) => self.snapshot = snapshot,
            Err(error) => {
                // Ride on the previous reading; transient probe trouble is
                // survivable.
                warn!("host sample failed: {error}");
                return;
            }
        }
        if self.state.net_iface.is_none() {
            if let Some(net) = &self.snapshot.net {
                debug!("watching first non-loopback interface {:?}", net.iface);
                self.state.net_iface = Some(net.iface.clone());
            }
        }
        if let Some(net) = &self.snapshot.net {
            self.rates.update(delta_t_ms, net.totals);
        }
    }

    fn draw(&mut self) {
        let frame = frame::compose(
            &mut self.state,
            &self.rates,
            &self.snapshot,
            &self.hostname,
            Instant::now(),
        );
        self.sink.draw(&frame);
    }

    /// Wait out this tick's pause. Control messages whittle down the
    /// remaining pause instead of resetting it, so chatty clients cannot
    /// starve the sampling cadence. Returns whether visibility should flip.
    fn check(&mut self) -> Result<bool> {
        let mut flip = false;
        let mut done = false;
        let mut pause = Duration::from_millis(self.state.pause_msecs());
        trace!(
            "pausing {pause:?}, HUD is {}",
            if self.state.hud_is_up { "UP" } else { "DOWN" }
        );
        loop {
            let wait_started = Instant::now();
            match self.wait_for_client(pause)? {
                Wait::Ready => {
                    flip = self.handle_client();
                    if !flip {
                        let waited = wait_started.elapsed();
                        if waited >= pause {
                            done = true;
                        } else {
                            pause -= waited;
                        }
                    }
                }
                Wait::TimedOut => {
                    // Only timer ticks evaluate hide-on-expiry.
                    done = true;
                    if self.state.expired(Instant::now()) {
                        flip = true;
                    }
                }
            }

            if signals::take_interrupted() {
                warn!("interrupted - shutting down");
                self.state.server_quit = true;
                flip = true;
                done = true;
            }
            if signals::take_reconfigure() {
                warn!("reconfiguration requested - nothing to do");
            }
            if signals::take_bump() {
                done = true;
                if self.state.hud_is_up {
                    self.state.extend_duration(self.state.display_msecs);
                } else {
                    flip = true;
                }
            }
            if !self.state.hud_is_up && self.state.check_alerts(&self.snapshot) {
                // An alert raises the HUD stuck, so it cannot fade unnoticed.
                self.state.stuck = true;
                flip = true;
                done = true;
            }

            if done || flip {
                break;
            }
        }
        Ok(flip)
    }

    /// Bounded wait for a pending connection on the control listener. An
    /// I/O error here is fatal; a signal just cuts the wait short so the
    /// sticky flags get polled.
    fn wait_for_client(&self, timeout: Duration) -> Result<Wait> {
        let mut fds = libc::pollfd {
            fd: self.listener.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let msecs = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;
        let ready = unsafe { libc::poll(&mut fds, 1, msecs) };
        if ready < 0 {
            let error = io::Error::last_os_error();
            if error.kind() == io::ErrorKind::Interrupted {
                return Ok(Wait::TimedOut);
            }
            return Err(error).context("waiting on the control listener");
        }
        Ok(if ready == 0 {
            Wait::TimedOut
        } else {
            Wait::Ready
        })
    }

    /// Accept and consume one client. Returns whether visibility should
    /// flip. Whatever goes wrong with a single connection is logged and
    /// forgotten; the daemon keeps serving.
    fn handle_client(&mut self) -> bool {
        let stream = match self.listener.accept() {
            Ok((stream, _)) => stream,
            Err(error) => {
                warn!("accept failed: {error}");
                return false;
            }
        };
        let line = match read_request(&stream) {
            Ok(line) => line,
            Err(error) => {
                warn!("error reading client: {error}");
                return false;
            }
        };
        debug!("control message: {:?}", line.trim_end());
        let msg = match message::parse_line(&line) {
            Ok(msg) => msg,
            Err(error) => {
                warn!("rejecting control message {:?}: {error}", line.trim_end());
                return false;
            }
        };

        let (next, outcome) = message::merge(&self.state, &msg);
        self.state = next;
        if outcome.iface_changed {
            debug!(
                "interface changed to {:?}, clearing rate statistics",
                self.state.net_iface
            );
            self.rates.reset();
        }
        if self.state.server_quit {
            info!("kill requested by client");
            return true;
        }
        outcome.wake
    }
}

/// Clients are short-lived: one line in, nothing out. A stalled writer gets
/// dropped rather than wedging the whole daemon.
fn read_request(stream: &UnixStream) -> io::Result<String> {
    stream.set_read_timeout(Some(Duration::from_millis(500)))?;
    let mut reader = BufReader::new(stream).take(control::MAX_MSG_SIZE as u64 + 1);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.len() > control::MAX_MSG_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "control line too long",
        ));
    }
    Ok(line)
}

/// Bring the daemon up on `sock_path` with the host sampler and the logging
/// sink, and serve until shutdown.
pub fn run(state: SessionState, sock_path: &Path) -> Result<()> {
    let mut daemon = Daemon::try_new(state, SystemSampler::new(), LogSink, sock_path)?;
    let sock_path = sock_path.to_path_buf();
    defer! {
        if let Err(error) = std::fs::remove_file(&sock_path) {
            warn!("could not unlink control socket {sock_path:?}: {error}");
        }
    }
    daemon.run()
}
