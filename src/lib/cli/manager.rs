use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;

/// The startup grammar, shared verbatim with the control protocol: a client
/// invocation forwards these same short options over the control socket to
/// the running daemon.
#[derive(Parser, Debug, Clone, Default, PartialEq)]
#[command(name = env!("CARGO_PKG_NAME"), version, about, long_about = None)]
pub struct CommandLine {
    /// Turn all log categories up to Debug, for more information check RUST_LOG env variable
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Log everything, including the per-tick probe spew
    #[arg(short = 'g', long)]
    pub debug: bool,

    /// Ask the running daemon to shut down
    #[arg(short = 'k', long = "kill")]
    pub kill: bool,

    /// Run in the foreground instead of daemonizing
    #[arg(short = 'F', long)]
    pub foreground: bool,

    /// Bring the HUD down
    #[arg(short = 'D', long = "down")]
    pub down: bool,

    /// Bring the HUD up
    #[arg(short = 'U', long = "up")]
    pub up: bool,

    /// Bring the HUD up and keep it up until unstuck
    #[arg(short = 'S', long = "stick")]
    pub stick: bool,

    /// Let a stuck HUD expire normally again
    #[arg(short = 'N', long = "unstick")]
    pub unstick: bool,

    /// Toggle the HUD: raise it stuck, drop it on the next toggle
    #[arg(short = 't', long = "toggle")]
    pub toggle: bool,

    /// Raise the HUD automatically when an alert threshold trips
    #[arg(short = 'a', long = "alerts")]
    pub alerts: bool,

    /// Stop raising the HUD on alerts
    #[arg(short = 'A', long = "cancel-alerts")]
    pub cancel_alerts: bool,

    /// Show the time left before the HUD hides itself
    #[arg(short = 'C', long)]
    pub countdown: bool,

    /// Leave swap usage off the display
    #[arg(short = 'w', long = "no-swap")]
    pub no_swap: bool,

    /// Don't show the HUD when the daemon starts
    #[arg(short = 'n', long = "quiet-at-start")]
    pub quiet_at_start: bool,

    /// How long the HUD stays visible, in milliseconds
    #[arg(short = 'd', long = "display", value_name = "MSEC")]
    pub display_msecs: Option<u64>,

    /// Milliseconds between samples while the HUD is up
    #[arg(short = 'p', long = "short-pause", value_name = "MSEC")]
    pub short_pause_msecs: Option<u64>,

    /// Milliseconds between samples while the HUD is down
    #[arg(short = 'P', long = "long-pause", value_name = "MSEC")]
    pub long_pause_msecs: Option<u64>,

    /// Font for the on-screen display
    #[arg(short = 'f', long, value_name = "FONT")]
    pub font: Option<String>,

    /// Path to the Unix-domain control socket
    #[arg(
        short = 's',
        long = "socket",
        value_name = "PATH",
        env = "STATUSHUD_SOCKET"
    )]
    pub socket: Option<PathBuf>,

    /// Network interface to watch; defaults to the first non-loopback one
    #[arg(short = 'i', long = "iface", value_name = "NAME")]
    pub net_iface: Option<String>,

    /// Fix the interface link speed in megabits per second
    #[arg(short = 'X', long = "net-speed", value_name = "MBIT")]
    pub net_speed_mbits: Option<u32>,

    /// strftime-style format for the clock line
    #[arg(short = 'T', long = "time-fmt", value_name = "FMT")]
    pub time_fmt: Option<String>,

    /// Directory for the rolling log files
    #[arg(long = "log-path", value_name = "DIR", env = "STATUSHUD_LOG_PATH")]
    pub log_path: Option<PathBuf>,
}

#[derive(Debug)]
struct Manager {
    command_line: CommandLine,
}

lazy_static! {
    static ref MANAGER: Arc<Manager> = Arc::new(Manager::new());
}

impl Manager {
    fn new() -> Self {
        // Usage problems are reported to the invoking terminal; there is no
        // daemon (and no logger) yet.
        let command_line = CommandLine::try_parse().unwrap_or_else(|error| {
            let _ = error.print();
            std::process::exit(i32::from(error.use_stderr()));
        });
        Self { command_line }
    }
}

// Construct our manager, should be done inside main
pub fn init() {
    MANAGER.as_ref();
}

pub fn command_line() -> CommandLine {
    MANAGER.command_line.clone()
}

pub fn is_verbose() -> bool {
    MANAGER.command_line.verbose
}

pub fn is_debug() -> bool {
    MANAGER.command_line.debug
}

pub fn is_foreground() -> bool {
    MANAGER.command_line.foreground
}

/// Where the daemon listens and clients knock. One well-known path per user
/// and version, unless overridden by `-s`/`STATUSHUD_SOCKET`.
pub fn socket_path() -> PathBuf {
    MANAGER
        .command_line
        .socket
        .clone()
        .unwrap_or_else(default_socket_path)
}

pub fn default_socket_path() -> PathBuf {
    let file = format!(
        "{}-{}.sock",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
    directories::ProjectDirs::from("com", "statushud", env!("CARGO_PKG_NAME"))
        .and_then(|project| project.runtime_dir().map(Path::to_path_buf))
        .unwrap_or_else(|| {
            // No per-user runtime dir on this platform; fall back to the
            // shared tmp dir with the uid baked in.
            let uid = unsafe { libc::geteuid() };
            std::env::temp_dir().join(format!("{}-{uid}", env!("CARGO_PKG_NAME")))
        })
        .join(file)
}

pub fn log_path() -> PathBuf {
    MANAGER
        .command_line
        .log_path
        .clone()
        .unwrap_or_else(default_log_path)
}

pub fn default_log_path() -> PathBuf {
    directories::ProjectDirs::from("com", "statushud", env!("CARGO_PKG_NAME"))
        .map(|project| project.data_local_dir().join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join(env!("CARGO_PKG_NAME")).join("logs"))
}

// Return the command line used to start this application
pub fn command_line_string() -> String {
    std::env::args().collect::<Vec<String>>().join(" ")
}
