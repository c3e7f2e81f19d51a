use std::io::{self, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::manager::CommandLine;
use crate::session;

/// Re-serialize a parsed command line as one control-protocol text line.
/// The display duration and both pauses always travel, so a bare invocation
/// refreshes the running daemon's timing (and wakes it) exactly like the
/// original activation did.
pub fn pack(command_line: &CommandLine) -> String {
    let mut words: Vec<String> = Vec::new();
    for (flag, on) in [
        ("-v", command_line.verbose),
        ("-g", command_line.debug),
        ("-k", command_line.kill),
        ("-D", command_line.down),
        ("-U", command_line.up),
        ("-S", command_line.stick),
        ("-N", command_line.unstick),
        ("-t", command_line.toggle),
        ("-a", command_line.alerts),
        ("-A", command_line.cancel_alerts),
        ("-C", command_line.countdown),
    ] {
        if on {
            words.push(flag.to_string());
        }
    }
    if let Some(font) = &command_line.font {
        words.push("-f".to_string());
        words.push(font.clone());
    }
    if let Some(iface) = &command_line.net_iface {
        words.push("-i".to_string());
        words.push(iface.clone());
    }
    if let Some(fmt) = &command_line.time_fmt {
        words.push("-T".to_string());
        words.push(fmt.clone());
    }
    if let Some(mbits) = command_line.net_speed_mbits {
        words.push("-X".to_string());
        words.push(mbits.to_string());
    }
    words.push("-d".to_string());
    words.push(
        command_line
            .display_msecs
            .unwrap_or(session::DEFAULT_DISPLAY_MSECS)
            .to_string(),
    );
    words.push("-p".to_string());
    words.push(
        command_line
            .short_pause_msecs
            .unwrap_or(session::DEFAULT_SHORT_PAUSE_MSECS)
            .to_string(),
    );
    words.push("-P".to_string());
    words.push(
        command_line
            .long_pause_msecs
            .unwrap_or(session::DEFAULT_LONG_PAUSE_MSECS)
            .to_string(),
    );

    let mut line = words.join(" ");
    line.push('\n');
    line
}

/// Hand one packed line to an already-running daemon, if there is one.
///
/// Returns false when no live daemon answers so the caller can fall through
/// to serving. A refused connection with the socket file still present means
/// a dead daemon: the stale socket is removed first.
pub fn kick(sock_path: &Path, line: &str) -> Result<bool> {
    match UnixStream::connect(sock_path) {
        Ok(mut stream) => {
            stream
                .write_all(line.as_bytes())
                .context("writing to the running daemon")?;
            Ok(true)
        }
        Err(error)
            if error.kind() == io::ErrorKind::ConnectionRefused && sock_path.exists() =>
        {
            std::fs::remove_file(sock_path)
                .with_context(|| format!("unlinking stale socket {sock_path:?}"))?;
            Ok(false)
        }
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::message;

    #[test]
    fn pack_always_carries_the_timing() {
        let line = pack(&CommandLine::default());
        assert_eq!(line, "-d 2000 -p 80 -P 80\n");
    }

    #[test]
    fn pack_round_trips_through_the_message_parser() {
        let mut command_line = CommandLine::default();
        command_line.verbose = true;
        command_line.stick = true;
        command_line.font = Some("terminus".to_string());
        command_line.net_iface = Some("eth0".to_string());
        command_line.net_speed_mbits = Some(1000);
        command_line.display_msecs = Some(3000);

        let parsed = message::parse_line(&pack(&command_line)).unwrap();
        assert!(parsed.verbose);
        assert!(parsed.stick);
        assert_eq!(parsed.font.as_deref(), Some("terminus"));
        assert_eq!(parsed.net_iface.as_deref(), Some("eth0"));
        assert_eq!(parsed.net_speed_mbits, Some(1000));
        assert_eq!(parsed.display_msecs, Some(3000));
        assert_eq!(parsed.short_pause_msecs, Some(80));
    }

    #[test]
    fn kick_without_a_daemon_reports_nobody_home() {
        let path = std::env::temp_dir().join("statushud-kick-test-nonexistent.sock");
        assert!(!kick(&path, "-U\n").unwrap());
    }
}
