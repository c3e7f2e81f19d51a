use anyhow::Result;

use statushud::cli::manager::CommandLine;
use statushud::session::SessionState;
use statushud::settings::manager::SettingsStruct;
use statushud::{cli, control, helper, logger, server, settings};

fn main() -> Result<()> {
    cli::manager::init();

    let command_line = cli::manager::command_line();
    let sock_path = cli::manager::socket_path();

    // Hand our arguments to a running daemon when there is one. Foreground
    // runs always serve themselves.
    if !command_line.foreground {
        let line = control::client::pack(&command_line);
        if control::client::kick(&sock_path, &line)? {
            if command_line.verbose {
                println!("kicked running daemon via {}", sock_path.display());
            }
            return Ok(());
        }
    }
    if command_line.kill {
        // Nothing to kill; don't start a daemon just to stop it.
        if command_line.verbose {
            println!("no daemon listening at {}", sock_path.display());
        }
        return Ok(());
    }

    if !command_line.foreground {
        let child = helper::daemon::fork_to_background()?;
        if child > 0 {
            if command_line.verbose {
                println!("forked daemon pid {child}");
            }
            return Ok(());
        }
    }

    logger::manager::init();
    settings::manager::init(None);
    let state = build_state(&command_line, &settings::manager::config());
    server::manager::run(state, &sock_path)
}

/// Initial session state: the persisted defaults, overridden by whatever was
/// given on the command line.
fn build_state(command_line: &CommandLine, defaults: &SettingsStruct) -> SessionState {
    SessionState {
        toggle_mode: command_line.toggle,
        countdown: command_line.countdown,
        alerts_mode: command_line.alerts && !command_line.cancel_alerts,
        quiet_at_start: command_line.quiet_at_start,
        show_swap: defaults.show_swap && !command_line.no_swap,
        display_msecs: command_line.display_msecs.unwrap_or(defaults.display_msecs),
        short_pause_msecs: command_line
            .short_pause_msecs
            .unwrap_or(defaults.short_pause_msecs),
        long_pause_msecs: command_line
            .long_pause_msecs
            .unwrap_or(defaults.long_pause_msecs),
        net_movavg_window: defaults.net_movavg_window,
        font: command_line.font.clone().or_else(|| defaults.font.clone()),
        net_iface: command_line
            .net_iface
            .clone()
            .or_else(|| defaults.net_iface.clone()),
        net_speed_mbits: command_line.net_speed_mbits.unwrap_or(0),
        time_fmt: Some(
            command_line
                .time_fmt
                .clone()
                .unwrap_or_else(|| defaults.time_fmt.clone()),
        ),
        alerts: defaults.alerts.clone(),
        ..Default::default()
    }
}
