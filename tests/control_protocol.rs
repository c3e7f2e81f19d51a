//! End-to-end daemon tests: a real control socket, a scripted sampler and a
//! recording sink, no screen and no host counters involved.

use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use statushud::hud::{Frame, LineRecord, RenderSink};
use statushud::sampler::{MetricSampler, NetSample, SampleError, Snapshot};
use statushud::server::manager::Daemon;
use statushud::session::SessionState;
use statushud::stats::rate::NetTotals;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Show,
    Hide,
    Drew(Frame),
}

#[derive(Clone, Default)]
struct RecordingSink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RenderSink for RecordingSink {
    fn show(&mut self) {
        self.events.lock().unwrap().push(Event::Show);
    }

    fn hide(&mut self) {
        self.events.lock().unwrap().push(Event::Hide);
    }

    fn draw(&mut self, frame: &Frame) {
        self.events.lock().unwrap().push(Event::Drew(frame.clone()));
    }
}

/// Hands out 500 more inbound bytes per tick on whatever interface is asked
/// for, so rates are always deterministic.
struct ScriptedSampler {
    ticks: u64,
}

impl MetricSampler for ScriptedSampler {
    fn sample(&mut self, iface: Option<&str>) -> Result<Snapshot, SampleError> {
        self.ticks += 1;
        Ok(Snapshot {
            load_avg: 0.42,
            mem_used_fraction: 0.5,
            swap_used_fraction: 0.1,
            net: Some(NetSample {
                iface: iface.unwrap_or("eth0").to_string(),
                totals: NetTotals {
                    in_bytes: self.ticks * 500,
                    out_bytes: self.ticks * 100,
                    in_packets: self.ticks * 4,
                    out_packets: self.ticks,
                },
            }),
            battery: None,
            uptime_secs: 4242,
        })
    }
}

fn random_socket_path() -> PathBuf {
    use rand::Rng;

    let tag: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    std::env::temp_dir().join(format!("statushud-test-{tag}.sock"))
}

fn send(sock_path: &PathBuf, line: &str) {
    let mut stream = UnixStream::connect(sock_path).expect("daemon not listening");
    stream.write_all(line.as_bytes()).expect("send failed");
}

fn wait_for<F: FnMut() -> bool>(mut condition: F, what: &str) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return;
        }
        thread::sleep(Duration::from_millis(20));
    }
    panic!("timed out waiting for {what}");
}

fn wait_for_listener(sock_path: &PathBuf) {
    wait_for(
        || UnixStream::connect(sock_path).is_ok(),
        "the control socket to answer",
    );
}

fn frame_line_starting_with(events: &[Event], prefix: &str) -> bool {
    events.iter().any(|event| match event {
        Event::Drew(frame) => frame.lines.iter().any(|line| match line {
            LineRecord::Text(text) => text.starts_with(prefix),
            LineRecord::Gauge { text, .. } => text.starts_with(prefix),
        }),
        _ => false,
    })
}

#[test]
fn interface_switch_and_shutdown_over_the_socket() {
    let sock_path = random_socket_path();
    let state = SessionState {
        short_pause_msecs: 15,
        long_pause_msecs: 15,
        net_iface: Some("eth0".to_string()),
        ..Default::default()
    };
    let sink = RecordingSink::default();
    let events = sink.events.clone();

    let mut daemon =
        Daemon::try_new(state, ScriptedSampler { ticks: 0 }, sink, &sock_path).unwrap();
    let server = thread::spawn(move || daemon.run());
    wait_for_listener(&sock_path);

    wait_for(
        || events.lock().unwrap().first() == Some(&Event::Show),
        "the HUD to come up",
    );
    wait_for(
        || frame_line_starting_with(&events.lock().unwrap(), "net (eth0"),
        "a frame for the initial interface",
    );
    assert!(frame_line_starting_with(
        &events.lock().unwrap(),
        "load: 0.42"
    ));

    // Switching interfaces must retarget the net line (and clear the rate
    // statistics underneath, which unit tests pin down in detail).
    send(&sock_path, "-i wlan0\n");
    wait_for(
        || frame_line_starting_with(&events.lock().unwrap(), "net (wlan0"),
        "a frame for the new interface",
    );

    send(&sock_path, "-D\n");
    wait_for(
        || events.lock().unwrap().contains(&Event::Hide),
        "the HUD to come down",
    );

    send(&sock_path, "-k\n");
    server.join().unwrap().unwrap();
    assert!(!sock_path.exists() || UnixStream::connect(&sock_path).is_err());
}

#[test]
fn stick_suppresses_expiry_until_unstuck() {
    let sock_path = random_socket_path();
    let state = SessionState {
        short_pause_msecs: 15,
        long_pause_msecs: 15,
        display_msecs: 400,
        net_iface: Some("eth0".to_string()),
        ..Default::default()
    };
    let sink = RecordingSink::default();
    let events = sink.events.clone();

    let mut daemon =
        Daemon::try_new(state, ScriptedSampler { ticks: 0 }, sink, &sock_path).unwrap();
    let server = thread::spawn(move || daemon.run());
    wait_for_listener(&sock_path);
    wait_for(
        || events.lock().unwrap().first() == Some(&Event::Show),
        "the HUD to come up",
    );

    send(&sock_path, "-S\n");
    thread::sleep(Duration::from_millis(1200));
    assert!(
        !events.lock().unwrap().contains(&Event::Hide),
        "a stuck HUD must not expire"
    );

    send(&sock_path, "-N\n");
    wait_for(
        || events.lock().unwrap().contains(&Event::Hide),
        "expiry once unstuck",
    );

    send(&sock_path, "-k\n");
    server.join().unwrap().unwrap();
}
