use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use packpilot_core::mocks::{RecordingRelays, ScriptedTransport};
use packpilot_core::{
    Command, ControlLoop, ControlParams, LineReader, RelayId, RunCfg, SnapshotHub, TickOutcome,
    Trend, command_channel, parse_line, run,
};
use packpilot_traits::MonotonicClock;

fn frame_line(t_batt: f64, t_heat: f64, pack_v: f64) -> String {
    // Five low taps plus the full-pack tap; max(cumulative) is pack_v.
    format!("DATA,{t_batt},{t_heat},4.0,8.0,12.0,16.0,20.0,{pack_v}")
}

fn quiet_reader() -> LineReader {
    LineReader::spawn(
        ScriptedTransport::new(Vec::<String>::new()),
        Duration::from_millis(5),
    )
}

#[test]
fn frames_while_disabled_drive_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let relays = RecordingRelays::new();
    let (_tx, rx) = command_channel();
    let hub = SnapshotHub::new();
    let mut params = ControlParams::default();
    params.log_dir = dir.path().to_path_buf();
    let mut ctl = ControlLoop::new(relays.clone(), params, hub.clone(), rx).expect("build");

    for i in 0..5 {
        let frame = parse_line(&frame_line(10.0, 30.0, 24.0)).expect("frame");
        ctl.process_frame(&frame, i as f64 * 0.04);
    }

    assert!(relays.commands().is_empty());
    assert_eq!(ctl.session_rows(), 0);
    let snap = hub.read();
    assert_eq!(snap.frames_seen, 5);
    assert!((snap.t_batt - 10.0).abs() < 1e-12);
}

#[test]
fn autopilot_toggle_records_and_persists_a_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let relays = RecordingRelays::new();
    let (tx, rx) = command_channel();
    let hub = SnapshotHub::new();
    let mut params = ControlParams::default();
    params.log_dir = dir.path().to_path_buf();
    params.trend_window = 5;
    let mut ctl = ControlLoop::new(relays.clone(), params, hub.clone(), rx).expect("build");
    let reader = quiet_reader();

    tx.send(Command::ToggleAutoPilot).expect("send");
    assert_eq!(ctl.tick(&reader, 0.0), TickOutcome::Continue);
    assert!(ctl.autopilot_enabled());
    assert!(ctl.session_open());

    // Cold battery, hot plate: heater on, coolant circulating.
    for i in 0..10 {
        let frame = parse_line(&frame_line(15.0, 28.0, 23.5)).expect("frame");
        ctl.process_frame(&frame, 0.04 * (i + 1) as f64);
    }
    assert_eq!(ctl.session_rows(), 10);
    let commands = relays.commands();
    assert!(commands.contains(&(RelayId::Heater.wire_id(), true)));
    assert!(commands.contains(&(RelayId::Solenoid.wire_id(), true)));
    assert!(commands.contains(&(RelayId::Pump.wire_id(), true)));
    // Load is never driven by the pilot.
    assert!(!commands.iter().any(|(id, _)| *id == RelayId::Load.wire_id()));

    tx.send(Command::ToggleAutoPilot).expect("send");
    assert_eq!(ctl.tick(&reader, 0.5), TickOutcome::Continue);
    assert!(!ctl.autopilot_enabled());
    assert!(!ctl.session_open());

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read_dir")
        .collect::<std::io::Result<_>>()
        .expect("entries");
    assert_eq!(entries.len(), 1, "exactly one session file");
    let content = std::fs::read_to_string(entries[0].path()).expect("read csv");
    let mut lines = content.lines();
    assert!(lines.next().expect("header").starts_with("t_s,tBatt,tHeat,Heater"));
    assert_eq!(lines.count(), 10, "one row per processed frame");
}

#[test]
fn disable_without_enable_is_a_quiet_noop() {
    let dir = tempfile::tempdir().expect("tempdir");
    let relays = RecordingRelays::new();
    let (_tx, rx) = command_channel();
    let mut params = ControlParams::default();
    params.log_dir = dir.path().to_path_buf();
    let mut ctl =
        ControlLoop::new(relays, params, SnapshotHub::new(), rx).expect("build");
    ctl.finish();
    let leftovers = std::fs::read_dir(dir.path()).expect("read_dir").count();
    assert_eq!(leftovers, 0, "no session file without a session");
}

#[test]
fn manual_load_toggle_passes_through() {
    let dir = tempfile::tempdir().expect("tempdir");
    let relays = RecordingRelays::new();
    let (tx, rx) = command_channel();
    let mut params = ControlParams::default();
    params.log_dir = dir.path().to_path_buf();
    let mut ctl =
        ControlLoop::new(relays.clone(), params, SnapshotHub::new(), rx).expect("build");
    let reader = quiet_reader();

    tx.send(Command::ToggleRelay(RelayId::Load)).expect("send");
    ctl.tick(&reader, 0.0);
    tx.send(Command::ToggleRelay(RelayId::Load)).expect("send");
    ctl.tick(&reader, 0.1);

    assert_eq!(
        relays.commands(),
        vec![
            (RelayId::Load.wire_id(), true),
            (RelayId::Load.wire_id(), false)
        ]
    );
}

#[test]
fn rising_pack_voltage_reads_as_charging() {
    let dir = tempfile::tempdir().expect("tempdir");
    let relays = RecordingRelays::new();
    let (_tx, rx) = command_channel();
    let hub = SnapshotHub::new();
    let mut params = ControlParams::default();
    params.log_dir = dir.path().to_path_buf();
    let mut ctl = ControlLoop::new(relays, params, hub.clone(), rx).expect("build");

    // 70 flat samples, then a linear 20.0 -> 24.0 V ramp over 30 samples.
    for i in 0..70 {
        let frame = parse_line(&frame_line(22.0, 22.0, 20.0)).expect("frame");
        ctl.process_frame(&frame, i as f64 * 0.04);
    }
    for i in 0..30 {
        let v = 20.0 + 4.0 * (i + 1) as f64 / 30.0;
        let frame = parse_line(&frame_line(22.0, 22.0, v)).expect("frame");
        ctl.process_frame(&frame, (70 + i) as f64 * 0.04);
    }

    let snap = hub.read();
    assert_eq!(snap.trend, Trend::Up);
    assert!((snap.pack.pack_voltage - 24.0).abs() < 1e-9);
    assert!((snap.pack.soc_pct - 95.2).abs() < 0.1);
    assert_eq!(snap.frames_seen, 100);
}

#[test]
fn link_failure_stops_the_loop_and_gates_relays() {
    let dir = tempfile::tempdir().expect("tempdir");
    let relays = RecordingRelays::new();
    let (tx, rx) = command_channel();
    let hub = SnapshotHub::new();
    let mut params = ControlParams::default();
    params.log_dir = dir.path().to_path_buf();
    let mut ctl = ControlLoop::new(relays.clone(), params, hub.clone(), rx).expect("build");

    let link = ScriptedTransport::failing_after(
        [frame_line(15.0, 28.0, 23.5)],
        "device unplugged",
    );
    let reader = LineReader::spawn(link, Duration::from_millis(5));
    std::thread::sleep(Duration::from_millis(50)); // let the worker run dry

    let outcome = ctl.tick(&reader, 0.0);
    assert!(matches!(outcome, TickOutcome::Disconnected(ref msg) if msg.contains("unplugged")));
    assert!(hub.read().fault.is_some());

    // Relay commands are refused after the fault.
    let before = relays.commands().len();
    tx.send(Command::ToggleRelay(RelayId::Load)).expect("send");
    ctl.tick(&reader, 0.1);
    assert_eq!(relays.commands().len(), before);
}

#[test]
fn run_exits_cleanly_on_shutdown() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut params = ControlParams::default();
    params.log_dir = dir.path().to_path_buf();
    let (_tx, rx) = command_channel();
    let hub = SnapshotHub::new();
    let shutdown = Arc::new(AtomicBool::new(false));
    let stop = Arc::clone(&shutdown);

    let link = ScriptedTransport::new([
        frame_line(22.0, 22.0, 24.0),
        frame_line(22.0, 22.0, 24.0),
    ]);
    let handle = std::thread::spawn(move || {
        run(
            link,
            RecordingRelays::new(),
            params,
            RunCfg {
                tick_ms: 1,
                read_timeout_ms: 5,
            },
            hub,
            rx,
            stop,
            MonotonicClock::new(),
        )
    });

    std::thread::sleep(Duration::from_millis(50));
    shutdown.store(true, Ordering::Relaxed);
    let result = handle.join().expect("runner thread");
    assert!(result.is_ok());
}

#[test]
fn run_errors_on_link_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut params = ControlParams::default();
    params.log_dir = dir.path().to_path_buf();
    let (_tx, rx) = command_channel();
    let shutdown = Arc::new(AtomicBool::new(false));

    let link = ScriptedTransport::failing_after(
        [frame_line(22.0, 22.0, 24.0)],
        "device unplugged",
    );
    let handle = std::thread::spawn(move || {
        run(
            link,
            RecordingRelays::new(),
            params,
            RunCfg {
                tick_ms: 1,
                read_timeout_ms: 5,
            },
            SnapshotHub::new(),
            rx,
            shutdown,
            MonotonicClock::new(),
        )
    });

    let result = handle.join().expect("runner thread");
    let err = result.expect_err("must report the dead link");
    assert!(err.to_string().contains("serial link lost"));
}
