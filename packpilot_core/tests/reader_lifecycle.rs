use std::time::{Duration, Instant};

use packpilot_core::mocks::ScriptedTransport;
use packpilot_core::{LineReader, ReaderEvent};

fn drain(reader: &LineReader, want: usize) -> Vec<ReaderEvent> {
    let mut got = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(2);
    while got.len() < want && Instant::now() < deadline {
        match reader.poll() {
            Some(event) => got.push(event),
            None => std::thread::sleep(Duration::from_millis(2)),
        }
    }
    got
}

#[test]
fn well_formed_frames_come_through_in_order() {
    let link = ScriptedTransport::new([
        "DATA,1.0,2.0,4,8,12,16,20,24",
        "DATA,2.0,2.0,4,8,12,16,20,24",
    ]);
    let reader = LineReader::spawn(link, Duration::from_millis(5));
    let events = drain(&reader, 2);
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], ReaderEvent::Frame(f) if (f.t_batt - 1.0).abs() < 1e-12));
    assert!(matches!(&events[1], ReaderEvent::Frame(f) if (f.t_batt - 2.0).abs() < 1e-12));
}

#[test]
fn malformed_lines_are_skipped_without_events() {
    let link = ScriptedTransport::new([
        "boot banner v1.2",
        "DATA,1.0,2.0,4,8,12,16,20,24",
        "DATA,torn",
        "DATA,2.0,2.0,4,8,12,16,20,24",
    ]);
    let reader = LineReader::spawn(link, Duration::from_millis(5));
    let events = drain(&reader, 2);
    assert_eq!(events.len(), 2);
    for event in &events {
        assert!(matches!(event, ReaderEvent::Frame(_)));
    }
}

#[test]
fn hard_failure_emits_exactly_one_disconnect() {
    let link = ScriptedTransport::failing_after(
        ["DATA,1.0,2.0,4,8,12,16,20,24"],
        "device unplugged",
    );
    let reader = LineReader::spawn(link, Duration::from_millis(5));
    let events = drain(&reader, 2);
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], ReaderEvent::Frame(_)));
    assert!(
        matches!(&events[1], ReaderEvent::Disconnected(msg) if msg.contains("unplugged"))
    );
    // The worker has exited; nothing further ever arrives.
    std::thread::sleep(Duration::from_millis(20));
    assert!(reader.poll().is_none());
}

#[test]
fn drop_signals_and_joins_the_worker() {
    let reader = LineReader::spawn(
        ScriptedTransport::new(Vec::<String>::new()),
        Duration::from_millis(5),
    );
    std::thread::sleep(Duration::from_millis(20));
    let start = Instant::now();
    drop(reader);
    // Join latency is bounded by the read timeout, not by data arrival.
    assert!(start.elapsed() < Duration::from_secs(1));
}
