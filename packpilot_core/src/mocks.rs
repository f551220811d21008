//! Doubles for the transport and relay seams, used by tests and the CLI
//! self-check.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use packpilot_traits::{Relays, Transport};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Transport that replays scripted lines, then either reports quiet
/// timeouts forever or fails hard once, depending on construction.
pub struct ScriptedTransport {
    lines: VecDeque<String>,
    fail_after: Option<String>,
}

impl ScriptedTransport {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            fail_after: None,
        }
    }

    /// Replays `lines`, then returns one hard error with `msg`.
    pub fn failing_after<I, S>(lines: I, msg: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut t = Self::new(lines);
        t.fail_after = Some(msg.to_string());
        t
    }
}

impl Transport for ScriptedTransport {
    fn clear_input(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, BoxError> {
        if let Some(line) = self.lines.pop_front() {
            return Ok(Some(line));
        }
        match self.fail_after.take() {
            Some(msg) => Err(msg.into()),
            None => {
                // Emulate a quiet read timeout without spinning the reader
                // thread at full speed.
                std::thread::sleep(timeout.min(Duration::from_millis(5)));
                Ok(None)
            }
        }
    }
}

/// Relay driver that records every emitted `(wire_id, on)` command.
/// Cloning shares the log, so tests keep a handle while the loop owns one.
#[derive(Clone, Default)]
pub struct RecordingRelays {
    log: Arc<Mutex<Vec<(u8, bool)>>>,
}

impl RecordingRelays {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<(u8, bool)> {
        self.log.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl Relays for RecordingRelays {
    fn drive(&mut self, relay_id: u8, on: bool) -> Result<(), BoxError> {
        if let Ok(mut log) = self.log.lock() {
            log.push((relay_id, on));
        }
        Ok(())
    }
}

/// Relay driver that accepts and discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRelays;

impl Relays for NullRelays {
    fn drive(&mut self, _relay_id: u8, _on: bool) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Relay driver that always fails; exercises the warn-and-continue path.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingRelays;

impl Relays for FailingRelays {
    fn drive(&mut self, relay_id: u8, on: bool) -> Result<(), BoxError> {
        Err(format!("relay {relay_id} refused command on={on}").into())
    }
}
