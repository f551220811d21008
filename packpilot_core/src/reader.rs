//! Background serial reader feeding parsed frames to the control loop.
//!
//! One worker thread owns the transport and pushes events into a bounded
//! channel. The control loop drains the channel non-blockingly each tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel as xch;

use packpilot_traits::Transport;

use crate::frame::{SensorFrame, parse_line};

/// Depth of the frame channel. The control tick drains everything queued,
/// so this only needs to cover a tick's worth of frames plus slack.
pub const FRAME_QUEUE_DEPTH: usize = 32;

/// What the reader thread can hand to the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderEvent {
    Frame(SensorFrame),
    /// Terminal link failure. Emitted exactly once; the thread then exits
    /// and no reconnection is attempted.
    Disconnected(String),
}

/// Handle to the reader thread. Dropping it signals shutdown and joins.
pub struct LineReader {
    rx: xch::Receiver<ReaderEvent>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

impl LineReader {
    /// Spawn the worker. Stale input buffered in the transport is cleared
    /// first so the loop starts on fresh data.
    pub fn spawn<T>(mut link: T, read_timeout: Duration) -> Self
    where
        T: Transport + Send + 'static,
    {
        let (tx, rx) = xch::bounded(FRAME_QUEUE_DEPTH);
        // The worker keeps its own receiver so it can evict the oldest
        // event when the queue is full: newest data wins.
        let drain = rx.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);

        let join_handle = std::thread::spawn(move || {
            if let Err(e) = link.clear_input() {
                tracing::warn!(error = %e, "could not clear stale serial input");
            }
            loop {
                if shutdown_flag.load(Ordering::Relaxed) {
                    tracing::debug!("line reader shutting down");
                    break;
                }
                match link.read_line(read_timeout) {
                    Ok(Some(line)) => {
                        let trimmed = line.trim();
                        let Some(frame) = parse_line(trimmed) else {
                            // Boot banners and torn lines are routine noise.
                            tracing::trace!(line = trimmed, "dropped malformed line");
                            continue;
                        };
                        if !push_newest(&tx, &drain, ReaderEvent::Frame(frame)) {
                            break;
                        }
                    }
                    Ok(None) => {
                        // Quiet timeout; loop back to re-check shutdown.
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "serial link failure, reader stopping");
                        let _ = push_newest(&tx, &drain, ReaderEvent::Disconnected(e.to_string()));
                        break;
                    }
                }
            }
        });

        Self {
            rx,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Non-blocking receive of the next queued event.
    pub fn poll(&self) -> Option<ReaderEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for LineReader {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            if handle.join().is_err() {
                tracing::warn!("line reader thread panicked");
            }
        }
    }
}

/// Try-send that evicts the oldest queued event on overflow so the newest
/// one always gets through. Returns false once every receiver is gone.
fn push_newest(
    tx: &xch::Sender<ReaderEvent>,
    drain: &xch::Receiver<ReaderEvent>,
    event: ReaderEvent,
) -> bool {
    let mut event = event;
    loop {
        match tx.try_send(event) {
            Ok(()) => return true,
            Err(xch::TrySendError::Full(back)) => {
                let _ = drain.try_recv();
                event = back;
            }
            Err(xch::TrySendError::Disconnected(_)) => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_newest_evicts_oldest_on_overflow() {
        let (tx, rx) = xch::bounded(2);
        let frame = |v: f64| {
            ReaderEvent::Frame(SensorFrame {
                t_batt: v,
                t_heat: 0.0,
                cumulative: [0.0; 6],
            })
        };
        assert!(push_newest(&tx, &rx, frame(1.0)));
        assert!(push_newest(&tx, &rx, frame(2.0)));
        assert!(push_newest(&tx, &rx, frame(3.0)));
        // 1.0 was evicted; 2.0 and 3.0 remain in order.
        assert_eq!(rx.try_recv().ok(), Some(frame(2.0)));
        assert_eq!(rx.try_recv().ok(), Some(frame(3.0)));
        assert!(rx.try_recv().is_err());
    }
}
