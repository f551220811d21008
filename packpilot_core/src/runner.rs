//! Fixed-cadence run loop tying reader, control loop, and clock together.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;

use packpilot_traits::{Clock, Relays, Transport};

use crate::control::{Command, ControlLoop, ControlParams, SnapshotHub, TickOutcome};
use crate::error::{CoreError, Result};
use crate::reader::LineReader;

/// Timing knobs for [`run`].
#[derive(Debug, Clone, Copy)]
pub struct RunCfg {
    /// Control tick period (ms).
    pub tick_ms: u64,
    /// Per-read transport timeout (ms); bounds shutdown latency of the
    /// reader thread.
    pub read_timeout_ms: u64,
}

impl Default for RunCfg {
    fn default() -> Self {
        Self {
            tick_ms: 40,
            read_timeout_ms: 100,
        }
    }
}

/// Drive the control loop until `shutdown` is raised or the link dies.
///
/// Timestamps handed to the loop are seconds since this call, so session
/// rows start near zero. Returns an error only on a terminal link failure;
/// a requested shutdown is a clean exit, with any open session flushed
/// either way.
pub fn run<T, R, C>(
    link: T,
    relays: R,
    params: ControlParams,
    run_cfg: RunCfg,
    hub: SnapshotHub,
    commands: xch::Receiver<Command>,
    shutdown: Arc<AtomicBool>,
    clock: C,
) -> Result<()>
where
    T: Transport + Send + 'static,
    R: Relays,
    C: Clock,
{
    let reader = LineReader::spawn(link, Duration::from_millis(run_cfg.read_timeout_ms.max(1)));
    let mut ctl = ControlLoop::new(relays, params, hub, commands)?;

    let period = Duration::from_millis(run_cfg.tick_ms.max(1));
    let epoch = clock.now();
    tracing::info!(tick_ms = run_cfg.tick_ms, "control loop running");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            ctl.finish();
            tracing::info!("control loop stopped on shutdown signal");
            return Ok(());
        }
        let now_s = clock.secs_since(epoch);
        match ctl.tick(&reader, now_s) {
            TickOutcome::Continue => {}
            TickOutcome::Disconnected(msg) => {
                ctl.finish();
                return Err(CoreError::Disconnected(msg).into());
            }
        }
        clock.sleep(period);
    }
}
