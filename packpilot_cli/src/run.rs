//! Wiring: config plus CLI overrides into hardware and the core runner.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::{Result, WrapErr};

use packpilot_config::Config;
use packpilot_core::{
    Command, ControlParams, RunCfg, SnapshotHub, command_channel, run,
};
use packpilot_hardware::{SimulatedPack, open_pair};
use packpilot_traits::MonotonicClock;

#[derive(Debug)]
pub struct RunOpts {
    pub port: Option<String>,
    pub sim: bool,
    pub auto: bool,
    pub setpoint: Option<f64>,
    pub log_dir: Option<PathBuf>,
    pub run_for: u64,
}

pub fn run_monitor(cfg: &Config, opts: RunOpts) -> Result<()> {
    let mut params = ControlParams::from(cfg);
    if let Some(setpoint) = opts.setpoint {
        params.setpoint_c = setpoint;
    }
    if let Some(dir) = opts.log_dir {
        params.log_dir = dir;
    }
    let run_cfg = RunCfg::from(cfg);

    let (commands_tx, commands_rx) = command_channel();
    if opts.auto {
        let _ = commands_tx.send(Command::ToggleAutoPilot);
    }

    let hub = SnapshotHub::new();
    let shutdown = Arc::new(AtomicBool::new(false));

    let signal_stop = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        signal_stop.store(true, Ordering::Relaxed);
    })
    .wrap_err("install Ctrl-C handler")?;

    if opts.run_for > 0 {
        let timer_stop = Arc::clone(&shutdown);
        let secs = opts.run_for;
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(secs));
            timer_stop.store(true, Ordering::Relaxed);
        });
    }

    // Presentation adapter: periodic status line from the snapshot hub.
    let reporter_stop = Arc::clone(&shutdown);
    let reporter_hub = hub.clone();
    let reporter = std::thread::spawn(move || {
        while !reporter_stop.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_secs(1));
            let snap = reporter_hub.read();
            if snap.frames_seen == 0 {
                continue;
            }
            tracing::info!(
                t_batt = snap.t_batt,
                t_heat = snap.t_heat,
                pack_v = snap.pack.pack_voltage,
                soc_pct = snap.pack.soc_pct,
                trend = ?snap.trend,
                autopilot = snap.autopilot,
                "status"
            );
        }
    });

    let result = if opts.sim {
        let pack = SimulatedPack::new();
        let relays = pack.relays_handle();
        tracing::info!("running against the built-in simulator");
        run(
            pack,
            relays,
            params,
            run_cfg,
            hub.clone(),
            commands_rx,
            Arc::clone(&shutdown),
            MonotonicClock::new(),
        )
    } else {
        let port = opts.port.as_deref().unwrap_or(&cfg.serial.port);
        let (transport, relays) = open_pair(port, cfg.serial.baud)?;
        run(
            transport,
            relays,
            params,
            run_cfg,
            hub.clone(),
            commands_rx,
            Arc::clone(&shutdown),
            MonotonicClock::new(),
        )
    };

    // Stop the reporter even when the runner exited on its own fault.
    shutdown.store(true, Ordering::Relaxed);
    let _ = reporter.join();
    result
}

/// Short simulated run proving the whole pipeline moves data: frames flow,
/// the pilot engages, and a session file lands on disk.
pub fn self_check() -> Result<()> {
    let dir = tempfile_dir()?;
    let pack = SimulatedPack::with_period(Duration::from_millis(5));
    let relays = pack.relays_handle();

    let mut params = ControlParams::default();
    params.log_dir = dir.clone();
    let run_cfg = RunCfg {
        tick_ms: 5,
        read_timeout_ms: 10,
    };

    let (commands_tx, commands_rx) = command_channel();
    let _ = commands_tx.send(Command::ToggleAutoPilot);

    let hub = SnapshotHub::new();
    let runner_hub = hub.clone();
    let shutdown = Arc::new(AtomicBool::new(false));
    let stop = Arc::clone(&shutdown);

    let handle = std::thread::spawn(move || {
        run(
            pack,
            relays,
            params,
            run_cfg,
            runner_hub,
            commands_rx,
            stop,
            MonotonicClock::new(),
        )
    });

    std::thread::sleep(Duration::from_millis(400));
    shutdown.store(true, Ordering::Relaxed);
    handle
        .join()
        .map_err(|_| eyre::eyre!("runner thread panicked"))??;

    let snap = hub.read();
    if snap.frames_seen == 0 {
        eyre::bail!("no frames flowed through the simulator");
    }
    if !std::fs::read_dir(&dir)?.any(|e| e.is_ok()) {
        eyre::bail!("no session file was written");
    }
    println!(
        "self-check ok: {} frames, pack {:.2} V, trend {:?}",
        snap.frames_seen, snap.pack.pack_voltage, snap.trend
    );
    Ok(())
}

fn tempfile_dir() -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("packpilot-selfcheck-{}", std::process::id()));
    std::fs::create_dir_all(&dir).wrap_err("create self-check scratch dir")?;
    Ok(dir)
}
