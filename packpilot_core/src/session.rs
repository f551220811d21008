//! Session recording: rows accumulate in memory while auto-pilot is
//! engaged and are written out as one CSV file when it is disengaged.
//!
//! Buffering the whole session and writing once keeps the per-tick path
//! free of storage I/O; the trade-off is that a crash mid-session loses
//! that session's rows, which is acceptable for bench logging.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::CoreError;

/// CSV header, one column per logged quantity.
pub const LOG_HEADER: [&str; 13] = [
    "t_s",
    "tBatt",
    "tHeat",
    "Heater",
    "Solenoid",
    "Pump",
    "LOAD",
    "PackV",
    "SOC%",
    "SOH%",
    "Charging",
    "HeatStart",
    "HeatDelta_s",
];

/// One logged control tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLogRow {
    /// Seconds since process start.
    pub t_s: f64,
    pub t_batt: f64,
    pub t_heat: f64,
    /// Relay states in wire-id order: heater, solenoid, pump, load.
    pub relays: [bool; 4],
    pub pack_voltage: f64,
    pub soc_pct: f64,
    pub soh_pct: f64,
    /// True while the voltage trend reads `Up`.
    pub charging: bool,
    /// Start stamp of the current heating phase, if one has begun.
    pub heat_start_s: Option<f64>,
    /// Elapsed heating time, present only on heater-off ticks after a phase.
    pub heat_duration_s: Option<f64>,
}

#[derive(Debug)]
struct Session {
    started: DateTime<Local>,
    path: PathBuf,
    rows: Vec<SessionLogRow>,
}

/// Owns at most one open session and its destination directory.
///
/// A session that fails to persist on [`stop`](SessionLogger::stop) stays
/// open with all rows intact; the next `stop` retries the same file. A new
/// session cannot start until the stuck one is flushed, so no rows are
/// ever silently dropped.
#[derive(Debug)]
pub struct SessionLogger {
    log_dir: PathBuf,
    open: Option<Session>,
}

impl SessionLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            open: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn row_count(&self) -> usize {
        self.open.as_ref().map_or(0, |s| s.rows.len())
    }

    pub fn open_path(&self) -> Option<&Path> {
        self.open.as_ref().map(|s| s.path.as_path())
    }

    /// Open a new session file slot named after the wall-clock start time.
    ///
    /// Fails if a previous session is still awaiting its flush, or if the
    /// log directory cannot be created.
    pub fn start(&mut self) -> Result<PathBuf, CoreError> {
        if let Some(stuck) = &self.open {
            return Err(CoreError::SessionBusy(format!(
                "{} still holds {} unflushed rows",
                stuck.path.display(),
                stuck.rows.len()
            )));
        }
        std::fs::create_dir_all(&self.log_dir).map_err(|e| {
            CoreError::SessionIo(format!("create {}: {e}", self.log_dir.display()))
        })?;
        let started = Local::now();
        let name = format!("session_{}.csv", started.format("%Y-%m-%d_%H-%M-%S"));
        let path = self.log_dir.join(name);
        self.open = Some(Session {
            started,
            path: path.clone(),
            rows: Vec::new(),
        });
        Ok(path)
    }

    /// Append one row to the open session; ignored when none is open.
    pub fn append(&mut self, row: SessionLogRow) {
        if let Some(session) = &mut self.open {
            session.rows.push(row);
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.open.as_ref().map(|s| s.started)
    }

    /// Persist and close the open session.
    ///
    /// Returns the written path, or `Ok(None)` when no session was open
    /// (disabling auto-pilot that never recorded is a no-op). On a write
    /// failure the session is restored untouched for a later retry.
    pub fn stop(&mut self) -> Result<Option<PathBuf>, CoreError> {
        let Some(session) = self.open.take() else {
            return Ok(None);
        };
        let bytes = match encode_csv(&session.rows) {
            Ok(b) => b,
            Err(e) => {
                self.open = Some(session);
                return Err(e);
            }
        };
        if let Err(e) = std::fs::write(&session.path, &bytes) {
            let msg = format!("write {}: {e}", session.path.display());
            self.open = Some(session);
            return Err(CoreError::SessionBusy(msg));
        }
        Ok(Some(session.path))
    }
}

fn encode_csv(rows: &[SessionLogRow]) -> Result<Vec<u8>, CoreError> {
    let io_err = |e: &dyn std::fmt::Display| CoreError::SessionIo(format!("encode csv: {e}"));

    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(LOG_HEADER).map_err(|e| io_err(&e))?;
    for row in rows {
        let opt = |v: Option<f64>| v.map(|x| format!("{x:.3}")).unwrap_or_default();
        w.write_record(&[
            format!("{:.3}", row.t_s),
            format!("{:.2}", row.t_batt),
            format!("{:.2}", row.t_heat),
            u8::from(row.relays[0]).to_string(),
            u8::from(row.relays[1]).to_string(),
            u8::from(row.relays[2]).to_string(),
            u8::from(row.relays[3]).to_string(),
            format!("{:.3}", row.pack_voltage),
            format!("{:.1}", row.soc_pct),
            format!("{:.1}", row.soh_pct),
            u8::from(row.charging).to_string(),
            opt(row.heat_start_s),
            opt(row.heat_duration_s),
        ])
        .map_err(|e| io_err(&e))?;
    }
    w.into_inner().map_err(|e| io_err(&e))
}
