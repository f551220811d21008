//! The control loop: single writer of relay state, session rows, and the
//! published snapshot.
//!
//! All mutation funnels through [`ControlLoop::tick`]: user commands are
//! applied first, then every frame queued by the reader is processed in
//! order. Presentation layers read [`SnapshotHub`] and never touch the
//! loop's state directly.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crossbeam_channel as xch;

use packpilot_traits::Relays;

use crate::autopilot::{AutoPilot, DEFAULT_SETPOINT_C, effective_setpoint};
use crate::error::BuildError;
use crate::frame::{CELL_COUNT, PackRefs, PackState, SensorFrame, cell_voltages};
use crate::reader::{LineReader, ReaderEvent};
use crate::relay::{RelayBank, RelayId};
use crate::session::{SessionLogRow, SessionLogger};
use crate::trend::{Trend, TrendDetector};

/// Read-only view of the loop's state, published once per tick and after
/// every processed frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub t_batt: f64,
    pub t_heat: f64,
    pub cells: [f64; CELL_COUNT],
    pub pack: PackState,
    pub trend: Trend,
    /// Relay states in wire-id order.
    pub relays: [bool; 4],
    pub autopilot: bool,
    pub setpoint_c: f64,
    pub frames_seen: u64,
    /// Set once after a terminal link failure.
    pub fault: Option<String>,
    /// Transient user-facing message, e.g. a session flush failure.
    pub notice: Option<String>,
}

/// Shared slot holding the latest [`Snapshot`].
#[derive(Clone, Default)]
pub struct SnapshotHub {
    inner: Arc<Mutex<Snapshot>>,
}

impl SnapshotHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: Snapshot) {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = snapshot;
        }
    }

    pub fn read(&self) -> Snapshot {
        self.inner
            .lock()
            .map(|slot| slot.clone())
            .unwrap_or_default()
    }
}

/// User intents, delivered asynchronously and applied at the start of the
/// next tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Replace the target battery temperature; non-finite values fall back
    /// to the default.
    SetSetpoint(f64),
    /// Manual flip of one relay, including Load, which the pilot ignores.
    ToggleRelay(RelayId),
    /// Flip auto-pilot: engaging starts a session, disengaging persists it.
    ToggleAutoPilot,
}

/// Channel for delivering [`Command`]s to the loop. Unbounded: user
/// intents are rare and must never be dropped.
pub fn command_channel() -> (xch::Sender<Command>, xch::Receiver<Command>) {
    xch::unbounded()
}

/// Everything the loop needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct ControlParams {
    pub setpoint_c: f64,
    pub heater_cutoff_margin_c: f64,
    pub pump_delta_c: f64,
    pub refs: PackRefs,
    pub trend_window: usize,
    pub trend_threshold_v: f64,
    pub log_dir: PathBuf,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            setpoint_c: DEFAULT_SETPOINT_C,
            heater_cutoff_margin_c: 20.0,
            pump_delta_c: 10.0,
            refs: PackRefs::default(),
            trend_window: 30,
            trend_threshold_v: 0.01,
            log_dir: PathBuf::from("sessions"),
        }
    }
}

impl ControlParams {
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.trend_window < 2 {
            return Err(BuildError::InvalidParameter("trend_window must be >= 2"));
        }
        if !(self.trend_threshold_v.is_finite() && self.trend_threshold_v >= 0.0) {
            return Err(BuildError::InvalidParameter(
                "trend_threshold_v must be finite and >= 0",
            ));
        }
        if !(self.refs.pack_max_v.is_finite() && self.refs.pack_max_v > 0.0) {
            return Err(BuildError::InvalidParameter("pack_max_v must be > 0"));
        }
        if !(self.refs.cell_full_v.is_finite() && self.refs.cell_full_v > 0.0) {
            return Err(BuildError::InvalidParameter("cell_full_v must be > 0"));
        }
        if !self.heater_cutoff_margin_c.is_finite() || self.heater_cutoff_margin_c < 0.0 {
            return Err(BuildError::InvalidParameter(
                "heater_cutoff_margin_c must be finite and >= 0",
            ));
        }
        if !self.pump_delta_c.is_finite() || self.pump_delta_c < 0.0 {
            return Err(BuildError::InvalidParameter(
                "pump_delta_c must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Continue,
    /// The reader reported a terminal failure; the loop has flushed what it
    /// could and the caller should stop.
    Disconnected(String),
}

pub struct ControlLoop<R: Relays> {
    relays: R,
    bank: RelayBank,
    trend: TrendDetector,
    pilot: AutoPilot,
    logger: SessionLogger,
    refs: PackRefs,
    setpoint_c: f64,
    hub: SnapshotHub,
    commands: xch::Receiver<Command>,
    last: Snapshot,
    faulted: bool,
}

impl<R: Relays> ControlLoop<R> {
    pub fn new(
        relays: R,
        params: ControlParams,
        hub: SnapshotHub,
        commands: xch::Receiver<Command>,
    ) -> Result<Self, BuildError> {
        params.validate()?;
        let setpoint_c = effective_setpoint(params.setpoint_c);
        let last = Snapshot {
            setpoint_c,
            ..Snapshot::default()
        };
        Ok(Self {
            relays,
            bank: RelayBank::default(),
            trend: TrendDetector::new(params.trend_window, params.trend_threshold_v),
            pilot: AutoPilot::new(params.heater_cutoff_margin_c, params.pump_delta_c),
            logger: SessionLogger::new(params.log_dir),
            refs: params.refs,
            setpoint_c,
            hub,
            commands,
            last,
            faulted: false,
        })
    }

    /// Apply pending commands, then process every queued reader event.
    pub fn tick(&mut self, reader: &LineReader, now_s: f64) -> TickOutcome {
        self.apply_commands();
        while let Some(event) = reader.poll() {
            match event {
                ReaderEvent::Frame(frame) => self.process_frame(&frame, now_s),
                ReaderEvent::Disconnected(msg) => {
                    self.faulted = true;
                    self.last.fault = Some(msg.clone());
                    self.publish();
                    return TickOutcome::Disconnected(msg);
                }
            }
        }
        self.publish();
        TickOutcome::Continue
    }

    /// Run the pilot rules and logging for one frame. Normally driven via
    /// [`tick`](Self::tick); public so tests can feed frames directly.
    pub fn process_frame(&mut self, frame: &SensorFrame, now_s: f64) {
        let cells = cell_voltages(&frame.cumulative);
        let pack = PackState::derive(&frame.cumulative, &cells, self.refs);
        self.trend.observe(pack.pack_voltage);
        let trend = self.trend.classify();

        if self.pilot.is_enabled() {
            let plan = self.pilot.plan(frame.t_batt, frame.t_heat, self.setpoint_c);
            if let Some(on) = plan.heater {
                self.set_relay(RelayId::Heater, on);
            }
            if let Some(on) = plan.coolant {
                // Solenoid and pump are plumbed in series; always together.
                self.set_relay(RelayId::Solenoid, on);
                self.set_relay(RelayId::Pump, on);
            }

            let heater_on = self.bank.get(RelayId::Heater);
            let (heat_start_s, heat_duration_s) = self.pilot.heat_bookkeeping(heater_on, now_s);
            self.logger.append(SessionLogRow {
                t_s: now_s,
                t_batt: frame.t_batt,
                t_heat: frame.t_heat,
                relays: self.bank.as_array(),
                pack_voltage: pack.pack_voltage,
                soc_pct: pack.soc_pct,
                soh_pct: pack.soh_pct,
                charging: trend == Trend::Up,
                heat_start_s,
                heat_duration_s,
            });
        }

        self.last.t_batt = frame.t_batt;
        self.last.t_heat = frame.t_heat;
        self.last.cells = cells;
        self.last.pack = pack;
        self.last.trend = trend;
        self.last.frames_seen += 1;
        self.publish();
    }

    /// Disengage the pilot and flush any open session. Called on shutdown
    /// and after a terminal fault.
    pub fn finish(&mut self) {
        if self.pilot.is_enabled() {
            self.pilot.disengage();
            self.last.autopilot = false;
        }
        let rows = self.logger.row_count();
        match self.logger.stop() {
            Ok(Some(path)) => {
                tracing::info!(path = %path.display(), rows, "session persisted");
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, rows, "session not persisted, rows retained");
                self.last.notice = Some(e.to_string());
            }
        }
        self.publish();
    }

    pub fn bank(&self) -> RelayBank {
        self.bank
    }

    pub fn autopilot_enabled(&self) -> bool {
        self.pilot.is_enabled()
    }

    pub fn session_open(&self) -> bool {
        self.logger.is_open()
    }

    pub fn session_rows(&self) -> usize {
        self.logger.row_count()
    }

    fn apply_commands(&mut self) {
        while let Ok(cmd) = self.commands.try_recv() {
            match cmd {
                Command::SetSetpoint(v) => {
                    self.setpoint_c = effective_setpoint(v);
                    self.last.setpoint_c = self.setpoint_c;
                }
                Command::ToggleRelay(relay) => {
                    let next = !self.bank.get(relay);
                    self.set_relay(relay, next);
                }
                Command::ToggleAutoPilot => self.toggle_autopilot(),
            }
        }
    }

    fn toggle_autopilot(&mut self) {
        if self.pilot.is_enabled() {
            self.pilot.disengage();
            self.last.autopilot = false;
            let rows = self.logger.row_count();
            match self.logger.stop() {
                Ok(Some(path)) => {
                    tracing::info!(path = %path.display(), rows, "session persisted");
                    self.last.notice = None;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, rows, "session not persisted, rows retained");
                    self.last.notice = Some(e.to_string());
                }
            }
        } else {
            // A session stuck from a failed flush must drain before a new
            // one may open, or its rows would be lost.
            if self.logger.is_open() {
                if let Err(e) = self.logger.stop() {
                    tracing::error!(error = %e, "flush retry failed, auto-pilot stays off");
                    self.last.notice = Some(e.to_string());
                    return;
                }
                self.last.notice = None;
            }
            match self.logger.start() {
                Ok(path) => {
                    self.pilot.engage();
                    self.last.autopilot = true;
                    self.last.notice = None;
                    tracing::info!(path = %path.display(), "session started, auto-pilot engaged");
                }
                Err(e) => {
                    tracing::error!(error = %e, "could not start session, auto-pilot stays off");
                    self.last.notice = Some(e.to_string());
                }
            }
        }
    }

    /// Update the model and emit the command. Writes are idempotent at the
    /// model level but the command is emitted regardless, so the board gets
    /// a refresh even when the state did not change.
    fn set_relay(&mut self, relay: RelayId, on: bool) {
        if self.faulted {
            // No relay commands after a terminal link fault.
            return;
        }
        self.bank.set(relay, on);
        if let Err(e) = self.relays.drive(relay.wire_id(), on) {
            tracing::warn!(relay = relay.name(), on, error = %e, "relay drive failed");
        }
    }

    fn publish(&mut self) {
        self.last.relays = self.bank.as_array();
        self.last.autopilot = self.pilot.is_enabled();
        self.hub.publish(self.last.clone());
    }
}
