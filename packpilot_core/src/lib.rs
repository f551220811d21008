#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Hardware-agnostic core of the battery pack monitor.
//!
//! Everything here runs against the [`packpilot_traits`] seams: a
//! [`Transport`](packpilot_traits::Transport) feeding telemetry lines and a
//! [`Relays`](packpilot_traits::Relays) sink for actuator commands. The
//! real serial implementations live in `packpilot_hardware`; tests and the
//! self-check use the doubles in [`mocks`].

pub mod autopilot;
pub mod control;
pub mod conversions;
pub mod error;
pub mod frame;
pub mod mocks;
pub mod reader;
pub mod relay;
pub mod runner;
pub mod session;
pub mod trend;

pub use autopilot::{AutoPilot, DEFAULT_SETPOINT_C, PilotPlan, effective_setpoint, plan};
pub use control::{
    Command, ControlLoop, ControlParams, Snapshot, SnapshotHub, TickOutcome, command_channel,
};
pub use error::{BuildError, CoreError, Result};
pub use frame::{
    CELL_COUNT, FRAME_MARKER, PackRefs, PackState, SensorFrame, cell_voltages, parse_line,
};
pub use reader::{FRAME_QUEUE_DEPTH, LineReader, ReaderEvent};
pub use relay::{RelayBank, RelayId};
pub use runner::{RunCfg, run};
pub use session::{LOG_HEADER, SessionLogRow, SessionLogger};
pub use trend::{Trend, TrendDetector};
