#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Hardware backends for the pack monitor: the real serial link and a
//! software simulator for bench work.

pub mod error;
pub mod serial;
pub mod sim;

pub use error::HwError;
pub use serial::{SerialRelays, SerialTransport, open_pair};
pub use sim::{SimulatedPack, SimulatedRelays};
