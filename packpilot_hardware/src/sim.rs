//! Bench simulator: a fake pack that behaves plausibly enough to exercise
//! the whole pipeline without hardware attached.
//!
//! The transport half emits one telemetry line per read and the relay half
//! feeds commanded states back into the thermal model, so heater and pump
//! decisions visibly change the simulated temperatures.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use packpilot_traits::{Relays, Transport};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const AMBIENT_C: f64 = 12.0;
const PACK_MAX_V: f64 = 25.2;

#[derive(Debug)]
struct SimState {
    t_batt: f64,
    t_heat: f64,
    pack_v: f64,
    relays: [bool; 4],
    step: u64,
}

impl SimState {
    fn new() -> Self {
        Self {
            t_batt: AMBIENT_C,
            t_heat: AMBIENT_C,
            pack_v: 21.0,
            relays: [false; 4],
            step: 0,
        }
    }

    fn advance(&mut self) {
        self.step += 1;
        let heater = self.relays[0];
        let pump = self.relays[2];
        let load = self.relays[3];

        // Plate: driven hard by the heater, cooled by circulation,
        // otherwise relaxing toward ambient.
        if heater {
            self.t_heat += 0.35;
        }
        if pump {
            self.t_heat -= 0.20;
        }
        self.t_heat += (AMBIENT_C - self.t_heat) * 0.01;

        // Battery follows the plate slowly when coolant circulates.
        let coupling = if pump { 0.08 } else { 0.01 };
        self.t_batt += (self.t_heat - self.t_batt) * coupling;

        // Pack voltage: slow charge unless a load is drawing.
        if load {
            self.pack_v -= 0.004;
        } else if self.pack_v < PACK_MAX_V {
            self.pack_v += 0.002;
        }
        self.pack_v = self.pack_v.clamp(18.0, PACK_MAX_V);
    }

    fn frame_line(&self) -> String {
        // Small deterministic wobble so the taps are not perfectly even.
        let wobble = ((self.step % 7) as f64 - 3.0) * 0.001;
        let per_tap = self.pack_v / 6.0;
        let taps: Vec<String> = (1..=6)
            .map(|i| format!("{:.3}", per_tap * i as f64 + wobble))
            .collect();
        format!(
            "DATA,{:.2},{:.2},{}",
            self.t_batt,
            self.t_heat,
            taps.join(",")
        )
    }
}

/// Transport half of the simulator; emits one frame per read.
pub struct SimulatedPack {
    state: Arc<Mutex<SimState>>,
    period: Duration,
}

impl SimulatedPack {
    pub fn new() -> Self {
        Self::with_period(Duration::from_millis(40))
    }

    /// `period` paces frame emission; tests use a short one.
    pub fn with_period(period: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new())),
            period,
        }
    }

    /// Relay half sharing this pack's state.
    pub fn relays_handle(&self) -> SimulatedRelays {
        SimulatedRelays {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for SimulatedPack {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SimulatedPack {
    fn clear_input(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, BoxError> {
        std::thread::sleep(self.period.min(timeout));
        let Ok(mut state) = self.state.lock() else {
            return Err("simulator state poisoned".into());
        };
        state.advance();
        Ok(Some(state.frame_line()))
    }
}

/// Relay half of the simulator.
pub struct SimulatedRelays {
    state: Arc<Mutex<SimState>>,
}

impl Relays for SimulatedRelays {
    fn drive(&mut self, relay_id: u8, on: bool) -> Result<(), BoxError> {
        let Ok(mut state) = self.state.lock() else {
            return Err("simulator state poisoned".into());
        };
        match relay_id {
            1..=4 => state.relays[(relay_id - 1) as usize] = on,
            other => return Err(format!("unknown relay id {other}").into()),
        }
        Ok(())
    }
}
