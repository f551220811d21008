//! Thermal auto-pilot: rule evaluation and heater-phase bookkeeping.

/// Fallback target battery temperature (°C) when the supplied setpoint is
/// unusable.
pub const DEFAULT_SETPOINT_C: f64 = 20.0;

/// A setpoint read from user input each tick; non-finite values fall back
/// to [`DEFAULT_SETPOINT_C`] instead of failing the tick.
pub fn effective_setpoint(raw: f64) -> f64 {
    if raw.is_finite() {
        raw
    } else {
        DEFAULT_SETPOINT_C
    }
}

/// Relay intentions for one frame. `None` leaves a relay untouched, so a
/// manual override in the dead band between the on and off conditions
/// survives until a rule fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PilotPlan {
    pub heater: Option<bool>,
    /// Drives solenoid and pump together; they are plumbed in series.
    pub coolant: Option<bool>,
}

/// Evaluate the thermal rules for one sample.
///
/// Heater: on while the battery is below setpoint, with a lockout once the
/// heater plate climbs past `setpoint + cutoff_margin`. The on-condition is
/// checked first; at exactly the cutoff both conditions hold and the heater
/// stays on.
/// Coolant: circulates while the battery is cold but the plate runs at
/// least `pump_delta` above it; stops once the battery reaches setpoint.
/// The load relay is never touched by the pilot.
pub fn plan(
    t_batt: f64,
    t_heat: f64,
    setpoint_c: f64,
    cutoff_margin_c: f64,
    pump_delta_c: f64,
) -> PilotPlan {
    let cutoff = setpoint_c + cutoff_margin_c;

    let heater_on = t_batt < setpoint_c && t_heat <= cutoff;
    let heater_off = t_batt >= setpoint_c || t_heat >= cutoff;

    let coolant_on = t_batt < setpoint_c && t_heat >= t_batt + pump_delta_c;
    let coolant_off = t_batt >= setpoint_c;

    PilotPlan {
        heater: if heater_on {
            Some(true)
        } else if heater_off {
            Some(false)
        } else {
            None
        },
        coolant: if coolant_on {
            Some(true)
        } else if coolant_off {
            Some(false)
        } else {
            None
        },
    }
}

/// Auto-pilot state: the enable latch plus heater-phase timing for the
/// session log.
#[derive(Debug, Clone)]
pub struct AutoPilot {
    enabled: bool,
    cutoff_margin_c: f64,
    pump_delta_c: f64,
    heat_start_s: Option<f64>,
}

impl AutoPilot {
    pub fn new(cutoff_margin_c: f64, pump_delta_c: f64) -> Self {
        Self {
            enabled: false,
            cutoff_margin_c,
            pump_delta_c,
            heat_start_s: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Arm the pilot for a fresh session; heater timing starts over.
    pub fn engage(&mut self) {
        self.enabled = true;
        self.heat_start_s = None;
    }

    pub fn disengage(&mut self) {
        self.enabled = false;
    }

    pub fn plan(&self, t_batt: f64, t_heat: f64, setpoint_c: f64) -> PilotPlan {
        plan(
            t_batt,
            t_heat,
            setpoint_c,
            self.cutoff_margin_c,
            self.pump_delta_c,
        )
    }

    /// Track heater phases for the session row.
    ///
    /// Returns `(heat_start, heat_duration)`: the start stamp of the current
    /// or most recent heating phase, and, while the heater is off after a
    /// phase, the elapsed time since that start. `heat_start` is deliberately
    /// never cleared within a session; if the heater cycles a second time the
    /// original start stamp is reused and logged durations keep growing from
    /// it. Matches the deployed controller; see the session tests for the
    /// observable effect.
    pub fn heat_bookkeeping(&mut self, heater_on: bool, now_s: f64) -> (Option<f64>, Option<f64>) {
        if heater_on && self.heat_start_s.is_none() {
            self.heat_start_s = Some(now_s);
        }
        let duration = match self.heat_start_s {
            Some(start) if !heater_on => Some(now_s - start),
            _ => None,
        };
        (self.heat_start_s, duration)
    }
}
