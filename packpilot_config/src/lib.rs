#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the pack monitor.
//!
//! `Config` and its sub-structs are deserialized from TOML and validated.
//! Defaults mirror the deployed dashboard: 115200 baud, 40 ms control tick,
//! 25.2 V full pack, 4.20 V full cell, 30-sample trend window.

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SerialCfg {
    /// Serial device path of the pack telemetry board.
    pub port: String,
    pub baud: u32,
    /// Per-read timeout (ms); keeps the reader loop cancellable.
    pub read_timeout_ms: u64,
}

impl Default for SerialCfg {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud: 115_200,
            read_timeout_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    /// Control tick period in milliseconds (~25 Hz keeps logging responsive
    /// without saturating the frame channel).
    pub tick_ms: u64,
    /// Default target battery temperature (°C); also the fallback when the
    /// user-supplied setpoint is unreadable.
    pub setpoint_c: f64,
    /// Heater lockout: heater is forced off once t_heat reaches
    /// setpoint + this margin (°C).
    pub heater_cutoff_margin_c: f64,
    /// Coolant circulation starts once t_heat exceeds t_batt by this delta (°C).
    pub pump_delta_c: f64,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            tick_ms: 40,
            setpoint_c: 20.0,
            heater_cutoff_margin_c: 20.0,
            pump_delta_c: 10.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct BatteryCfg {
    /// Pack voltage at 100% SOC.
    pub pack_max_v: f64,
    /// Per-cell voltage at 100% SOH reference.
    pub cell_full_v: f64,
}

impl Default for BatteryCfg {
    fn default() -> Self {
        Self {
            pack_max_v: 25.2,
            cell_full_v: 4.20,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct TrendCfg {
    /// Sliding window length in samples; classification is valid once full.
    pub window: usize,
    /// Pack-voltage delta (V) below which the slope counts as flat,
    /// chosen to reject sensor jitter.
    pub threshold_v: f64,
}

impl Default for TrendCfg {
    fn default() -> Self {
        Self {
            window: 30,
            threshold_v: 0.01,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionCfg {
    /// Directory that receives one CSV file per auto-pilot session.
    pub log_dir: PathBuf,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("sessions"),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub serial: SerialCfg,
    pub control: ControlCfg,
    pub battery: BatteryCfg,
    pub trend: TrendCfg,
    pub session: SessionCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Serial
        if self.serial.port.is_empty() {
            eyre::bail!("serial.port must not be empty");
        }
        if self.serial.baud == 0 {
            eyre::bail!("serial.baud must be > 0");
        }
        if self.serial.read_timeout_ms == 0 {
            eyre::bail!("serial.read_timeout_ms must be >= 1");
        }

        // Control
        if self.control.tick_ms == 0 {
            eyre::bail!("control.tick_ms must be >= 1");
        }
        if self.control.tick_ms > 10_000 {
            eyre::bail!("control.tick_ms is unreasonably large (>10s)");
        }
        if !self.control.setpoint_c.is_finite() {
            eyre::bail!("control.setpoint_c must be finite");
        }
        if !self.control.heater_cutoff_margin_c.is_finite()
            || self.control.heater_cutoff_margin_c < 0.0
        {
            eyre::bail!("control.heater_cutoff_margin_c must be finite and >= 0");
        }
        if !self.control.pump_delta_c.is_finite() || self.control.pump_delta_c < 0.0 {
            eyre::bail!("control.pump_delta_c must be finite and >= 0");
        }

        // Battery references
        if !(self.battery.pack_max_v.is_finite() && self.battery.pack_max_v > 0.0) {
            eyre::bail!("battery.pack_max_v must be finite and > 0");
        }
        if !(self.battery.cell_full_v.is_finite() && self.battery.cell_full_v > 0.0) {
            eyre::bail!("battery.cell_full_v must be finite and > 0");
        }

        // Trend
        if self.trend.window < 2 {
            eyre::bail!("trend.window must be >= 2");
        }
        if !(self.trend.threshold_v.is_finite() && self.trend.threshold_v >= 0.0) {
            eyre::bail!("trend.threshold_v must be finite and >= 0");
        }

        // Session
        if self.session.log_dir.as_os_str().is_empty() {
            eyre::bail!("session.log_dir must not be empty");
        }

        Ok(())
    }
}
