//! Mapping from the file-format config structs to core parameter types.

use packpilot_config::{BatteryCfg, Config};

use crate::control::ControlParams;
use crate::frame::PackRefs;
use crate::runner::RunCfg;

impl From<BatteryCfg> for PackRefs {
    fn from(cfg: BatteryCfg) -> Self {
        Self {
            pack_max_v: cfg.pack_max_v,
            cell_full_v: cfg.cell_full_v,
        }
    }
}

impl From<&Config> for ControlParams {
    fn from(cfg: &Config) -> Self {
        Self {
            setpoint_c: cfg.control.setpoint_c,
            heater_cutoff_margin_c: cfg.control.heater_cutoff_margin_c,
            pump_delta_c: cfg.control.pump_delta_c,
            refs: cfg.battery.into(),
            trend_window: cfg.trend.window,
            trend_threshold_v: cfg.trend.threshold_v,
            log_dir: cfg.session.log_dir.clone(),
        }
    }
}

impl From<&Config> for RunCfg {
    fn from(cfg: &Config) -> Self {
        Self {
            tick_ms: cfg.control.tick_ms,
            read_timeout_ms: cfg.serial.read_timeout_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_through() {
        let cfg = Config::default();
        let params = ControlParams::from(&cfg);
        assert!((params.refs.pack_max_v - 25.2).abs() < 1e-9);
        assert_eq!(params.trend_window, 30);
        let run = RunCfg::from(&cfg);
        assert_eq!(run.tick_ms, 40);
    }
}
