#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // The frame parser sits on a raw serial line and must survive any
    // byte salad: no panics, and whatever it accepts must be finite.
    if let Some(frame) = packpilot_core::parse_line(data) {
        assert!(frame.t_batt.is_finite());
        assert!(frame.t_heat.is_finite());
        assert!(frame.cumulative.iter().all(|v| v.is_finite()));
        let cells = packpilot_core::cell_voltages(&frame.cumulative);
        assert!(cells.iter().all(|v| v.is_finite()));
    }
});
