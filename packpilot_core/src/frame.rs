//! Telemetry frame parsing and derived pack state.
//!
//! The telemetry board emits one CSV line per sample:
//!
//! ```text
//! DATA,<t_batt>,<t_heat>,<cum1>,<cum2>,<cum3>,<cum4>,<cum5>,<cum6>
//! ```
//!
//! The six trailing values are cumulative tap voltages measured from pack
//! ground; per-cell voltages are recovered by sorting and differencing.

/// Leading marker of a valid telemetry line.
pub const FRAME_MARKER: &str = "DATA";

/// Series cells in the pack.
pub const CELL_COUNT: usize = 6;

/// One parsed telemetry sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorFrame {
    /// Battery surface temperature (°C).
    pub t_batt: f64,
    /// Heater plate temperature (°C).
    pub t_heat: f64,
    /// Cumulative tap voltages, in wire order (not sorted).
    pub cumulative: [f64; CELL_COUNT],
}

/// Parse one raw line into a frame.
///
/// Returns `None` for anything that is not exactly a marker plus eight
/// finite numeric fields. Malformed lines are routine on a shared UART
/// (boot banners, partial lines after hot-plug) and are simply skipped
/// upstream.
pub fn parse_line(line: &str) -> Option<SensorFrame> {
    let mut fields = line.split(',');
    if fields.next()?.trim() != FRAME_MARKER {
        return None;
    }

    let mut values = [0f64; CELL_COUNT + 2];
    let mut count = 0usize;
    for field in fields {
        if count == values.len() {
            return None; // too many fields
        }
        let v: f64 = field.trim().parse().ok()?;
        if !v.is_finite() {
            return None;
        }
        values[count] = v;
        count += 1;
    }
    if count != values.len() {
        return None; // too few fields
    }

    let mut cumulative = [0f64; CELL_COUNT];
    cumulative.copy_from_slice(&values[2..]);
    Some(SensorFrame {
        t_batt: values[0],
        t_heat: values[1],
        cumulative,
    })
}

/// Recover per-cell voltages from cumulative tap readings.
///
/// Taps may arrive in any wire order, so they are sorted ascending first;
/// cell 0 is the lowest tap and each further cell is the difference to the
/// previous tap.
pub fn cell_voltages(cumulative: &[f64; CELL_COUNT]) -> [f64; CELL_COUNT] {
    let mut sorted = *cumulative;
    sorted.sort_by(f64::total_cmp);

    let mut cells = [0f64; CELL_COUNT];
    cells[0] = sorted[0];
    for i in 1..CELL_COUNT {
        cells[i] = sorted[i] - sorted[i - 1];
    }
    cells
}

/// Reference voltages used to normalize SOC and SOH.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackRefs {
    /// Pack voltage at 100% state of charge.
    pub pack_max_v: f64,
    /// Per-cell voltage treated as 100% state of health.
    pub cell_full_v: f64,
}

impl Default for PackRefs {
    fn default() -> Self {
        Self {
            pack_max_v: 25.2,
            cell_full_v: 4.20,
        }
    }
}

/// Derived electrical state for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PackState {
    /// Highest cumulative tap, i.e. full-pack voltage.
    pub pack_voltage: f64,
    /// State of charge, 0..=100.
    pub soc_pct: f64,
    /// State of health estimate from mean cell voltage, 0..=100.
    pub soh_pct: f64,
}

impl PackState {
    pub fn derive(
        cumulative: &[f64; CELL_COUNT],
        cells: &[f64; CELL_COUNT],
        refs: PackRefs,
    ) -> Self {
        let pack_voltage = cumulative
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let soc_pct = (pack_voltage / refs.pack_max_v).clamp(0.0, 1.0) * 100.0;
        let mean_cell = cells.iter().sum::<f64>() / CELL_COUNT as f64;
        let soh_pct = (mean_cell / refs.cell_full_v).clamp(0.0, 1.0) * 100.0;
        Self {
            pack_voltage,
            soc_pct,
            soh_pct,
        }
    }
}
