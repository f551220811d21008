use packpilot_core::{CELL_COUNT, PackRefs, PackState, cell_voltages, parse_line};
use proptest::prelude::*;
use rstest::rstest;

#[rstest]
#[case("")]
#[case("INFO,1,2,3,4,5,6,7,8")]
#[case("DATA,1,2,3,4,5,6,7")] // one field short
#[case("DATA,1,2,3,4,5,6,7,8,9")] // one field over
#[case("DATA,1,2,3,4,5,six,7,8")]
#[case("DATA,1,2,3,4,5,,7,8")]
#[case("DATA,nan,2,3,4,5,6,7,8")]
#[case("DATA,inf,2,3,4,5,6,7,8")]
#[case("1,2,3,4,5,6,7,8")] // marker missing entirely
fn malformed_lines_are_rejected(#[case] line: &str) {
    assert_eq!(parse_line(line), None, "accepted: {line:?}");
}

#[test]
fn whitespace_around_fields_is_tolerated() {
    let f = parse_line("DATA, 21.5, 30.0, 4.0, 8.0, 12.0, 16.0, 20.0, 24.0").expect("frame");
    assert!((f.t_batt - 21.5).abs() < 1e-12);
    assert!((f.cumulative[0] - 4.0).abs() < 1e-12);
}

#[test]
fn soc_at_24_volts_is_95_point_2() {
    let cumulative = [4.0, 8.0, 12.0, 16.0, 20.0, 24.0];
    let cells = cell_voltages(&cumulative);
    let state = PackState::derive(&cumulative, &cells, PackRefs::default());
    assert!((state.pack_voltage - 24.0).abs() < 1e-12);
    assert!((state.soc_pct - 95.2).abs() < 0.1, "soc={}", state.soc_pct);
}

#[test]
fn soc_and_soh_are_clamped() {
    // Overfull pack clamps at 100 rather than extrapolating.
    let cumulative = [5.0, 10.0, 15.0, 20.0, 25.0, 30.0];
    let cells = cell_voltages(&cumulative);
    let state = PackState::derive(&cumulative, &cells, PackRefs::default());
    assert!((state.soc_pct - 100.0).abs() < 1e-9);
    assert!((state.soh_pct - 100.0).abs() < 1e-9);
}

fn rotate(taps: [f64; CELL_COUNT], k: usize) -> [f64; CELL_COUNT] {
    let mut out = taps;
    out.rotate_left(k % CELL_COUNT);
    out
}

proptest! {
    #[test]
    fn cell_sum_matches_max_tap(taps in proptest::array::uniform6(0.0f64..30.0)) {
        let cells = cell_voltages(&taps);
        let max = taps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!((cells.iter().sum::<f64>() - max).abs() < 1e-9);
    }

    #[test]
    fn derivation_is_order_independent(
        taps in proptest::array::uniform6(0.0f64..30.0),
        k in 0usize..CELL_COUNT,
    ) {
        let straight = cell_voltages(&taps);
        let shuffled = cell_voltages(&rotate(taps, k));
        for (a, b) in straight.iter().zip(shuffled.iter()) {
            prop_assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn parser_round_trips_numeric_lines(
        t_batt in -40.0f64..80.0,
        t_heat in -40.0f64..120.0,
        taps in proptest::array::uniform6(0.0f64..30.0),
    ) {
        let line = format!(
            "DATA,{t_batt},{t_heat},{},{},{},{},{},{}",
            taps[0], taps[1], taps[2], taps[3], taps[4], taps[5]
        );
        let frame = parse_line(&line).expect("well-formed line");
        prop_assert!((frame.t_batt - t_batt).abs() < 1e-9);
        prop_assert!((frame.cumulative[5] - taps[5]).abs() < 1e-9);
    }
}
