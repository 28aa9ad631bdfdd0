mod common;

use std::collections::HashMap;

use common::*;
use nwsynth_algo::{is_bounded, METADATA_NAME, STATISTICS_ROOT};
use nwsynth_core::time::hours_in_month;
use nwsynth_core::SynthesisKey;
use nwsynth_io::frames::{column_f64, column_i32, column_str};
use nwsynth_io::DataFrame;

/// (stage, block) -> value, summed over entities.
fn by_stage_block(df: &DataFrame) -> HashMap<(i32, i32), f64> {
    let stages = column_i32(df, "stage").unwrap();
    let blocks = column_i32(df, "block").unwrap();
    let values = column_f64(df, "value").unwrap();
    let mut out = HashMap::new();
    for i in 0..df.height() {
        *out.entry((stages[i], blocks[i])).or_insert(0.0) += values[i];
    }
    out
}

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-6, "{a} != {b}");
}

/// (value, lower, upper) of the row of entity `code` at (stage, block).
fn cell(df: &DataFrame, code_column: &str, code: i32, stage: i32, block: i32) -> (f64, f64, f64) {
    let codes = column_i32(df, code_column).unwrap();
    let stages = column_i32(df, "stage").unwrap();
    let blocks = column_i32(df, "block").unwrap();
    let i = (0..df.height())
        .find(|&i| codes[i] == code && stages[i] == stage && blocks[i] == block)
        .unwrap_or_else(|| panic!("no row for {code} at stage {stage}, block {block}"));
    (
        column_f64(df, "value").unwrap()[i],
        column_f64(df, "lower_bound").unwrap()[i],
        column_f64(df, "upper_bound").unwrap()[i],
    )
}

#[test]
fn total_spillage_is_the_sum_of_its_parts() {
    let run = run(deck(), &["EVER_SIN"]);
    assert!(run.report.failed.is_empty(), "{:?}", run.report.failed);

    let total = by_stage_block(&run.frame("EVER_SIN"));
    let reservoir = by_stage_block(&run.frame("EVERR_SIN"));
    let run_of_river = by_stage_block(&run.frame("EVERF_SIN"));
    assert_eq!(total.len(), (STAGES * 4) as usize);
    for (cell, value) in &total {
        assert_close(*value, reservoir[cell] + run_of_river[cell]);
    }
    // Block 0 is the sum over the real blocks for energy.
    assert_close(total[&(1, 0)], total[&(1, 1)] + total[&(1, 2)] + total[&(1, 3)]);
}

#[test]
fn group_flows_roll_up_plant_flows() {
    let run = run(deck(), &["QTUR_REE"]);
    assert_eq!(run.report.succeeded, vec!["VTUR_UHE", "QTUR_UHE", "QTUR_REE"]);

    let plants = by_stage_block(&run.frame("QTUR_UHE"));
    let group = run.frame("QTUR_REE");
    assert_eq!(column_str(&group, "group").unwrap()[0], "PARANAIBA");
    for (cell, value) in by_stage_block(&group) {
        assert_close(value, plants[&cell]);
    }
}

#[test]
fn group_totals_match_an_independent_plant_sum() {
    let run = run(deck(), &["VTUR_REE", "QTUR_REE"]);
    assert!(run.report.failed.is_empty(), "{:?}", run.report.failed);

    // Plant flows summed per (group, stage, block) through their group column.
    let plants = run.frame("QTUR_UHE");
    let groups = column_i32(&plants, "group_code").unwrap();
    let stages = column_i32(&plants, "stage").unwrap();
    let blocks = column_i32(&plants, "block").unwrap();
    let values = column_f64(&plants, "value").unwrap();
    let mut summed: HashMap<(i32, i32, i32), f64> = HashMap::new();
    for i in 0..plants.height() {
        *summed.entry((groups[i], stages[i], blocks[i])).or_insert(0.0) += values[i];
    }
    let group = run.frame("QTUR_REE");
    assert_eq!(group.height(), summed.len());
    let groups = column_i32(&group, "group_code").unwrap();
    let stages = column_i32(&group, "stage").unwrap();
    let blocks = column_i32(&group, "block").unwrap();
    let values = column_f64(&group, "value").unwrap();
    for i in 0..group.height() {
        assert_close(values[i], summed[&(groups[i], stages[i], blocks[i])]);
    }

    // Both group tables against the volumes the toy deck prints per plant.
    let volumes = by_stage_block(&run.frame("VTUR_REE"));
    let flows = by_stage_block(&group);
    for stage in 1..=STAGES {
        let month_hours = hours_in_month(month(stage));
        let mut stage_total = 0.0;
        for block in 1..=BLOCK_FRACTIONS.len() as u32 {
            let printed: f64 = PLANTS
                .iter()
                .map(|&c| 50.0 * c as f64 + stage as f64 + 10.0 * block as f64)
                .sum();
            let hours = BLOCK_FRACTIONS[block as usize - 1] * month_hours;
            let cell = (stage as i32, block as i32);
            assert_close(volumes[&cell], printed);
            assert_close(flows[&cell], printed * 730.0 / (2.63 * hours));
            stage_total += printed;
        }
        assert_close(volumes[&(stage as i32, 0)], stage_total);
    }
}

#[test]
fn exchanges_and_thermal_generation_are_bounded_end_to_end() {
    let run = run(with_thermal_and_exchange(deck()), &["INT_SBP", "GTER_UTE"]);
    assert_eq!(run.report.succeeded, vec!["INT_SBP", "GTER_UTE"]);

    // January: 744 h, block 1 lasts 148.8 h.
    let exchange = run.frame("INT_SBP");
    assert_eq!(column_str(&exchange, "source_submarket").unwrap()[0], "SUDESTE");
    assert_eq!(column_str(&exchange, "target_submarket").unwrap()[0], "SUL");
    let (value, lower, upper) = cell(&exchange, "source_submarket_code", 1, 1, 1);
    assert_close(value, 140.0);
    assert_close(upper, 1000.0 * 0.8 * 148.8);
    assert_close(lower, -600.0 * 148.8);
    let (value, lower, upper) = cell(&exchange, "source_submarket_code", 1, 1, 0);
    assert_close(value, 870.0);
    assert_close(upper, 1000.0 * (0.8 * 148.8 + 223.2 + 372.0));
    assert_close(lower, -600.0 * 744.0);
    // February: 696 h.
    let (_, _, upper) = cell(&exchange, "source_submarket_code", 1, 2, 1);
    assert_close(upper, 1000.0 * 0.8 * 139.2);

    let thermal = run.frame("GTER_UTE");
    let (value, lower, upper) = cell(&thermal, "thermal_code", 1, 1, 1);
    assert_close(value, 20.0);
    assert_eq!((lower, upper), (10.2, 130.5));
    let (value, lower, upper) = cell(&thermal, "thermal_code", 1, 1, 0);
    assert_close(value, 100.0);
    assert_eq!((lower, upper), (51.0, 652.3));
    let (_, lower, upper) = cell(&thermal, "thermal_code", 2, 1, 0);
    assert_eq!((lower, upper), (0.0, 236.4));
    let codes = column_i32(&thermal, "thermal_code").unwrap();
    let submarkets = column_str(&thermal, "submarket").unwrap();
    for (code, submarket) in codes.iter().zip(&submarkets) {
        assert_eq!(submarket, if *code == 1 { "SUDESTE" } else { "SUL" });
    }
}

#[test]
fn block_zero_values_lie_within_their_bounds() {
    let requested = [
        "EARMF_SBM",
        "VARMF_UHE",
        "VARPF_UHE",
        "VTUR_UHE",
        "QTUR_UHE",
        "QTUR_REE",
        "INT_SBP",
        "GTER_UTE",
    ];
    let run = run(with_thermal_and_exchange(with_stored_energy(deck())), &requested);
    assert!(run.report.failed.is_empty(), "{:?}", run.report.failed);
    assert_eq!(run.report.succeeded.len(), requested.len());

    for name in &run.report.succeeded {
        assert!(is_bounded(&SynthesisKey::parse(name).unwrap()), "{name}");
        let df = run.frame(name);
        let blocks = column_i32(&df, "block").unwrap();
        let values = column_f64(&df, "value").unwrap();
        let lowers = column_f64(&df, "lower_bound").unwrap();
        let uppers = column_f64(&df, "upper_bound").unwrap();
        let mut checked = 0;
        for i in (0..df.height()).filter(|&i| blocks[i] == 0) {
            assert!(
                lowers[i] <= values[i] && values[i] <= uppers[i],
                "{name} row {i}: {} outside [{}, {}]",
                values[i],
                lowers[i],
                uppers[i]
            );
            assert!(lowers[i].is_finite() || uppers[i].is_finite(), "{name} row {i}");
            checked += 1;
        }
        assert!(checked > 0, "{name} has no block 0 rows");
    }
}

#[test]
fn flows_convert_from_printed_volumes() {
    let run = run(deck(), &["QTUR_UHE"]);
    let volumes = run.frame("VTUR_UHE");
    let flows = run.frame("QTUR_UHE");
    let hours = column_f64(&flows, "block_hours").unwrap();
    let blocks = column_i32(&flows, "block").unwrap();
    let volume = column_f64(&volumes, "value").unwrap();
    let flow = column_f64(&flows, "value").unwrap();
    for i in 0..flows.height() {
        if blocks[i] == 0 {
            continue;
        }
        assert_close(flow[i], volume[i] * 730.0 / (2.63 * hours[i]));
    }
}

#[test]
fn exported_tables_carry_their_resolution_columns() {
    let run = run(deck(), &["EVER_SIN", "CMO_SBM", "QTUR_REE", "VARPF_UHE"]);
    assert!(run.report.failed.is_empty(), "{:?}", run.report.failed);
    for name in &run.report.succeeded {
        let resolution = SynthesisKey::parse(name).unwrap().resolution;
        let df = run.frame(name);
        let columns = df.get_column_names();
        let expected: Vec<&str> = resolution
            .entity_columns()
            .iter()
            .flat_map(|(code, label)| [*code, *label])
            .collect();
        assert_eq!(&columns[..expected.len()], expected.as_slice(), "{name}");
        assert_eq!(columns[expected.len()], "stage", "{name}");
    }
}

#[test]
fn percent_volumes_are_bounded_by_one_hundred() {
    let run = run(deck(), &["VARPF_UHE"]);
    let df = run.frame("VARPF_UHE");
    let uppers = column_f64(&df, "upper_bound").unwrap();
    let lowers = column_f64(&df, "lower_bound").unwrap();
    let values = column_f64(&df, "value").unwrap();
    assert!(uppers.iter().all(|u| *u == 100.0));
    assert!(lowers.iter().all(|l| (0.0..=100.0).contains(l)));
    assert!(values.iter().all(|v| (0.0..=100.0).contains(v)));

    // Absolute volumes are printed above the dead volume.
    let absolute = run.frame("VARMF_UHE");
    let values = column_f64(&absolute, "value").unwrap();
    let lowers = column_f64(&absolute, "lower_bound").unwrap();
    assert_close(lowers[0], 4669.0);
    assert_close(values[0], 4669.0 + 150.0);
}

#[test]
fn initial_stored_energy_shifts_the_final_series() {
    let run = run(with_stored_energy(deck()), &["EARMI_SBM"]);
    assert_eq!(run.report.succeeded, vec!["EARMF_SBM", "EARMI_SBM"]);

    let finals = by_stage_block(&run.frame("EARMF_SBM"));
    let initials = by_stage_block(&run.frame("EARMI_SBM"));
    assert_close(initials[&(1, 0)], 38_500.0);
    for stage in 2..=STAGES as i32 {
        assert_close(initials[&(stage, 0)], finals[&(stage - 1, 0)]);
    }
    let df = run.frame("EARMF_SBM");
    assert_eq!(column_f64(&df, "upper_bound").unwrap()[0], 100_000.0);
    assert_eq!(column_f64(&df, "lower_bound").unwrap()[0], 20_000.0);
}

#[test]
fn failed_syntheses_stay_out_of_the_metadata() {
    // No stored-energy capacity in the deck: EARMF_SBM cannot be bounded.
    let run = run(deck(), &["CMO_SBM", "EARMF_SBM", "NOT_A_KEY"]);
    assert_eq!(run.report.succeeded, vec!["CMO_SBM"]);
    assert_eq!(run.report.failed.len(), 1);
    assert_eq!(run.report.failed[0].key, "EARMF_SBM");
    assert!(run.exporter.get("EARMF_SBM").is_none());

    let metadata = run.frame(METADATA_NAME);
    assert_eq!(column_str(&metadata, "synthesis").unwrap(), vec!["CMO_SBM"]);

    let stats = run.frame(&format!("{STATISTICS_ROOT}_SBM"));
    assert!(column_str(&stats, "variable").unwrap().iter().all(|v| v == "CMO"));
}

#[test]
fn dependents_of_a_failed_synthesis_fail_too() {
    let run = run(registry(), &["VARPF_UHE"]);
    assert!(run.report.is_total_failure());
    let failed: Vec<&str> = run.report.failed.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(failed, vec!["VARMF_UHE", "VARPF_UHE"]);
    assert!(run.report.failed[1].error.contains("not cached"));
    assert_eq!(run.frame(METADATA_NAME).height(), 0);
}
