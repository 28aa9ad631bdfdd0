//! Cross-scenario statistics.
//!
//! For every (entity, stage, block) the genuine scenario values are reduced
//! to quantiles (linear interpolation), mean and sample standard deviation.
//! Each statistic becomes a row whose scenario column carries its label.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::table::{Entity, ScenarioLabel, SynthesisRow, SynthesisTable};

pub const MIN_LABEL: &str = "min";
pub const MAX_LABEL: &str = "max";
pub const MEDIAN_LABEL: &str = "median";
pub const MEAN_LABEL: &str = "mean";
pub const STD_LABEL: &str = "std";

/// Quantile labels and levels, in output order.
pub fn quantile_levels() -> Vec<(String, f64)> {
    let mut levels = vec![(MIN_LABEL.to_string(), 0.0)];
    for pct in (5..=95).step_by(5) {
        if pct == 50 {
            continue;
        }
        levels.push((format!("p{pct}"), f64::from(pct) / 100.0));
    }
    levels.push((MEDIAN_LABEL.to_string(), 0.5));
    levels.push((MAX_LABEL.to_string(), 1.0));
    levels
}

/// Every statistic label produced by [`compute_statistics`].
pub fn statistic_labels() -> Vec<String> {
    let mut labels: Vec<String> = quantile_levels().into_iter().map(|(l, _)| l).collect();
    labels.push(MEAN_LABEL.to_string());
    labels.push(STD_LABEL.to_string());
    labels
}

/// Linear-interpolated quantile of an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; zero with fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Statistic rows for the scenario rows in `rows`.
///
/// Statistic rows already present in the input are ignored.
pub fn compute_statistics(rows: &[SynthesisRow]) -> Vec<SynthesisRow> {
    let mut groups: BTreeMap<(Arc<Entity>, u32, u32), (usize, Vec<f64>)> = BTreeMap::new();
    for (index, row) in rows.iter().enumerate() {
        if row.is_statistic() {
            continue;
        }
        groups
            .entry((row.entity.clone(), row.stage, row.block))
            .or_insert_with(|| (index, Vec::new()))
            .1
            .push(row.value);
    }

    let levels = quantile_levels();
    let mut out = Vec::with_capacity(groups.len() * (levels.len() + 2));
    for (_, (template, mut values)) in groups {
        let template = &rows[template];
        values.sort_by(|a, b| a.total_cmp(b));
        let mut push = |label: &str, value: f64| {
            out.push(SynthesisRow {
                scenario: ScenarioLabel::Statistic(label.to_string()),
                value,
                lower: f64::NEG_INFINITY,
                upper: f64::INFINITY,
                ..template.clone()
            });
        };
        for (label, q) in &levels {
            push(label, quantile(&values, *q));
        }
        push(MEAN_LABEL, mean(&values));
        push(STD_LABEL, std_dev(&values));
    }
    out
}

/// Replace the statistic rows of `table` with freshly computed ones and sort.
pub fn with_statistics(table: SynthesisTable) -> SynthesisTable {
    let (mut scenarios, _) = table.split_statistics();
    let stats = compute_statistics(&scenarios.rows);
    scenarios.rows.extend(stats);
    scenarios.sort();
    scenarios
}
