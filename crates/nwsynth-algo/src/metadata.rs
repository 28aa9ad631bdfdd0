//! Metadata catalog and per-resolution statistics exports.

use anyhow::Context;
use polars::prelude::*;
use tracing::info;

use nwsynth_core::{is_computed, SynthResult, SynthesisKey, SynthesisRow};
use nwsynth_io::{labeled_frame, Exporter};

use crate::bounds::is_bounded;
use crate::context::StatisticsByResolution;

/// File name of the metadata catalog.
pub const METADATA_NAME: &str = "METADATA_OPERATION";

/// Prefix of the per-resolution statistics files.
pub const STATISTICS_ROOT: &str = "OPERATION_STATISTICS";

/// One catalog row per key, in the given order.
pub fn metadata_frame(keys: &[SynthesisKey]) -> SynthResult<DataFrame> {
    let column = |f: fn(&SynthesisKey) -> String| keys.iter().map(f).collect::<Vec<_>>();
    let frame = DataFrame::new(vec![
        Series::new("synthesis", column(|k| k.to_string())),
        Series::new("variable_short", column(|k| k.variable.short_name().to_string())),
        Series::new("variable_long", column(|k| k.variable.long_name().to_string())),
        Series::new("resolution_short", column(|k| k.resolution.short_name().to_string())),
        Series::new("resolution_long", column(|k| k.resolution.long_name().to_string())),
        Series::new("unit", column(|k| k.variable.unit().as_str().to_string())),
        Series::new("computed", keys.iter().map(is_computed).collect::<Vec<_>>()),
        Series::new("bounded", keys.iter().map(is_bounded).collect::<Vec<_>>()),
    ])
    .context("assembling metadata frame")?;
    Ok(frame)
}

pub fn export_metadata(exporter: &dyn Exporter, succeeded: &[SynthesisKey]) -> SynthResult<()> {
    let mut frame = metadata_frame(succeeded)?;
    exporter.write(&mut frame, METADATA_NAME)?;
    info!(syntheses = succeeded.len(), "exported metadata catalog");
    Ok(())
}

/// Write one statistics file per resolution with accumulated statistic rows.
///
/// Rows are tagged with their variable and sorted by entity, stage, scenario
/// and block; rows of different variables keep their synthesis order.
pub fn export_statistics(
    exporter: &dyn Exporter,
    statistics: &StatisticsByResolution,
) -> SynthResult<()> {
    for (resolution, tables) in statistics {
        let mut rows: Vec<(&str, &SynthesisRow)> = tables
            .iter()
            .flat_map(|(key, table)| {
                let label = key.variable.short_name();
                table.rows.iter().map(move |row| (label, row))
            })
            .collect();
        if rows.is_empty() {
            continue;
        }
        rows.sort_by(|(_, a), (_, b)| {
            a.entity
                .cmp(&b.entity)
                .then(a.stage.cmp(&b.stage))
                .then(a.scenario.cmp(&b.scenario))
                .then(a.block.cmp(&b.block))
        });
        let mut frame = labeled_frame(*resolution, &rows)?;
        let name = format!("{STATISTICS_ROOT}_{}", resolution.short_name());
        exporter.write(&mut frame, &name)?;
        info!(file = %name, rows = rows.len(), "exported statistics");
    }
    Ok(())
}
