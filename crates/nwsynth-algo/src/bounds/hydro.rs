//! Hydro plant bounds: stored volume, outflow and turbined flow.

use nwsynth_core::{flow_to_volume, with_statistics, SynthResult, SynthesisTable};

use super::grid::{BoundGrid, StageBounds};
use super::volume_table::{HydroLimitTable, PlantLimits};
use super::{BoundsContext, FlowForm, Measure};
use crate::entities;

fn plant_stage_bounds<F>(ctx: &BoundsContext<'_>, pick: F) -> SynthResult<StageBounds>
where
    F: Fn(&PlantLimits) -> (f64, f64),
{
    let plants = entities::hydro_plants(ctx.deck)?;
    let starts = &ctx.ordered.start_dates;
    let limits = HydroLimitTable::load(ctx.deck, starts)?;
    let mut fine = StageBounds::new();
    for (plant, entity) in &plants {
        for start in starts {
            if let Some(limits) = limits.get(plant.code, *start) {
                fine.insert((entity.clone(), *start), pick(limits));
            }
        }
    }
    Ok(fine)
}

fn plant_grid<F>(ctx: &BoundsContext<'_>, pick: F) -> SynthResult<BoundGrid>
where
    F: Fn(&PlantLimits) -> (f64, f64),
{
    let fine = plant_stage_bounds(ctx, pick)?;
    let mut grid = ctx.grid();
    grid.fill_stage_bounds(&fine);
    Ok(grid)
}

pub fn stored_volume(ctx: &BoundsContext<'_>, measure: Measure) -> SynthResult<BoundGrid> {
    let mut grid = plant_grid(ctx, |l| (l.min_volume, l.max_volume))?;
    if measure == Measure::Percent {
        grid.rebase_to_percent();
    }
    Ok(grid)
}

fn flow_grid<F>(ctx: &BoundsContext<'_>, form: FlowForm, pick: F) -> SynthResult<BoundGrid>
where
    F: Fn(&PlantLimits) -> (f64, f64),
{
    let mut grid = plant_grid(ctx, pick)?;
    if form == FlowForm::Volume {
        grid.try_map(|_, start, block, (lower, upper)| {
            let hours = ctx.calendar.block_hours(start, block)?;
            Ok((flow_to_volume(lower, hours), flow_to_volume(upper, hours)))
        })?;
    }
    Ok(grid)
}

pub fn outflow(ctx: &BoundsContext<'_>, form: FlowForm) -> SynthResult<BoundGrid> {
    flow_grid(ctx, form, |l| (l.min_outflow, l.max_outflow))
}

pub fn turbined_flow(ctx: &BoundsContext<'_>, form: FlowForm) -> SynthResult<BoundGrid> {
    flow_grid(ctx, form, |l| (l.min_turbined, l.max_turbined))
}

/// Printed stored volumes are useful volumes; shift them by the dead volume
/// (the lower bound) and recompute the statistics of the shifted series.
pub fn offset_by_lower(table: SynthesisTable, grid: &BoundGrid) -> SynthesisTable {
    let (mut scenarios, _) = table.split_statistics();
    for row in &mut scenarios.rows {
        let (lower, _) = grid.get(&row.entity, row.start, row.block);
        if lower.is_finite() {
            row.value += lower;
        }
    }
    with_statistics(scenarios)
}
