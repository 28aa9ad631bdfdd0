//! Thermal generation bounds, from MW limits to the energy of each block.

use std::collections::HashMap;
use std::sync::Arc;

use nwsynth_core::time::first_of_month;
use nwsynth_core::{Entity, SynthError, SynthResult, STAGE_DURATION_HOURS};
use nwsynth_io::{required, tables};

use super::grid::{BoundGrid, StageBounds};
use super::BoundsContext;
use crate::entities;

pub fn thermal_generation(ctx: &BoundsContext<'_>) -> SynthResult<BoundGrid> {
    let plants: HashMap<i32, Arc<Entity>> = entities::thermal_plants(ctx.deck)?
        .into_iter()
        .map(|(p, e)| (p.code, e))
        .collect();
    let limits = required(tables::THERMAL_LIMITS, ctx.deck.thermal_limits())?;

    let mut fine = StageBounds::new();
    for record in limits.iter() {
        let plant = plants.get(&record.plant_code).ok_or_else(|| {
            SynthError::Validation(format!(
                "generation limits for unknown thermal plant {}",
                record.plant_code
            ))
        })?;
        fine.insert(
            (plant.clone(), first_of_month(record.start)),
            (record.min_generation, record.max_generation),
        );
    }

    let mut grid = ctx.grid();
    grid.fill_stage_bounds(&fine);
    grid.try_map(|_, start, block, (lower, upper)| {
        let share = ctx.calendar.block_hours(start, block)? / STAGE_DURATION_HOURS;
        Ok((lower * share, upper * share))
    })?;
    Ok(grid)
}
