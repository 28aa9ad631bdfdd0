//! Stored-energy bounds: security curve below, storage capacity above.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;

use nwsynth_core::time::first_of_month;
use nwsynth_core::{Entity, SynthError, SynthResult};
use nwsynth_io::{required, tables};

use super::grid::{BoundGrid, StageBounds};
use super::{BoundsContext, Measure};
use crate::entities;

pub fn stored_energy(ctx: &BoundsContext<'_>, measure: Measure) -> SynthResult<BoundGrid> {
    let groups: HashMap<i32, Arc<Entity>> = entities::reservoir_groups(ctx.deck)?
        .into_iter()
        .map(|(g, e)| (g.code, e))
        .collect();
    let capacity = required(tables::STORED_ENERGY_CAPACITY, ctx.deck.stored_energy_capacity())?;
    let curve: HashMap<(i32, NaiveDate), f64> =
        required(tables::SECURITY_CURVE, ctx.deck.security_curve())?
            .iter()
            .map(|c| ((c.group_code, first_of_month(c.start)), c.percent))
            .collect();

    let mut fine = StageBounds::new();
    for record in capacity.iter() {
        let start = first_of_month(record.start);
        let group = groups.get(&record.group_code).ok_or_else(|| {
            SynthError::Validation(format!(
                "stored energy capacity for unknown reservoir group {}",
                record.group_code
            ))
        })?;
        let lower = curve
            .get(&(record.group_code, start))
            .map_or(0.0, |percent| percent / 100.0 * record.max_energy);
        fine.insert((group.clone(), start), (lower, record.max_energy));
    }

    let mut grid = ctx.grid();
    grid.fill_stage_bounds(&fine);
    if measure == Measure::Percent {
        grid.rebase_to_percent();
    }
    Ok(grid)
}
