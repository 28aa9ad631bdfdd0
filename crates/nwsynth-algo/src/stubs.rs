//! Stub rules: syntheses computed from other, already cached syntheses.
//!
//! Every rule reads only the scenario rows of its inputs and the statistics of
//! the result are recomputed. A rule never touches simulator outputs, which is
//! what lets coarse hydro syntheses be built from the plant table instead of
//! reading coarser raw files.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use nwsynth_core::dependencies::{
    FLOW_FROM_VOLUME, PERCENT_FROM_ABSOLUTE, SUM_RULES, VOLUME_FROM_FLOW,
};
use nwsynth_core::{
    dependencies_of, flow_to_volume, volume_to_flow, with_statistics, CascadeGraph, CascadePlant,
    Entity, Hectometers3, ScenarioLabel, SpatialResolution, SynthError, SynthResult,
    SynthesisKey, SynthesisRow, SynthesisTable, Unit, Variable,
};
use nwsynth_io::{required, tables, DeckAccessor};

use crate::context::RunContext;
use crate::entities;
use crate::temporal::recompute_stage_block;

/// How a computed synthesis is obtained from its dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubRule {
    /// Row-wise sum of two syntheses at the same resolution.
    Sum(SynthesisKey, SynthesisKey),
    FlowFromVolume(SynthesisKey),
    VolumeFromFlow(SynthesisKey),
    /// Plant-level synthesis summed into a coarser resolution.
    RollUp(SynthesisKey),
    PercentFromAbsolute(SynthesisKey),
    /// Initial values: the initial condition, then the final series shifted
    /// by one stage.
    InitialFromFinal(SynthesisKey),
    /// Plant stored energy from stored volume and accumulated productivity.
    PlantStoredEnergy(SynthesisKey),
}

type RowKey = (Arc<Entity>, u32, ScenarioLabel, u32);

fn row_key(row: &SynthesisRow) -> RowKey {
    (row.entity.clone(), row.stage, row.scenario.clone(), row.block)
}

/// Rule computing `key`, or `None` when it is read from simulator outputs.
pub fn stub_rule(key: &SynthesisKey) -> Option<StubRule> {
    use SpatialResolution::HydroPlant as UHE;
    use Variable::*;

    let variable = key.variable;
    match *dependencies_of(key) {
        [first, second] if SUM_RULES.iter().any(|(total, _, _)| *total == variable) => {
            Some(StubRule::Sum(first, second))
        }
        [dep] if FLOW_FROM_VOLUME.iter().any(|(flow, _)| *flow == variable) => {
            Some(StubRule::FlowFromVolume(dep))
        }
        [dep] if VOLUME_FROM_FLOW.iter().any(|(volume, _)| *volume == variable) => {
            Some(StubRule::VolumeFromFlow(dep))
        }
        [dep] if PERCENT_FROM_ABSOLUTE.iter().any(|(pct, _)| *pct == variable) => {
            Some(StubRule::PercentFromAbsolute(dep))
        }
        [dep] if key.resolution == UHE => match variable {
            StoredVolumeInitial => Some(StubRule::InitialFromFinal(dep)),
            StoredEnergyInitial | StoredEnergyFinal => Some(StubRule::PlantStoredEnergy(dep)),
            _ => None,
        },
        [dep] if variable == StoredEnergyInitial => Some(StubRule::InitialFromFinal(dep)),
        [dep] if variable.rolls_up_from_plants() => Some(StubRule::RollUp(dep)),
        _ => None,
    }
}

/// Compute `key` from cached dependencies, or `None` when no rule applies.
pub fn apply_stub(
    key: SynthesisKey,
    run: &RunContext,
    deck: &dyn DeckAccessor,
) -> SynthResult<Option<SynthesisTable>> {
    let Some(rule) = stub_rule(&key) else {
        return Ok(None);
    };
    debug!(%key, ?rule, "applying stub rule");
    let table = match rule {
        StubRule::Sum(first, second) => sum(
            key.resolution,
            run.dependency(&first)?,
            run.dependency(&second)?,
        ),
        StubRule::FlowFromVolume(dep) => {
            convert(run.dependency(&dep)?, Unit::M3s, volume_to_flow)
        }
        StubRule::VolumeFromFlow(dep) => {
            convert(run.dependency(&dep)?, Unit::Hm3, flow_to_volume)
        }
        StubRule::RollUp(dep) => roll_up(key.resolution, run.dependency(&dep)?)?,
        StubRule::PercentFromAbsolute(dep) => percent_of_upper(run.dependency(&dep)?),
        StubRule::InitialFromFinal(dep) => {
            let initial = initial_condition(key, deck)?;
            initial_from_final(run.dependency(&dep)?, &initial)?
        }
        StubRule::PlantStoredEnergy(dep) => plant_stored_energy(run.dependency(&dep)?, deck)?,
    };
    Ok(Some(with_statistics(table)))
}

fn scenario_rows(table: &SynthesisTable) -> impl Iterator<Item = &SynthesisRow> {
    table.rows.iter().filter(|r| !r.is_statistic())
}

/// Row-wise sum matched by row identity; a row missing on one side counts as zero.
pub fn sum(
    resolution: SpatialResolution,
    first: &SynthesisTable,
    second: &SynthesisTable,
) -> SynthesisTable {
    let mut rows: BTreeMap<RowKey, SynthesisRow> = BTreeMap::new();
    for row in scenario_rows(first).chain(scenario_rows(second)) {
        rows.entry(row_key(row))
            .and_modify(|acc| acc.value += row.value)
            .or_insert_with(|| row.with_value(row.value));
    }
    SynthesisTable::new(resolution, rows.into_values().collect())
}

/// Convert every row with `f(value, block_hours)` and rebuild block 0 from
/// the converted real blocks.
pub fn convert(table: &SynthesisTable, unit: Unit, f: fn(f64, f64) -> f64) -> SynthesisTable {
    let rows = scenario_rows(table)
        .map(|r| r.with_value(f(r.value, r.block_hours)))
        .collect();
    SynthesisTable::new(table.resolution, recompute_stage_block(rows, unit))
}

/// Sum a finer table (values and bounds) into `resolution`.
pub fn roll_up(
    resolution: SpatialResolution,
    table: &SynthesisTable,
) -> SynthResult<SynthesisTable> {
    let mut interned: HashMap<Entity, Arc<Entity>> = HashMap::new();
    let mut rows: BTreeMap<RowKey, SynthesisRow> = BTreeMap::new();
    for row in scenario_rows(table) {
        let target = row.entity.roll_up(resolution).ok_or_else(|| {
            SynthError::Validation(format!("{} does not roll up to {resolution}", row.entity))
        })?;
        let target = interned
            .entry(target)
            .or_insert_with_key(|e| Arc::new(e.clone()))
            .clone();
        let key = (target.clone(), row.stage, row.scenario.clone(), row.block);
        rows.entry(key)
            .and_modify(|acc| {
                acc.value += row.value;
                acc.lower += row.lower;
                acc.upper += row.upper;
            })
            .or_insert_with(|| SynthesisRow {
                entity: target,
                ..row.clone()
            });
    }
    let mut rolled = SynthesisTable::new(resolution, rows.into_values().collect());
    rolled.bounded = true;
    Ok(rolled)
}

/// Percentage of each row's upper bound; rows without a finite positive
/// upper bound get zero.
pub fn percent_of_upper(table: &SynthesisTable) -> SynthesisTable {
    let rows = scenario_rows(table)
        .map(|r| {
            let percent = if r.upper.is_finite() && r.upper > 0.0 {
                100.0 * r.value / r.upper
            } else {
                0.0
            };
            r.with_value(percent)
        })
        .collect();
    SynthesisTable::new(table.resolution, rows)
}

/// Initial condition of every entity of `key`'s resolution.
fn initial_condition(
    key: SynthesisKey,
    deck: &dyn DeckAccessor,
) -> SynthResult<HashMap<Entity, f64>> {
    let mut initial = HashMap::new();
    match key.variable {
        Variable::StoredVolumeInitial => {
            for (plant, entity) in entities::hydro_plants(deck)? {
                initial.insert(entity.as_ref().clone(), plant.initial_volume());
            }
        }
        Variable::StoredEnergyInitial => {
            let records =
                required(tables::INITIAL_STORED_ENERGY, deck.initial_stored_energy())?;
            let groups: HashMap<i32, Arc<Entity>> = entities::reservoir_groups(deck)?
                .into_iter()
                .map(|(g, e)| (g.code, e))
                .collect();
            for record in records.iter() {
                let group = groups.get(&record.group_code).ok_or_else(|| {
                    SynthError::Validation(format!(
                        "initial stored energy for unknown reservoir group {}",
                        record.group_code
                    ))
                })?;
                if let Some(target) = group.roll_up(key.resolution) {
                    *initial.entry(target).or_insert(0.0) += record.value;
                }
            }
        }
        other => {
            return Err(SynthError::Validation(format!(
                "no initial condition for {other}"
            )))
        }
    }
    Ok(initial)
}

/// Stage 1 takes the initial condition; stage k takes the final value of
/// stage k - 1 for the same entity, scenario and block.
pub fn initial_from_final(
    finals: &SynthesisTable,
    initial: &HashMap<Entity, f64>,
) -> SynthResult<SynthesisTable> {
    let previous: HashMap<RowKey, f64> = scenario_rows(finals)
        .map(|r| ((r.entity.clone(), r.stage + 1, r.scenario.clone(), r.block), r.value))
        .collect();
    let mut rows = Vec::new();
    for row in scenario_rows(finals) {
        let value = if row.stage == 1 {
            initial.get(row.entity.as_ref()).copied().ok_or_else(|| {
                SynthError::Validation(format!("no initial condition for {}", row.entity))
            })?
        } else {
            match previous.get(&row_key(row)) {
                Some(value) => *value,
                None => continue,
            }
        };
        rows.push(row.with_value(value));
    }
    let mut table = SynthesisTable::new(finals.resolution, rows);
    table.bounded = finals.bounded;
    Ok(table)
}

/// Stored energy of each plant: useful volume above the lower bound (or the
/// dead volume when unbounded) times the accumulated productivity.
pub fn plant_stored_energy(
    volumes: &SynthesisTable,
    deck: &dyn DeckAccessor,
) -> SynthResult<SynthesisTable> {
    let plants = required(tables::HYDRO_PLANTS, deck.hydro_plants())?;
    let cascade = CascadeGraph::new(
        &plants
            .iter()
            .map(|p| CascadePlant {
                code: p.code,
                downstream: p.downstream_code,
                productivity: p.productivity,
            })
            .collect::<Vec<_>>(),
    );
    let productivity = cascade.accumulated_productivity()?;
    let dead_volume: HashMap<i32, f64> = plants.iter().map(|p| (p.code, p.min_volume)).collect();

    let mut rows = Vec::new();
    for row in scenario_rows(volumes) {
        let code = row.entity.code().unwrap_or_default();
        let (Some(accumulated), Some(dead)) = (productivity.get(&code), dead_volume.get(&code))
        else {
            return Err(SynthError::Validation(format!(
                "no cascade data for {}",
                row.entity
            )));
        };
        let lower = if row.lower.is_finite() { row.lower } else { *dead };
        let energy = Hectometers3(row.value - lower).to_stored_energy(*accumulated);
        rows.push(row.with_value(energy.value()));
    }
    Ok(SynthesisTable::new(volumes.resolution, rows))
}
