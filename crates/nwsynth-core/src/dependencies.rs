//! Static dependency table between syntheses and its topological expansion.
//!
//! A synthesis listed here is computed from the syntheses it maps to rather
//! than read from the simulator outputs. [`expand_with_dependencies`] orders a
//! request so every dependency is resolved (and cached) before its dependents.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

use crate::error::{SynthError, SynthResult};
use crate::key::SynthesisKey;
use crate::resolution::SpatialResolution::{
    self, HydroPlant as UHE, ReservoirGroup as REE, Submarket as SBM, System as SIN,
};
use crate::variable::Variable::{self, *};

pub type DependencyTable = HashMap<SynthesisKey, Vec<SynthesisKey>>;

/// Plant-level flows obtained by converting the printed volume, as (flow, volume).
pub const FLOW_FROM_VOLUME: [(Variable, Variable); 5] = [
    (TurbinedFlow, TurbinedVolume),
    (SpilledFlow, SpilledVolume),
    (WithdrawnFlow, WithdrawnVolume),
    (DivertedFlow, DivertedVolume),
    (EvaporatedFlow, EvaporatedVolume),
];

/// Plant-level volumes obtained by converting the printed flow, as (volume, flow).
pub const VOLUME_FROM_FLOW: [(Variable, Variable); 2] = [
    (InflowVolume, InflowFlow),
    (IncrementalVolume, IncrementalFlow),
];

/// Syntheses that are the sum of two other syntheses at the same resolution.
pub const SUM_RULES: [(Variable, Variable, Variable); 5] = [
    (SpilledEnergy, SpilledEnergyReservoir, SpilledEnergyRunOfRiver),
    (MinOutflowEnergy, MinOutflowEnergyGoal, MinOutflowEnergyViolation),
    (
        EvaporationViolation,
        EvaporationViolationPositive,
        EvaporationViolationNegative,
    ),
    (OutflowFlow, TurbinedFlow, SpilledFlow),
    (OutflowVolume, TurbinedVolume, SpilledVolume),
];

/// Percentage syntheses obtained from their absolute counterpart, as (percent, absolute).
pub const PERCENT_FROM_ABSOLUTE: [(Variable, Variable); 3] = [
    (StoredEnergyPercentInitial, StoredEnergyInitial),
    (StoredVolumePercentInitial, StoredVolumeInitial),
    (StoredVolumePercentFinal, StoredVolumeFinal),
];

const GROUP_AND_UP: [SpatialResolution; 3] = [SIN, SBM, REE];
const PLANT_AND_UP: [SpatialResolution; 4] = [SIN, SBM, REE, UHE];

/// The hand-curated dependency table.
pub static DEPENDENCIES: Lazy<DependencyTable> = Lazy::new(build_dependencies);

fn build_dependencies() -> DependencyTable {
    let k = SynthesisKey::new;
    let mut deps = DependencyTable::new();

    for (total, first, second) in SUM_RULES {
        let resolutions: &[SpatialResolution] = match total {
            SpilledEnergy | MinOutflowEnergy => &GROUP_AND_UP,
            _ => &[UHE],
        };
        for res in resolutions {
            deps.insert(k(total, *res), vec![k(first, *res), k(second, *res)]);
        }
    }
    for (flow, volume) in FLOW_FROM_VOLUME {
        deps.insert(k(flow, UHE), vec![k(volume, UHE)]);
    }
    for (volume, flow) in VOLUME_FROM_FLOW {
        deps.insert(k(volume, UHE), vec![k(flow, UHE)]);
    }

    // Initial values are the final series shifted by one stage.
    for res in GROUP_AND_UP {
        deps.insert(k(StoredEnergyInitial, res), vec![k(StoredEnergyFinal, res)]);
    }
    deps.insert(k(StoredVolumeInitial, UHE), vec![k(StoredVolumeFinal, UHE)]);

    // Plant stored energy from stored volume and accumulated productivity.
    deps.insert(k(StoredEnergyInitial, UHE), vec![k(StoredVolumeInitial, UHE)]);
    deps.insert(k(StoredEnergyFinal, UHE), vec![k(StoredVolumeFinal, UHE)]);

    for (percent, absolute) in PERCENT_FROM_ABSOLUTE {
        let resolutions: &[SpatialResolution] = if percent == StoredEnergyPercentInitial {
            &GROUP_AND_UP
        } else {
            &PLANT_AND_UP
        };
        for res in resolutions {
            deps.insert(k(percent, *res), vec![k(absolute, *res)]);
        }
    }

    for variable in Variable::ALL.iter().filter(|v| v.rolls_up_from_plants()) {
        for res in GROUP_AND_UP {
            deps.insert(k(*variable, res), vec![k(*variable, UHE)]);
        }
    }
    deps
}

/// Direct dependencies of `key` (empty when read from simulator outputs).
pub fn dependencies_of(key: &SynthesisKey) -> &'static [SynthesisKey] {
    DEPENDENCIES.get(key).map(Vec::as_slice).unwrap_or(&[])
}

/// Whether `key` is computed from other syntheses.
pub fn is_computed(key: &SynthesisKey) -> bool {
    DEPENDENCIES.contains_key(key)
}

/// Expand `requested` with all transitive dependencies in post-order.
///
/// Every key in the result appears after all of its dependencies and each
/// key appears once. A cycle is reported as [`SynthError::DependencyCycle`].
pub fn expand_with_dependencies(requested: &[SynthesisKey]) -> SynthResult<Vec<SynthesisKey>> {
    expand_with(&DEPENDENCIES, requested)
}

/// [`expand_with_dependencies`] over an arbitrary table.
pub fn expand_with(
    table: &DependencyTable,
    requested: &[SynthesisKey],
) -> SynthResult<Vec<SynthesisKey>> {
    let mut order = Vec::new();
    let mut done = HashSet::new();
    let mut path = Vec::new();
    for key in requested {
        visit(table, *key, &mut done, &mut path, &mut order)?;
    }
    Ok(order)
}

fn visit(
    table: &DependencyTable,
    key: SynthesisKey,
    done: &mut HashSet<SynthesisKey>,
    path: &mut Vec<SynthesisKey>,
    order: &mut Vec<SynthesisKey>,
) -> SynthResult<()> {
    if done.contains(&key) {
        return Ok(());
    }
    if let Some(start) = path.iter().position(|k| *k == key) {
        let cycle: Vec<String> = path[start..]
            .iter()
            .chain(std::iter::once(&key))
            .map(|k| k.to_string())
            .collect();
        return Err(SynthError::DependencyCycle(cycle.join(" -> ")));
    }
    path.push(key);
    for dependency in table.get(&key).into_iter().flatten() {
        visit(table, *dependency, done, path, order)?;
    }
    path.pop();
    done.insert(key);
    order.push(key);
    Ok(())
}

/// Keys whose resolved table must be cached because another key in `order` needs it.
pub fn cache_targets(order: &[SynthesisKey]) -> HashSet<SynthesisKey> {
    order
        .iter()
        .flat_map(|key| dependencies_of(key).iter().copied())
        .collect()
}
