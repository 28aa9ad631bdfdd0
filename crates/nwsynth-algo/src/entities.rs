//! Registry records turned into tagged [`Entity`] values.

use std::collections::HashMap;
use std::sync::Arc;

use nwsynth_core::{Entity, SynthError, SynthResult};
use nwsynth_io::{
    required, tables, DeckAccessor, HydroPlantRecord, ReservoirGroupRecord, SubmarketRecord,
    ThermalPlantRecord, WindFarmRecord,
};

fn submarkets_by_code(deck: &dyn DeckAccessor) -> SynthResult<HashMap<i32, SubmarketRecord>> {
    let submarkets = required(tables::SUBMARKETS, deck.submarkets())?;
    Ok(submarkets.iter().map(|s| (s.code, s.clone())).collect())
}

fn submarket_name(submarkets: &HashMap<i32, SubmarketRecord>, code: i32) -> SynthResult<String> {
    submarkets
        .get(&code)
        .map(|s| s.name.clone())
        .ok_or_else(|| SynthError::Validation(format!("unknown submarket code {code}")))
}

/// Non-fictitious submarkets.
pub fn submarkets(deck: &dyn DeckAccessor) -> SynthResult<Vec<(SubmarketRecord, Arc<Entity>)>> {
    let submarkets = required(tables::SUBMARKETS, deck.submarkets())?;
    Ok(submarkets
        .iter()
        .filter(|s| !s.fictitious)
        .map(|s| {
            let entity = Entity::Submarket {
                code: s.code,
                name: s.name.clone(),
            };
            (s.clone(), Arc::new(entity))
        })
        .collect())
}

/// Every ordered pair `(i, j)` of submarkets with `i < j`, fictitious included.
pub fn submarket_pairs(deck: &dyn DeckAccessor) -> SynthResult<Vec<Arc<Entity>>> {
    let mut all: Vec<SubmarketRecord> =
        required(tables::SUBMARKETS, deck.submarkets())?.to_vec();
    all.sort_by_key(|s| s.code);
    let mut pairs = Vec::new();
    for (i, source) in all.iter().enumerate() {
        for target in &all[i + 1..] {
            pairs.push(Arc::new(Entity::SubmarketPair {
                source_code: source.code,
                source: source.name.clone(),
                target_code: target.code,
                target: target.name.clone(),
            }));
        }
    }
    Ok(pairs)
}

pub fn reservoir_groups(
    deck: &dyn DeckAccessor,
) -> SynthResult<Vec<(ReservoirGroupRecord, Arc<Entity>)>> {
    let submarkets = submarkets_by_code(deck)?;
    let groups = required(tables::RESERVOIR_GROUPS, deck.reservoir_groups())?;
    groups
        .iter()
        .map(|g| {
            let entity = Entity::ReservoirGroup {
                code: g.code,
                name: g.name.clone(),
                submarket_code: g.submarket_code,
                submarket: submarket_name(&submarkets, g.submarket_code)?,
            };
            Ok((g.clone(), Arc::new(entity)))
        })
        .collect()
}

pub fn hydro_plants(
    deck: &dyn DeckAccessor,
) -> SynthResult<Vec<(HydroPlantRecord, Arc<Entity>)>> {
    let groups: HashMap<i32, Arc<Entity>> = reservoir_groups(deck)?
        .into_iter()
        .map(|(g, e)| (g.code, e))
        .collect();
    let plants = required(tables::HYDRO_PLANTS, deck.hydro_plants())?;
    plants
        .iter()
        .map(|p| {
            let group = groups.get(&p.group_code).ok_or_else(|| {
                SynthError::Validation(format!(
                    "hydro plant {} references unknown reservoir group {}",
                    p.code, p.group_code
                ))
            })?;
            let Entity::ReservoirGroup {
                name: group_name,
                submarket_code,
                submarket,
                ..
            } = group.as_ref()
            else {
                return Err(SynthError::Validation(format!(
                    "group {} is not a reservoir group entity",
                    p.group_code
                )));
            };
            let entity = Entity::HydroPlant {
                code: p.code,
                name: p.name.clone(),
                group_code: p.group_code,
                group: group_name.clone(),
                submarket_code: *submarket_code,
                submarket: submarket.clone(),
            };
            Ok((p.clone(), Arc::new(entity)))
        })
        .collect()
}

pub fn thermal_plants(
    deck: &dyn DeckAccessor,
) -> SynthResult<Vec<(ThermalPlantRecord, Arc<Entity>)>> {
    let submarkets = submarkets_by_code(deck)?;
    let plants = required(tables::THERMAL_PLANTS, deck.thermal_plants())?;
    plants
        .iter()
        .map(|p| {
            let entity = Entity::ThermalPlant {
                code: p.code,
                name: p.name.clone(),
                submarket_code: p.submarket_code,
                submarket: submarket_name(&submarkets, p.submarket_code)?,
            };
            Ok((p.clone(), Arc::new(entity)))
        })
        .collect()
}

pub fn wind_farms(deck: &dyn DeckAccessor) -> SynthResult<Vec<(WindFarmRecord, Arc<Entity>)>> {
    let submarkets = submarkets_by_code(deck)?;
    let farms = required(tables::WIND_FARMS, deck.wind_farms())?;
    farms
        .iter()
        .map(|w| {
            let entity = Entity::WindFarm {
                code: w.code,
                name: w.name.clone(),
                submarket_code: w.submarket_code,
                submarket: submarket_name(&submarkets, w.submarket_code)?,
            };
            Ok((w.clone(), Arc::new(entity)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nwsynth_io::InMemoryDeck;

    fn deck() -> InMemoryDeck {
        InMemoryDeck::new()
            .with_submarkets(vec![
                SubmarketRecord {
                    code: 2,
                    name: "S".into(),
                    fictitious: false,
                },
                SubmarketRecord {
                    code: 1,
                    name: "SE".into(),
                    fictitious: false,
                },
                SubmarketRecord {
                    code: 11,
                    name: "FC".into(),
                    fictitious: true,
                },
            ])
            .with_reservoir_groups(vec![ReservoirGroupRecord {
                code: 1,
                name: "SUDESTE".into(),
                submarket_code: 1,
            }])
    }

    #[test]
    fn fictitious_submarkets_are_skipped_but_paired() {
        let deck = deck();
        assert_eq!(submarkets(&deck).unwrap().len(), 2);
        let pairs = submarket_pairs(&deck).unwrap();
        assert_eq!(pairs.len(), 3);
        assert!(matches!(
            pairs[0].as_ref(),
            Entity::SubmarketPair {
                source_code: 1,
                target_code: 2,
                ..
            }
        ));
    }

    #[test]
    fn groups_carry_submarket_names() {
        let groups = reservoir_groups(&deck()).unwrap();
        assert_eq!(groups[0].1.labels()[1], (1, "SE"));
    }

    #[test]
    fn dangling_references_are_validation_errors() {
        let deck = deck().with_hydro_plants(vec![HydroPlantRecord {
            code: 6,
            name: "FURNAS".into(),
            group_code: 9,
            downstream_code: 0,
            productivity: 0.8,
            min_volume: 0.0,
            max_volume: 1.0,
            max_turbined_flow: 1.0,
            min_outflow: 0.0,
            initial_volume_percent: 0.0,
        }]);
        assert!(matches!(
            hydro_plants(&deck).unwrap_err(),
            SynthError::Validation(_)
        ));
        let missing = InMemoryDeck::new();
        assert!(matches!(
            hydro_plants(&missing).unwrap_err(),
            SynthError::MissingInput(_)
        ));
    }
}
