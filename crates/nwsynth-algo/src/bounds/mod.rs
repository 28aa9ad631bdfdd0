//! Bounds Resolver: attaches admissible (lower, upper) ranges to synthesis rows.
//!
//! Each [`SynthesisKey`] with known physical limits maps to one
//! [`BoundsStrategy`] in the static [`STRATEGIES`] table. A strategy builds a
//! [`BoundGrid`] over the (entity, stage start, block) cells of the table
//! from the deck registry, and the grid is then written onto every row,
//! statistic rows included, rounded to the strategy's precision.
//!
//! Keys without a strategy get (-inf, +inf).

use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::debug;

use nwsynth_core::resolution::SpatialResolution::{
    self, HydroPlant as UHE, ReservoirGroup as REE, Submarket as SBM, System as SIN,
};
use nwsynth_core::variable::Variable::{self, *};
use nwsynth_core::{OrderedEntities, SynthResult, SynthesisKey, SynthesisTable};
use nwsynth_io::DeckAccessor;

use crate::temporal::Calendar;

pub mod energy;
pub mod exchange;
pub mod grid;
pub mod hydro;
pub mod thermal;
pub mod volume_table;

pub use grid::{BoundGrid, StageBounds, UNBOUNDED};
pub use volume_table::{HydroLimitTable, PlantLimits};

/// Whether a storage synthesis is absolute or a percentage of capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Absolute,
    Percent,
}

/// Whether a hydro flow synthesis is reported as a flow or as a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowForm {
    Flow,
    Volume,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundsStrategy {
    StoredEnergy(Measure),
    StoredVolume(Measure),
    Outflow(FlowForm),
    TurbinedFlow(FlowForm),
    Exchange,
    ThermalGeneration,
    /// Fixed lower bound, no upper bound.
    LowerBounded(f64),
    Unbounded,
}

impl BoundsStrategy {
    /// Decimal digits the bounds are rounded to.
    pub fn digits(&self) -> i32 {
        match self {
            BoundsStrategy::StoredEnergy(Measure::Absolute) => 0,
            BoundsStrategy::StoredEnergy(Measure::Percent) => 1,
            BoundsStrategy::Exchange | BoundsStrategy::ThermalGeneration => 1,
            BoundsStrategy::StoredVolume(_)
            | BoundsStrategy::Outflow(_)
            | BoundsStrategy::TurbinedFlow(_)
            | BoundsStrategy::LowerBounded(_)
            | BoundsStrategy::Unbounded => 2,
        }
    }

    fn grid(&self, ctx: &BoundsContext<'_>) -> SynthResult<BoundGrid> {
        match *self {
            BoundsStrategy::StoredEnergy(measure) => energy::stored_energy(ctx, measure),
            BoundsStrategy::StoredVolume(measure) => hydro::stored_volume(ctx, measure),
            BoundsStrategy::Outflow(form) => hydro::outflow(ctx, form),
            BoundsStrategy::TurbinedFlow(form) => hydro::turbined_flow(ctx, form),
            BoundsStrategy::Exchange => exchange::exchange(ctx),
            BoundsStrategy::ThermalGeneration => thermal::thermal_generation(ctx),
            BoundsStrategy::LowerBounded(lower) => {
                let mut grid = ctx.grid();
                grid.fill((lower, f64::INFINITY));
                Ok(grid)
            }
            BoundsStrategy::Unbounded => Ok(ctx.grid()),
        }
    }
}

/// Everything a strategy reads.
pub struct BoundsContext<'a> {
    pub deck: &'a dyn DeckAccessor,
    pub calendar: &'a Calendar,
    pub resolution: SpatialResolution,
    pub ordered: &'a OrderedEntities,
}

impl BoundsContext<'_> {
    /// Unbounded grid shaped like the table being bounded.
    pub fn grid(&self) -> BoundGrid {
        BoundGrid::new(self.resolution, self.ordered)
    }
}

pub static STRATEGIES: Lazy<HashMap<SynthesisKey, BoundsStrategy>> = Lazy::new(build_strategies);

fn build_strategies() -> HashMap<SynthesisKey, BoundsStrategy> {
    use BoundsStrategy as S;

    let mut table = HashMap::new();
    let mut register = |variable: Variable, resolutions: &[SpatialResolution], strategy| {
        for resolution in resolutions {
            table.insert(SynthesisKey::new(variable, *resolution), strategy);
        }
    };
    let groups = [SIN, SBM, REE];
    let plants = [SIN, SBM, REE, UHE];

    register(StoredEnergyInitial, &groups, S::StoredEnergy(Measure::Absolute));
    register(StoredEnergyFinal, &groups, S::StoredEnergy(Measure::Absolute));
    register(StoredEnergyPercentInitial, &groups, S::StoredEnergy(Measure::Percent));
    register(StoredEnergyPercentFinal, &groups, S::StoredEnergy(Measure::Percent));
    register(StoredVolumeInitial, &plants, S::StoredVolume(Measure::Absolute));
    register(StoredVolumeFinal, &plants, S::StoredVolume(Measure::Absolute));
    register(StoredVolumePercentInitial, &plants, S::StoredVolume(Measure::Percent));
    register(StoredVolumePercentFinal, &plants, S::StoredVolume(Measure::Percent));
    register(OutflowFlow, &plants, S::Outflow(FlowForm::Flow));
    register(OutflowVolume, &plants, S::Outflow(FlowForm::Volume));
    register(TurbinedFlow, &plants, S::TurbinedFlow(FlowForm::Flow));
    register(TurbinedVolume, &plants, S::TurbinedFlow(FlowForm::Volume));
    register(Exchange, Exchange.resolutions(), S::Exchange);
    register(ThermalGeneration, ThermalGeneration.resolutions(), S::ThermalGeneration);

    register(InflowFlow, &plants, S::LowerBounded(0.0));
    register(InflowVolume, &plants, S::LowerBounded(0.0));
    register(NaturalInflowEnergy, &groups, S::LowerBounded(0.0));
    // TODO: upper bound of diverted flow from the hydro change records.
    register(DivertedFlow, &plants, S::LowerBounded(0.0));
    register(DivertedVolume, &plants, S::LowerBounded(0.0));
    // TODO: hydro generation bounds from the frozen production function.
    register(HydroGeneration, HydroGeneration.resolutions(), S::LowerBounded(0.0));

    register(IncrementalFlow, &plants, S::Unbounded);
    register(IncrementalVolume, &plants, S::Unbounded);
    register(WithdrawnFlow, &plants, S::Unbounded);
    register(WithdrawnVolume, &plants, S::Unbounded);
    table
}

/// Strategy registered for `key`, if any.
pub fn strategy_for(key: &SynthesisKey) -> Option<BoundsStrategy> {
    STRATEGIES.get(key).copied()
}

/// Whether `key` has a registered bounds strategy.
pub fn is_bounded(key: &SynthesisKey) -> bool {
    STRATEGIES.contains_key(key)
}

/// Attach bounds to every row of `table`.
///
/// Absolute stored volumes read straight from the simulator are shifted by
/// their lower bound first. Registry tables a strategy needs are required;
/// their absence fails the synthesis.
pub fn resolve_bounds(
    key: SynthesisKey,
    mut table: SynthesisTable,
    ordered: &OrderedEntities,
    deck: &dyn DeckAccessor,
) -> SynthResult<SynthesisTable> {
    let strategy = match strategy_for(&key) {
        Some(BoundsStrategy::Unbounded) | None => {
            table.clear_bounds();
            return Ok(table);
        }
        Some(strategy) => strategy,
    };
    let calendar = Calendar::load(deck)?;
    let ctx = BoundsContext {
        deck,
        calendar: &calendar,
        resolution: key.resolution,
        ordered,
    };
    let grid = strategy.grid(&ctx)?;
    if strategy == BoundsStrategy::StoredVolume(Measure::Absolute) && !table.bounded {
        table = hydro::offset_by_lower(table, &grid);
    }
    grid.apply(&mut table, strategy.digits());
    table.bounded = true;
    debug!(%key, ?strategy, rows = table.len(), "attached bounds");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use nwsynth_core::time::hours_in_month;
    use nwsynth_core::{Entity, ScenarioLabel, SynthesisRow};
    use nwsynth_io::{
        BlockDurationRecord, CaseConfig, ExchangeBlockFactorRecord, ExchangeLimitRecord,
        HydroPlantRecord, InMemoryDeck, ReservoirGroupRecord, SecurityCurveRecord,
        StoredEnergyCapacityRecord, SubmarketRecord, ThermalLimitRecord, ThermalPlantRecord,
    };

    fn april() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    /// One-stage deck in April 2024 (720 h) with blocks of 365, 200 and 155 hours.
    fn deck() -> InMemoryDeck {
        let start = april();
        let hours = hours_in_month(start);
        InMemoryDeck::new()
            .with_case(CaseConfig {
                study_start: start,
                study_stages: 1,
                scenarios: 2,
                blocks: 3,
                individualized_hydro: true,
                individualized_stages: None,
                has_wind: false,
            })
            .with_block_durations(
                [365.0, 200.0, 155.0]
                    .iter()
                    .enumerate()
                    .map(|(i, h)| BlockDurationRecord {
                        start,
                        block: i as u32 + 1,
                        fraction: h / hours,
                    })
                    .collect(),
            )
            .with_submarkets(vec![
                SubmarketRecord {
                    code: 1,
                    name: "SE".into(),
                    fictitious: false,
                },
                SubmarketRecord {
                    code: 2,
                    name: "S".into(),
                    fictitious: false,
                },
            ])
            .with_reservoir_groups(vec![
                ReservoirGroupRecord {
                    code: 1,
                    name: "SUDESTE".into(),
                    submarket_code: 1,
                },
                ReservoirGroupRecord {
                    code: 2,
                    name: "SUL".into(),
                    submarket_code: 2,
                },
            ])
    }

    fn rows(entity: Arc<Entity>, blocks: &[u32], value: f64) -> Vec<SynthesisRow> {
        let start = april();
        let hours = [720.0, 365.0, 200.0, 155.0];
        let mut rows = Vec::new();
        for scenario in 1..=2 {
            for block in blocks {
                rows.push(SynthesisRow {
                    entity: entity.clone(),
                    stage: 1,
                    start,
                    end: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                    scenario: ScenarioLabel::Scenario(scenario),
                    block: *block,
                    block_hours: hours[*block as usize],
                    value,
                    lower: f64::NEG_INFINITY,
                    upper: f64::INFINITY,
                });
            }
        }
        rows
    }

    fn bound(key: &str, table: SynthesisTable, deck: &InMemoryDeck) -> SynthesisTable {
        let key = SynthesisKey::parse(key).unwrap();
        let ordered = OrderedEntities::capture(&table);
        resolve_bounds(key, table, &ordered, deck).unwrap()
    }

    fn row<'a>(table: &'a SynthesisTable, block: u32) -> &'a SynthesisRow {
        table
            .rows
            .iter()
            .find(|r| r.block == block && r.scenario == ScenarioLabel::Scenario(1))
            .unwrap()
    }

    #[test]
    fn strategy_table_covers_the_bounded_families() {
        let key = |s: &str| SynthesisKey::parse(s).unwrap();
        assert_eq!(
            strategy_for(&key("EARPF_SBM")),
            Some(BoundsStrategy::StoredEnergy(Measure::Percent))
        );
        assert_eq!(
            strategy_for(&key("VDEF_REE")),
            Some(BoundsStrategy::Outflow(FlowForm::Volume))
        );
        assert_eq!(strategy_for(&key("GTER_UTE")), Some(BoundsStrategy::ThermalGeneration));
        assert!(is_bounded(&key("QINC_UHE")));
        assert!(!is_bounded(&key("CMO_SBM")));
    }

    #[test]
    fn unregistered_keys_are_unbounded() {
        let entity = Arc::new(Entity::Submarket {
            code: 1,
            name: "SE".into(),
        });
        let mut table =
            SynthesisTable::new(SpatialResolution::Submarket, rows(entity, &[0], 1.0));
        table.rows[0].lower = 0.0;
        let table = bound("CMO_SBM", table, &deck());
        assert!(table.rows.iter().all(|r| r.lower.is_infinite() && r.upper.is_infinite()));
        assert!(!table.bounded);
    }

    #[test]
    fn thermal_minimum_scales_with_block_duration() {
        let deck = deck()
            .with_thermal_plants(vec![ThermalPlantRecord {
                code: 211,
                name: "ANGRA 1".into(),
                submarket_code: 1,
            }])
            .with_thermal_limits(vec![ThermalLimitRecord {
                plant_code: 211,
                start: april(),
                min_generation: 50.0,
                max_generation: 640.0,
            }]);
        let entity = Arc::new(Entity::ThermalPlant {
            code: 211,
            name: "ANGRA 1".into(),
            submarket_code: 1,
            submarket: "SE".into(),
        });
        let table = SynthesisTable::new(
            SpatialResolution::ThermalPlant,
            rows(entity, &[0, 1, 2, 3], 100.0),
        );
        let table = bound("GTER_UTE", table, &deck);
        assert_eq!(row(&table, 2).lower, 13.7);
        assert_eq!(row(&table, 0).lower, 49.3);
        assert_eq!(row(&table, 0).upper, 631.2);
    }

    #[test]
    fn exchange_limits_bound_both_directions() {
        let limit = |reverse| ExchangeLimitRecord {
            source_code: 1,
            target_code: 2,
            reverse,
            start: april(),
            limit: 1000.0,
        };
        let factor = |source_code, target_code| ExchangeBlockFactorRecord {
            source_code,
            target_code,
            start: april(),
            block: 1,
            factor: 0.8,
        };
        let deck = deck()
            .with_exchange_limits(vec![limit(false), limit(true)])
            .with_exchange_block_factors(vec![factor(1, 2), factor(2, 1)]);
        let entity = Arc::new(Entity::SubmarketPair {
            source_code: 1,
            source: "SE".into(),
            target_code: 2,
            target: "S".into(),
        });
        let table = SynthesisTable::new(
            SpatialResolution::SubmarketPair,
            rows(entity, &[0, 1, 2], 0.0),
        );
        let table = bound("INT_SBP", table, &deck);
        assert_eq!(row(&table, 1).upper, 292000.0);
        assert_eq!(row(&table, 1).lower, -292000.0);
        assert_eq!(row(&table, 2).upper, 200000.0);
        assert_eq!(row(&table, 0).upper, 292000.0 + 200000.0 + 155000.0);
    }

    #[test]
    fn missing_reverse_limit_leaves_the_lower_bound_open() {
        let deck = deck()
            .with_exchange_limits(vec![ExchangeLimitRecord {
                source_code: 1,
                target_code: 2,
                reverse: false,
                start: april(),
                limit: 10.0,
            }])
            .with_exchange_block_factors(vec![]);
        let entity = Arc::new(Entity::SubmarketPair {
            source_code: 1,
            source: "SE".into(),
            target_code: 2,
            target: "S".into(),
        });
        let table = SynthesisTable::new(SpatialResolution::SubmarketPair, rows(entity, &[1], 0.0));
        let table = bound("INT_SBP", table, &deck);
        assert_eq!(row(&table, 1).upper, 3650.0);
        assert!(row(&table, 1).lower.is_infinite());
    }

    fn energy_deck() -> InMemoryDeck {
        deck()
            .with_stored_energy_capacity(vec![
                StoredEnergyCapacityRecord {
                    group_code: 1,
                    start: april(),
                    max_energy: 200000.0,
                },
                StoredEnergyCapacityRecord {
                    group_code: 2,
                    start: april(),
                    max_energy: 20000.0,
                },
            ])
            .with_security_curve(vec![SecurityCurveRecord {
                group_code: 1,
                start: april(),
                percent: 20.0,
            }])
    }

    #[test]
    fn stored_energy_sums_groups_into_the_system() {
        let table = SynthesisTable::new(
            SpatialResolution::System,
            rows(Arc::new(Entity::System), &[0], 100000.0),
        );
        let table = bound("EARMF_SIN", table, &energy_deck());
        assert_eq!(row(&table, 0).lower, 40000.0);
        assert_eq!(row(&table, 0).upper, 220000.0);
    }

    #[test]
    fn stored_energy_percent_is_rebased_to_capacity() {
        let entity = Arc::new(Entity::Submarket {
            code: 2,
            name: "S".into(),
        });
        let table = SynthesisTable::new(SpatialResolution::Submarket, rows(entity, &[0], 50.0));
        let table = bound("EARPF_SBM", table, &energy_deck());
        assert!(table.rows.iter().all(|r| r.upper == 100.0 && r.lower == 0.0));
    }

    fn hydro_deck() -> InMemoryDeck {
        deck().with_hydro_plants(vec![HydroPlantRecord {
            code: 6,
            name: "FURNAS".into(),
            group_code: 1,
            downstream_code: 0,
            productivity: 0.8,
            min_volume: 5733.0,
            max_volume: 22950.0,
            max_turbined_flow: 1692.0,
            min_outflow: 180.0,
            initial_volume_percent: 40.0,
        }])
    }

    fn furnas() -> Arc<Entity> {
        Arc::new(Entity::HydroPlant {
            code: 6,
            name: "FURNAS".into(),
            group_code: 1,
            group: "SUDESTE".into(),
            submarket_code: 1,
            submarket: "SE".into(),
        })
    }

    #[test]
    fn printed_stored_volume_is_shifted_by_the_dead_volume() {
        let table =
            SynthesisTable::new(SpatialResolution::HydroPlant, rows(furnas(), &[0], 1000.0));
        let table = bound("VARMF_UHE", table, &hydro_deck());
        let first = row(&table, 0);
        assert_eq!(first.value, 6733.0);
        assert_eq!((first.lower, first.upper), (5733.0, 22950.0));
        assert!(table.bounded);

        // Already bounded tables keep their values.
        let ordered = OrderedEntities::capture(&table);
        let again = resolve_bounds(
            SynthesisKey::parse("VARMF_UHE").unwrap(),
            table.clone(),
            &ordered,
            &hydro_deck(),
        )
        .unwrap();
        assert_eq!(row(&again, 0).value, 6733.0);
    }

    #[test]
    fn turbined_volume_bounds_follow_block_hours() {
        let table = SynthesisTable::new(
            SpatialResolution::HydroPlant,
            rows(furnas(), &[0, 1], 10.0),
        );
        let table = bound("VTUR_UHE", table, &hydro_deck());
        let expected = nwsynth_core::round_to(nwsynth_core::flow_to_volume(1692.0, 365.0), 2);
        assert_eq!(row(&table, 1).upper, expected);
        assert_eq!(row(&table, 1).lower, 0.0);

        let table = SynthesisTable::new(SpatialResolution::HydroPlant, rows(furnas(), &[1], 10.0));
        let table = bound("QDEF_UHE", table, &hydro_deck());
        assert_eq!(row(&table, 1).lower, 180.0);
        assert!(row(&table, 1).upper.is_infinite());
    }

    #[test]
    fn missing_registry_tables_fail_the_bounds() {
        let table = SynthesisTable::new(
            SpatialResolution::System,
            rows(Arc::new(Entity::System), &[0], 1.0),
        );
        let key = SynthesisKey::parse("EARMF_SIN").unwrap();
        let ordered = OrderedEntities::capture(&table);
        let err = resolve_bounds(key, table, &ordered, &deck()).unwrap_err();
        assert!(matches!(err, nwsynth_core::SynthError::MissingInput(_)));
    }
}
