//! Bound cells shaped by a table's ordered entities.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;

use nwsynth_core::{
    round_to, Entity, OrderedEntities, SpatialResolution, SynthResult, SynthesisTable,
};

/// Unbounded cell value.
pub const UNBOUNDED: (f64, f64) = (f64::NEG_INFINITY, f64::INFINITY);

/// Per-stage bounds of individual entities, usually finer than the grid.
pub type StageBounds = BTreeMap<(Arc<Entity>, NaiveDate), (f64, f64)>;

type CellKey = (Arc<Entity>, NaiveDate, u32);

/// (lower, upper) for every (entity, stage start, block) of a table.
#[derive(Debug, Clone)]
pub struct BoundGrid {
    resolution: SpatialResolution,
    entities: Vec<Arc<Entity>>,
    start_dates: Vec<NaiveDate>,
    blocks: Vec<u32>,
    cells: HashMap<CellKey, (f64, f64)>,
}

impl BoundGrid {
    pub fn new(resolution: SpatialResolution, ordered: &OrderedEntities) -> Self {
        let mut cells = HashMap::with_capacity(
            ordered.entities.len() * ordered.start_dates.len() * ordered.blocks.len(),
        );
        for entity in &ordered.entities {
            for start in &ordered.start_dates {
                for block in &ordered.blocks {
                    cells.insert((entity.clone(), *start, *block), UNBOUNDED);
                }
            }
        }
        Self {
            resolution,
            entities: ordered.entities.clone(),
            start_dates: ordered.start_dates.clone(),
            blocks: ordered.blocks.clone(),
            cells,
        }
    }

    pub fn resolution(&self) -> SpatialResolution {
        self.resolution
    }

    pub fn entities(&self) -> &[Arc<Entity>] {
        &self.entities
    }

    pub fn start_dates(&self) -> &[NaiveDate] {
        &self.start_dates
    }

    pub fn blocks(&self) -> &[u32] {
        &self.blocks
    }

    pub fn get(&self, entity: &Arc<Entity>, start: NaiveDate, block: u32) -> (f64, f64) {
        self.cells
            .get(&(entity.clone(), start, block))
            .copied()
            .unwrap_or(UNBOUNDED)
    }

    pub fn set(&mut self, entity: &Arc<Entity>, start: NaiveDate, block: u32, bounds: (f64, f64)) {
        self.cells.insert((entity.clone(), start, block), bounds);
    }

    /// Same bounds on every cell.
    pub fn fill(&mut self, bounds: (f64, f64)) {
        for cell in self.cells.values_mut() {
            *cell = bounds;
        }
    }

    /// Sum the per-stage bounds of every entity in `fine` into the grid
    /// entity that covers it, then tile the sums over all blocks.
    ///
    /// Cells no fine entity contributes to stay unbounded.
    pub fn fill_stage_bounds(&mut self, fine: &StageBounds) {
        let by_entity: HashMap<&Entity, &Arc<Entity>> =
            self.entities.iter().map(|e| (e.as_ref(), e)).collect();
        let mut sums: HashMap<(Arc<Entity>, NaiveDate), (f64, f64)> = HashMap::new();
        for ((entity, start), (lower, upper)) in fine {
            let Some(target) = entity
                .roll_up(self.resolution)
                .and_then(|rolled| by_entity.get(&rolled).map(|e| Arc::clone(e)))
            else {
                continue;
            };
            let sum = sums.entry((target, *start)).or_insert((0.0, 0.0));
            sum.0 += lower;
            sum.1 += upper;
        }
        for ((entity, start), bounds) in sums {
            for block in &self.blocks {
                if let Some(cell) = self.cells.get_mut(&(entity.clone(), start, *block)) {
                    *cell = bounds;
                }
            }
        }
    }

    /// Rewrite every cell through `f(entity, start, block, bounds)`.
    pub fn try_map<F>(&mut self, mut f: F) -> SynthResult<()>
    where
        F: FnMut(&Entity, NaiveDate, u32, (f64, f64)) -> SynthResult<(f64, f64)>,
    {
        for ((entity, start, block), cell) in self.cells.iter_mut() {
            *cell = f(entity, *start, *block, *cell)?;
        }
        Ok(())
    }

    /// Express bounds as a percentage of the upper bound: the upper bound
    /// becomes 100 and the lower bound is clamped to [0, 100].
    pub fn rebase_to_percent(&mut self) {
        for cell in self.cells.values_mut() {
            let (lower, upper) = *cell;
            let lower = if upper.is_finite() && upper > 0.0 && lower.is_finite() {
                (100.0 * lower / upper).clamp(0.0, 100.0)
            } else {
                0.0
            };
            *cell = (lower, 100.0);
        }
    }

    /// Write rounded bounds onto every row of `table`, statistic rows included.
    pub fn apply(&self, table: &mut SynthesisTable, digits: i32) {
        for row in &mut table.rows {
            let (lower, upper) = self.get(&row.entity, row.start, row.block);
            row.lower = round_to(lower, digits);
            row.upper = round_to(upper, digits);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nwsynth_core::{ScenarioLabel, SynthesisRow};

    fn d(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, 1).unwrap()
    }

    fn submarket(code: i32, name: &str) -> Arc<Entity> {
        Arc::new(Entity::Submarket {
            code,
            name: name.into(),
        })
    }

    fn group(code: i32, submarket_code: i32, submarket: &str) -> Arc<Entity> {
        Arc::new(Entity::ReservoirGroup {
            code,
            name: format!("G{code}"),
            submarket_code,
            submarket: submarket.into(),
        })
    }

    fn ordered(entities: Vec<Arc<Entity>>) -> OrderedEntities {
        OrderedEntities {
            entities,
            stages: vec![1, 2],
            start_dates: vec![d(1), d(2)],
            scenarios: vec![ScenarioLabel::Scenario(1)],
            blocks: vec![0, 1],
        }
    }

    #[test]
    fn stage_bounds_are_summed_per_covering_entity() {
        let se = submarket(1, "SE");
        let s = submarket(2, "S");
        let mut grid = BoundGrid::new(
            SpatialResolution::Submarket,
            &ordered(vec![se.clone(), s.clone()]),
        );
        let mut fine = StageBounds::new();
        fine.insert((group(1, 1, "SE"), d(1)), (10.0, 100.0));
        fine.insert((group(2, 1, "SE"), d(1)), (5.0, 50.0));
        fine.insert((group(3, 2, "S"), d(2)), (1.0, 20.0));
        grid.fill_stage_bounds(&fine);

        assert_eq!(grid.get(&se, d(1), 0), (15.0, 150.0));
        assert_eq!(grid.get(&se, d(1), 1), (15.0, 150.0));
        assert_eq!(grid.get(&se, d(2), 1), UNBOUNDED);
        assert_eq!(grid.get(&s, d(2), 0), (1.0, 20.0));
    }

    #[test]
    fn percent_rebase_pins_the_upper_bound() {
        let se = submarket(1, "SE");
        let mut grid =
            BoundGrid::new(SpatialResolution::Submarket, &ordered(vec![se.clone()]));
        grid.fill((25.0, 200.0));
        grid.set(&se, d(2), 0, UNBOUNDED);
        grid.rebase_to_percent();
        assert_eq!(grid.get(&se, d(1), 1), (12.5, 100.0));
        assert_eq!(grid.get(&se, d(2), 0), (0.0, 100.0));
    }

    #[test]
    fn apply_rounds_every_row() {
        let se = submarket(1, "SE");
        let mut grid =
            BoundGrid::new(SpatialResolution::Submarket, &ordered(vec![se.clone()]));
        grid.fill((1.234, f64::INFINITY));
        let row = SynthesisRow {
            entity: se,
            stage: 1,
            start: d(1),
            end: d(2),
            scenario: ScenarioLabel::Statistic("mean".into()),
            block: 1,
            block_hours: 744.0,
            value: 3.0,
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        };
        let mut table = SynthesisTable::new(SpatialResolution::Submarket, vec![row]);
        grid.apply(&mut table, 1);
        assert_eq!(table.rows[0].lower, 1.2);
        assert!(table.rows[0].upper.is_infinite());
    }
}
