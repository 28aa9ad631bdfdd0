//! Long-format synthesis tables.
//!
//! A [`SynthesisTable`] holds one row per (entity, stage, scenario, block).
//! The entity of every row is an [`Entity`] whose variant is fixed by the
//! table's [`SpatialResolution`]; [`SynthesisTable::validate`] enforces that
//! schema once at the boundary where tables are produced.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{SynthError, SynthResult};
use crate::resolution::SpatialResolution;

/// Entity-identifying columns of a row.
///
/// Field order drives the derived ordering, so codes sort before names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Entity {
    System,
    Submarket {
        code: i32,
        name: String,
    },
    SubmarketPair {
        source_code: i32,
        source: String,
        target_code: i32,
        target: String,
    },
    ReservoirGroup {
        code: i32,
        name: String,
        submarket_code: i32,
        submarket: String,
    },
    HydroPlant {
        code: i32,
        name: String,
        group_code: i32,
        group: String,
        submarket_code: i32,
        submarket: String,
    },
    ThermalPlant {
        code: i32,
        name: String,
        submarket_code: i32,
        submarket: String,
    },
    WindFarm {
        code: i32,
        name: String,
        submarket_code: i32,
        submarket: String,
    },
}

impl Entity {
    pub fn resolution(&self) -> SpatialResolution {
        match self {
            Entity::System => SpatialResolution::System,
            Entity::Submarket { .. } => SpatialResolution::Submarket,
            Entity::SubmarketPair { .. } => SpatialResolution::SubmarketPair,
            Entity::ReservoirGroup { .. } => SpatialResolution::ReservoirGroup,
            Entity::HydroPlant { .. } => SpatialResolution::HydroPlant,
            Entity::ThermalPlant { .. } => SpatialResolution::ThermalPlant,
            Entity::WindFarm { .. } => SpatialResolution::WindFarm,
        }
    }

    /// Primary code (`None` for the system).
    pub fn code(&self) -> Option<i32> {
        match self {
            Entity::System => None,
            Entity::Submarket { code, .. }
            | Entity::ReservoirGroup { code, .. }
            | Entity::HydroPlant { code, .. }
            | Entity::ThermalPlant { code, .. }
            | Entity::WindFarm { code, .. } => Some(*code),
            Entity::SubmarketPair { source_code, .. } => Some(*source_code),
        }
    }

    /// (code, name) pairs in the order of [`SpatialResolution::entity_columns`].
    pub fn labels(&self) -> Vec<(i32, &str)> {
        match self {
            Entity::System => vec![],
            Entity::Submarket { code, name } => vec![(*code, name.as_str())],
            Entity::SubmarketPair {
                source_code,
                source,
                target_code,
                target,
            } => vec![(*source_code, source.as_str()), (*target_code, target.as_str())],
            Entity::ReservoirGroup {
                code,
                name,
                submarket_code,
                submarket,
            } => vec![(*code, name.as_str()), (*submarket_code, submarket.as_str())],
            Entity::HydroPlant {
                code,
                name,
                group_code,
                group,
                submarket_code,
                submarket,
            } => vec![
                (*code, name.as_str()),
                (*group_code, group.as_str()),
                (*submarket_code, submarket.as_str()),
            ],
            Entity::ThermalPlant {
                code,
                name,
                submarket_code,
                submarket,
            }
            | Entity::WindFarm {
                code,
                name,
                submarket_code,
                submarket,
            } => vec![(*code, name.as_str()), (*submarket_code, submarket.as_str())],
        }
    }

    /// The entity containing `self` at the coarser resolution `target`.
    pub fn roll_up(&self, target: SpatialResolution) -> Option<Entity> {
        if self.resolution() == target {
            return Some(self.clone());
        }
        if !target.is_coarser_than(self.resolution()) {
            return None;
        }
        match target {
            SpatialResolution::System => Some(Entity::System),
            SpatialResolution::Submarket => match self {
                Entity::ReservoirGroup {
                    submarket_code,
                    submarket,
                    ..
                }
                | Entity::HydroPlant {
                    submarket_code,
                    submarket,
                    ..
                }
                | Entity::ThermalPlant {
                    submarket_code,
                    submarket,
                    ..
                }
                | Entity::WindFarm {
                    submarket_code,
                    submarket,
                    ..
                } => Some(Entity::Submarket {
                    code: *submarket_code,
                    name: submarket.clone(),
                }),
                _ => None,
            },
            SpatialResolution::ReservoirGroup => match self {
                Entity::HydroPlant {
                    group_code,
                    group,
                    submarket_code,
                    submarket,
                    ..
                } => Some(Entity::ReservoirGroup {
                    code: *group_code,
                    name: group.clone(),
                    submarket_code: *submarket_code,
                    submarket: submarket.clone(),
                }),
                _ => None,
            },
            _ => None,
        }
    }

    /// Whether `self` aggregates (or is) `finer`, compared by codes.
    pub fn covers(&self, finer: &Entity) -> bool {
        finer
            .roll_up(self.resolution())
            .map(|e| e.code() == self.code())
            .unwrap_or(false)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::System => f.write_str("SIN"),
            Entity::SubmarketPair { source, target, .. } => write!(f, "{source}->{target}"),
            other => {
                let labels = other.labels();
                let (code, name) = labels.first().copied().unwrap_or((0, ""));
                write!(f, "{name} ({code})")
            }
        }
    }
}

/// Scenario id of a genuine row, or the label of a statistic row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScenarioLabel {
    Scenario(u32),
    Statistic(String),
}

impl ScenarioLabel {
    pub fn is_statistic(&self) -> bool {
        matches!(self, ScenarioLabel::Statistic(_))
    }

    pub fn scenario(&self) -> Option<u32> {
        match self {
            ScenarioLabel::Scenario(id) => Some(*id),
            ScenarioLabel::Statistic(_) => None,
        }
    }
}

impl fmt::Display for ScenarioLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioLabel::Scenario(id) => write!(f, "{id}"),
            ScenarioLabel::Statistic(label) => f.write_str(label),
        }
    }
}

/// One row of a synthesis table.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRow {
    pub entity: Arc<Entity>,
    pub stage: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub scenario: ScenarioLabel,
    pub block: u32,
    pub block_hours: f64,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

impl SynthesisRow {
    pub fn is_statistic(&self) -> bool {
        self.scenario.is_statistic()
    }

    /// Row identity within a table: (entity, stage, block, scenario).
    pub fn identity(&self) -> (&Entity, u32, u32, &ScenarioLabel) {
        (self.entity.as_ref(), self.stage, self.block, &self.scenario)
    }

    /// Same row with a different value; bounds reset to unbounded.
    pub fn with_value(&self, value: f64) -> Self {
        Self {
            value,
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
            ..self.clone()
        }
    }
}

/// A long-format table of one synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisTable {
    pub resolution: SpatialResolution,
    pub rows: Vec<SynthesisRow>,
    /// Whether `lower`/`upper` already carry bounds (e.g. summed from bounded tables).
    pub bounded: bool,
}

impl SynthesisTable {
    pub fn new(resolution: SpatialResolution, rows: Vec<SynthesisRow>) -> Self {
        Self {
            resolution,
            rows,
            bounded: false,
        }
    }

    pub fn empty(resolution: SpatialResolution) -> Self {
        Self::new(resolution, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sort by entity, stage, scenario (genuine before statistics) and block.
    pub fn sort(&mut self) {
        self.rows.sort_by(|a, b| {
            a.entity
                .cmp(&b.entity)
                .then(a.stage.cmp(&b.stage))
                .then(a.scenario.cmp(&b.scenario))
                .then(a.block.cmp(&b.block))
        });
    }

    /// Check the entity schema and row identity uniqueness.
    pub fn validate(&self) -> SynthResult<()> {
        let mut seen = HashSet::with_capacity(self.rows.len());
        for row in &self.rows {
            if row.entity.resolution() != self.resolution {
                return Err(SynthError::Validation(format!(
                    "row entity {} does not belong to resolution {}",
                    row.entity, self.resolution
                )));
            }
            if !seen.insert(row.identity()) {
                return Err(SynthError::Validation(format!(
                    "duplicate row for {} stage {} block {} scenario {}",
                    row.entity, row.stage, row.block, row.scenario
                )));
            }
        }
        Ok(())
    }

    /// Genuine scenario rows only.
    pub fn scenario_rows(&self) -> Self {
        Self {
            resolution: self.resolution,
            rows: self
                .rows
                .iter()
                .filter(|r| !r.is_statistic())
                .cloned()
                .collect(),
            bounded: self.bounded,
        }
    }

    /// Split into (scenario rows, statistic rows).
    pub fn split_statistics(self) -> (Self, Self) {
        let (stats, scenarios): (Vec<_>, Vec<_>) =
            self.rows.into_iter().partition(|r| r.is_statistic());
        (
            Self {
                resolution: self.resolution,
                rows: scenarios,
                bounded: self.bounded,
            },
            Self {
                resolution: self.resolution,
                rows: stats,
                bounded: self.bounded,
            },
        )
    }

    /// Reset every row to unbounded.
    pub fn clear_bounds(&mut self) {
        for row in &mut self.rows {
            row.lower = f64::NEG_INFINITY;
            row.upper = f64::INFINITY;
        }
        self.bounded = false;
    }
}

/// Distinct values of each sort/entity column, in table order.
///
/// Captured right after a table is sorted and used to shape bound grids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedEntities {
    pub entities: Vec<Arc<Entity>>,
    pub stages: Vec<u32>,
    pub start_dates: Vec<NaiveDate>,
    pub scenarios: Vec<ScenarioLabel>,
    pub blocks: Vec<u32>,
}

impl OrderedEntities {
    pub fn capture(table: &SynthesisTable) -> Self {
        fn push_unique<T: PartialEq + Clone>(values: &mut Vec<T>, seen: &mut HashSet<T>, v: &T)
        where
            T: std::hash::Hash + Eq,
        {
            if seen.insert(v.clone()) {
                values.push(v.clone());
            }
        }

        let mut ordered = Self::default();
        let mut entities = HashSet::new();
        let mut stages = HashSet::new();
        let mut dates = HashSet::new();
        let mut scenarios = HashSet::new();
        let mut blocks = HashSet::new();
        for row in &table.rows {
            push_unique(&mut ordered.entities, &mut entities, &row.entity);
            push_unique(&mut ordered.stages, &mut stages, &row.stage);
            push_unique(&mut ordered.start_dates, &mut dates, &row.start);
            push_unique(&mut ordered.scenarios, &mut scenarios, &row.scenario);
            push_unique(&mut ordered.blocks, &mut blocks, &row.block);
        }
        ordered.stages.sort_unstable();
        ordered.start_dates.sort_unstable();
        ordered.blocks.sort_unstable();
        ordered
    }

    /// Distinct values of a named column, rendered as strings.
    pub fn column(&self, name: &str) -> Option<Vec<String>> {
        match name {
            "stage" => Some(self.stages.iter().map(|s| s.to_string()).collect()),
            "start_date" => Some(self.start_dates.iter().map(|d| d.to_string()).collect()),
            "scenario" => Some(self.scenarios.iter().map(|s| s.to_string()).collect()),
            "block" => Some(self.blocks.iter().map(|b| b.to_string()).collect()),
            other => {
                let resolution = self.entities.first()?.resolution();
                let columns = resolution.entity_columns();
                let (index, is_code) = columns.iter().enumerate().find_map(|(i, (code, label))| {
                    if *code == other {
                        Some((i, true))
                    } else if *label == other {
                        Some((i, false))
                    } else {
                        None
                    }
                })?;
                let mut values: Vec<String> = Vec::new();
                for entity in &self.entities {
                    let (code, label) = entity.labels()[index];
                    let rendered = if is_code {
                        code.to_string()
                    } else {
                        label.to_string()
                    };
                    if !values.contains(&rendered) {
                        values.push(rendered);
                    }
                }
                Some(values)
            }
        }
    }
}
