//! Stage calendar, block durations and block 0 ("whole stage") synthesis.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::warn;

use nwsynth_core::time::{add_months, first_of_month, hours_in_month, stage_of};
use nwsynth_core::{Entity, ScenarioLabel, SynthError, SynthResult, SynthesisRow, Unit};
use nwsynth_core::STAGE_DURATION_HOURS;
use nwsynth_io::{required, tables, CaseConfig, DeckAccessor, RawRow};

/// Study calendar: stage numbering plus block durations.
#[derive(Debug, Clone)]
pub struct Calendar {
    case: Arc<CaseConfig>,
    durations: HashMap<(NaiveDate, u32), f64>,
}

impl Calendar {
    pub fn load(deck: &dyn DeckAccessor) -> SynthResult<Self> {
        let case = required(tables::CASE, deck.case())?;
        let durations = required(tables::BLOCK_DURATIONS, deck.block_durations())?;
        Ok(Self::new(
            case,
            durations
                .iter()
                .map(|d| ((first_of_month(d.start), d.block), d.hours()))
                .collect(),
        ))
    }

    pub fn new(case: Arc<CaseConfig>, durations: HashMap<(NaiveDate, u32), f64>) -> Self {
        Self { case, durations }
    }

    pub fn case(&self) -> &CaseConfig {
        &self.case
    }

    /// Stage of `date`; `None` outside the study horizon.
    pub fn stage(&self, date: NaiveDate) -> Option<u32> {
        let stage = stage_of(self.case.study_start, date);
        u32::try_from(stage)
            .ok()
            .filter(|s| (1..=self.case.study_stages).contains(s))
    }

    /// End of the stage starting at `start`.
    pub fn stage_end(&self, start: NaiveDate) -> NaiveDate {
        add_months(first_of_month(start), 1)
    }

    /// Duration in hours of `block` in the month starting at `start`.
    /// Block 0 lasts the whole month.
    pub fn block_hours(&self, start: NaiveDate, block: u32) -> SynthResult<f64> {
        if block == 0 {
            return Ok(hours_in_month(start));
        }
        self.durations
            .get(&(first_of_month(start), block))
            .copied()
            .ok_or_else(|| {
                SynthError::Validation(format!("no duration for block {block} of {start}"))
            })
    }
}

/// Stage-level value from per-block values and durations.
///
/// Additive units are summed; intensive units are weighted by block duration
/// over the nominal stage length.
pub fn stage_value(unit: Unit, blocks: &[(f64, f64)]) -> f64 {
    if unit.is_additive() {
        blocks.iter().map(|(value, _)| value).sum()
    } else {
        blocks
            .iter()
            .map(|(value, hours)| value * hours / STAGE_DURATION_HOURS)
            .sum()
    }
}

/// Replace (or add) the block 0 row of every (entity, stage, scenario) that
/// has real blocks, deriving it from the real blocks.
///
/// Groups without real blocks keep their block 0 untouched.
pub fn recompute_stage_block(rows: Vec<SynthesisRow>, unit: Unit) -> Vec<SynthesisRow> {
    let mut groups: BTreeMap<(Arc<Entity>, u32, ScenarioLabel), Vec<SynthesisRow>> =
        BTreeMap::new();
    for row in rows {
        groups
            .entry((row.entity.clone(), row.stage, row.scenario.clone()))
            .or_default()
            .push(row);
    }
    let mut out = Vec::new();
    for (_, mut group) in groups {
        let real: Vec<(f64, f64)> = group
            .iter()
            .filter(|r| r.block > 0)
            .map(|r| (r.value, r.block_hours))
            .collect();
        if real.is_empty() {
            out.extend(group);
            continue;
        }
        group.retain(|r| r.block > 0);
        let template = &group[0];
        let stage_row = SynthesisRow {
            block: 0,
            block_hours: hours_in_month(template.start),
            value: stage_value(unit, &real),
            ..template.clone()
        };
        out.push(stage_row);
        out.extend(group);
    }
    out
}

/// Add block 0 where the raw table printed only real blocks.
pub fn fill_stage_block(rows: Vec<SynthesisRow>, unit: Unit) -> Vec<SynthesisRow> {
    let has_stage_block: HashSet<(Arc<Entity>, u32, ScenarioLabel)> = rows
        .iter()
        .filter(|r| r.block == 0)
        .map(|r| (r.entity.clone(), r.stage, r.scenario.clone()))
        .collect();
    let (complete, missing): (Vec<_>, Vec<_>) = rows.into_iter().partition(|r| {
        has_stage_block.contains(&(r.entity.clone(), r.stage, r.scenario.clone()))
    });
    let mut out = complete;
    out.extend(recompute_stage_block(missing, unit));
    out
}

/// Tag raw rows with `entity`, stage numbering and block durations.
///
/// Rows outside the study horizon and, when `last_stage` is set, after it
/// are dropped, as are real blocks without a registered duration. Block 0 is
/// synthesized when absent.
pub fn rows_from_raw(
    calendar: &Calendar,
    entity: &Arc<Entity>,
    raw: &[RawRow],
    unit: Unit,
    last_stage: Option<u32>,
) -> SynthResult<Vec<SynthesisRow>> {
    let mut rows = Vec::with_capacity(raw.len());
    let mut undated = 0usize;
    for r in raw {
        let Some(stage) = calendar.stage(r.date) else {
            continue;
        };
        if last_stage.is_some_and(|last| stage > last) {
            continue;
        }
        let start = first_of_month(r.date);
        let Ok(block_hours) = calendar.block_hours(start, r.block) else {
            undated += 1;
            continue;
        };
        rows.push(SynthesisRow {
            entity: entity.clone(),
            stage,
            start,
            end: calendar.stage_end(start),
            scenario: ScenarioLabel::Scenario(r.scenario),
            block: r.block,
            block_hours,
            value: r.value,
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        });
    }
    if undated > 0 {
        warn!(entity = %entity, rows = undated, "dropped rows of blocks without a duration");
    }
    Ok(fill_stage_block(rows, unit))
}
