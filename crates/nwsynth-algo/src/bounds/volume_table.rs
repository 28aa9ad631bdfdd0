//! Per-plant, per-stage volume and flow limits: the hydro registry with its
//! change records applied.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use nwsynth_core::time::first_of_month;
use nwsynth_core::{SynthError, SynthResult};
use nwsynth_io::{
    required, tables, ChangeKind, ChangeUnit, DeckAccessor, HydroChangeRecord, HydroPlantRecord,
};

/// Absolute limits of one plant in one stage. Volumes in hm3, flows in m3/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantLimits {
    pub min_volume: f64,
    pub max_volume: f64,
    pub min_outflow: f64,
    pub max_outflow: f64,
    pub min_turbined: f64,
    pub max_turbined: f64,
}

impl PlantLimits {
    pub fn from_registry(plant: &HydroPlantRecord) -> Self {
        Self {
            min_volume: plant.min_volume,
            max_volume: plant.max_volume,
            min_outflow: plant.min_outflow,
            max_outflow: f64::INFINITY,
            min_turbined: 0.0,
            max_turbined: plant.max_turbined_flow,
        }
    }

    fn set(&mut self, kind: ChangeKind, value: f64) {
        match kind {
            ChangeKind::MinVolume => self.min_volume = value,
            ChangeKind::MaxVolume => self.max_volume = value,
            ChangeKind::MinOutflow => self.min_outflow = value,
            ChangeKind::MaxOutflow => self.max_outflow = value,
            ChangeKind::MinTurbined => self.min_turbined = value,
            ChangeKind::MaxTurbined => self.max_turbined = value,
        }
    }
}

const KINDS: [ChangeKind; 6] = [
    ChangeKind::MinVolume,
    ChangeKind::MaxVolume,
    ChangeKind::MinOutflow,
    ChangeKind::MaxOutflow,
    ChangeKind::MinTurbined,
    ChangeKind::MaxTurbined,
];

fn is_volume(kind: ChangeKind) -> bool {
    matches!(kind, ChangeKind::MinVolume | ChangeKind::MaxVolume)
}

fn check_unit(record: &HydroChangeRecord) -> SynthResult<()> {
    let valid = match record.unit {
        ChangeUnit::Hm3 | ChangeUnit::Percent => is_volume(record.kind),
        ChangeUnit::M3s => !is_volume(record.kind),
    };
    if valid {
        Ok(())
    } else {
        Err(SynthError::Validation(format!(
            "plant {}: {} change given in {:?}",
            record.plant_code,
            record.kind.as_str(),
            record.unit
        )))
    }
}

/// Record of `kind` in force at `start`: the latest one starting on or
/// before it, where records without a start date apply from the beginning.
fn in_force<'a>(
    records: &[&'a HydroChangeRecord],
    kind: ChangeKind,
    start: NaiveDate,
) -> Option<&'a HydroChangeRecord> {
    records
        .iter()
        .filter(|r| r.kind == kind)
        .filter(|r| r.start.map_or(true, |s| first_of_month(s) <= start))
        .max_by_key(|r| r.start.map(first_of_month))
        .copied()
}

/// Limits of one plant at the stage starting at `start`.
pub fn limits_at(
    plant: &HydroPlantRecord,
    changes: &[&HydroChangeRecord],
    start: NaiveDate,
) -> PlantLimits {
    let mut limits = PlantLimits::from_registry(plant);
    let active: Vec<&HydroChangeRecord> = KINDS
        .iter()
        .filter_map(|kind| in_force(changes, *kind, start))
        .collect();
    for record in active.iter().filter(|r| r.unit != ChangeUnit::Percent) {
        limits.set(record.kind, record.value);
    }
    let (min, max) = (limits.min_volume, limits.max_volume);
    for record in active.iter().filter(|r| r.unit == ChangeUnit::Percent) {
        limits.set(record.kind, min + record.value / 100.0 * (max - min));
    }
    limits
}

/// Limits of every plant at every stage start.
#[derive(Debug, Clone, Default)]
pub struct HydroLimitTable {
    limits: BTreeMap<(i32, NaiveDate), PlantLimits>,
}

impl HydroLimitTable {
    pub fn build(
        plants: &[HydroPlantRecord],
        changes: &[HydroChangeRecord],
        starts: &[NaiveDate],
    ) -> SynthResult<Self> {
        let mut by_plant: HashMap<i32, Vec<&HydroChangeRecord>> = HashMap::new();
        for record in changes {
            check_unit(record)?;
            by_plant.entry(record.plant_code).or_default().push(record);
        }
        let mut limits = BTreeMap::new();
        for plant in plants {
            let records = by_plant.get(&plant.code).map(Vec::as_slice).unwrap_or(&[]);
            for start in starts {
                limits.insert((plant.code, *start), limits_at(plant, records, *start));
            }
        }
        Ok(Self { limits })
    }

    /// Table for the deck's plants over `starts`. The change table is
    /// optional; without it the registry limits hold for the whole study.
    pub fn load(deck: &dyn DeckAccessor, starts: &[NaiveDate]) -> SynthResult<Self> {
        let plants = required(tables::HYDRO_PLANTS, deck.hydro_plants())?;
        let changes = deck.hydro_changes()?;
        let changes = changes.as_ref().map(|c| c.as_slice()).unwrap_or(&[]);
        Self::build(&plants, changes, starts)
    }

    pub fn get(&self, plant: i32, start: NaiveDate) -> Option<&PlantLimits> {
        self.limits.get(&(plant, start))
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}
