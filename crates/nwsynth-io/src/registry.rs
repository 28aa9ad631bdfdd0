//! Registry (deck) records and raw simulator output rows.
//!
//! Records are plain data: each deck table maps to one record type, read by a
//! [`crate::DeckAccessor`] implementation and shared behind `Arc`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use nwsynth_core::time::{first_of_month, hours_in_month};
use nwsynth_core::{SynthError, SynthResult};

/// Deck table names, used in file names and in missing-input errors.
pub mod tables {
    pub const CASE: &str = "case";
    pub const SUBMARKETS: &str = "submarkets";
    pub const RESERVOIR_GROUPS: &str = "reservoir_groups";
    pub const HYDRO_PLANTS: &str = "hydro_plants";
    pub const HYDRO_CHANGES: &str = "hydro_changes";
    pub const THERMAL_PLANTS: &str = "thermal_plants";
    pub const THERMAL_LIMITS: &str = "thermal_limits";
    pub const WIND_FARMS: &str = "wind_farms";
    pub const BLOCK_DURATIONS: &str = "block_durations";
    pub const EXCHANGE_LIMITS: &str = "exchange_limits";
    pub const EXCHANGE_BLOCK_FACTORS: &str = "exchange_block_factors";
    pub const STORED_ENERGY_CAPACITY: &str = "stored_energy_capacity";
    pub const SECURITY_CURVE: &str = "security_curve";
    pub const INITIAL_STORED_ENERGY: &str = "initial_stored_energy";
}

/// General case configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseConfig {
    /// First month of the study period (stage 1).
    pub study_start: NaiveDate,
    /// Number of study stages.
    pub study_stages: u32,
    /// Number of simulated scenarios.
    pub scenarios: u32,
    /// Number of load blocks per stage (excluding block 0).
    pub blocks: u32,
    /// Whether hydro plants were simulated individually.
    pub individualized_hydro: bool,
    /// Last stage simulated with individualized plants (`None` = whole study).
    pub individualized_stages: Option<u32>,
    /// Whether the case models wind-farm equivalents.
    pub has_wind: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmarketRecord {
    pub code: i32,
    pub name: String,
    /// Fictitious submarkets only route exchanges and have no outputs.
    pub fictitious: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservoirGroupRecord {
    pub code: i32,
    pub name: String,
    pub submarket_code: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydroPlantRecord {
    pub code: i32,
    pub name: String,
    pub group_code: i32,
    /// Plant immediately downstream (0 = outlet).
    pub downstream_code: i32,
    /// Specific productivity (MW per m3/s).
    pub productivity: f64,
    /// Minimum (dead) volume in hm3.
    pub min_volume: f64,
    /// Maximum volume in hm3.
    pub max_volume: f64,
    /// Maximum turbined flow in m3/s.
    pub max_turbined_flow: f64,
    /// Minimum total outflow in m3/s.
    pub min_outflow: f64,
    /// Initial useful volume as a percentage of the useful range.
    pub initial_volume_percent: f64,
}

impl HydroPlantRecord {
    /// Initial absolute stored volume in hm3.
    pub fn initial_volume(&self) -> f64 {
        self.min_volume + self.initial_volume_percent / 100.0 * (self.max_volume - self.min_volume)
    }
}

/// Kind of a hydro change record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChangeKind {
    MinVolume,
    MaxVolume,
    MinOutflow,
    MaxOutflow,
    MinTurbined,
    MaxTurbined,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::MinVolume => "VOLMIN",
            ChangeKind::MaxVolume => "VOLMAX",
            ChangeKind::MinOutflow => "VAZMIN",
            ChangeKind::MaxOutflow => "VAZMAX",
            ChangeKind::MinTurbined => "TURBMIN",
            ChangeKind::MaxTurbined => "TURBMAX",
        }
    }

    pub fn parse(s: &str) -> SynthResult<Self> {
        [
            ChangeKind::MinVolume,
            ChangeKind::MaxVolume,
            ChangeKind::MinOutflow,
            ChangeKind::MaxOutflow,
            ChangeKind::MinTurbined,
            ChangeKind::MaxTurbined,
        ]
        .into_iter()
        .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| SynthError::Parse(format!("unknown change kind '{s}'")))
    }
}

/// Unit of a change record value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeUnit {
    Hm3,
    M3s,
    Percent,
}

impl ChangeUnit {
    pub fn parse(s: &str) -> SynthResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hm3" | "h" => Ok(ChangeUnit::Hm3),
            "m3s" | "m3/s" => Ok(ChangeUnit::M3s),
            "%" | "percent" | "pct" => Ok(ChangeUnit::Percent),
            other => Err(SynthError::Parse(format!("unknown change unit '{other}'"))),
        }
    }
}

/// Override of a plant limit, for the whole horizon (`start == None`) or from
/// `start` until the next record of the same kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydroChangeRecord {
    pub plant_code: i32,
    pub kind: ChangeKind,
    pub start: Option<NaiveDate>,
    pub value: f64,
    pub unit: ChangeUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalPlantRecord {
    pub code: i32,
    pub name: String,
    pub submarket_code: i32,
}

/// Generation limits of a thermal plant for one stage, in MW.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalLimitRecord {
    pub plant_code: i32,
    pub start: NaiveDate,
    pub min_generation: f64,
    pub max_generation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindFarmRecord {
    pub code: i32,
    pub name: String,
    pub submarket_code: i32,
}

/// Duration of a load block as a fraction of its month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDurationRecord {
    pub start: NaiveDate,
    pub block: u32,
    pub fraction: f64,
}

impl BlockDurationRecord {
    pub fn hours(&self) -> f64 {
        self.fraction * hours_in_month(self.start)
    }
}

/// Average exchange limit (MWmed) between two submarkets from `start` on.
///
/// When `reverse` is set the limit applies from `target_code` to
/// `source_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeLimitRecord {
    pub source_code: i32,
    pub target_code: i32,
    pub reverse: bool,
    pub start: NaiveDate,
    pub limit: f64,
}

impl ExchangeLimitRecord {
    /// Direction of the limit as (from, to).
    pub fn direction(&self) -> (i32, i32) {
        if self.reverse {
            (self.target_code, self.source_code)
        } else {
            (self.source_code, self.target_code)
        }
    }
}

/// Per-block multiplier (p.u.) of an exchange limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeBlockFactorRecord {
    pub source_code: i32,
    pub target_code: i32,
    pub start: NaiveDate,
    pub block: u32,
    pub factor: f64,
}

/// Maximum storable energy of a reservoir group for one stage (MWmes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEnergyCapacityRecord {
    pub group_code: i32,
    pub start: NaiveDate,
    pub max_energy: f64,
}

/// Security curve of a reservoir group for one stage, as a percentage of
/// the maximum stored energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityCurveRecord {
    pub group_code: i32,
    pub start: NaiveDate,
    pub percent: f64,
}

/// Stored energy of a reservoir group at the start of the study (MWmes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialStoredEnergyRecord {
    pub group_code: i32,
    pub value: f64,
}

/// Selects the raw output file of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntitySelector {
    System,
    Submarket(i32),
    SubmarketPair(i32, i32),
    ReservoirGroup(i32),
    HydroPlant(i32),
    /// All thermal plants of a submarket, in one table.
    ThermalPlantsOf(i32),
    WindFarm(i32),
}

impl EntitySelector {
    /// File stem used by directory decks.
    pub fn file_stem(&self) -> String {
        match self {
            EntitySelector::System => "sin".to_string(),
            EntitySelector::Submarket(code) => format!("sbm_{code}"),
            EntitySelector::SubmarketPair(from, to) => format!("sbp_{from}_{to}"),
            EntitySelector::ReservoirGroup(code) => format!("ree_{code}"),
            EntitySelector::HydroPlant(code) => format!("uhe_{code}"),
            EntitySelector::ThermalPlantsOf(code) => format!("ute_sbm_{code}"),
            EntitySelector::WindFarm(code) => format!("pee_{code}"),
        }
    }
}

/// One raw output value as printed by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// Entity code inside multi-entity tables (thermal plants of a submarket).
    pub code: Option<i32>,
    /// Start of the month the value refers to.
    pub date: NaiveDate,
    pub scenario: u32,
    /// Load block; 0 is the whole stage.
    pub block: u32,
    pub value: f64,
}

impl RawRow {
    pub fn new(date: NaiveDate, scenario: u32, block: u32, value: f64) -> Self {
        Self {
            code: None,
            date: first_of_month(date),
            scenario,
            block,
            value,
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }
}

pub type RawTable = Vec<RawRow>;
