//! Case deck stored as a directory of CSV/Parquet tables.
//!
//! ```text
//! <case>/
//!   registry/<table>.csv|parquet        one file per deck table
//!   outputs/<VAR>_<RES>/<entity>.csv|parquet
//! ```
//!
//! Registry tables are parsed once per deck instance and shared afterwards.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use once_cell::sync::OnceCell;
use polars::prelude::DataFrame;
use tracing::debug;

use nwsynth_core::{SynthError, SynthResult, SynthesisKey};

use crate::accessor::{DeckAccessor, Records};
use crate::frames::*;
use crate::registry::*;

const EXTENSIONS: [&str; 2] = ["parquet", "csv"];

/// Directory-backed deck.
#[derive(Debug, Default)]
pub struct DirectoryDeck {
    root: PathBuf,
    case: OnceCell<Option<Arc<CaseConfig>>>,
    submarkets: OnceCell<Option<Records<SubmarketRecord>>>,
    reservoir_groups: OnceCell<Option<Records<ReservoirGroupRecord>>>,
    hydro_plants: OnceCell<Option<Records<HydroPlantRecord>>>,
    hydro_changes: OnceCell<Option<Records<HydroChangeRecord>>>,
    thermal_plants: OnceCell<Option<Records<ThermalPlantRecord>>>,
    thermal_limits: OnceCell<Option<Records<ThermalLimitRecord>>>,
    wind_farms: OnceCell<Option<Records<WindFarmRecord>>>,
    block_durations: OnceCell<Option<Records<BlockDurationRecord>>>,
    exchange_limits: OnceCell<Option<Records<ExchangeLimitRecord>>>,
    exchange_block_factors: OnceCell<Option<Records<ExchangeBlockFactorRecord>>>,
    stored_energy_capacity: OnceCell<Option<Records<StoredEnergyCapacityRecord>>>,
    security_curve: OnceCell<Option<Records<SecurityCurveRecord>>>,
    initial_stored_energy: OnceCell<Option<Records<InitialStoredEnergyRecord>>>,
}

impl DirectoryDeck {
    /// Open a case directory. Only the directory itself is checked here.
    pub fn open(root: impl AsRef<Path>) -> SynthResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(SynthError::Config(format!(
                "case directory not found or is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self {
            root,
            ..Self::default()
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn find(dir: &Path, stem: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{stem}.{ext}")))
            .find(|p| p.is_file())
    }

    fn load<T>(
        &self,
        name: &str,
        parse: fn(&DataFrame) -> Result<Vec<T>>,
    ) -> SynthResult<Option<Records<T>>> {
        let Some(path) = Self::find(&self.root.join("registry"), name) else {
            debug!(table = name, "registry table not present");
            return Ok(None);
        };
        let records = read_frame(&path)
            .and_then(|df| parse(&df))
            .map_err(|err| SynthError::Parse(format!("{}: {err:#}", path.display())))?;
        debug!(table = name, rows = records.len(), "loaded registry table");
        Ok(Some(Arc::new(records)))
    }
}

fn parse_case(df: &DataFrame) -> Result<Vec<CaseConfig>> {
    let starts = column_date(df, "study_start")?;
    let stages = column_i32(df, "study_stages")?;
    let scenarios = column_i32(df, "scenarios")?;
    let blocks = column_i32(df, "blocks")?;
    let individualized = column_bool(df, "individualized_hydro")?;
    let horizon = if has_column(df, "individualized_stages") {
        column_opt_i32(df, "individualized_stages")?
    } else {
        vec![None; df.height()]
    };
    let wind = column_bool(df, "has_wind")?;
    (0..df.height())
        .map(|i| {
            Ok(CaseConfig {
                study_start: nwsynth_core::time::first_of_month(starts[i]),
                study_stages: non_negative(stages[i], "study_stages")?,
                scenarios: non_negative(scenarios[i], "scenarios")?,
                blocks: non_negative(blocks[i], "blocks")?,
                individualized_hydro: individualized[i],
                individualized_stages: horizon[i]
                    .map(|h| non_negative(h, "individualized_stages"))
                    .transpose()?,
                has_wind: wind[i],
            })
        })
        .collect()
}

fn column_opt_i32(df: &DataFrame, name: &str) -> Result<Vec<Option<i32>>> {
    let series = df
        .column(name)?
        .cast(&polars::prelude::DataType::Int32)?;
    Ok(series.i32()?.into_iter().collect())
}

fn non_negative(value: i32, name: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("'{name}' must be non-negative, got {value}"))
}

fn parse_submarkets(df: &DataFrame) -> Result<Vec<SubmarketRecord>> {
    let codes = column_i32(df, "code")?;
    let names = column_str(df, "name")?;
    let fictitious = if has_column(df, "fictitious") {
        column_bool(df, "fictitious")?
    } else {
        vec![false; df.height()]
    };
    Ok((0..df.height())
        .map(|i| SubmarketRecord {
            code: codes[i],
            name: names[i].clone(),
            fictitious: fictitious[i],
        })
        .collect())
}

fn parse_reservoir_groups(df: &DataFrame) -> Result<Vec<ReservoirGroupRecord>> {
    let codes = column_i32(df, "code")?;
    let names = column_str(df, "name")?;
    let submarkets = column_i32(df, "submarket_code")?;
    Ok((0..df.height())
        .map(|i| ReservoirGroupRecord {
            code: codes[i],
            name: names[i].clone(),
            submarket_code: submarkets[i],
        })
        .collect())
}

fn parse_hydro_plants(df: &DataFrame) -> Result<Vec<HydroPlantRecord>> {
    let codes = column_i32(df, "code")?;
    let names = column_str(df, "name")?;
    let groups = column_i32(df, "group_code")?;
    let downstream = column_i32(df, "downstream_code")?;
    let productivity = column_f64(df, "productivity")?;
    let min_volume = column_f64(df, "min_volume")?;
    let max_volume = column_f64(df, "max_volume")?;
    let max_turbined = column_f64(df, "max_turbined_flow")?;
    let min_outflow = column_f64(df, "min_outflow")?;
    let initial = column_f64(df, "initial_volume_percent")?;
    Ok((0..df.height())
        .map(|i| HydroPlantRecord {
            code: codes[i],
            name: names[i].clone(),
            group_code: groups[i],
            downstream_code: downstream[i],
            productivity: productivity[i],
            min_volume: min_volume[i],
            max_volume: max_volume[i],
            max_turbined_flow: max_turbined[i],
            min_outflow: min_outflow[i],
            initial_volume_percent: initial[i],
        })
        .collect())
}

fn parse_hydro_changes(df: &DataFrame) -> Result<Vec<HydroChangeRecord>> {
    let plants = column_i32(df, "plant_code")?;
    let kinds = column_str(df, "kind")?;
    let starts = column_opt_date(df, "start")?;
    let values = column_f64(df, "value")?;
    let units = column_str(df, "unit")?;
    (0..df.height())
        .map(|i| {
            Ok(HydroChangeRecord {
                plant_code: plants[i],
                kind: ChangeKind::parse(&kinds[i])?,
                start: starts[i],
                value: values[i],
                unit: ChangeUnit::parse(&units[i])?,
            })
        })
        .collect()
}

fn parse_thermal_plants(df: &DataFrame) -> Result<Vec<ThermalPlantRecord>> {
    let codes = column_i32(df, "code")?;
    let names = column_str(df, "name")?;
    let submarkets = column_i32(df, "submarket_code")?;
    Ok((0..df.height())
        .map(|i| ThermalPlantRecord {
            code: codes[i],
            name: names[i].clone(),
            submarket_code: submarkets[i],
        })
        .collect())
}

fn parse_thermal_limits(df: &DataFrame) -> Result<Vec<ThermalLimitRecord>> {
    let plants = column_i32(df, "plant_code")?;
    let starts = column_date(df, "start")?;
    let mins = column_f64(df, "min_generation")?;
    let maxs = column_f64(df, "max_generation")?;
    Ok((0..df.height())
        .map(|i| ThermalLimitRecord {
            plant_code: plants[i],
            start: starts[i],
            min_generation: mins[i],
            max_generation: maxs[i],
        })
        .collect())
}

fn parse_wind_farms(df: &DataFrame) -> Result<Vec<WindFarmRecord>> {
    let codes = column_i32(df, "code")?;
    let names = column_str(df, "name")?;
    let submarkets = column_i32(df, "submarket_code")?;
    Ok((0..df.height())
        .map(|i| WindFarmRecord {
            code: codes[i],
            name: names[i].clone(),
            submarket_code: submarkets[i],
        })
        .collect())
}

fn parse_block_durations(df: &DataFrame) -> Result<Vec<BlockDurationRecord>> {
    let starts = column_date(df, "start")?;
    let blocks = column_i32(df, "block")?;
    let fractions = column_f64(df, "fraction")?;
    (0..df.height())
        .map(|i| {
            Ok(BlockDurationRecord {
                start: nwsynth_core::time::first_of_month(starts[i]),
                block: non_negative(blocks[i], "block")?,
                fraction: fractions[i],
            })
        })
        .collect()
}

fn parse_exchange_limits(df: &DataFrame) -> Result<Vec<ExchangeLimitRecord>> {
    let sources = column_i32(df, "source_code")?;
    let targets = column_i32(df, "target_code")?;
    let reverse = column_bool(df, "reverse")?;
    let starts = column_date(df, "start")?;
    let limits = column_f64(df, "limit")?;
    Ok((0..df.height())
        .map(|i| ExchangeLimitRecord {
            source_code: sources[i],
            target_code: targets[i],
            reverse: reverse[i],
            start: starts[i],
            limit: limits[i],
        })
        .collect())
}

fn parse_exchange_block_factors(df: &DataFrame) -> Result<Vec<ExchangeBlockFactorRecord>> {
    let sources = column_i32(df, "source_code")?;
    let targets = column_i32(df, "target_code")?;
    let starts = column_date(df, "start")?;
    let blocks = column_i32(df, "block")?;
    let factors = column_f64(df, "factor")?;
    (0..df.height())
        .map(|i| {
            Ok(ExchangeBlockFactorRecord {
                source_code: sources[i],
                target_code: targets[i],
                start: starts[i],
                block: non_negative(blocks[i], "block")?,
                factor: factors[i],
            })
        })
        .collect()
}

fn parse_stored_energy_capacity(df: &DataFrame) -> Result<Vec<StoredEnergyCapacityRecord>> {
    let groups = column_i32(df, "group_code")?;
    let starts = column_date(df, "start")?;
    let values = column_f64(df, "max_energy")?;
    Ok((0..df.height())
        .map(|i| StoredEnergyCapacityRecord {
            group_code: groups[i],
            start: starts[i],
            max_energy: values[i],
        })
        .collect())
}

fn parse_security_curve(df: &DataFrame) -> Result<Vec<SecurityCurveRecord>> {
    let groups = column_i32(df, "group_code")?;
    let starts = column_date(df, "start")?;
    let values = column_f64(df, "percent")?;
    Ok((0..df.height())
        .map(|i| SecurityCurveRecord {
            group_code: groups[i],
            start: starts[i],
            percent: values[i],
        })
        .collect())
}

fn parse_initial_stored_energy(df: &DataFrame) -> Result<Vec<InitialStoredEnergyRecord>> {
    let groups = column_i32(df, "group_code")?;
    let values = column_f64(df, "value")?;
    Ok((0..df.height())
        .map(|i| InitialStoredEnergyRecord {
            group_code: groups[i],
            value: values[i],
        })
        .collect())
}

macro_rules! memoized {
    ($method:ident, $table:expr, $parse:ident, $record:ty) => {
        fn $method(&self) -> SynthResult<Option<Records<$record>>> {
            self.$method
                .get_or_try_init(|| self.load($table, $parse))
                .cloned()
        }
    };
}

impl DeckAccessor for DirectoryDeck {
    fn case(&self) -> SynthResult<Option<Arc<CaseConfig>>> {
        self.case
            .get_or_try_init(|| {
                let Some(rows) = self.load(tables::CASE, parse_case)? else {
                    return Ok(None);
                };
                match rows.as_slice() {
                    [case] => Ok(Some(Arc::new(case.clone()))),
                    other => Err(SynthError::Validation(format!(
                        "case table must have exactly one row, found {}",
                        other.len()
                    ))),
                }
            })
            .cloned()
    }

    memoized!(submarkets, tables::SUBMARKETS, parse_submarkets, SubmarketRecord);
    memoized!(
        reservoir_groups,
        tables::RESERVOIR_GROUPS,
        parse_reservoir_groups,
        ReservoirGroupRecord
    );
    memoized!(hydro_plants, tables::HYDRO_PLANTS, parse_hydro_plants, HydroPlantRecord);
    memoized!(hydro_changes, tables::HYDRO_CHANGES, parse_hydro_changes, HydroChangeRecord);
    memoized!(
        thermal_plants,
        tables::THERMAL_PLANTS,
        parse_thermal_plants,
        ThermalPlantRecord
    );
    memoized!(
        thermal_limits,
        tables::THERMAL_LIMITS,
        parse_thermal_limits,
        ThermalLimitRecord
    );
    memoized!(wind_farms, tables::WIND_FARMS, parse_wind_farms, WindFarmRecord);
    memoized!(
        block_durations,
        tables::BLOCK_DURATIONS,
        parse_block_durations,
        BlockDurationRecord
    );
    memoized!(
        exchange_limits,
        tables::EXCHANGE_LIMITS,
        parse_exchange_limits,
        ExchangeLimitRecord
    );
    memoized!(
        exchange_block_factors,
        tables::EXCHANGE_BLOCK_FACTORS,
        parse_exchange_block_factors,
        ExchangeBlockFactorRecord
    );
    memoized!(
        stored_energy_capacity,
        tables::STORED_ENERGY_CAPACITY,
        parse_stored_energy_capacity,
        StoredEnergyCapacityRecord
    );
    memoized!(
        security_curve,
        tables::SECURITY_CURVE,
        parse_security_curve,
        SecurityCurveRecord
    );
    memoized!(
        initial_stored_energy,
        tables::INITIAL_STORED_ENERGY,
        parse_initial_stored_energy,
        InitialStoredEnergyRecord
    );

    fn raw_output(
        &self,
        key: SynthesisKey,
        selector: EntitySelector,
    ) -> SynthResult<Option<RawTable>> {
        let dir = self.root.join("outputs").join(key.to_string());
        let Some(path) = Self::find(&dir, &selector.file_stem()) else {
            return Ok(None);
        };
        read_frame(&path)
            .and_then(|df| raw_table_from_frame(&df))
            .map(Some)
            .map_err(|err| SynthError::Parse(format!("{}: {err:#}", path.display())))
    }
}
