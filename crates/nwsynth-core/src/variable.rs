//! Catalog of synthesized operation variables.
//!
//! Each [`Variable`] knows its short code, long name and [`Unit`], the
//! resolutions at which the simulator prints it directly, and the full set of
//! resolutions at which it can be synthesized (directly or through a rule).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SynthError;
use crate::resolution::SpatialResolution;
use crate::units::Unit;

use SpatialResolution::{
    HydroPlant as UHE, ReservoirGroup as REE, Submarket as SBM, SubmarketPair as SBP,
    System as SIN, ThermalPlant as UTE, WindFarm as PEE,
};

const PLANT_AND_ROLL_UPS: &[SpatialResolution] = &[SIN, SBM, REE, UHE];
const GROUP_AND_UP: &[SpatialResolution] = &[SIN, SBM, REE];

/// Operation variable produced by the synthesis pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Variable {
    MarginalCost,
    WaterValue,
    ThermalGenerationCost,
    OperationCost,
    StoredEnergyInitial,
    StoredEnergyFinal,
    StoredEnergyPercentInitial,
    StoredEnergyPercentFinal,
    NaturalInflowEnergy,
    SpilledEnergy,
    SpilledEnergyReservoir,
    SpilledEnergyRunOfRiver,
    MinOutflowEnergyGoal,
    MinOutflowEnergyViolation,
    MinOutflowEnergy,
    HydroGeneration,
    ThermalGeneration,
    WindGeneration,
    WindSpeed,
    Exchange,
    Deficit,
    Demand,
    InflowFlow,
    IncrementalFlow,
    TurbinedFlow,
    SpilledFlow,
    OutflowFlow,
    WithdrawnFlow,
    DivertedFlow,
    EvaporatedFlow,
    InflowVolume,
    IncrementalVolume,
    TurbinedVolume,
    SpilledVolume,
    OutflowVolume,
    WithdrawnVolume,
    DivertedVolume,
    EvaporatedVolume,
    StoredVolumeInitial,
    StoredVolumeFinal,
    StoredVolumePercentInitial,
    StoredVolumePercentFinal,
    EvaporationViolationPositive,
    EvaporationViolationNegative,
    EvaporationViolation,
    ProductionFunctionViolation,
}

impl Variable {
    pub const ALL: [Variable; 46] = [
        Variable::MarginalCost,
        Variable::WaterValue,
        Variable::ThermalGenerationCost,
        Variable::OperationCost,
        Variable::StoredEnergyInitial,
        Variable::StoredEnergyFinal,
        Variable::StoredEnergyPercentInitial,
        Variable::StoredEnergyPercentFinal,
        Variable::NaturalInflowEnergy,
        Variable::SpilledEnergy,
        Variable::SpilledEnergyReservoir,
        Variable::SpilledEnergyRunOfRiver,
        Variable::MinOutflowEnergyGoal,
        Variable::MinOutflowEnergyViolation,
        Variable::MinOutflowEnergy,
        Variable::HydroGeneration,
        Variable::ThermalGeneration,
        Variable::WindGeneration,
        Variable::WindSpeed,
        Variable::Exchange,
        Variable::Deficit,
        Variable::Demand,
        Variable::InflowFlow,
        Variable::IncrementalFlow,
        Variable::TurbinedFlow,
        Variable::SpilledFlow,
        Variable::OutflowFlow,
        Variable::WithdrawnFlow,
        Variable::DivertedFlow,
        Variable::EvaporatedFlow,
        Variable::InflowVolume,
        Variable::IncrementalVolume,
        Variable::TurbinedVolume,
        Variable::SpilledVolume,
        Variable::OutflowVolume,
        Variable::WithdrawnVolume,
        Variable::DivertedVolume,
        Variable::EvaporatedVolume,
        Variable::StoredVolumeInitial,
        Variable::StoredVolumeFinal,
        Variable::StoredVolumePercentInitial,
        Variable::StoredVolumePercentFinal,
        Variable::EvaporationViolationPositive,
        Variable::EvaporationViolationNegative,
        Variable::EvaporationViolation,
        Variable::ProductionFunctionViolation,
    ];

    /// Short code used in synthesis names (e.g. `EVER`).
    pub fn short_name(&self) -> &'static str {
        use Variable::*;
        match self {
            MarginalCost => "CMO",
            WaterValue => "VAGUA",
            ThermalGenerationCost => "CTER",
            OperationCost => "COP",
            StoredEnergyInitial => "EARMI",
            StoredEnergyFinal => "EARMF",
            StoredEnergyPercentInitial => "EARPI",
            StoredEnergyPercentFinal => "EARPF",
            NaturalInflowEnergy => "ENAA",
            SpilledEnergy => "EVER",
            SpilledEnergyReservoir => "EVERR",
            SpilledEnergyRunOfRiver => "EVERF",
            MinOutflowEnergyGoal => "MEVMIN",
            MinOutflowEnergyViolation => "VEVMIN",
            MinOutflowEnergy => "EVMIN",
            HydroGeneration => "GHID",
            ThermalGeneration => "GTER",
            WindGeneration => "GEOL",
            WindSpeed => "VENTO",
            Exchange => "INT",
            Deficit => "DEF",
            Demand => "MER",
            InflowFlow => "QAFL",
            IncrementalFlow => "QINC",
            TurbinedFlow => "QTUR",
            SpilledFlow => "QVER",
            OutflowFlow => "QDEF",
            WithdrawnFlow => "QRET",
            DivertedFlow => "QDES",
            EvaporatedFlow => "QEVP",
            InflowVolume => "VAFL",
            IncrementalVolume => "VINC",
            TurbinedVolume => "VTUR",
            SpilledVolume => "VVER",
            OutflowVolume => "VDEF",
            WithdrawnVolume => "VRET",
            DivertedVolume => "VDES",
            EvaporatedVolume => "VEVP",
            StoredVolumeInitial => "VARMI",
            StoredVolumeFinal => "VARMF",
            StoredVolumePercentInitial => "VARPI",
            StoredVolumePercentFinal => "VARPF",
            EvaporationViolationPositive => "VPOSEVAP",
            EvaporationViolationNegative => "VNEGEVAP",
            EvaporationViolation => "VEVAP",
            ProductionFunctionViolation => "VFPHA",
        }
    }

    pub fn long_name(&self) -> &'static str {
        use Variable::*;
        match self {
            MarginalCost => "Marginal Operating Cost",
            WaterValue => "Water Value",
            ThermalGenerationCost => "Thermal Generation Cost",
            OperationCost => "Operation Cost",
            StoredEnergyInitial => "Initial Stored Energy",
            StoredEnergyFinal => "Final Stored Energy",
            StoredEnergyPercentInitial => "Initial Stored Energy (Percent)",
            StoredEnergyPercentFinal => "Final Stored Energy (Percent)",
            NaturalInflowEnergy => "Natural Inflow Energy",
            SpilledEnergy => "Spilled Energy",
            SpilledEnergyReservoir => "Spilled Energy (Reservoir Plants)",
            SpilledEnergyRunOfRiver => "Spilled Energy (Run-of-River Plants)",
            MinOutflowEnergyGoal => "Minimum Outflow Energy Goal",
            MinOutflowEnergyViolation => "Minimum Outflow Energy Violation",
            MinOutflowEnergy => "Minimum Outflow Energy",
            HydroGeneration => "Hydro Generation",
            ThermalGeneration => "Thermal Generation",
            WindGeneration => "Wind Generation",
            WindSpeed => "Wind Speed",
            Exchange => "Exchange",
            Deficit => "Deficit",
            Demand => "Demand",
            InflowFlow => "Inflow",
            IncrementalFlow => "Incremental Inflow",
            TurbinedFlow => "Turbined Flow",
            SpilledFlow => "Spilled Flow",
            OutflowFlow => "Outflow",
            WithdrawnFlow => "Withdrawn Flow",
            DivertedFlow => "Diverted Flow",
            EvaporatedFlow => "Evaporated Flow",
            InflowVolume => "Inflow Volume",
            IncrementalVolume => "Incremental Inflow Volume",
            TurbinedVolume => "Turbined Volume",
            SpilledVolume => "Spilled Volume",
            OutflowVolume => "Outflow Volume",
            WithdrawnVolume => "Withdrawn Volume",
            DivertedVolume => "Diverted Volume",
            EvaporatedVolume => "Evaporated Volume",
            StoredVolumeInitial => "Initial Stored Volume",
            StoredVolumeFinal => "Final Stored Volume",
            StoredVolumePercentInitial => "Initial Stored Volume (Percent)",
            StoredVolumePercentFinal => "Final Stored Volume (Percent)",
            EvaporationViolationPositive => "Positive Evaporation Violation",
            EvaporationViolationNegative => "Negative Evaporation Violation",
            EvaporationViolation => "Evaporation Violation",
            ProductionFunctionViolation => "Production Function Violation",
        }
    }

    pub fn unit(&self) -> Unit {
        use Variable::*;
        match self {
            MarginalCost => Unit::CurrencyPerMwh,
            WaterValue => Unit::CurrencyPerHm3,
            ThermalGenerationCost | OperationCost => Unit::Currency,
            StoredEnergyPercentInitial
            | StoredEnergyPercentFinal
            | StoredVolumePercentInitial
            | StoredVolumePercentFinal => Unit::Percent,
            Exchange => Unit::Mwh,
            WindSpeed => Unit::MetersPerSecond,
            InflowFlow | IncrementalFlow | TurbinedFlow | SpilledFlow | OutflowFlow
            | WithdrawnFlow | DivertedFlow | EvaporatedFlow => Unit::M3s,
            InflowVolume
            | IncrementalVolume
            | TurbinedVolume
            | SpilledVolume
            | OutflowVolume
            | WithdrawnVolume
            | DivertedVolume
            | EvaporatedVolume
            | StoredVolumeInitial
            | StoredVolumeFinal
            | EvaporationViolationPositive
            | EvaporationViolationNegative
            | EvaporationViolation => Unit::Hm3,
            StoredEnergyInitial
            | StoredEnergyFinal
            | NaturalInflowEnergy
            | SpilledEnergy
            | SpilledEnergyReservoir
            | SpilledEnergyRunOfRiver
            | MinOutflowEnergyGoal
            | MinOutflowEnergyViolation
            | MinOutflowEnergy
            | HydroGeneration
            | ThermalGeneration
            | WindGeneration
            | Deficit
            | Demand
            | ProductionFunctionViolation => Unit::MwMonth,
        }
    }

    /// Resolutions at which the simulator prints this variable.
    pub fn native_resolutions(&self) -> &'static [SpatialResolution] {
        use Variable::*;
        match self {
            MarginalCost => &[SBM],
            WaterValue => &[REE, UHE],
            ThermalGenerationCost => &[SIN, SBM],
            OperationCost => &[SIN],
            StoredEnergyFinal
            | StoredEnergyPercentFinal
            | NaturalInflowEnergy
            | SpilledEnergyReservoir
            | SpilledEnergyRunOfRiver
            | MinOutflowEnergyGoal
            | MinOutflowEnergyViolation => GROUP_AND_UP,
            HydroGeneration => PLANT_AND_ROLL_UPS,
            ThermalGeneration => &[SIN, SBM, UTE],
            WindGeneration => &[SIN, SBM, PEE],
            WindSpeed => &[PEE],
            Exchange => &[SBP],
            Deficit | Demand => &[SIN, SBM],
            InflowFlow
            | IncrementalFlow
            | TurbinedVolume
            | SpilledVolume
            | WithdrawnVolume
            | DivertedVolume
            | EvaporatedVolume
            | StoredVolumeFinal
            | EvaporationViolationPositive
            | EvaporationViolationNegative
            | ProductionFunctionViolation => &[UHE],
            StoredEnergyInitial
            | StoredEnergyPercentInitial
            | SpilledEnergy
            | MinOutflowEnergy
            | TurbinedFlow
            | SpilledFlow
            | OutflowFlow
            | WithdrawnFlow
            | DivertedFlow
            | EvaporatedFlow
            | InflowVolume
            | IncrementalVolume
            | OutflowVolume
            | StoredVolumeInitial
            | StoredVolumePercentInitial
            | StoredVolumePercentFinal
            | EvaporationViolation => &[],
        }
    }

    /// Every resolution at which this variable can be synthesized.
    pub fn resolutions(&self) -> &'static [SpatialResolution] {
        use Variable::*;
        match self {
            StoredEnergyInitial | StoredEnergyFinal => PLANT_AND_ROLL_UPS,
            StoredEnergyPercentInitial | SpilledEnergy | MinOutflowEnergy => GROUP_AND_UP,
            v if v.rolls_up_from_plants() => PLANT_AND_ROLL_UPS,
            StoredVolumePercentInitial | StoredVolumePercentFinal => PLANT_AND_ROLL_UPS,
            v => v.native_resolutions(),
        }
    }

    /// Plant-level variables whose coarser resolutions are sums of the plant table.
    pub fn rolls_up_from_plants(&self) -> bool {
        use Variable::*;
        matches!(
            self,
            InflowFlow
                | IncrementalFlow
                | TurbinedFlow
                | SpilledFlow
                | OutflowFlow
                | WithdrawnFlow
                | DivertedFlow
                | EvaporatedFlow
                | InflowVolume
                | IncrementalVolume
                | TurbinedVolume
                | SpilledVolume
                | OutflowVolume
                | WithdrawnVolume
                | DivertedVolume
                | EvaporatedVolume
                | StoredVolumeInitial
                | StoredVolumeFinal
                | EvaporationViolationPositive
                | EvaporationViolationNegative
                | EvaporationViolation
                | ProductionFunctionViolation
        )
    }

    /// Variables that only exist when the case has wind-farm equivalents.
    pub fn requires_wind(&self) -> bool {
        matches!(self, Variable::WindGeneration | Variable::WindSpeed)
    }

    /// Variables only printed when hydro plants are individualized.
    pub fn requires_individualized_hydro(&self) -> bool {
        use Variable::*;
        matches!(
            self,
            EvaporatedFlow
                | EvaporatedVolume
                | EvaporationViolationPositive
                | EvaporationViolationNegative
                | EvaporationViolation
                | ProductionFunctionViolation
        )
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for Variable {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variable::ALL
            .iter()
            .copied()
            .find(|v| v.short_name() == s)
            .ok_or_else(|| SynthError::Parse(format!("unknown variable '{s}'")))
    }
}
