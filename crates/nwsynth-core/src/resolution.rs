//! Spatial resolutions (aggregation levels) and their table schemas.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SynthError;

/// Aggregation level of a synthesis.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum SpatialResolution {
    /// Whole interconnected system (SIN)
    System,
    /// Submarket (SBM)
    Submarket,
    /// Ordered pair of submarkets (SBP)
    SubmarketPair,
    /// Reservoir-equivalent group (REE)
    ReservoirGroup,
    /// Individual hydro plant (UHE)
    HydroPlant,
    /// Individual thermal plant (UTE)
    ThermalPlant,
    /// Wind-farm equivalent (PEE)
    WindFarm,
}

impl SpatialResolution {
    pub const ALL: [SpatialResolution; 7] = [
        SpatialResolution::System,
        SpatialResolution::Submarket,
        SpatialResolution::SubmarketPair,
        SpatialResolution::ReservoirGroup,
        SpatialResolution::HydroPlant,
        SpatialResolution::ThermalPlant,
        SpatialResolution::WindFarm,
    ];

    /// Short code used in synthesis names.
    pub fn short_name(&self) -> &'static str {
        match self {
            SpatialResolution::System => "SIN",
            SpatialResolution::Submarket => "SBM",
            SpatialResolution::SubmarketPair => "SBP",
            SpatialResolution::ReservoirGroup => "REE",
            SpatialResolution::HydroPlant => "UHE",
            SpatialResolution::ThermalPlant => "UTE",
            SpatialResolution::WindFarm => "PEE",
        }
    }

    pub fn long_name(&self) -> &'static str {
        match self {
            SpatialResolution::System => "Interconnected System",
            SpatialResolution::Submarket => "Submarket",
            SpatialResolution::SubmarketPair => "Submarket Pair",
            SpatialResolution::ReservoirGroup => "Reservoir-Equivalent Group",
            SpatialResolution::HydroPlant => "Hydro Plant",
            SpatialResolution::ThermalPlant => "Thermal Plant",
            SpatialResolution::WindFarm => "Wind-Farm Equivalent",
        }
    }

    /// Entity-identifying columns, as (code column, name column) pairs.
    ///
    /// The set is fixed per resolution; [`crate::Entity::labels`] yields one
    /// (code, name) pair per entry, in this order.
    pub fn entity_columns(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            SpatialResolution::System => &[],
            SpatialResolution::Submarket => &[("submarket_code", "submarket")],
            SpatialResolution::SubmarketPair => &[
                ("source_submarket_code", "source_submarket"),
                ("target_submarket_code", "target_submarket"),
            ],
            SpatialResolution::ReservoirGroup => &[
                ("group_code", "group"),
                ("submarket_code", "submarket"),
            ],
            SpatialResolution::HydroPlant => &[
                ("hydro_code", "hydro"),
                ("group_code", "group"),
                ("submarket_code", "submarket"),
            ],
            SpatialResolution::ThermalPlant => &[
                ("thermal_code", "thermal"),
                ("submarket_code", "submarket"),
            ],
            SpatialResolution::WindFarm => &[
                ("wind_code", "wind"),
                ("submarket_code", "submarket"),
            ],
        }
    }

    /// Canonical sort columns: primary entity codes, then time and scenario.
    pub fn sort_columns(&self) -> Vec<&'static str> {
        let mut columns: Vec<&'static str> = match self {
            SpatialResolution::SubmarketPair => {
                vec!["source_submarket_code", "target_submarket_code"]
            }
            other => other
                .entity_columns()
                .first()
                .map(|(code, _)| vec![*code])
                .unwrap_or_default(),
        };
        columns.extend(["stage", "scenario", "block"]);
        columns
    }

    /// Whether `self` can be obtained by summing entities of `finer`.
    pub fn is_coarser_than(&self, finer: SpatialResolution) -> bool {
        use SpatialResolution::*;
        match (finer, self) {
            (HydroPlant, ReservoirGroup | Submarket | System) => true,
            (ReservoirGroup, Submarket | System) => true,
            (ThermalPlant | WindFarm, Submarket | System) => true,
            (Submarket, System) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SpatialResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for SpatialResolution {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpatialResolution::ALL
            .iter()
            .copied()
            .find(|r| r.short_name() == s)
            .ok_or_else(|| SynthError::Parse(format!("unknown spatial resolution '{s}'")))
    }
}
