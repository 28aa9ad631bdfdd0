//! Units of the synthesized variables and the hydro conversion constants.
//!
//! Every variable is reported in one [`Unit`]. Units also decide how the
//! synthetic block 0 ("whole stage") is derived from the real load blocks:
//! additive quantities (energy, volume, cost) are summed, intensive ones
//! (flows, rates, percentages) are averaged weighted by block duration over
//! the nominal stage length.
//!
//! # Volume and flow
//!
//! The simulator works with monthly stages of [`STAGE_DURATION_HOURS`] hours.
//! One cubic meter per second sustained for a whole nominal month is 2.63
//! cubic hectometers, so
//!
//! ```text
//! flow = volume * STAGE_DURATION_HOURS / (HM3_PER_M3S_MONTH * block_hours)
//! volume = flow * HM3_PER_M3S_MONTH * block_hours / STAGE_DURATION_HOURS
//! ```
//!
//! ```
//! use nwsynth_core::units::{CubicMetersPerSecond, Hectometers3};
//!
//! let v = Hectometers3(263.0);
//! let q = v.to_flow(730.0);
//! assert!((q.value() - 100.0).abs() < 1e-9);
//! assert!((q.to_volume(730.0).value() - 263.0).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Nominal stage (month) duration used by the simulator, in hours.
pub const STAGE_DURATION_HOURS: f64 = 730.0;

/// Cubic hectometers moved by one m3/s over a nominal month.
pub const HM3_PER_M3S_MONTH: f64 = 2.63;

/// Convert a volume over a block into the mean flow for that block.
#[inline]
pub fn volume_to_flow(volume: f64, block_hours: f64) -> f64 {
    volume * STAGE_DURATION_HOURS / (HM3_PER_M3S_MONTH * block_hours)
}

/// Convert a mean flow over a block into the volume it moves.
#[inline]
pub fn flow_to_volume(flow: f64, block_hours: f64) -> f64 {
    flow * HM3_PER_M3S_MONTH * block_hours / STAGE_DURATION_HOURS
}

/// Round half away from zero to `digits` decimal places. Infinite bounds pass through.
#[inline]
pub fn round_to(value: f64, digits: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

/// Reporting unit of a synthesized variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// Currency (R$)
    Currency,
    /// Currency per energy (R$/MWh)
    CurrencyPerMwh,
    /// Currency per volume (R$/hm3)
    CurrencyPerHm3,
    /// Average megawatts over a month (MWmes)
    MwMonth,
    /// Average megawatts (MWmed)
    MwAverage,
    /// Megawatt-hours
    Mwh,
    /// Cubic hectometers
    Hm3,
    /// Cubic meters per second
    M3s,
    /// Percentage
    Percent,
    /// Meters per second
    MetersPerSecond,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Currency => "R$",
            Unit::CurrencyPerMwh => "R$/MWh",
            Unit::CurrencyPerHm3 => "R$/hm3",
            Unit::MwMonth => "MWmes",
            Unit::MwAverage => "MWmed",
            Unit::Mwh => "MWh",
            Unit::Hm3 => "hm3",
            Unit::M3s => "m3/s",
            Unit::Percent => "%",
            Unit::MetersPerSecond => "m/s",
        }
    }

    /// Whether block values of this unit add up to the stage value.
    pub fn is_additive(&self) -> bool {
        matches!(
            self,
            Unit::Currency | Unit::MwMonth | Unit::Mwh | Unit::Hm3
        )
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
            }
        }

        impl $type {
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

/// Water volume in cubic hectometers (hm3)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Hectometers3(pub f64);

impl_unit_ops!(Hectometers3, "hm3");

/// Water flow in cubic meters per second (m3/s)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct CubicMetersPerSecond(pub f64);

impl_unit_ops!(CubicMetersPerSecond, "m3/s");

/// Average power over a month (MWmes)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct MegawattMonths(pub f64);

impl_unit_ops!(MegawattMonths, "MWmes");

impl Hectometers3 {
    /// Mean flow that moves this volume during a block of `block_hours`.
    #[inline]
    pub fn to_flow(self, block_hours: f64) -> CubicMetersPerSecond {
        CubicMetersPerSecond(volume_to_flow(self.0, block_hours))
    }

    /// Stored energy of this useful volume given the accumulated productivity
    /// (MW per m3/s) of every plant downstream, including the plant itself.
    #[inline]
    pub fn to_stored_energy(self, accumulated_productivity: f64) -> MegawattMonths {
        MegawattMonths(self.0 / HM3_PER_M3S_MONTH * accumulated_productivity)
    }
}

impl CubicMetersPerSecond {
    /// Volume moved by this flow during a block of `block_hours`.
    #[inline]
    pub fn to_volume(self, block_hours: f64) -> Hectometers3 {
        Hectometers3(flow_to_volume(self.0, block_hours))
    }
}
