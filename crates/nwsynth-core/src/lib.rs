//! # nwsynth-core: synthesis data model
//!
//! Shared types for turning hydro-thermal operation-planning simulator
//! outputs into long-format "syntheses".
//!
//! A synthesis is identified by a [`SynthesisKey`], a ([`Variable`],
//! [`SpatialResolution`]) pair such as `EVER_SIN` (total spilled energy of the
//! interconnected system). Some keys are printed by the simulator; the rest
//! are computed from other keys through the static dependency table in
//! [`dependencies`].
//!
//! ## Modules
//!
//! - [`variable`] / [`resolution`] / [`key`] - the synthesis catalog
//! - [`dependencies`] - dependency table and topological expansion
//! - [`table`] - typed long-format rows ([`SynthesisTable`], [`Entity`])
//! - [`statistics`] - cross-scenario quantiles, mean and std
//! - [`units`] - unit tags and the volume/flow conversion constants
//! - [`cascade`] - plant cascade graph and accumulated productivity
//! - [`time`] - monthly stage arithmetic
//!
//! ## Quick Start
//!
//! ```rust
//! use nwsynth_core::{expand_with_dependencies, SynthesisKey};
//!
//! let key = SynthesisKey::parse("EVER_SIN").unwrap();
//! let order = expand_with_dependencies(&[key]).unwrap();
//! assert_eq!(order.last(), Some(&key));
//! ```

pub mod cascade;
pub mod dependencies;
pub mod error;
pub mod key;
pub mod resolution;
pub mod statistics;
pub mod table;
pub mod time;
pub mod units;
pub mod variable;

pub use cascade::{CascadeGraph, CascadePlant, OUTLET};
pub use dependencies::{
    cache_targets, dependencies_of, expand_with_dependencies, is_computed, DEPENDENCIES,
};
pub use error::{SynthError, SynthResult};
pub use key::SynthesisKey;
pub use resolution::SpatialResolution;
pub use statistics::{compute_statistics, statistic_labels, with_statistics};
pub use table::{Entity, OrderedEntities, ScenarioLabel, SynthesisRow, SynthesisTable};
pub use units::{
    flow_to_volume, round_to, volume_to_flow, CubicMetersPerSecond, Hectometers3, MegawattMonths,
    Unit, HM3_PER_M3S_MONTH, STAGE_DURATION_HOURS,
};
pub use variable::Variable;
