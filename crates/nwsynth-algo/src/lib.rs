//! # nwsynth-algo: synthesis resolution
//!
//! Turns raw simulator outputs into bounded, long-format synthesis tables.
//!
//! - [`Synthesizer`] drives a run: planning, the per-key loop, final exports.
//! - [`spatial`] fans a synthesis out over the entities of its resolution on a
//!   [`WorkerPool`].
//! - [`stubs`] computes syntheses from cached dependencies.
//! - [`bounds`] attaches lower/upper bounds from registry data.
//! - [`metadata`] writes the catalog and the per-resolution statistics.

pub mod bounds;
pub mod config;
pub mod context;
pub mod entities;
pub mod metadata;
pub mod report;
pub mod spatial;
pub mod stubs;
pub mod synthesizer;
pub mod temporal;
pub mod validity;

pub use bounds::{is_bounded, resolve_bounds, strategy_for, BoundsStrategy};
pub use config::SynthesisConfig;
pub use context::RunContext;
pub use metadata::{export_metadata, export_statistics, METADATA_NAME, STATISTICS_ROOT};
pub use report::{load_report, write_report, FailedSynthesis, SynthesisReport};
pub use spatial::{resolve_spatial, WorkerPool};
pub use stubs::{apply_stub, stub_rule, StubRule};
pub use synthesizer::Synthesizer;
pub use temporal::Calendar;
pub use validity::filter_valid;
