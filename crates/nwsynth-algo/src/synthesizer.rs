//! The synthesis loop.
//!
//! [`Synthesizer::synthesize`] turns a list of requested synthesis names into
//! exported tables:
//!
//! 1. Parse the names (unparsable ones are skipped), drop keys the case cannot
//!    produce and expand the rest with their dependencies, dependencies first.
//! 2. For each key: reuse a cached table, else apply a stub rule, else read it
//!    from the simulator outputs. Then validate, sort, attach bounds, export
//!    the scenario rows and keep the statistic rows for later.
//! 3. Export the per-resolution statistics and the metadata catalog of the
//!    keys that succeeded.
//!
//! A failing synthesis is logged and recorded in the report; siblings and
//! dependents still run (dependents then fail on the missing cache entry).

use std::sync::Arc;

use tracing::{error, info, info_span, warn};

use nwsynth_core::{
    cache_targets, expand_with_dependencies, with_statistics, OrderedEntities, SynthError,
    SynthResult, SynthesisKey, SynthesisTable,
};
use nwsynth_io::{required, table_frame, tables, DeckAccessor, Exporter};

use crate::bounds::resolve_bounds;
use crate::config::SynthesisConfig;
use crate::context::RunContext;
use crate::metadata::{export_metadata, export_statistics};
use crate::report::SynthesisReport;
use crate::spatial::{resolve_spatial, WorkerPool};
use crate::stubs::apply_stub;
use crate::validity::filter_valid;

pub struct Synthesizer {
    deck: Arc<dyn DeckAccessor>,
    exporter: Arc<dyn Exporter>,
    pool: WorkerPool,
}

impl Synthesizer {
    pub fn new(
        deck: Arc<dyn DeckAccessor>,
        exporter: Arc<dyn Exporter>,
        config: &SynthesisConfig,
    ) -> SynthResult<Self> {
        Ok(Self {
            deck,
            exporter,
            pool: WorkerPool::new(config)?,
        })
    }

    /// Keys to resolve for `requested`, in resolution order.
    ///
    /// An empty request means every supported synthesis.
    pub fn plan(&self, requested: &[String]) -> SynthResult<Vec<SynthesisKey>> {
        let mut keys = Vec::with_capacity(requested.len());
        for name in requested {
            match SynthesisKey::parse(name) {
                Some(key) => keys.push(key),
                None => warn!(synthesis = %name, "skipping unrecognized synthesis"),
            }
        }
        if requested.is_empty() {
            keys = SynthesisKey::supported();
        }
        let case = required(tables::CASE, self.deck.case())?;
        let valid = filter_valid(&keys, &case);
        expand_with_dependencies(&valid)
    }

    /// Resolve and export `requested`.
    ///
    /// Fails only when planning fails or the final statistics/metadata
    /// exports cannot be written; per-synthesis failures land in the report.
    pub fn synthesize(&self, requested: &[String]) -> SynthResult<SynthesisReport> {
        let order = self.plan(requested)?;
        info!(
            syntheses = order.len(),
            workers = self.pool.threads(),
            "starting synthesis run"
        );
        let mut run = RunContext::new(cache_targets(&order));
        for key in order {
            let _span = info_span!("synthesis", key = %key).entered();
            match self.synthesize_one(key, &mut run) {
                Ok(rows) => {
                    info!(rows, "synthesis exported");
                    run.record_success(key);
                }
                Err(err) => {
                    error!(error = %err, "synthesis failed");
                    run.record_failure(key, &err);
                }
            }
        }
        export_statistics(self.exporter.as_ref(), run.statistics())?;
        export_metadata(self.exporter.as_ref(), run.succeeded())?;
        let report = run.into_report();
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "synthesis run finished"
        );
        Ok(report)
    }

    /// Table of `key` with statistic rows, before bounds.
    fn resolve(&self, key: SynthesisKey, run: &RunContext) -> SynthResult<SynthesisTable> {
        if let Some(cached) = run.cached(&key) {
            return Ok(with_statistics(cached.clone()));
        }
        if let Some(table) = apply_stub(key, run, self.deck.as_ref())? {
            return Ok(table);
        }
        resolve_spatial(key, &self.deck, &self.pool)
    }

    /// Resolve, bound and export one synthesis; returns the exported row count.
    fn synthesize_one(&self, key: SynthesisKey, run: &mut RunContext) -> SynthResult<usize> {
        let mut table = self.resolve(key, run)?;
        if table.is_empty() {
            return Err(SynthError::MissingInput(format!("no simulator output for {key}")));
        }
        table.validate()?;
        table.sort();
        let ordered = OrderedEntities::capture(&table);
        let table = resolve_bounds(key, table, &ordered, self.deck.as_ref())?;

        let (scenarios, statistics) = table.split_statistics();
        let mut frame = table_frame(&scenarios)?;
        self.exporter.write(&mut frame, &key.to_string())?;
        run.accumulate_statistics(key, statistics);
        run.cache(key, &scenarios);
        Ok(scenarios.len())
    }
}
