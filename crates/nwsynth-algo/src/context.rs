//! Per-run state: the synthesis cache and the accumulators.
//!
//! A [`RunContext`] is created at the start of each `synthesize` call and
//! dropped at its end. Only the orchestrator writes to it, between
//! syntheses; stub rules read cached dependencies from it.

use std::collections::{BTreeMap, HashMap, HashSet};

use nwsynth_core::{SpatialResolution, SynthError, SynthResult, SynthesisKey, SynthesisTable};

use crate::report::SynthesisReport;

pub type StatisticsByResolution = BTreeMap<SpatialResolution, Vec<(SynthesisKey, SynthesisTable)>>;

#[derive(Debug, Default)]
pub struct RunContext {
    cache: HashMap<SynthesisKey, SynthesisTable>,
    statistics: StatisticsByResolution,
    cache_targets: HashSet<SynthesisKey>,
    succeeded: Vec<SynthesisKey>,
    report: SynthesisReport,
}

impl RunContext {
    /// Context that caches the results of `cache_targets`.
    pub fn new(cache_targets: HashSet<SynthesisKey>) -> Self {
        Self {
            cache_targets,
            ..Self::default()
        }
    }

    pub fn is_cache_target(&self, key: &SynthesisKey) -> bool {
        self.cache_targets.contains(key)
    }

    pub fn cached(&self, key: &SynthesisKey) -> Option<&SynthesisTable> {
        self.cache.get(key)
    }

    /// Cached table of a dependency; its absence means the dependency failed.
    pub fn dependency(&self, key: &SynthesisKey) -> SynthResult<&SynthesisTable> {
        self.cached(key)
            .ok_or_else(|| SynthError::NotCached(key.to_string()))
    }

    /// Keep `table` when another synthesis depends on `key`.
    pub fn cache(&mut self, key: SynthesisKey, table: &SynthesisTable) -> bool {
        if !self.is_cache_target(&key) {
            return false;
        }
        self.cache.insert(key, table.clone());
        true
    }

    pub fn accumulate_statistics(&mut self, key: SynthesisKey, statistics: SynthesisTable) {
        self.statistics
            .entry(key.resolution)
            .or_default()
            .push((key, statistics));
    }

    /// Accumulated statistic tables, per resolution, in synthesis order.
    pub fn statistics(&self) -> &StatisticsByResolution {
        &self.statistics
    }

    pub fn record_success(&mut self, key: SynthesisKey) {
        self.report.record_success(&key);
        self.succeeded.push(key);
    }

    pub fn record_failure(&mut self, key: SynthesisKey, error: &SynthError) {
        self.report.record_failure(&key, error);
    }

    pub fn succeeded(&self) -> &[SynthesisKey] {
        &self.succeeded
    }

    pub fn into_report(self) -> SynthesisReport {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> SynthesisKey {
        SynthesisKey::parse(s).unwrap()
    }

    #[test]
    fn only_targets_are_cached() {
        let mut run = RunContext::new([key("EVERR_SIN")].into_iter().collect());
        let table = SynthesisTable::empty(SpatialResolution::System);
        assert!(run.cache(key("EVERR_SIN"), &table));
        assert!(!run.cache(key("CMO_SBM"), &SynthesisTable::empty(SpatialResolution::Submarket)));
        assert!(run.dependency(&key("EVERR_SIN")).is_ok());
        assert!(matches!(
            run.dependency(&key("CMO_SBM")).unwrap_err(),
            SynthError::NotCached(_)
        ));
    }

    #[test]
    fn statistics_accumulate_per_resolution() {
        let mut run = RunContext::default();
        let submarket = || SynthesisTable::empty(SpatialResolution::Submarket);
        run.accumulate_statistics(key("CMO_SBM"), submarket());
        run.accumulate_statistics(key("DEF_SBM"), submarket());
        run.accumulate_statistics(key("COP_SIN"), SynthesisTable::empty(SpatialResolution::System));
        let stats = run.statistics();
        assert_eq!(stats[&SpatialResolution::Submarket].len(), 2);
        assert_eq!(stats[&SpatialResolution::System][0].0, key("COP_SIN"));
    }

    #[test]
    fn failures_stay_out_of_the_success_list() {
        let mut run = RunContext::default();
        run.record_success(key("CMO_SBM"));
        run.record_failure(key("EARMF_SIN"), &SynthError::Worker("timeout".into()));
        assert_eq!(run.succeeded(), &[key("CMO_SBM")]);
        let report = run.into_report();
        assert_eq!(report.failed.len(), 1);
    }
}
