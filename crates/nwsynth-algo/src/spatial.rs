//! Spatial fan-out: one extraction task per entity, run on a worker pool.
//!
//! Each task is a pure function of (task, key, read-only deck). It reads the
//! raw output of one entity, tags it with entity and calendar columns, and
//! appends that entity's cross-scenario statistics. The caller collects every
//! result before continuing, waiting at most the configured timeout for each.

use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use rayon::{ThreadPool, ThreadPoolBuilder};

use nwsynth_core::{
    compute_statistics, Entity, SpatialResolution, SynthError, SynthResult, SynthesisKey,
    SynthesisRow, SynthesisTable, Unit,
};
use nwsynth_io::{DeckAccessor, EntitySelector};

use crate::config::SynthesisConfig;
use crate::entities;
use crate::temporal::{rows_from_raw, Calendar};

/// Fixed-size worker pool with a per-result timeout.
pub struct WorkerPool {
    pool: ThreadPool,
    timeout: Duration,
}

impl WorkerPool {
    pub fn new(config: &SynthesisConfig) -> SynthResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.thread_count())
            .thread_name(|i| format!("nwsynth-worker-{i}"))
            .build()
            .map_err(|err| SynthError::Worker(format!("building worker pool: {err}")))?;
        Ok(Self {
            pool,
            timeout: config.task_timeout,
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `work` on every task and return the results in task order.
    ///
    /// The first failure (error, panic or timeout) is returned; tasks already
    /// submitted run to completion and their results are discarded.
    pub fn map<T, R, F>(&self, tasks: Vec<T>, work: F) -> SynthResult<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> SynthResult<R> + Send + Sync + 'static,
    {
        let work = Arc::new(work);
        let (tx, rx) = mpsc::channel();
        let count = tasks.len();
        for (index, task) in tasks.into_iter().enumerate() {
            let tx = tx.clone();
            let work = Arc::clone(&work);
            self.pool.spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| work(task)))
                    .unwrap_or_else(|_| Err(SynthError::Worker(format!("task {index} panicked"))));
                // The receiver is gone when an earlier task already failed.
                let _ = tx.send((index, result));
            });
        }
        drop(tx);

        let mut results: Vec<Option<R>> = (0..count).map(|_| None).collect();
        for _ in 0..count {
            let (index, result) = rx.recv_timeout(self.timeout).map_err(|err| match err {
                RecvTimeoutError::Timeout => SynthError::Worker(format!(
                    "no task result within {}s",
                    self.timeout.as_secs()
                )),
                RecvTimeoutError::Disconnected => {
                    SynthError::Worker("worker pool disconnected".into())
                }
            })?;
            results[index] = Some(result?);
        }
        Ok(results.into_iter().flatten().collect())
    }
}

/// How rows of one raw table map to entities.
#[derive(Debug, Clone)]
enum Target {
    Single(Arc<Entity>),
    /// Multi-entity table; rows carry the entity code.
    ByCode(Arc<HashMap<i32, Arc<Entity>>>),
}

#[derive(Debug, Clone)]
struct EntityTask {
    selector: EntitySelector,
    target: Target,
    last_stage: Option<u32>,
}

fn single(selector: EntitySelector, entity: Arc<Entity>) -> EntityTask {
    EntityTask {
        selector,
        target: Target::Single(entity),
        last_stage: None,
    }
}

fn plan_tasks(
    resolution: SpatialResolution,
    deck: &dyn DeckAccessor,
    calendar: &Calendar,
) -> SynthResult<Vec<EntityTask>> {
    let tasks = match resolution {
        SpatialResolution::System => {
            vec![single(EntitySelector::System, Arc::new(Entity::System))]
        }
        SpatialResolution::Submarket => entities::submarkets(deck)?
            .into_iter()
            .map(|(s, e)| single(EntitySelector::Submarket(s.code), e))
            .collect(),
        SpatialResolution::SubmarketPair => entities::submarket_pairs(deck)?
            .into_iter()
            .filter_map(|e| match e.as_ref() {
                Entity::SubmarketPair {
                    source_code,
                    target_code,
                    ..
                } => Some(single(
                    EntitySelector::SubmarketPair(*source_code, *target_code),
                    e.clone(),
                )),
                _ => None,
            })
            .collect(),
        SpatialResolution::ReservoirGroup => entities::reservoir_groups(deck)?
            .into_iter()
            .map(|(g, e)| single(EntitySelector::ReservoirGroup(g.code), e))
            .collect(),
        SpatialResolution::HydroPlant => {
            let last_stage = calendar.case().individualized_stages;
            entities::hydro_plants(deck)?
                .into_iter()
                .map(|(p, e)| EntityTask {
                    last_stage,
                    ..single(EntitySelector::HydroPlant(p.code), e)
                })
                .collect()
        }
        SpatialResolution::ThermalPlant => {
            let plants = entities::thermal_plants(deck)?;
            let mut by_submarket: BTreeMap<i32, HashMap<i32, Arc<Entity>>> = BTreeMap::new();
            for (plant, entity) in plants {
                by_submarket
                    .entry(plant.submarket_code)
                    .or_default()
                    .insert(plant.code, entity);
            }
            entities::submarkets(deck)?
                .into_iter()
                .filter_map(|(s, _)| {
                    by_submarket.remove(&s.code).map(|plants| EntityTask {
                        selector: EntitySelector::ThermalPlantsOf(s.code),
                        target: Target::ByCode(Arc::new(plants)),
                        last_stage: None,
                    })
                })
                .collect()
        }
        SpatialResolution::WindFarm => entities::wind_farms(deck)?
            .into_iter()
            .map(|(w, e)| single(EntitySelector::WindFarm(w.code), e))
            .collect(),
    };
    Ok(tasks)
}

fn extract(
    task: EntityTask,
    key: SynthesisKey,
    deck: &dyn DeckAccessor,
    calendar: &Calendar,
    unit: Unit,
) -> SynthResult<Vec<SynthesisRow>> {
    let Some(raw) = deck.raw_output(key, task.selector)? else {
        return Ok(Vec::new());
    };
    let mut rows = match &task.target {
        Target::Single(entity) => rows_from_raw(calendar, entity, &raw, unit, task.last_stage)?,
        Target::ByCode(entities) => {
            let mut by_code: BTreeMap<i32, Vec<_>> = BTreeMap::new();
            for row in raw {
                let code = row.code.ok_or_else(|| {
                    SynthError::Validation(format!(
                        "{key}: {} rows must carry an entity code",
                        task.selector.file_stem()
                    ))
                })?;
                by_code.entry(code).or_default().push(row);
            }
            let mut rows = Vec::new();
            for (code, raw) in by_code {
                let entity = entities.get(&code).ok_or_else(|| {
                    SynthError::Validation(format!(
                        "{key}: unknown entity code {code} in {}",
                        task.selector.file_stem()
                    ))
                })?;
                rows.extend(rows_from_raw(calendar, entity, &raw, unit, task.last_stage)?);
            }
            rows
        }
    };
    let statistics = compute_statistics(&rows);
    rows.extend(statistics);
    Ok(rows)
}

/// Read `key` for every entity of its resolution and assemble the sorted table.
pub fn resolve_spatial(
    key: SynthesisKey,
    deck: &Arc<dyn DeckAccessor>,
    pool: &WorkerPool,
) -> SynthResult<SynthesisTable> {
    let calendar = Arc::new(Calendar::load(deck.as_ref())?);
    let tasks = plan_tasks(key.resolution, deck.as_ref(), &calendar)?;
    let unit = key.variable.unit();
    let worker_deck = Arc::clone(deck);
    let worker_calendar = Arc::clone(&calendar);
    let parts = pool.map(tasks, move |task| {
        extract(task, key, worker_deck.as_ref(), &worker_calendar, unit)
    })?;
    let mut table = SynthesisTable::new(key.resolution, parts.into_iter().flatten().collect());
    table.sort();
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pool(threads: usize, timeout: Duration) -> WorkerPool {
        WorkerPool::new(
            &SynthesisConfig::default()
                .with_processors(threads)
                .with_task_timeout(timeout),
        )
        .unwrap()
    }

    #[test]
    fn results_keep_task_order() {
        let pool = pool(4, Duration::from_secs(10));
        let out = pool
            .map((0..32).collect(), |i: u64| {
                std::thread::sleep(Duration::from_millis(32 - i));
                Ok(i * 2)
            })
            .unwrap();
        assert_eq!(out, (0..32).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn first_error_is_returned() {
        let pool = pool(2, Duration::from_secs(10));
        let err = pool
            .map(vec![1, 2, 3], |i: i32| {
                if i == 2 {
                    Err(SynthError::Validation("bad entity".into()))
                } else {
                    Ok(i)
                }
            })
            .unwrap_err();
        assert!(matches!(err, SynthError::Validation(_)));
    }

    #[test]
    fn panics_become_worker_errors() {
        let pool = pool(1, Duration::from_secs(10));
        let err = pool
            .map(vec![()], |_: ()| -> SynthResult<()> { panic!("boom") })
            .unwrap_err();
        assert!(matches!(err, SynthError::Worker(_)));
    }

    #[test]
    fn slow_tasks_time_out() {
        let pool = pool(1, Duration::from_millis(20));
        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);
        let err = pool
            .map(vec![()], move |_: ()| {
                std::thread::sleep(Duration::from_millis(200));
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, SynthError::Worker(ref msg) if msg.contains("no task result")));
    }

    #[test]
    fn empty_task_list_is_fine() {
        let pool = pool(1, Duration::from_secs(1));
        let out: Vec<u8> = pool.map(Vec::<u8>::new(), Ok).unwrap();
        assert!(out.is_empty());
    }
}
