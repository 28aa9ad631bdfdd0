//! Hydro plant cascade graph and accumulated productivity.
//!
//! Plants form a forest rooted at the outlet (code [`OUTLET`]): every plant
//! points to the plant immediately downstream, or to the outlet. The
//! accumulated productivity of a plant is its own specific productivity plus
//! the accumulated productivity of the plant downstream of it, so a cubic
//! hectometer stored upstream is valued by every turbine it will pass.

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Bfs;
use std::collections::{HashMap, HashSet};

use crate::error::{SynthError, SynthResult};

/// Sentinel code of the sea/outlet node.
pub const OUTLET: i32 = 0;

/// One plant in the cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadePlant {
    pub code: i32,
    /// Plant immediately downstream, [`OUTLET`] at the river mouth.
    pub downstream: i32,
    /// Specific productivity (MW per m3/s).
    pub productivity: f64,
}

/// Directed cascade graph with edges from each plant to its upstream plants.
#[derive(Debug, Clone)]
pub struct CascadeGraph {
    graph: DiGraphMap<i32, ()>,
    productivity: HashMap<i32, f64>,
}

impl CascadeGraph {
    /// Build the graph. Plants whose downstream plant is not in `plants`
    /// drain straight to the outlet.
    pub fn new(plants: &[CascadePlant]) -> Self {
        let codes: HashSet<i32> = plants.iter().map(|p| p.code).collect();
        let mut graph = DiGraphMap::new();
        graph.add_node(OUTLET);
        let mut productivity = HashMap::with_capacity(plants.len());
        for plant in plants {
            let downstream = if codes.contains(&plant.downstream) {
                plant.downstream
            } else {
                OUTLET
            };
            graph.add_edge(downstream, plant.code, ());
            productivity.insert(plant.code, plant.productivity);
        }
        Self {
            graph,
            productivity,
        }
    }

    pub fn plant_count(&self) -> usize {
        self.productivity.len()
    }

    /// Plants directly upstream of `code`.
    pub fn upstream_of(&self, code: i32) -> Vec<i32> {
        let mut upstream: Vec<i32> = self.graph.neighbors(code).collect();
        upstream.sort_unstable();
        upstream
    }

    /// Fail with [`SynthError::CascadeCycle`] if the downstream links loop.
    pub fn check_acyclic(&self) -> SynthResult<()> {
        toposort(&self.graph, None)
            .map(|_| ())
            .map_err(|cycle| SynthError::CascadeCycle(cycle.node_id()))
    }

    /// Accumulated productivity of every plant, by breadth-first traversal
    /// from the outlet.
    pub fn accumulated_productivity(&self) -> SynthResult<HashMap<i32, f64>> {
        self.check_acyclic()?;
        let mut accumulated: HashMap<i32, f64> = HashMap::with_capacity(self.plant_count());
        accumulated.insert(OUTLET, 0.0);
        let mut bfs = Bfs::new(&self.graph, OUTLET);
        while let Some(node) = bfs.next(&self.graph) {
            let base = accumulated.get(&node).copied().unwrap_or(0.0);
            for upstream in self.graph.neighbors(node) {
                let own = self.productivity.get(&upstream).copied().unwrap_or(0.0);
                accumulated.insert(upstream, own + base);
            }
        }
        accumulated.remove(&OUTLET);
        Ok(accumulated)
    }
}
