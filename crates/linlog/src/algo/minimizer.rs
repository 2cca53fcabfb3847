//! Iterative energy minimization over a Barnes-Hut octree.
//!
//! Each iteration rebuilds the octree and the barycenter, picks the repulsion factor from the
//! annealing schedule, and then moves every non-fixed vertex in index order along its force
//! direction by the best step found with a bounded line search. Vertices later in the pass see
//! the already-updated positions of earlier ones.

use super::energy::{EnergyField, barycenter, repulsion_factor_normalization};
use super::octree::Octree;
use super::{EnergyModel, MinimizerOptions};
use crate::diagnostics::DistanceStats;
use crate::error::{Error, Result};
use crate::graph::{LayoutGraph, Position};
use serde::Serialize;

/// Multipliers of the repulsion factor, cycled through by step number. Applied with the power
/// `attr_exponent - repu_exponent` to all but the last `REPULSION_SCHEDULE.len()` iterations.
const REPULSION_SCHEDULE: [f64; 20] = [
    0.95, 0.9, 0.85, 0.8, 0.75, 0.8, 0.85, 0.9, 0.95, 1.0, 1.1, 1.2, 1.3, 1.4, 1.5, 1.4, 1.3, 1.2,
    1.1, 1.0,
];

/// The force direction is divided into this many base units; the line search tries multiples
/// of the base unit.
const LINE_SEARCH_UNITS: u32 = 32;
const LINE_SEARCH_MAX_MULTIPLE: u32 = 128;

/// Snapshot handed to observers at every iteration boundary.
#[derive(Debug, Clone, Copy)]
pub struct IterationEvent<'a> {
    /// 0 for the notification before the first iteration.
    pub step: usize,
    /// Sum of the vertex energies (all vertices for step 0, non-fixed vertices afterwards).
    pub energy: f64,
    pub repulsion_factor: f64,
    pub positions: &'a [Position],
}

pub trait Observer {
    fn on_iteration(&mut self, event: &IterationEvent<'_>);
}

impl<F> Observer for F
where
    F: FnMut(&IterationEvent<'_>),
{
    fn on_iteration(&mut self, event: &IterationEvent<'_>) {
        self(event)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MinimizeReport {
    pub iterations: usize,
    pub initial_energy: f64,
    pub final_energy: f64,
    pub before: Option<DistanceStats>,
    pub after: Option<DistanceStats>,
}

/// Outcome of the line search for one vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Step {
    pub(crate) origin: Position,
    pub(crate) old_energy: f64,
    pub(crate) best_energy: f64,
    /// Multiple of the base unit that was applied; 0 means the vertex did not move.
    pub(crate) multiple: u32,
}

pub struct Minimizer<'a> {
    graph: &'a LayoutGraph,
    positions: &'a mut [Position],
    options: MinimizerOptions,
    observers: Vec<Box<dyn Observer + 'a>>,
}

impl std::fmt::Debug for Minimizer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Minimizer")
            .field("node_count", &self.graph.node_count())
            .field("options", &self.options)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<'a> Minimizer<'a> {
    /// Checks `positions` and the model against `graph`. The positions are the input layout
    /// and receive the result of [`Minimizer::minimize`].
    pub fn new(
        graph: &'a LayoutGraph,
        positions: &'a mut [Position],
        options: MinimizerOptions,
    ) -> Result<Self> {
        options.model.validate()?;
        if positions.len() != graph.node_count() {
            return Err(Error::LengthMismatch {
                what: "positions",
                expected: graph.node_count(),
                actual: positions.len(),
            });
        }
        for (vertex, p) in positions.iter().enumerate() {
            if let Some(&value) = p.iter().find(|c| !c.is_finite()) {
                return Err(Error::NonFinite {
                    what: "position",
                    vertex,
                    value,
                });
            }
        }
        Ok(Self {
            graph,
            positions,
            options,
            observers: Vec::new(),
        })
    }

    /// Registers a callback invoked once before the first iteration and after every iteration.
    pub fn add_observer<O: Observer + 'a>(&mut self, observer: O) {
        self.observers.push(Box::new(observer));
    }

    pub fn positions(&self) -> &[Position] {
        &*self.positions
    }

    pub fn options(&self) -> &MinimizerOptions {
        &self.options
    }

    fn notify(&mut self, step: usize, energy: f64, repulsion_factor: f64) {
        let event = IterationEvent {
            step,
            energy,
            repulsion_factor,
            positions: &*self.positions,
        };
        for observer in &mut self.observers {
            observer.on_iteration(&event);
        }
    }

    fn distance_stats(&self, phase: &'static str) -> Option<DistanceStats> {
        if !self.options.diagnostics {
            return None;
        }
        match DistanceStats::compute(self.graph, &*self.positions) {
            Ok(stats) => {
                stats.log(phase);
                Some(stats)
            }
            Err(err) => {
                tracing::warn!(phase, %err, "skipping edge length statistics");
                None
            }
        }
    }

    /// Runs `iterations` rounds of minimization, updating the positions in place.
    ///
    /// Graphs with at most one vertex are left untouched and produce no notifications.
    pub fn minimize(&mut self, iterations: usize) -> MinimizeReport {
        let graph = self.graph;
        let n = graph.node_count();
        let mut report = MinimizeReport::default();
        if n <= 1 {
            return report;
        }

        let span = tracing::debug_span!("minimize", nodes = n, iterations);
        let _guard = span.enter();
        let started = std::time::Instant::now();

        report.before = self.distance_stats("before");

        let model = self.options.model;
        let masses = graph.repulsions();
        let normalized = repulsion_factor_normalization(graph, &model);

        let tree = Octree::build(&*self.positions, masses);
        let field = EnergyField {
            model: &model,
            graph,
            barycenter: barycenter(&*self.positions, masses),
            repulsion_factor: normalized,
        };
        let positions: &[Position] = &*self.positions;
        let initial_energy: f64 = (0..n).map(|i| field.energy(&tree, positions, i)).sum();
        tracing::debug!(energy = initial_energy, repulsion_factor = normalized, "initial energy");
        report.initial_energy = initial_energy;
        report.final_energy = initial_energy;
        self.notify(0, initial_energy, normalized);

        for step in 1..=iterations {
            let mut tree = Octree::build(&*self.positions, masses);
            let repulsion_factor = scheduled_repulsion_factor(step, iterations, normalized, &model);
            let field = EnergyField {
                model: &model,
                graph,
                barycenter: barycenter(&*self.positions, masses),
                repulsion_factor,
            };

            let mut energy = 0.0;
            for vertex in 0..n {
                if graph.is_fixed(vertex) {
                    continue;
                }
                let moved = line_search(&field, &tree, &mut *self.positions, vertex);
                debug_assert!(moved.best_energy <= moved.old_energy || moved.old_energy.is_nan());
                if moved.multiple > 0 {
                    tree.move_vertex(&moved.origin, &self.positions[vertex], masses[vertex]);
                }
                energy += moved.best_energy;
            }

            tracing::trace!(step, energy, repulsion_factor, "iteration");
            report.iterations = step;
            report.final_energy = energy;
            self.notify(step, energy, repulsion_factor);
        }

        report.after = self.distance_stats("after");
        tracing::debug!(
            energy = report.final_energy,
            elapsed = ?started.elapsed(),
            "minimization finished"
        );
        report
    }
}

/// Repulsion factor of iteration `step` (1-based) out of `iterations`.
pub fn scheduled_repulsion_factor(
    step: usize,
    iterations: usize,
    normalized: f64,
    model: &EnergyModel,
) -> f64 {
    if step + REPULSION_SCHEDULE.len() < iterations {
        let multiplier = REPULSION_SCHEDULE[step % REPULSION_SCHEDULE.len()];
        normalized * multiplier.powf(model.attr_exponent - model.repu_exponent)
    } else {
        normalized
    }
}

/// Moves `vertex` to the lowest-energy point among a fixed set of multiples of its force
/// direction.
///
/// Multiples 32, 16, 8, .. are tried while each halving still improved on the previous one;
/// if 32 itself was best, 64 and 128 are tried while doubling keeps improving. The vertex is
/// left at its origin when no multiple lowers its energy.
pub(crate) fn line_search(
    field: &EnergyField<'_>,
    tree: &Octree,
    positions: &mut [Position],
    vertex: usize,
) -> Step {
    let origin = positions[vertex];
    let old_energy = field.energy(tree, positions, vertex);
    let mut best_energy = old_energy;
    let mut best_multiple = 0u32;

    let Some(dir) = field.direction(tree, positions, vertex) else {
        return Step {
            origin,
            old_energy,
            best_energy,
            multiple: 0,
        };
    };
    let unit = dir / f64::from(LINE_SEARCH_UNITS);
    let energy_at = |multiple: u32, positions: &mut [Position]| {
        positions[vertex] = origin + unit * f64::from(multiple);
        field.energy(tree, positions, vertex)
    };

    let mut multiple = LINE_SEARCH_UNITS;
    while multiple >= 1 && (best_multiple == 0 || best_multiple / 2 == multiple) {
        let energy = energy_at(multiple, positions);
        if energy < best_energy {
            best_energy = energy;
            best_multiple = multiple;
        }
        multiple /= 2;
    }

    let mut multiple = LINE_SEARCH_UNITS * 2;
    while multiple <= LINE_SEARCH_MAX_MULTIPLE && best_multiple == multiple / 2 {
        let energy = energy_at(multiple, positions);
        if energy < best_energy {
            best_energy = energy;
            best_multiple = multiple;
        }
        multiple *= 2;
    }

    positions[vertex] = origin + unit * f64::from(best_multiple);
    Step {
        origin,
        old_energy,
        best_energy,
        multiple: best_multiple,
    }
}
