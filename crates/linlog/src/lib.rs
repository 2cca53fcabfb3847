#![forbid(unsafe_code)]

//! Force-directed graph layout by minimization of LinLog-family energy models.
//!
//! The minimizer approximates all-pairs repulsion with a Barnes-Hut octree and moves one vertex
//! at a time along its force direction, choosing the step length with a bounded line search.
//! It is strictly sequential and deterministic: identical inputs yield bit-identical layouts.

pub mod algo;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod init;

pub use algo::minimizer::{IterationEvent, MinimizeReport, Minimizer, Observer};
pub use algo::{EnergyModel, MinimizerOptions};
pub use diagnostics::DistanceStats;
pub use error::{Error, Result};
pub use graph::{Edge, GraphBuilder, GraphOptions, LayoutGraph, Neighbor, Position, RepulsionModel};
pub use init::{Dimensions, InitialLayout, apply_prior_layout, random_layout};

/// Minimizes the energy of `graph` for `iterations` rounds, starting from and writing back to
/// `positions`.
pub fn layout(
    graph: &LayoutGraph,
    positions: &mut [Position],
    options: MinimizerOptions,
    iterations: usize,
) -> Result<MinimizeReport> {
    let mut minimizer = Minimizer::new(graph, positions, options)?;
    Ok(minimizer.minimize(iterations))
}
