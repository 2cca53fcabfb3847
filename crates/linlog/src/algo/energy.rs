//! Per-vertex energy and force direction of the LinLog-family energy model.
//!
//! The energy of vertex `i` is
//!
//! ```text
//! E(i) = - rf * m(i) * Σ_nodes m(node) * f(|p_i - p_node|, repu_exp)      (repulsion)
//!        +             Σ_j     w(i, j) * f(|p_i - p_j|,    attr_exp)      (attraction)
//!        + g * rf * m(i) *               f(|p_i - b|,      attr_exp)      (gravitation)
//! ```
//!
//! with `f(d, 0) = ln d` and `f(d, e) = d^e / e` otherwise, where the repulsion sum runs over
//! the Barnes-Hut approximation of the octree and `b` is the barycenter.

use super::EnergyModel;
use super::octree::{NodeId, NodeKind, Octree};
use crate::graph::{LayoutGraph, Position};

/// A node is expanded during energy queries when the vertex is closer than this many node
/// widths to its centroid.
const ENERGY_OPENING: f64 = 2.0;
/// Same threshold for force-direction queries.
const FORCE_OPENING: f64 = 1.0;

/// `d^e / e`, or `ln d` for `e == 0`. Returns 0 where the term is singular (`d == 0` with a
/// non-positive exponent).
pub fn distance_term(dist: f64, exponent: f64) -> f64 {
    if dist == 0.0 && exponent <= 0.0 {
        return 0.0;
    }
    if exponent == 0.0 {
        dist.ln()
    } else {
        dist.powf(exponent) / exponent
    }
}

/// Repulsion factor that makes the average distance between vertices of maximal similarity
/// roughly 1 in the energy minimum.
pub fn repulsion_factor_normalization(graph: &LayoutGraph, model: &EnergyModel) -> f64 {
    let attr_sum = graph.attraction_sum();
    let repu_sum = graph.repulsion_sum();
    if attr_sum > 0.0 && repu_sum > 0.0 {
        attr_sum / (repu_sum * repu_sum)
            * repu_sum.powf(0.5 * (model.attr_exponent - model.repu_exponent))
    } else {
        1.0
    }
}

/// Mass-weighted mean of `positions`; falls back to the plain mean when all masses are zero.
pub fn barycenter(positions: &[Position], masses: &[f64]) -> Position {
    let mut weighted = Position::zeros();
    let mut total = 0.0;
    for (p, &m) in positions.iter().zip(masses) {
        weighted += p * m;
        total += m;
    }
    if total > 0.0 {
        return weighted / total;
    }
    if positions.is_empty() {
        return Position::zeros();
    }
    positions.iter().sum::<Position>() / positions.len() as f64
}

/// Energy landscape of one iteration: the model, the graph, the barycenter and the scheduled
/// repulsion factor. Positions and the octree are passed per call since both change while a
/// pass over the vertices is in progress.
#[derive(Debug, Clone, Copy)]
pub struct EnergyField<'a> {
    pub model: &'a EnergyModel,
    pub graph: &'a LayoutGraph,
    pub barycenter: Position,
    pub repulsion_factor: f64,
}

impl EnergyField<'_> {
    /// Total energy contribution of `vertex` at its current position.
    pub fn energy(&self, tree: &Octree, positions: &[Position], vertex: usize) -> f64 {
        let mass = self.graph.repulsion(vertex);
        let pos = positions[vertex];

        let mut energy = 0.0;
        if mass != 0.0 && !tree.root_id().is_empty() {
            energy += self.repulsion_energy(tree, tree.root_id(), &pos, vertex) * mass;
        }

        let attr_exp = self.model.attr_exponent;
        for nb in self.graph.neighbors(vertex) {
            if nb.index == vertex {
                continue;
            }
            let dist = (positions[nb.index] - pos).norm();
            energy += nb.weight * distance_term(dist, attr_exp);
        }

        let dist = (pos - self.barycenter).norm();
        energy += self.gravitation_scale(mass) * distance_term(dist, attr_exp);
        energy
    }

    fn gravitation_scale(&self, mass: f64) -> f64 {
        self.model.gravitation_factor * self.repulsion_factor * mass
    }

    fn repulsion_energy(&self, tree: &Octree, id: NodeId, pos: &Position, vertex: usize) -> f64 {
        let node = tree.node(id);
        let dist = (pos - node.position).norm();
        match node.kind {
            NodeKind::Leaf { vertex: v } if v == vertex => 0.0,
            NodeKind::Internal { .. } if dist < ENERGY_OPENING * node.width() => node
                .children()
                .map(|c| self.repulsion_energy(tree, c, pos, vertex))
                .sum(),
            _ => -self.repulsion_factor * node.mass * distance_term(dist, self.model.repu_exponent),
        }
    }

    /// Adds the repulsion force from the subtree at `id` to `dir` and returns its curvature
    /// estimate.
    fn add_repulsion_dir(
        &self,
        tree: &Octree,
        id: NodeId,
        pos: &Position,
        vertex: usize,
        mass: f64,
        dir: &mut Position,
    ) -> f64 {
        let node = tree.node(id);
        let dist = (pos - node.position).norm();
        match node.kind {
            NodeKind::Leaf { vertex: v } if v == vertex => 0.0,
            NodeKind::Internal { .. } if dist < FORCE_OPENING * node.width() => node
                .children()
                .map(|c| self.add_repulsion_dir(tree, c, pos, vertex, mass, dir))
                .sum(),
            _ if dist == 0.0 => 0.0,
            _ => {
                let repu_exp = self.model.repu_exponent;
                let tmp = self.repulsion_factor * node.mass * mass * dist.powf(repu_exp - 2.0);
                *dir -= (node.position - pos) * tmp;
                tmp * (repu_exp - 1.0).abs()
            }
        }
    }

    /// Direction in which `vertex` should move, scaled by the inverse curvature of its energy
    /// and clamped to an eighth of the tree width.
    ///
    /// Returns `None` when the curvature estimate is not positive, in which case the vertex
    /// stays where it is for this iteration.
    pub fn direction(
        &self,
        tree: &Octree,
        positions: &[Position],
        vertex: usize,
    ) -> Option<Position> {
        let mass = self.graph.repulsion(vertex);
        let pos = positions[vertex];
        let mut dir = Position::zeros();

        let mut dir2 = 0.0;
        if mass != 0.0 && !tree.root_id().is_empty() {
            dir2 += self.add_repulsion_dir(tree, tree.root_id(), &pos, vertex, mass, &mut dir);
        }

        let attr_exp = self.model.attr_exponent;
        for nb in self.graph.neighbors(vertex) {
            if nb.index == vertex {
                continue;
            }
            let diff = positions[nb.index] - pos;
            let dist = diff.norm();
            if dist == 0.0 {
                continue;
            }
            let tmp = nb.weight * dist.powf(attr_exp - 2.0);
            dir2 += tmp * (attr_exp - 1.0).abs();
            dir += diff * tmp;
        }

        let diff = self.barycenter - pos;
        let dist = diff.norm();
        if dist != 0.0 {
            let tmp = self.gravitation_scale(mass) * dist.powf(attr_exp - 2.0);
            dir2 += tmp * (attr_exp - 1.0).abs();
            dir += diff * tmp;
        }

        if !(dir2 > 0.0 && dir2.is_finite()) {
            return None;
        }
        dir /= dir2;

        let length = dir.norm();
        let max_length = tree.width() / 8.0;
        if length > max_length {
            dir *= max_length / length;
        }
        dir.iter().all(|c| c.is_finite()).then_some(dir)
    }
}
