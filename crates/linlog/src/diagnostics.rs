//! Edge-length statistics used to judge a layout before and after minimization.

use crate::error::{Error, Result};
use crate::graph::{LayoutGraph, Position};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceStats {
    pub node_count: usize,
    /// Total weight of all undirected edges.
    pub attraction_sum: f64,
    /// Weighted arithmetic mean of the edge lengths, `None` without weighted edges.
    pub arithmetic_mean: Option<f64>,
    /// Weighted geometric mean of the edge lengths, `None` without weighted edges.
    pub geometric_mean: Option<f64>,
}

impl DistanceStats {
    pub fn compute(graph: &LayoutGraph, positions: &[Position]) -> Result<Self> {
        if positions.len() != graph.node_count() {
            return Err(Error::LengthMismatch {
                what: "positions",
                expected: graph.node_count(),
                actual: positions.len(),
            });
        }
        let mut length_sum = 0.0;
        let mut log_sum = 0.0;
        let mut attr_sum = 0.0;
        let mut collapsed = false;

        for (i, pos) in positions.iter().enumerate() {
            for nb in graph.neighbors(i) {
                let dist = (positions[nb.index] - pos).norm();
                length_sum += nb.weight * dist;
                attr_sum += nb.weight;
                if nb.weight > 0.0 {
                    if dist == 0.0 {
                        collapsed = true;
                    } else {
                        log_sum += nb.weight * dist.ln();
                    }
                }
            }
        }
        // Every undirected edge was visited from both endpoints.
        length_sum /= 2.0;
        log_sum /= 2.0;
        attr_sum /= 2.0;

        let (arithmetic_mean, geometric_mean) = if attr_sum > 0.0 {
            let geometric = if collapsed {
                0.0
            } else {
                (log_sum / attr_sum).exp()
            };
            (Some(length_sum / attr_sum), Some(geometric))
        } else {
            (None, None)
        };

        Ok(Self {
            node_count: graph.node_count(),
            attraction_sum: attr_sum,
            arithmetic_mean,
            geometric_mean,
        })
    }

    pub(crate) fn log(&self, phase: &'static str) {
        tracing::debug!(
            phase,
            nodes = self.node_count,
            attraction = self.attraction_sum,
            arithmetic_mean = ?self.arithmetic_mean,
            geometric_mean = ?self.geometric_mean,
            "edge length statistics"
        );
    }
}
