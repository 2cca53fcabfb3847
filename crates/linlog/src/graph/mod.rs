use crate::error::{Error, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Position of a vertex in 3-dimensional space. Two-dimensional layouts keep `z == 0`.
pub type Position = nalgebra::Vector3<f64>;

/// One entry of a vertex's attraction list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub weight: f64,
}

impl Neighbor {
    pub fn new(index: usize, weight: f64) -> Self {
        Self { index, weight }
    }
}

/// Validated input of the minimizer: symmetric attraction lists, repulsion masses and fixed
/// flags, all indexed by vertex.
#[derive(Debug, Clone)]
pub struct LayoutGraph {
    attraction: Vec<Vec<Neighbor>>,
    repulsion: Vec<f64>,
    fixed: Vec<bool>,
}

impl LayoutGraph {
    pub fn new(
        attraction: Vec<Vec<Neighbor>>,
        repulsion: Vec<f64>,
        fixed: Vec<bool>,
    ) -> Result<Self> {
        let graph = Self {
            attraction,
            repulsion,
            fixed,
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Builds a graph from parallel index/weight lists.
    pub fn from_parts(
        attr_indexes: Vec<Vec<usize>>,
        attr_values: Vec<Vec<f64>>,
        repulsion: Vec<f64>,
        fixed: Vec<bool>,
    ) -> Result<Self> {
        if attr_values.len() != attr_indexes.len() {
            return Err(Error::LengthMismatch {
                what: "attraction weight lists",
                expected: attr_indexes.len(),
                actual: attr_values.len(),
            });
        }
        let mut attraction = Vec::with_capacity(attr_indexes.len());
        for (vertex, (indexes, values)) in attr_indexes.into_iter().zip(attr_values).enumerate() {
            if indexes.len() != values.len() {
                return Err(Error::RowLengthMismatch {
                    vertex,
                    indexes: indexes.len(),
                    values: values.len(),
                });
            }
            attraction.push(
                indexes
                    .into_iter()
                    .zip(values)
                    .map(|(index, weight)| Neighbor { index, weight })
                    .collect(),
            );
        }
        Self::new(attraction, repulsion, fixed)
    }

    fn validate(&self) -> Result<()> {
        let n = self.attraction.len();
        if self.repulsion.len() != n {
            return Err(Error::LengthMismatch {
                what: "repulsion vector",
                expected: n,
                actual: self.repulsion.len(),
            });
        }
        if self.fixed.len() != n {
            return Err(Error::LengthMismatch {
                what: "fixed flags",
                expected: n,
                actual: self.fixed.len(),
            });
        }

        for (vertex, &mass) in self.repulsion.iter().enumerate() {
            if !mass.is_finite() {
                return Err(Error::NonFinite {
                    what: "repulsion",
                    vertex,
                    value: mass,
                });
            }
            if mass < 0.0 {
                return Err(Error::Negative {
                    what: "repulsion",
                    vertex,
                    value: mass,
                });
            }
        }

        // Each undirected edge must appear once from either side with bit-identical weight;
        // entries of `i < j` count up, mirrored ones count down.
        let mut balance: FxHashMap<(usize, usize, u64), i64> = FxHashMap::default();
        for (vertex, row) in self.attraction.iter().enumerate() {
            for nb in row {
                if nb.index >= n {
                    return Err(Error::NeighborOutOfRange {
                        vertex,
                        neighbor: nb.index,
                        node_count: n,
                    });
                }
                if !nb.weight.is_finite() {
                    return Err(Error::NonFinite {
                        what: "attraction weight",
                        vertex,
                        value: nb.weight,
                    });
                }
                if nb.weight < 0.0 {
                    return Err(Error::Negative {
                        what: "attraction weight",
                        vertex,
                        value: nb.weight,
                    });
                }
                if nb.index == vertex {
                    continue;
                }
                let (key, delta) = if vertex < nb.index {
                    ((vertex, nb.index, nb.weight.to_bits()), 1)
                } else {
                    ((nb.index, vertex, nb.weight.to_bits()), -1)
                };
                *balance.entry(key).or_insert(0) += delta;
            }
        }

        let mut unmatched: Vec<(&(usize, usize, u64), &i64)> =
            balance.iter().filter(|(_, count)| **count != 0).collect();
        unmatched.sort_by_key(|(key, _)| **key);
        if let Some(&(&(a, b, bits), &count)) = unmatched.first() {
            let (from, to) = if count > 0 { (a, b) } else { (b, a) };
            return Err(Error::Asymmetric {
                from,
                to,
                weight: f64::from_bits(bits),
            });
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.attraction.len()
    }

    pub fn neighbors(&self, vertex: usize) -> &[Neighbor] {
        &self.attraction[vertex]
    }

    pub fn repulsion(&self, vertex: usize) -> f64 {
        self.repulsion[vertex]
    }

    pub fn repulsions(&self) -> &[f64] {
        &self.repulsion
    }

    pub fn is_fixed(&self, vertex: usize) -> bool {
        self.fixed[vertex]
    }

    pub fn set_fixed(&mut self, vertex: usize, fixed: bool) {
        self.fixed[vertex] = fixed;
    }

    /// Sum of all attraction weights, each undirected edge counted from both endpoints.
    pub fn attraction_sum(&self) -> f64 {
        self.attraction
            .iter()
            .flat_map(|row| row.iter().map(|nb| nb.weight))
            .sum()
    }

    pub fn repulsion_sum(&self) -> f64 {
        self.repulsion.iter().sum()
    }
}

/// How repulsion masses are assigned to vertices by [`GraphBuilder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepulsionModel {
    /// Every vertex repels with mass 1.
    Vertex,
    /// Every vertex repels with its (weighted) degree.
    #[default]
    EdgeDegree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphOptions {
    pub repulsion: RepulsionModel,
    /// When false, every edge weight is replaced by 1.
    pub weighted: bool,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            repulsion: RepulsionModel::EdgeDegree,
            weighted: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub weight: f64,
}

/// Turns a weighted edge list into a symmetric [`LayoutGraph`].
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    node_count: usize,
    edges: Vec<Edge>,
    options: GraphOptions,
}

impl GraphBuilder {
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            edges: Vec::new(),
            options: GraphOptions::default(),
        }
    }

    pub fn options(mut self, options: GraphOptions) -> Self {
        self.options = options;
        self
    }

    pub fn edge(mut self, source: usize, target: usize, weight: f64) -> Self {
        self.add_edge(source, target, weight);
        self
    }

    pub fn add_edge(&mut self, source: usize, target: usize, weight: f64) {
        self.edges.push(Edge {
            source,
            target,
            weight,
        });
    }

    pub fn build(&self) -> Result<LayoutGraph> {
        let n = self.node_count;
        let mut degree = vec![0.0f64; n];
        let mut attraction: Vec<Vec<Neighbor>> = vec![Vec::new(); n];

        for e in &self.edges {
            if e.source >= n || e.target >= n {
                return Err(Error::EndpointOutOfRange {
                    source_ix: e.source,
                    target_ix: e.target,
                    node_count: n,
                });
            }
            if !e.weight.is_finite() {
                return Err(Error::NonFinite {
                    what: "edge weight",
                    vertex: e.source,
                    value: e.weight,
                });
            }
            let weight = e.weight.abs();
            degree[e.source] += weight;
            degree[e.target] += weight;

            if e.source == e.target {
                tracing::warn!(vertex = e.source, "dropping reflexive edge");
                continue;
            }
            let w = if self.options.weighted { weight } else { 1.0 };
            attraction[e.source].push(Neighbor::new(e.target, w));
            attraction[e.target].push(Neighbor::new(e.source, w));
        }

        let repulsion = match self.options.repulsion {
            RepulsionModel::Vertex => vec![1.0; n],
            RepulsionModel::EdgeDegree => degree,
        };
        LayoutGraph::new(attraction, repulsion, vec![false; n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_drops_reflexive_edges_but_counts_their_degree() {
        let g = GraphBuilder::new(2)
            .edge(0, 1, 2.0)
            .edge(1, 1, 3.0)
            .build()
            .unwrap();
        assert_eq!(g.neighbors(0), &[Neighbor::new(1, 2.0)]);
        assert_eq!(g.neighbors(1), &[Neighbor::new(0, 2.0)]);
        assert_eq!(g.repulsion(0), 2.0);
        assert_eq!(g.repulsion(1), 8.0);
    }

    #[test]
    fn unweighted_builder_uses_unit_weights() {
        let g = GraphBuilder::new(3)
            .options(GraphOptions {
                repulsion: RepulsionModel::Vertex,
                weighted: false,
            })
            .edge(0, 1, -4.0)
            .edge(1, 2, 0.5)
            .build()
            .unwrap();
        assert_eq!(g.attraction_sum(), 4.0);
        assert_eq!(g.repulsions(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn asymmetric_adjacency_is_rejected() {
        let err = LayoutGraph::new(
            vec![vec![Neighbor::new(1, 1.0)], vec![Neighbor::new(0, 2.0)]],
            vec![1.0, 1.0],
            vec![false, false],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Asymmetric { .. }), "got {err}");
    }
}
