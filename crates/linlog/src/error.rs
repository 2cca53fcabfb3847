#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{what} has length {actual}, expected {expected} (one entry per vertex)")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("vertex {vertex} has {indexes} neighbor indexes but {values} weights")]
    RowLengthMismatch {
        vertex: usize,
        indexes: usize,
        values: usize,
    },
    #[error("vertex {vertex} lists neighbor {neighbor}, but the graph has {node_count} vertices")]
    NeighborOutOfRange {
        vertex: usize,
        neighbor: usize,
        node_count: usize,
    },
    #[error("edge ({source_ix}, {target_ix}) references a vertex outside 0..{node_count}")]
    EndpointOutOfRange {
        source_ix: usize,
        target_ix: usize,
        node_count: usize,
    },
    #[error("adjacency is not symmetric: ({from}, {to}) with weight {weight} has no mirror entry")]
    Asymmetric { from: usize, to: usize, weight: f64 },
    #[error("{what} of vertex {vertex} is not finite: {value}")]
    NonFinite {
        what: &'static str,
        vertex: usize,
        value: f64,
    },
    #[error("{what} of vertex {vertex} is negative: {value}")]
    Negative {
        what: &'static str,
        vertex: usize,
        value: f64,
    },
    #[error("energy model parameter `{name}` is not finite: {value}")]
    InvalidModel { name: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;
