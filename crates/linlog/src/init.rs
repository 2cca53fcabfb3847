//! Starting positions for the minimizer.

use crate::graph::{LayoutGraph, Position};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimensions {
    #[default]
    #[serde(rename = "2d")]
    Two,
    #[serde(rename = "3d")]
    Three,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialLayout {
    pub dimensions: Dimensions,
    /// Seed for the deterministic generator; the same seed always yields the same layout.
    pub random_seed: u64,
}

/// Places `node_count` vertices uniformly in `[-1, 1)` along every used axis.
pub fn random_layout(node_count: usize, opts: InitialLayout) -> Vec<Position> {
    let mut rng = XorShift64Star::new(opts.random_seed);
    (0..node_count)
        .map(|_| {
            let x = rng.next_f64_signed();
            let y = rng.next_f64_signed();
            let z = match opts.dimensions {
                Dimensions::Two => 0.0,
                Dimensions::Three => rng.next_f64_signed(),
            };
            Position::new(x, y, z)
        })
        .collect()
}

/// Copies positions of a previously computed layout into `positions`.
///
/// Entries whose index is out of range are ignored. With `fix` set, every copied vertex is
/// marked fixed so the minimizer only places the remaining ones.
pub fn apply_prior_layout<I>(
    positions: &mut [Position],
    graph: &mut LayoutGraph,
    prior: I,
    fix: bool,
) where
    I: IntoIterator<Item = (usize, Position)>,
{
    for (idx, pos) in prior {
        if idx >= positions.len() || idx >= graph.node_count() {
            continue;
        }
        positions[idx] = pos;
        if fix {
            graph.set_fixed(idx, true);
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    pub(crate) fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D_u64)
    }

    pub(crate) fn next_f64_signed(&mut self) -> f64 {
        // 53 random mantissa bits mapped to [-1, 1).
        let u = self.next_u64() >> 11;
        let v = (u as f64) / ((1u64 << 53) as f64);
        (v * 2.0) - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_dimensional_layout_keeps_z_at_zero() {
        let pos = random_layout(50, InitialLayout::default());
        assert_eq!(pos.len(), 50);
        for p in &pos {
            assert_eq!(p.z, 0.0);
            assert!((-1.0..1.0).contains(&p.x) && (-1.0..1.0).contains(&p.y));
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let opts = InitialLayout {
            dimensions: Dimensions::Three,
            random_seed: 42,
        };
        assert_eq!(random_layout(10, opts), random_layout(10, opts));
        let other = InitialLayout {
            random_seed: 43,
            ..opts
        };
        assert_ne!(random_layout(10, opts), random_layout(10, other));
    }
}
