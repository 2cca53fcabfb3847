//! Arena-backed octree over vertex positions for Barnes-Hut repulsion queries.
//!
//! Every node stores the mass-weighted centroid and the total mass of the vertices inside its
//! cuboid. The tree is rebuilt from scratch once per minimizer iteration; in between, single
//! vertex moves only shift the centroids along the vertex's insertion path (the cuboids are not
//! re-subdivided), which keeps the aggregate masses exact and the centroids exact up to the
//! octant a vertex left.

use crate::graph::Position;

/// Insertion depth after which a point is merged into the leaf it lands on instead of splitting
/// further. Only reachable for (nearly) coincident points.
const MAX_DEPTH: usize = 40;

/// Index into the node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Absent child.
    pub const EMPTY: NodeId = NodeId(u32::MAX);

    fn new(index: usize) -> Self {
        debug_assert!(index < u32::MAX as usize, "NodeId overflow");
        NodeId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

/// Axis-aligned cuboid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cuboid {
    pub min: Position,
    pub max: Position,
}

impl Cuboid {
    /// Bounding cuboid of `points`, with every axis padded to a non-zero extent.
    pub fn around(points: &[Position]) -> Self {
        let mut min = Position::repeat(f64::INFINITY);
        let mut max = Position::repeat(f64::NEG_INFINITY);
        for p in points {
            min = min.inf(p);
            max = max.sup(p);
        }
        if points.is_empty() {
            min = Position::zeros();
            max = Position::zeros();
        }

        let largest = (max - min).max();
        let min_extent = (largest * 1e-6).max(1e-9);
        for axis in 0..3 {
            let extent = max[axis] - min[axis];
            if extent < min_extent {
                let pad = (min_extent - extent) / 2.0;
                min[axis] -= pad;
                max[axis] += pad;
            }
        }
        Self { min, max }
    }

    pub fn center(&self) -> Position {
        (self.min + self.max) / 2.0
    }

    /// Largest per-axis extent.
    pub fn width(&self) -> f64 {
        (self.max - self.min).max()
    }

    /// Octant of `p`: bit `i` is set when `p` lies above the midpoint along axis `i`.
    pub fn octant(&self, p: &Position) -> usize {
        let c = self.center();
        let mut octant = 0;
        for axis in 0..3 {
            if p[axis] > c[axis] {
                octant |= 1 << axis;
            }
        }
        octant
    }

    pub fn subdivide(&self, octant: usize) -> Self {
        let c = self.center();
        let mut min = self.min;
        let mut max = self.max;
        for axis in 0..3 {
            if octant & (1 << axis) == 0 {
                max[axis] = c[axis];
            } else {
                min[axis] = c[axis];
            }
        }
        Self { min, max }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeKind {
    Leaf { vertex: usize },
    Internal { children: [NodeId; 8] },
}

#[derive(Clone, Debug)]
pub struct OctreeNode {
    pub kind: NodeKind,
    /// Mass-weighted centroid of the contained vertices.
    pub position: Position,
    pub mass: f64,
    pub bounds: Cuboid,
}

impl OctreeNode {
    pub fn width(&self) -> f64 {
        self.bounds.width()
    }

    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        let children: &[NodeId] = match &self.kind {
            NodeKind::Leaf { .. } => &[],
            NodeKind::Internal { children } => children,
        };
        children.iter().copied().filter(|c| !c.is_empty())
    }
}

#[derive(Clone, Debug)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    root: NodeId,
    bounds: Cuboid,
}

impl Octree {
    /// Builds the tree over all vertices with non-zero mass. `positions` and `masses` are
    /// indexed by vertex.
    pub fn build(positions: &[Position], masses: &[f64]) -> Self {
        debug_assert_eq!(positions.len(), masses.len());
        let mut tree = Self {
            nodes: Vec::with_capacity(positions.len() * 2),
            root: NodeId::EMPTY,
            bounds: Cuboid::around(positions),
        };
        for (vertex, (pos, &mass)) in positions.iter().zip(masses).enumerate() {
            tree.insert(vertex, *pos, mass);
        }
        tree
    }

    pub fn root(&self) -> Option<&OctreeNode> {
        if self.root.is_empty() {
            None
        } else {
            Some(&self.nodes[self.root.index()])
        }
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &OctreeNode {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    /// Width of the bounding cuboid of all vertices (including massless ones).
    pub fn width(&self) -> f64 {
        self.bounds.width()
    }

    fn push_leaf(
        &mut self,
        vertex: usize,
        position: Position,
        mass: f64,
        bounds: Cuboid,
    ) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(OctreeNode {
            kind: NodeKind::Leaf { vertex },
            position,
            mass,
            bounds,
        });
        id
    }

    /// Hangs a new leaf below `parent` in the octant of `position`.
    fn attach_leaf(&mut self, parent: NodeId, vertex: usize, position: Position, mass: f64) {
        let bounds = self.nodes[parent.index()].bounds;
        let octant = bounds.octant(&position);
        let child = self.push_leaf(vertex, position, mass, bounds.subdivide(octant));
        if let NodeKind::Internal { children } = &mut self.nodes[parent.index()].kind {
            children[octant] = child;
        }
    }

    fn insert(&mut self, vertex: usize, position: Position, mass: f64) {
        if mass == 0.0 {
            return;
        }
        if self.root.is_empty() {
            self.root = self.push_leaf(vertex, position, mass, self.bounds);
            return;
        }

        let mut current = self.root;
        let mut depth = 0;
        loop {
            let node = &mut self.nodes[current.index()];
            if let NodeKind::Leaf { vertex: resident } = node.kind {
                if depth >= MAX_DEPTH {
                    node.position =
                        (node.position * node.mass + position * mass) / (node.mass + mass);
                    node.mass += mass;
                    return;
                }
                let (resident_pos, resident_mass) = (node.position, node.mass);
                node.kind = NodeKind::Internal {
                    children: [NodeId::EMPTY; 8],
                };
                self.attach_leaf(current, resident, resident_pos, resident_mass);
            }

            let node = &mut self.nodes[current.index()];
            node.position = (node.position * node.mass + position * mass) / (node.mass + mass);
            node.mass += mass;

            let octant = node.bounds.octant(&position);
            let next = match node.kind {
                NodeKind::Internal { children } => children[octant],
                NodeKind::Leaf { .. } => unreachable!("converted to internal above"),
            };
            if next.is_empty() {
                self.attach_leaf(current, vertex, position, mass);
                return;
            }
            current = next;
            depth += 1;
        }
    }

    /// Shifts the centroids along the path of a vertex that moved from `old` to `new`.
    ///
    /// The path is found from `old`, i.e. the position the vertex was inserted at. Cuboids are
    /// left untouched until the next [`Octree::build`].
    pub fn move_vertex(&mut self, old: &Position, new: &Position, mass: f64) {
        if mass == 0.0 {
            return;
        }
        let delta = new - old;
        let mut current = self.root;
        while !current.is_empty() {
            let node = &mut self.nodes[current.index()];
            if node.mass > 0.0 {
                node.position += delta * (mass / node.mass);
            }
            current = match node.kind {
                NodeKind::Internal { children } => children[node.bounds.octant(old)],
                NodeKind::Leaf { .. } => NodeId::EMPTY,
            };
        }
    }
}
