use linlog::Position;
use linlog::algo::octree::{NodeId, NodeKind, Octree};
use proptest::prelude::*;

/// Checks every internal node below `id` against its leaves and returns the leaf mass and
/// mass-weighted position sum.
fn check_subtree(tree: &Octree, id: NodeId) -> (f64, Position) {
    let node = tree.node(id);
    if let NodeKind::Leaf { .. } = node.kind {
        return (node.mass, node.position * node.mass);
    }

    let (mass, weighted) = node
        .children()
        .map(|c| check_subtree(tree, c))
        .fold((0.0, Position::zeros()), |(m, p), (cm, cp)| (m + cm, p + cp));
    assert!(
        (node.mass - mass).abs() <= 1e-9 * mass.max(1.0),
        "node {}: mass {} != leaf sum {mass}",
        id.index(),
        node.mass
    );
    let centroid = weighted / mass;
    assert!(
        (node.position - centroid).norm() <= 1e-7 * (1.0 + centroid.norm()),
        "node {}: centroid {:?} != {:?}",
        id.index(),
        node.position,
        centroid
    );
    (mass, weighted)
}

fn assert_aggregates(tree: &Octree) {
    if !tree.root_id().is_empty() {
        check_subtree(tree, tree.root_id());
    }
}

fn point() -> impl Strategy<Value = Position> {
    (-100.0..100.0f64, -100.0..100.0f64, -100.0..100.0f64)
        .prop_map(|(x, y, z)| Position::new(x, y, z))
}

fn mass() -> impl Strategy<Value = f64> {
    prop_oneof![1 => Just(0.0), 6 => 0.5..4.0f64]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn internal_nodes_aggregate_their_leaves(
        points in prop::collection::vec((point(), mass()), 1..10_000)
    ) {
        let (pos, masses): (Vec<Position>, Vec<f64>) = points.into_iter().unzip();
        let tree = Octree::build(&pos, &masses);

        let total: f64 = masses.iter().sum();
        match tree.root() {
            Some(root) => prop_assert!((root.mass - total).abs() <= 1e-9 * total.max(1.0)),
            None => prop_assert_eq!(total, 0.0),
        }
        let leaves = tree
            .nodes()
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Leaf { .. }))
            .count();
        prop_assert_eq!(leaves, masses.iter().filter(|m| **m != 0.0).count());
        assert_aggregates(&tree);
    }

    #[test]
    fn moves_preserve_the_aggregates(
        points in prop::collection::vec((point(), 0.5..4.0f64), 2..300),
        shifts in prop::collection::vec(point(), 1..20),
    ) {
        let (mut pos, masses): (Vec<Position>, Vec<f64>) = points.into_iter().unzip();
        let mut tree = Octree::build(&pos, &masses);
        // Every vertex moves at most once between rebuilds.
        for (v, shift) in shifts.iter().enumerate().take(pos.len()) {
            let old = pos[v];
            let new = old + shift * 0.01;
            tree.move_vertex(&old, &new, masses[v]);
            pos[v] = new;
        }
        assert_aggregates(&tree);
    }
}

#[test]
fn width_is_the_largest_extent() {
    let pos = [Position::new(0.0, 0.0, 0.0), Position::new(3.0, 1.0, 0.0)];
    let tree = Octree::build(&pos, &[1.0, 1.0]);
    assert_eq!(tree.width(), 3.0);
    assert_eq!(tree.root().unwrap().width(), 3.0);
}

#[test]
fn all_massless_vertices_give_an_empty_tree() {
    let pos = [Position::new(0.0, 0.0, 0.0), Position::new(1.0, 1.0, 1.0)];
    let tree = Octree::build(&pos, &[0.0, 0.0]);
    assert!(tree.root().is_none());
    assert!(tree.is_empty());
    assert!(tree.width() > 0.0);
}
