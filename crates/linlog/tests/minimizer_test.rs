use linlog::{
    Dimensions, EnergyModel, GraphBuilder, GraphOptions, InitialLayout, IterationEvent,
    LayoutGraph, Minimizer, MinimizerOptions, Neighbor, Position, RepulsionModel, layout,
    random_layout,
};

fn vertex_repulsion() -> GraphOptions {
    GraphOptions {
        repulsion: RepulsionModel::Vertex,
        weighted: true,
    }
}

fn lin_log_without_gravity() -> MinimizerOptions {
    MinimizerOptions::from(EnergyModel::lin_log().with_gravitation(0.0))
}

fn dist(a: &Position, b: &Position) -> f64 {
    (a - b).norm()
}

fn assert_within_mean(values: &[f64], tolerance: f64) {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    for v in values {
        assert!(
            (v - mean).abs() <= tolerance * mean,
            "value {v} deviates from mean {mean} by more than {tolerance}: {values:?}"
        );
    }
}

fn extent(positions: &[Position]) -> f64 {
    let mut min = Position::repeat(f64::INFINITY);
    let mut max = Position::repeat(f64::NEG_INFINITY);
    for p in positions {
        min = min.inf(p);
        max = max.sup(p);
    }
    (max - min).max()
}

#[test]
fn triangle_converges_to_near_equilateral() {
    let g = GraphBuilder::new(3)
        .options(vertex_repulsion())
        .edge(0, 1, 1.0)
        .edge(1, 2, 1.0)
        .edge(2, 0, 1.0)
        .build()
        .unwrap();
    let mut pos = vec![
        Position::new(0.0, 0.0, 0.0),
        Position::new(2.0, 0.3, 0.0),
        Position::new(0.5, 1.7, 0.0),
    ];

    layout(&g, &mut pos, lin_log_without_gravity(), 100).unwrap();

    let d = [
        dist(&pos[0], &pos[1]),
        dist(&pos[1], &pos[2]),
        dist(&pos[2], &pos[0]),
    ];
    assert_within_mean(&d, 0.15);
    assert!(pos.iter().all(|p| p.z == 0.0));
}

#[test]
fn star_leaves_end_at_equal_distance_from_the_center() {
    let k = 5;
    let mut builder = GraphBuilder::new(k + 1).options(vertex_repulsion());
    for leaf in 1..=k {
        builder.add_edge(0, leaf, 1.0);
    }
    let g = builder.build().unwrap();

    let mut pos = vec![Position::zeros()];
    for leaf in 0..k {
        let angle = std::f64::consts::TAU * leaf as f64 / k as f64;
        pos.push(Position::new(angle.cos(), angle.sin(), 0.0));
    }

    // Without gravitation the symmetric start is broken by the sequential updates and the
    // leaves never settle at equal distance; the default gravitation holds them together.
    layout(&g, &mut pos, MinimizerOptions::default(), 100).unwrap();

    let leaf_distances: Vec<f64> = (1..=k).map(|leaf| dist(&pos[0], &pos[leaf])).collect();
    assert_within_mean(&leaf_distances, 0.15);
}

#[test]
fn gravitation_keeps_a_disconnected_cloud_together() {
    let g = GraphBuilder::new(12)
        .options(vertex_repulsion())
        .build()
        .unwrap();
    let start = random_layout(
        12,
        InitialLayout {
            dimensions: Dimensions::Two,
            random_seed: 7,
        },
    );

    let mut free = start.clone();
    layout(&g, &mut free, lin_log_without_gravity(), 40).unwrap();

    let mut pulled = start.clone();
    let options = MinimizerOptions::from(EnergyModel::lin_log().with_gravitation(1.0));
    layout(&g, &mut pulled, options, 40).unwrap();

    let free_extent = extent(&free);
    let pulled_extent = extent(&pulled);
    assert!(pulled.iter().all(|p| p.iter().all(|c| c.is_finite())));
    assert!(pulled_extent.is_finite());
    assert!(
        pulled_extent < free_extent,
        "gravity extent {pulled_extent} should be below free extent {free_extent}"
    );
}

#[test]
fn fixed_vertices_never_move() {
    let base = GraphBuilder::new(6)
        .edge(0, 1, 1.0)
        .edge(1, 2, 1.0)
        .edge(2, 3, 2.0)
        .edge(3, 4, 1.0)
        .edge(4, 5, 1.0)
        .edge(5, 0, 1.0)
        .build()
        .unwrap();
    let attraction: Vec<Vec<Neighbor>> = (0..6).map(|i| base.neighbors(i).to_vec()).collect();
    let fixed = vec![true, false, false, true, false, true];
    let g = LayoutGraph::new(attraction, base.repulsions().to_vec(), fixed.clone()).unwrap();

    let start = random_layout(6, InitialLayout::default());
    let mut pos = start.clone();
    layout(&g, &mut pos, MinimizerOptions::default(), 60).unwrap();

    for (i, is_fixed) in fixed.iter().enumerate() {
        if *is_fixed {
            assert_eq!(pos[i], start[i], "fixed vertex {i} moved");
        }
    }
    assert_ne!(pos, start);
}

#[test]
fn identical_inputs_give_identical_layouts() {
    let mut builder = GraphBuilder::new(40);
    for i in 0..40 {
        builder.add_edge(i, (i + 1) % 40, 1.0);
        builder.add_edge(i, (i * 7 + 3) % 40, 0.5);
    }
    let g = builder.build().unwrap();
    let start = random_layout(
        40,
        InitialLayout {
            dimensions: Dimensions::Three,
            random_seed: 11,
        },
    );

    let mut a = start.clone();
    let mut b = start.clone();
    let report_a = layout(&g, &mut a, MinimizerOptions::default(), 30).unwrap();
    let report_b = layout(&g, &mut b, MinimizerOptions::default(), 30).unwrap();
    assert_eq!(a, b);
    assert_eq!(report_a, report_b);
}

#[test]
fn zero_iterations_leave_positions_untouched_and_notify_once() {
    let g = GraphBuilder::new(3)
        .edge(0, 1, 1.0)
        .edge(1, 2, 1.0)
        .build()
        .unwrap();
    let start = random_layout(3, InitialLayout::default());
    let mut pos = start.clone();
    let mut steps = Vec::new();
    {
        let mut m = Minimizer::new(&g, &mut pos, MinimizerOptions::default()).unwrap();
        m.add_observer(|e: &IterationEvent<'_>| steps.push(e.step));
        let report = m.minimize(0);
        assert_eq!(report.iterations, 0);
        assert_eq!(report.initial_energy, report.final_energy);
    }
    assert_eq!(steps, vec![0]);
    assert_eq!(pos, start);
}

#[test]
fn observers_see_every_iteration_with_current_positions() {
    let g = GraphBuilder::new(4)
        .edge(0, 1, 1.0)
        .edge(1, 2, 1.0)
        .edge(2, 3, 1.0)
        .build()
        .unwrap();
    let mut pos = random_layout(4, InitialLayout::default());
    let mut seen: Vec<(usize, Vec<Position>)> = Vec::new();
    let mut final_positions = Vec::new();
    {
        let mut m = Minimizer::new(&g, &mut pos, MinimizerOptions::default()).unwrap();
        m.add_observer(|e: &IterationEvent<'_>| seen.push((e.step, e.positions.to_vec())));
        m.minimize(5);
        final_positions.extend_from_slice(m.positions());
    }
    let steps: Vec<usize> = seen.iter().map(|(s, _)| *s).collect();
    assert_eq!(steps, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(seen.last().unwrap().1, final_positions);
    assert_eq!(final_positions, pos);
}

#[test]
fn two_dimensional_input_stays_two_dimensional() {
    let mut builder = GraphBuilder::new(20);
    for i in 1..20 {
        builder.add_edge(i / 2, i, 1.0);
    }
    let g = builder.build().unwrap();
    let mut pos = random_layout(20, InitialLayout::default());
    layout(&g, &mut pos, MinimizerOptions::default(), 50).unwrap();
    assert!(pos.iter().all(|p| p.z == 0.0 && p.x.is_finite() && p.y.is_finite()));
}

#[test]
fn diagnostics_report_edge_lengths_before_and_after() {
    let g = GraphBuilder::new(3)
        .edge(0, 1, 1.0)
        .edge(1, 2, 1.0)
        .build()
        .unwrap();
    let mut pos = random_layout(3, InitialLayout::default());
    let report = layout(&g, &mut pos, MinimizerOptions::default(), 10).unwrap();
    let before = report.before.expect("stats before");
    let after = report.after.expect("stats after");
    assert_eq!(before.attraction_sum, 2.0);
    assert_eq!(after.node_count, 3);
    assert!(after.arithmetic_mean.unwrap() > 0.0);

    let quiet = MinimizerOptions {
        diagnostics: false,
        ..Default::default()
    };
    let report = layout(&g, &mut pos, quiet, 1).unwrap();
    assert!(report.before.is_none() && report.after.is_none());
}

#[test]
fn coincident_start_positions_stay_finite() {
    let g = GraphBuilder::new(4)
        .edge(0, 1, 1.0)
        .edge(1, 2, 1.0)
        .edge(2, 3, 1.0)
        .build()
        .unwrap();
    let mut pos = vec![
        Position::new(0.2, 0.2, 0.0),
        Position::new(0.2, 0.2, 0.0),
        Position::new(0.2, 0.2, 0.0),
        Position::new(1.0, 0.0, 0.0),
    ];
    layout(&g, &mut pos, MinimizerOptions::default(), 20).unwrap();
    assert!(pos.iter().all(|p| p.iter().all(|c| c.is_finite())));
}

#[test]
fn mismatched_position_count_is_rejected() {
    let g = GraphBuilder::new(3).edge(0, 1, 1.0).build().unwrap();
    let mut pos = vec![Position::zeros(); 2];
    let err = layout(&g, &mut pos, MinimizerOptions::default(), 1).unwrap_err();
    assert!(
        matches!(
            err,
            linlog::Error::LengthMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ),
        "got {err}"
    );
}
