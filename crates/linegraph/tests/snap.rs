// Integration tests for endpoint snapping and connectivity:
//   tolerance boundaries, determinism, chained clusters, component partitions

use geo::Coord;
use linegraph::{cluster_points, connected_components, AdjacencyMatrix, GroupId, NodeId, SnapStrategy};

fn grid(n: usize, spacing: f64) -> Vec<Coord<f64>> {
    (0..n * n).map(|i| Coord { x: (i % n) as f64 * spacing, y: (i / n) as f64 * spacing }).collect()
}

#[test]
fn points_closer_than_tolerance_share_a_node() {
    let points = vec![Coord { x: 10.0, y: 10.0 }, Coord { x: 10.3, y: 10.0 }];
    let clusters = cluster_points(&points, 0.5, SnapStrategy::Transitive);
    assert_eq!(clusters.labels()[0], clusters.labels()[1]);
}

#[test]
fn points_farther_than_tolerance_get_distinct_nodes() {
    let points = vec![Coord { x: 10.0, y: 10.0 }, Coord { x: 10.7, y: 10.0 }];
    let clusters = cluster_points(&points, 0.5, SnapStrategy::Transitive);
    assert_ne!(clusters.labels()[0], clusters.labels()[1]);
}

#[test]
fn well_separated_grid_is_untouched() {
    let points = grid(5, 10.0);
    for strategy in [SnapStrategy::Transitive, SnapStrategy::Strict] {
        let clusters = cluster_points(&points, 0.5, strategy);
        assert_eq!(clusters.len(), 25);
        assert!(clusters.labels().iter().enumerate().all(|(i, &l)| l == NodeId(i as u32)));
    }
}

#[test]
fn clustering_is_deterministic() {
    let mut points = grid(4, 1.0);
    points.extend(grid(4, 1.0).into_iter().map(|c| Coord { x: c.x + 0.01, y: c.y }));

    let first = cluster_points(&points, 0.1, SnapStrategy::Transitive);
    let second = cluster_points(&points, 0.1, SnapStrategy::Transitive);
    assert_eq!(first, second);
    assert_eq!(first.len(), 16);
}

#[test]
fn long_chain_collapses_under_transitive_policy_only() {
    let points = (0..10).map(|i| Coord { x: i as f64 * 0.4, y: 0.0 }).collect::<Vec<_>>();

    let transitive = cluster_points(&points, 0.5, SnapStrategy::Transitive);
    assert_eq!(transitive.len(), 1);
    assert!(transitive.is_chained(NodeId(0)));

    let strict = cluster_points(&points, 0.5, SnapStrategy::Strict);
    assert_eq!(strict.len(), 5);
    assert_eq!(strict.chained().count(), 0);
}

#[test]
fn components_of_a_path_and_a_singleton() {
    let adj = AdjacencyMatrix::from_edges(5, &[(0, 1), (1, 2), (2, 3)]);
    let components = connected_components(&adj);
    assert_eq!(components.len(), 2);
    assert_eq!(components.members(GroupId(0)), &[0, 1, 2, 3]);
    assert_eq!(components.members(GroupId(1)), &[4]);
}
