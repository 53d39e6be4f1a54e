use geo::Coord;
use petgraph::unionfind::UnionFind;
use rstar::{primitives::GeomWithData, RTree};
use serde::{Deserialize, Serialize};

use crate::components::label_by_first_appearance;
use crate::id::NodeId;

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// How points within the snapping tolerance are merged into clusters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapStrategy {
    /// Union-find over tolerance-radius links.  Any two points within the
    /// tolerance share a cluster, and so do points linked through a chain of
    /// such pairs, even if the chain ends are far apart.
    #[default]
    Transitive,
    /// A point joins the earliest existing cluster whose members are *all*
    /// within the tolerance; otherwise it opens a new cluster.  Never chains,
    /// but two points within the tolerance may land in different clusters.
    Strict,
}

/// Result of clustering a point set.
#[derive(Debug, Clone, PartialEq)]
pub struct Clusters {
    labels: Vec<NodeId>,
    /// `chained[c]` is set when cluster `c` holds two members farther apart
    /// than the tolerance.
    chained: Vec<bool>,
}

impl Clusters {
    /// Number of clusters.
    #[inline] pub fn len(&self) -> usize { self.chained.len() }

    /// Check if there are no clusters.
    #[inline] pub fn is_empty(&self) -> bool { self.chained.is_empty() }

    /// Cluster of each input point, indexed by point.
    #[inline] pub fn labels(&self) -> &[NodeId] { &self.labels }

    /// Returns `true` if `cluster` was formed through chained proximity.
    #[inline] pub fn is_chained(&self, cluster: NodeId) -> bool { self.chained[cluster.index()] }

    /// Clusters formed through chained proximity, ascending.
    pub fn chained(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.chained.iter().enumerate().filter(|(_, c)| **c).map(|(i, _)| NodeId(i as u32))
    }
}

#[inline]
fn distance_2(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).powi(2) + (a.y - b.y).powi(2)
}

/// Group `points` into clusters of near-coincident locations.
///
/// Cluster ids follow first appearance in `points`: the cluster holding
/// `points[0]` is `NodeId(0)`, and so on, so identical input always yields
/// identical labels.  `tolerance` is in the units of the coordinates and must
/// be non-negative; a tolerance of `0` merges exactly coincident points only.
pub fn cluster_points(points: &[Coord<f64>], tolerance: f64, strategy: SnapStrategy) -> Clusters {
    debug_assert!(tolerance >= 0.0, "tolerance must be non-negative");
    let radius_2 = tolerance * tolerance;

    let (labels, count) = match strategy {
        SnapStrategy::Transitive => cluster_transitive(points, radius_2),
        SnapStrategy::Strict => cluster_strict(points, radius_2),
    };

    // Flag clusters whose members are not all pairwise within tolerance.
    let mut members = vec![Vec::new(); count];
    labels.iter().enumerate().for_each(|(i, &label)| members[label as usize].push(i));
    let chained = members.iter()
        .map(|m| m.len() > 2 && m.iter().enumerate().any(|(k, &i)| {
            m[k + 1..].iter().any(|&j| distance_2(points[i], points[j]) > radius_2)
        }))
        .collect();

    Clusters { labels: labels.into_iter().map(NodeId).collect(), chained }
}

fn cluster_transitive(points: &[Coord<f64>], radius_2: f64) -> (Vec<u32>, usize) {
    let tree = RTree::bulk_load(
        points.iter().enumerate()
            .map(|(i, c)| IndexedPoint::new([c.x, c.y], i))
            .collect()
    );

    let mut uf = UnionFind::<usize>::new(points.len());
    for (i, c) in points.iter().enumerate() {
        for cand in tree.locate_within_distance([c.x, c.y], radius_2) {
            if cand.data > i { uf.union(i, cand.data); }
        }
    }

    let roots = (0..points.len()).map(|i| uf.find_mut(i)).collect::<Vec<_>>();
    label_by_first_appearance(&roots)
}

fn cluster_strict(points: &[Coord<f64>], radius_2: f64) -> (Vec<u32>, usize) {
    let mut tree: RTree<IndexedPoint> = RTree::new();
    let mut labels: Vec<u32> = Vec::with_capacity(points.len());
    let mut members: Vec<Vec<usize>> = Vec::new();

    for (i, &c) in points.iter().enumerate() {
        let mut candidates = tree.locate_within_distance([c.x, c.y], radius_2)
            .map(|p| labels[p.data])
            .collect::<Vec<_>>();
        candidates.sort_unstable();
        candidates.dedup();

        let fits = |label: &u32| members[*label as usize].iter()
            .all(|&j| distance_2(points[j], c) <= radius_2);
        let label = match candidates.iter().find(|&&l| fits(&l)) {
            Some(&label) => label,
            None => { members.push(Vec::new()); (members.len() - 1) as u32 }
        };

        members[label as usize].push(i);
        labels.push(label);
        tree.insert(IndexedPoint::new([c.x, c.y], i));
    }

    let count = members.len();
    (labels, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(points: &[(f64, f64)]) -> Vec<Coord<f64>> {
        points.iter().map(|&(x, y)| Coord { x, y }).collect()
    }

    #[test]
    fn coincident_points_share_a_cluster() {
        let points = coords(&[(0.0, 0.0), (5.0, 5.0), (0.0, 0.0)]);
        let clusters = cluster_points(&points, 0.0, SnapStrategy::Transitive);
        assert_eq!(clusters.labels(), &[NodeId(0), NodeId(1), NodeId(0)]);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn labels_follow_first_appearance() {
        let points = coords(&[(9.0, 9.0), (0.0, 0.0), (9.1, 9.0), (0.05, 0.0)]);
        for strategy in [SnapStrategy::Transitive, SnapStrategy::Strict] {
            let clusters = cluster_points(&points, 0.2, strategy);
            assert_eq!(clusters.labels(), &[NodeId(0), NodeId(1), NodeId(0), NodeId(1)]);
        }
    }

    #[test]
    fn transitive_chains_through_intermediate_points() {
        // Each neighbor is 0.4 apart; the ends are 0.8 apart.
        let points = coords(&[(0.0, 0.0), (0.4, 0.0), (0.8, 0.0)]);
        let clusters = cluster_points(&points, 0.5, SnapStrategy::Transitive);
        assert_eq!(clusters.len(), 1);
        assert!(clusters.is_chained(NodeId(0)));
        assert_eq!(clusters.chained().collect::<Vec<_>>(), vec![NodeId(0)]);
    }

    #[test]
    fn strict_does_not_chain() {
        let points = coords(&[(0.0, 0.0), (0.4, 0.0), (0.8, 0.0)]);
        let clusters = cluster_points(&points, 0.5, SnapStrategy::Strict);
        assert_eq!(clusters.labels(), &[NodeId(0), NodeId(0), NodeId(1)]);
        assert_eq!(clusters.chained().count(), 0);
    }

    #[test]
    fn pairs_are_never_flagged_as_chained() {
        let points = coords(&[(0.0, 0.0), (0.3, 0.0)]);
        let clusters = cluster_points(&points, 0.5, SnapStrategy::Transitive);
        assert_eq!(clusters.len(), 1);
        assert!(!clusters.is_chained(NodeId(0)));
    }

    #[test]
    fn empty_input() {
        let clusters = cluster_points(&[], 1.0, SnapStrategy::Transitive);
        assert!(clusters.is_empty());
        assert!(clusters.labels().is_empty());
    }
}
