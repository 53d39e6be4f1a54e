use geo::{Coord, Point};
use linegraph::{cluster_points, FeatureId, NodeId};
use smallvec::SmallVec;
use tracing::{info, warn};

use crate::config::SnapParams;
use crate::error::Result;
use crate::feature::{check_arena, common_crs, Crs, LineEnd, LineFeature};

/// One end of one line feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointRef {
    pub feature: FeatureId,
    pub end: LineEnd,
}

/// A topological node: every line endpoint that snapped to the same place.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    point: Point<f64>,
    crs: Crs,
    endpoints: SmallVec<[EndpointRef; 4]>,
    chained: bool,
}

impl Node {
    #[inline] pub fn id(&self) -> NodeId { self.id }

    /// Location of the node: the coordinate of its first endpoint.
    #[inline] pub fn point(&self) -> Point<f64> { self.point }

    #[inline] pub fn crs(&self) -> Crs { self.crs }

    /// Endpoints that collapsed onto this node, in traversal order.
    #[inline] pub fn endpoints(&self) -> &[EndpointRef] { &self.endpoints }

    /// Number of line ends meeting at this node.
    #[inline] pub fn degree(&self) -> usize { self.endpoints.len() }

    /// Set when the node merged endpoints farther apart than the snapping
    /// tolerance through a chain of nearer ones.
    #[inline] pub fn is_chained(&self) -> bool { self.chained }
}

/// Node id of every (feature, end) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointMap {
    nodes: Vec<NodeId>, // nodes[2 * feature + end]
}

impl EndpointMap {
    #[inline]
    fn slot(feature: FeatureId, end: LineEnd) -> usize {
        2 * feature.index() + matches!(end, LineEnd::End) as usize
    }

    /// Node that `end` of `feature` resolved to.
    #[inline]
    pub fn get(&self, feature: FeatureId, end: LineEnd) -> NodeId {
        self.nodes[Self::slot(feature, end)]
    }

    /// Number of features covered.
    #[inline] pub fn num_features(&self) -> usize { self.nodes.len() / 2 }

    /// `(start, end)` node pairs per feature: the edge list of the line graph.
    pub fn edges(&self) -> impl Iterator<Item = (FeatureId, NodeId, NodeId)> + '_ {
        self.nodes.chunks_exact(2).enumerate().map(|(i, pair)| (FeatureId(i as u32), pair[0], pair[1]))
    }
}

/// Output of the Node Builder.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTable {
    nodes: Vec<Node>,
    endpoints: EndpointMap,
}

impl NodeTable {
    #[inline] pub fn len(&self) -> usize { self.nodes.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    #[inline] pub fn nodes(&self) -> &[Node] { &self.nodes }

    #[inline] pub fn node(&self, id: NodeId) -> &Node { &self.nodes[id.index()] }

    #[inline] pub fn endpoints(&self) -> &EndpointMap { &self.endpoints }

    /// Nodes formed through chained proximity.
    pub fn chained(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(|n| n.chained)
    }
}

/// Derive topological nodes from the endpoints of `lines`.
///
/// Endpoints are visited in input order, start before end.  Endpoints within
/// `params.tolerance` of each other share a node under the policy in
/// `params.strategy`; node ids follow first appearance in that traversal, so
/// identical input always yields an identical table.
///
/// Under [`linegraph::SnapStrategy::Transitive`] nearby but distinct intersections can
/// merge through a chain of endpoints; such nodes are flagged (see
/// [`Node::is_chained`]) and logged, never split.
///
/// `lines` must be a working set as produced by `normalize`: each
/// feature's id is its position.  Anything else is an input error.
pub fn build_nodes(lines: &[LineFeature], params: &SnapParams) -> Result<NodeTable> {
    params.validate()?;
    check_arena(lines)?;
    let Some(crs) = common_crs(lines)? else {
        return Ok(NodeTable { nodes: Vec::new(), endpoints: EndpointMap { nodes: Vec::new() } });
    };

    let points = lines.iter()
        .flat_map(|line| [line.endpoint(LineEnd::Start), line.endpoint(LineEnd::End)])
        .collect::<Vec<Coord<f64>>>();
    let clusters = cluster_points(&points, params.tolerance, params.strategy);

    let mut nodes: Vec<Node> = Vec::with_capacity(clusters.len());
    for (slot, &id) in clusters.labels().iter().enumerate() {
        let endpoint = EndpointRef {
            feature: lines[slot / 2].id(),
            end: if slot % 2 == 0 { LineEnd::Start } else { LineEnd::End },
        };
        // Labels follow first appearance, so a new id is always the next one.
        if id.index() == nodes.len() {
            nodes.push(Node {
                id,
                point: points[slot].into(),
                crs,
                endpoints: SmallVec::new(),
                chained: clusters.is_chained(id),
            });
        }
        nodes[id.index()].endpoints.push(endpoint);
    }

    for node in nodes.iter().filter(|n| n.chained) {
        warn!(node = %node.id, endpoints = node.degree(), x = node.point.x(), y = node.point.y(),
            "endpoints merged through chained proximity; nearby intersections may have collapsed");
    }
    info!(lines = lines.len(), nodes = nodes.len(), strategy = ?params.strategy, "built line nodes");

    Ok(NodeTable {
        nodes,
        endpoints: EndpointMap { nodes: clusters.labels().to_vec() },
    })
}

#[cfg(test)]
mod tests {
    use linegraph::SnapStrategy;

    use super::*;
    use crate::feature::testing::line;

    fn params(tolerance: f64) -> SnapParams {
        SnapParams { tolerance, strategy: SnapStrategy::Transitive }
    }

    #[test]
    fn three_lines_sharing_an_endpoint_make_four_nodes() {
        let lines = vec![
            line(0, &[(0.0, 0.0), (10.0, 0.0)]),
            line(1, &[(10.0, 0.0), (20.0, 0.0)]),
            line(2, &[(10.0, 0.0), (10.0, 10.0)]),
        ];
        let table = build_nodes(&lines, &params(0.5)).unwrap();

        assert_eq!(table.len(), 4);
        let shared = table.endpoints().get(FeatureId(0), LineEnd::End);
        assert_eq!(table.endpoints().get(FeatureId(1), LineEnd::Start), shared);
        assert_eq!(table.endpoints().get(FeatureId(2), LineEnd::Start), shared);
        assert_eq!(table.node(shared).degree(), 3);
        assert_eq!(table.nodes().iter().map(Node::degree).sum::<usize>(), 6);
    }

    #[test]
    fn ids_follow_first_appearance() {
        let lines = vec![
            line(0, &[(5.0, 5.0), (0.0, 0.0)]),
            line(1, &[(0.0, 0.0), (9.0, 9.0)]),
        ];
        let table = build_nodes(&lines, &params(0.5)).unwrap();

        let ids = table.endpoints().edges().collect::<Vec<_>>();
        assert_eq!(ids, vec![
            (FeatureId(0), NodeId(0), NodeId(1)),
            (FeatureId(1), NodeId(1), NodeId(2)),
        ]);
        assert_eq!(table.node(NodeId(0)).point(), Point::new(5.0, 5.0));
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let lines = (0..20)
            .map(|i| line(i, &[(i as f64 * 3.0, 0.0), (i as f64 * 3.0 + 3.05, 0.0)]))
            .collect::<Vec<_>>();
        let first = build_nodes(&lines, &params(0.1)).unwrap();
        let second = build_nodes(&lines, &params(0.1)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 21);
    }

    #[test]
    fn tolerance_decides_whether_endpoints_merge() {
        let lines = vec![
            line(0, &[(0.0, 0.0), (10.0, 0.0)]),
            line(1, &[(10.3, 0.0), (20.0, 0.0)]),
        ];
        let merged = build_nodes(&lines, &params(0.5)).unwrap();
        assert_eq!(merged.endpoints().get(FeatureId(0), LineEnd::End), merged.endpoints().get(FeatureId(1), LineEnd::Start));

        let split = build_nodes(&lines, &params(0.2)).unwrap();
        assert_ne!(split.endpoints().get(FeatureId(0), LineEnd::End), split.endpoints().get(FeatureId(1), LineEnd::Start));
    }

    #[test]
    fn chained_clusters_are_flagged() {
        // Three short stubs whose ends step 0.4 apart: one chained node at ~x=10.
        let lines = vec![
            line(0, &[(0.0, 0.0), (10.0, 0.0)]),
            line(1, &[(10.4, 0.0), (10.4, 10.0)]),
            line(2, &[(10.8, 0.0), (20.0, 0.0)]),
        ];
        let table = build_nodes(&lines, &params(0.5)).unwrap();
        assert_eq!(table.chained().count(), 1);

        let strict = build_nodes(&lines, &SnapParams { tolerance: 0.5, strategy: SnapStrategy::Strict }).unwrap();
        assert_eq!(strict.chained().count(), 0);
        assert_eq!(strict.len(), table.len() + 1);
    }

    #[test]
    fn empty_input_gives_empty_table() {
        let table = build_nodes(&[], &params(0.5)).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.endpoints().num_features(), 0);
    }

    #[test]
    fn out_of_order_ids_are_rejected() {
        let lines = vec![
            line(1, &[(0.0, 0.0), (10.0, 0.0)]),
            line(0, &[(20.0, 0.0), (30.0, 0.0)]),
        ];
        assert!(matches!(build_nodes(&lines, &params(0.5)), Err(crate::GapsError::Input(_))));
    }

    #[test]
    fn negative_tolerance_is_a_config_error() {
        let lines = vec![line(0, &[(0.0, 0.0), (1.0, 0.0)])];
        assert!(matches!(build_nodes(&lines, &params(-1.0)), Err(crate::GapsError::Config(_))));
    }
}
