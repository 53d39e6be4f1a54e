use geo::{BoundingRect, Distance, Euclidean, Intersects};
use linegraph::{connected_components, AdjacencyMatrix, FeatureId, GroupId};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::IslandParams;
use crate::error::Result;
use crate::feature::{check_arena, common_crs, LineFeature};
use crate::index::{feature_tree, padded_envelope};

/// A maximal set of mutually reachable sidewalk features.
#[derive(Debug, Clone, PartialEq)]
pub struct IslandGroup {
    pub id: GroupId,
    /// Member features, ascending.
    pub members: Vec<FeatureId>,
    /// Summed planar length of the members.
    pub length: f64,
}

impl IslandGroup {
    #[inline] pub fn len(&self) -> usize { self.members.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.members.is_empty() }

    #[inline] pub fn is_singleton(&self) -> bool { self.members.len() == 1 }
}

/// Output of the Island Detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Islands {
    groups: Vec<IslandGroup>,
    membership: Vec<GroupId>,
    adjacency: AdjacencyMatrix,
}

impl Islands {
    /// Groups in id order.
    #[inline] pub fn groups(&self) -> &[IslandGroup] { &self.groups }

    #[inline] pub fn group(&self, id: GroupId) -> &IslandGroup { &self.groups[id.index()] }

    /// Group of a feature.
    #[inline] pub fn group_of(&self, feature: FeatureId) -> GroupId { self.membership[feature.index()] }

    /// Feature-to-feature adjacency the groups were computed from.
    #[inline] pub fn adjacency(&self) -> &AdjacencyMatrix { &self.adjacency }

    #[inline] pub fn len(&self) -> usize { self.groups.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.groups.is_empty() }
}

/// Return true if `a` and `b` touch or come within `distance` of each other.
fn adjacent(a: &LineFeature, b: &LineFeature, distance: f64) -> bool {
    a.geometry().intersects(b.geometry())
        || (distance > 0.0 && Euclidean.distance(a.geometry(), b.geometry()) <= distance)
}

/// Group sidewalk features into connected islands.
///
/// Features are adjacent when they intersect or lie within
/// `params.adjacency_distance` of each other.  Group ids follow first
/// appearance in feature order, so the island holding feature 0 is group 0.
/// Isolated features come back as singleton groups.  Each feature's id must
/// be its position in `sidewalks`.
pub fn detect_islands(sidewalks: &[LineFeature], params: &IslandParams) -> Result<Islands> {
    params.validate()?;
    check_arena(sidewalks)?;
    common_crs(sidewalks)?;

    let distance = params.adjacency_distance;
    let tree = feature_tree(sidewalks);

    let edges = sidewalks.par_iter().enumerate()
        .flat_map_iter(|(i, feature)| {
            let candidates = feature.geometry().bounding_rect()
                .map(|rect| tree.locate_in_envelope_intersecting(&padded_envelope(rect, distance))
                    .map(|bbox| bbox.idx())
                    .filter(|&j| j > i && adjacent(feature, &sidewalks[j], distance))
                    .map(|j| (i as u32, j as u32))
                    .collect::<Vec<_>>())
                .unwrap_or_default();
            candidates.into_iter()
        })
        .collect::<Vec<_>>();
    debug!(sidewalks = sidewalks.len(), pairs = edges.len(), "found adjacent sidewalk pairs");

    let adjacency = AdjacencyMatrix::from_edges(sidewalks.len(), &edges);
    let components = connected_components(&adjacency);

    let groups = components.iter()
        .map(|(id, members)| IslandGroup {
            id,
            members: members.iter().map(|&m| FeatureId(m)).collect(),
            length: members.iter().map(|&m| sidewalks[m as usize].length()).sum(),
        })
        .collect::<Vec<_>>();

    info!(
        sidewalks = sidewalks.len(),
        islands = groups.len(),
        singletons = groups.iter().filter(|g| g.is_singleton()).count(),
        "detected sidewalk islands"
    );

    Ok(Islands { groups, membership: components.labels().to_vec(), adjacency })
}
