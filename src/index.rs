use geo::{BoundingRect, Line, Rect};
use rstar::{RTree, RTreeObject, AABB};

use crate::feature::LineFeature;

/// Grow a rectangle by `pad` on every side and turn it into an R-tree envelope.
#[inline]
pub(crate) fn padded_envelope(rect: Rect<f64>, pad: f64) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [rect.min().x - pad, rect.min().y - pad],
        [rect.max().x + pad, rect.max().y + pad],
    )
}

/// A bounding box in an R-tree, associated with a LineFeature by index.
#[derive(Debug, Clone)]
pub(crate) struct BoundingBox {
    idx: usize, // Index of corresponding LineFeature in the working set
    bbox: Rect<f64>,
}

impl BoundingBox {
    /// Get the index of the corresponding LineFeature.
    #[inline] pub(crate) fn idx(&self) -> usize { self.idx }
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// R-tree over whole-feature bounding boxes.
pub(crate) fn feature_tree(features: &[LineFeature]) -> RTree<BoundingBox> {
    RTree::bulk_load(
        features.iter().enumerate()
            .filter_map(|(idx, f)| f.geometry().bounding_rect().map(|bbox| BoundingBox { idx, bbox }))
            .collect()
    )
}

/// One straight segment of a LineFeature.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexedSegment {
    pub(crate) feature: usize,
    pub(crate) line: Line<f64>,
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.line.start.into(), self.line.end.into())
    }
}

/// R-tree over every segment of every feature.  Zero-length segments
/// (repeated vertices) are skipped.
pub(crate) fn segment_tree(features: &[LineFeature]) -> RTree<IndexedSegment> {
    RTree::bulk_load(
        features.iter().enumerate()
            .flat_map(|(feature, f)| f.geometry().lines()
                .filter(|line| line.start != line.end)
                .map(move |line| IndexedSegment { feature, line }))
            .collect()
    )
}
