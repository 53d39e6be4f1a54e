mod attrs;
mod crs;

use std::{fmt, sync::Arc};

use geo::{Coord, Euclidean, Length, LineString, MultiLineString};
use linegraph::FeatureId;

use crate::error::{GapsError, Result};

pub use attrs::{AttrValue, Attributes};
pub use crs::{Crs, CrsDefinition};
pub(crate) use crs::Reprojector;

/// Where a feature came from: a source table and the row within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub table: Arc<str>,
    pub row: u32,
}

impl SourceKey {
    pub fn new(table: &str, row: u32) -> Self {
        Self { table: table.into(), row }
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.table, self.row)
    }
}

/// Line geometry as read from the store, possibly multi-part.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceGeometry {
    Line(LineString<f64>),
    MultiLine(MultiLineString<f64>),
}

/// A raw feature as read from the store, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFeature {
    pub source: SourceKey,
    pub geometry: SourceGeometry,
    /// `None` when the store could not determine the CRS.
    pub crs: Option<Crs>,
    pub attributes: Attributes,
}

/// Which end of a line feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LineEnd {
    Start,
    End,
}

impl LineEnd {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
        }
    }
}

/// A single-part line in a planar working set.
///
/// Construction checks the invariants every downstream algorithm relies on:
/// at least two vertices, finite coordinates, and non-zero length.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFeature {
    id: FeatureId,
    source: SourceKey,
    explode: Option<u32>,
    geometry: LineString<f64>,
    crs: Crs,
    length: f64,
    attributes: Attributes,
}

impl LineFeature {
    pub fn new(
        id: FeatureId,
        source: SourceKey,
        explode: Option<u32>,
        geometry: LineString<f64>,
        crs: Crs,
        attributes: Attributes,
    ) -> Result<Self> {
        if geometry.0.len() < 2 {
            return Err(GapsError::geometry(&source, format!("line has {} vertices, need at least 2", geometry.0.len())));
        }
        if geometry.0.iter().any(|c: &Coord<f64>| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(GapsError::geometry(&source, "line has non-finite coordinates"));
        }
        let length = Euclidean.length(&geometry);
        if length <= 0.0 {
            return Err(GapsError::geometry(&source, "line has zero length"));
        }

        Ok(Self { id, source, explode, geometry, crs, length, attributes })
    }

    #[inline] pub fn id(&self) -> FeatureId { self.id }

    #[inline] pub fn source(&self) -> &SourceKey { &self.source }

    /// Part index within the source multi-part geometry, if it had one.
    #[inline] pub fn explode(&self) -> Option<u32> { self.explode }

    #[inline] pub fn geometry(&self) -> &LineString<f64> { &self.geometry }

    #[inline] pub fn crs(&self) -> Crs { self.crs }

    /// Planar length, in CRS units.
    #[inline] pub fn length(&self) -> f64 { self.length }

    #[inline] pub fn attributes(&self) -> &Attributes { &self.attributes }

    /// Coordinate of the requested end vertex.
    #[inline]
    pub fn endpoint(&self, end: LineEnd) -> Coord<f64> {
        match end {
            LineEnd::Start => self.geometry.0[0],
            LineEnd::End => self.geometry.0[self.geometry.0.len() - 1],
        }
    }
}

/// The single CRS shared by `features`, or `None` for an empty set.
pub(crate) fn common_crs(features: &[LineFeature]) -> Result<Option<Crs>> {
    let Some(first) = features.first() else { return Ok(None) };
    match features.iter().find(|f| f.crs() != first.crs()) {
        Some(other) => Err(GapsError::geometry(other.source(), format!(
            "CRS {} differs from working set CRS {}", other.crs(), first.crs()))),
        None => Ok(Some(first.crs())),
    }
}

/// Check that every feature's id is its position in `features`.  Node and
/// island results are indexed by position and reported by id, so the two must
/// agree.
pub(crate) fn check_arena(features: &[LineFeature]) -> Result<()> {
    match features.iter().enumerate().find(|(i, f)| f.id().index() != *i) {
        Some((i, f)) => Err(GapsError::Input(format!(
            "{} has id {} at position {i}; feature ids must be contiguous from 0", f.source(), f.id()))),
        None => Ok(()),
    }
}
