mod geojson;

use geo::{LineString, Point};

use crate::error::Result;
use crate::feature::{Attributes, Crs, SourceFeature};

pub use geojson::GeoJsonStore;

/// Geometry of a published feature.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputGeometry {
    Point(Point<f64>),
    Line(LineString<f64>),
}

/// One row of a published layer.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFeature {
    /// Value of the layer's key column.
    pub key: u64,
    pub geometry: OutputGeometry,
    pub properties: Attributes,
}

/// A derived table, written in full on every run.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayer {
    pub table: String,
    pub crs: Crs,
    /// Name of the stable integer key column.
    pub key: String,
    pub features: Vec<OutputFeature>,
}

impl OutputLayer {
    #[inline] pub fn len(&self) -> usize { self.features.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }
}

/// Source of line layers and sink for derived layers.
///
/// Tables live inside a schema.  `publish` replaces every named layer or,
/// on failure, none of them.
pub trait SpatialStore: Sync {
    /// Every feature of `schema.table`.  A missing table, null or non-line
    /// geometry, and an empty table are input errors.
    fn read_lines(&self, schema: &str, table: &str) -> Result<Vec<SourceFeature>>;

    /// Replace the given layers in `schema`.
    fn publish(&self, schema: &str, layers: &[OutputLayer]) -> Result<()>;
}
