#![doc = "Sidewalk gap analysis: line nodes, centerline coverage and sidewalk islands"]
mod config;
mod coverage;
mod error;
mod feature;
mod index;
mod islands;
mod nodes;
mod normalize;
mod output;
mod pipeline;
mod store;

#[doc(inline)]
pub use config::{AnalysisConfig, CoverageParams, IslandParams, SnapParams, TableNames};

#[doc(inline)]
pub use error::{GapsError, Result};

#[doc(inline)]
pub use feature::{AttrValue, Attributes, Crs, CrsDefinition, LineEnd, LineFeature, SourceFeature, SourceGeometry, SourceKey};

#[doc(inline)]
pub use normalize::normalize;

#[doc(inline)]
pub use nodes::{build_nodes, EndpointMap, EndpointRef, Node, NodeTable};

#[doc(inline)]
pub use coverage::{classify, CenterlineRecord, CoverageClass};

#[doc(inline)]
pub use islands::{detect_islands, IslandGroup, Islands};

#[doc(inline)]
pub use output::{coverage_layer, island_layer, node_layer};

#[doc(inline)]
pub use store::{GeoJsonStore, OutputFeature, OutputGeometry, OutputLayer, SpatialStore};

#[doc(inline)]
pub use pipeline::{CoverageSummary, IslandSummary, NodeSummary, Pipeline, RunSummary};

pub use linegraph::{FeatureId, GroupId, NodeId, SnapStrategy};
