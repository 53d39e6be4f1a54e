use std::{fs, path::Path};

use linegraph::SnapStrategy;
use serde::{Deserialize, Serialize};

use crate::error::{GapsError, Result};
use crate::feature::Crs;

/// Every tunable of a batch run, passed explicitly into each operation.
///
/// Distances are in the units of the target CRS (metres for the project
/// default, EPSG:26918).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// EPSG code of the planar CRS all geometry is reprojected into.
    pub target_epsg: u32,
    /// Maximum distance at which two line endpoints are the same node.
    pub snap_tolerance: f64,
    pub snap_strategy: SnapStrategy,
    /// Half-width of the strip around a centerline that counts as adjacent.
    pub buffer_distance: f64,
    /// Maximum angle, in degrees, between a sidewalk and the centerline for
    /// the sidewalk to count as parallel.
    pub parallel_tolerance: f64,
    /// Coverage fraction at or above which a centerline is fully covered.
    pub full_threshold: f64,
    /// Coverage fraction above which a centerline is partially covered.
    pub min_parallel_fraction: f64,
    /// Maximum gap between two sidewalks that still connects them.
    pub adjacency_distance: f64,
    pub tables: TableNames,
}

/// Names of the layers read and written by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableNames {
    pub sidewalks: String,
    pub centerlines: String,
    pub nodes: String,
    pub coverage: String,
    pub islands: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            sidewalks: "pedestriannetwork_lines".into(),
            centerlines: "osm_edges".into(),
            nodes: "nodes_for_sidewalks".into(),
            coverage: "centerline_sidewalk_coverage".into(),
            islands: "sidewalk_islands".into(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_epsg: 26918,
            snap_tolerance: 0.5,
            snap_strategy: SnapStrategy::Transitive,
            buffer_distance: 20.0,
            parallel_tolerance: 20.0,
            full_threshold: 0.9,
            min_parallel_fraction: 0.0,
            adjacency_distance: 1.0,
            tables: TableNames::default(),
        }
    }
}

/// Node Builder parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapParams {
    pub tolerance: f64,
    pub strategy: SnapStrategy,
}

/// Coverage Classifier parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageParams {
    pub buffer_distance: f64,
    /// Degrees.
    pub parallel_tolerance: f64,
    pub full_threshold: f64,
    pub min_parallel_fraction: f64,
}

/// Island Detector parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IslandParams {
    pub adjacency_distance: f64,
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(GapsError::Config(format!("{name} must be a non-negative number, got {value}")));
    }
    Ok(())
}

fn fraction(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(GapsError::Config(format!("{name} must be in [0, 1], got {value}")));
    }
    Ok(())
}

impl SnapParams {
    pub fn validate(&self) -> Result<()> {
        non_negative("snap_tolerance", self.tolerance)
    }
}

impl CoverageParams {
    pub fn validate(&self) -> Result<()> {
        non_negative("buffer_distance", self.buffer_distance)?;
        if !(0.0..=90.0).contains(&self.parallel_tolerance) {
            return Err(GapsError::Config(format!(
                "parallel_tolerance must be in [0, 90] degrees, got {}", self.parallel_tolerance)));
        }
        fraction("full_threshold", self.full_threshold)?;
        fraction("min_parallel_fraction", self.min_parallel_fraction)?;
        if self.min_parallel_fraction >= self.full_threshold {
            return Err(GapsError::Config(format!(
                "min_parallel_fraction ({}) must be below full_threshold ({})",
                self.min_parallel_fraction, self.full_threshold)));
        }
        Ok(())
    }
}

impl IslandParams {
    pub fn validate(&self) -> Result<()> {
        non_negative("adjacency_distance", self.adjacency_distance)
    }
}

impl AnalysisConfig {
    /// Read a (possibly partial) config from a JSON file; missing fields take
    /// their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| GapsError::io(path, e))?;
        let config: Self = serde_json::from_slice(&bytes).map_err(|e| GapsError::json(path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter is in range and the target CRS is usable.
    pub fn validate(&self) -> Result<()> {
        self.snap().validate()?;
        self.coverage().validate()?;
        self.islands().validate()?;
        let target = self.target_crs();
        match target.definition() {
            None => Err(GapsError::Config(format!("unsupported target CRS {target}"))),
            Some(def) if def.geographic => Err(GapsError::Config(format!(
                "target CRS {target} is geographic; a projected CRS is required"))),
            Some(_) => Ok(()),
        }
    }

    #[inline] pub fn target_crs(&self) -> Crs { Crs::epsg(self.target_epsg) }

    #[inline]
    pub fn snap(&self) -> SnapParams {
        SnapParams { tolerance: self.snap_tolerance, strategy: self.snap_strategy }
    }

    #[inline]
    pub fn coverage(&self) -> CoverageParams {
        CoverageParams {
            buffer_distance: self.buffer_distance,
            parallel_tolerance: self.parallel_tolerance,
            full_threshold: self.full_threshold,
            min_parallel_fraction: self.min_parallel_fraction,
        }
    }

    #[inline]
    pub fn islands(&self) -> IslandParams {
        IslandParams { adjacency_distance: self.adjacency_distance }
    }
}
