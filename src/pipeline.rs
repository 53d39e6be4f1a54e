use std::fmt;

use tracing::info;

use crate::config::AnalysisConfig;
use crate::coverage::{classify, CenterlineRecord, CoverageClass};
use crate::error::Result;
use crate::feature::LineFeature;
use crate::islands::{detect_islands, Islands};
use crate::nodes::{build_nodes, NodeTable};
use crate::normalize::normalize;
use crate::output::{coverage_layer, island_layer, node_layer};
use crate::store::SpatialStore;

/// Counts from the Node Builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSummary {
    pub lines: usize,
    pub nodes: usize,
    pub chained: usize,
}

/// Counts from the Coverage Classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageSummary {
    pub centerlines: usize,
    pub full: usize,
    pub partial: usize,
    pub none: usize,
}

/// Counts from the Island Detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IslandSummary {
    pub sidewalks: usize,
    pub islands: usize,
    pub singletons: usize,
}

/// What a pipeline command produced; stages that did not run are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub nodes: Option<NodeSummary>,
    pub coverage: Option<CoverageSummary>,
    pub islands: Option<IslandSummary>,
}

impl NodeSummary {
    fn of(lines: &[LineFeature], table: &NodeTable) -> Self {
        Self { lines: lines.len(), nodes: table.len(), chained: table.chained().count() }
    }
}

impl CoverageSummary {
    fn of(records: &[CenterlineRecord]) -> Self {
        let count = |class| records.iter().filter(|r| r.class == class).count();
        Self {
            centerlines: records.len(),
            full: count(CoverageClass::Full),
            partial: count(CoverageClass::Partial),
            none: count(CoverageClass::None),
        }
    }
}

impl IslandSummary {
    fn of(islands: &Islands) -> Self {
        Self {
            sidewalks: islands.groups().iter().map(|g| g.len()).sum(),
            islands: islands.len(),
            singletons: islands.groups().iter().filter(|g| g.is_singleton()).count(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.nodes {
            writeln!(f, "nodes: {} from {} lines ({} chained)", s.nodes, s.lines, s.chained)?;
        }
        if let Some(s) = self.coverage {
            writeln!(f, "centerlines: {} ({} full, {} partial, {} none)", s.centerlines, s.full, s.partial, s.none)?;
        }
        if let Some(s) = self.islands {
            writeln!(f, "islands: {} from {} sidewalks ({} singletons)", s.islands, s.sidewalks, s.singletons)?;
        }
        Ok(())
    }
}

/// Runs analysis commands against a store with a fixed configuration.
///
/// Each command reads its source tables from `schema`, computes in memory, and
/// publishes its output layers in one all-or-nothing step.  Nothing is written
/// when any stage fails.
pub struct Pipeline<'a, S: SpatialStore> {
    store: &'a S,
    config: &'a AnalysisConfig,
}

impl<'a, S: SpatialStore> Pipeline<'a, S> {
    /// Validate `config` and bind it to `store`.
    pub fn new(store: &'a S, config: &'a AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Read and normalize a line table.
    fn load(&self, schema: &str, table: &str) -> Result<Vec<LineFeature>> {
        let features = self.store.read_lines(schema, table)?;
        normalize(&features, self.config.target_crs())
    }

    fn load_both(&self, schema: &str) -> Result<(Vec<LineFeature>, Vec<LineFeature>)> {
        let tables = &self.config.tables;
        let (sidewalks, centerlines) = rayon::join(
            || self.load(schema, &tables.sidewalks),
            || self.load(schema, &tables.centerlines),
        );
        Ok((sidewalks?, centerlines?))
    }

    /// Derive the sidewalk node table.
    pub fn make_nodes(&self, schema: &str) -> Result<RunSummary> {
        let tables = &self.config.tables;
        let sidewalks = self.load(schema, &tables.sidewalks)?;
        let nodes = build_nodes(&sidewalks, &self.config.snap())?;

        self.store.publish(schema, &[node_layer(&tables.nodes, self.config.target_crs(), &nodes)])?;
        Ok(RunSummary { nodes: Some(NodeSummary::of(&sidewalks, &nodes)), ..Default::default() })
    }

    /// Classify centerline coverage.
    pub fn analyze_segments(&self, schema: &str) -> Result<RunSummary> {
        let (sidewalks, centerlines) = self.load_both(schema)?;
        let records = classify(&centerlines, &sidewalks, &self.config.coverage())?;

        self.store.publish(schema, &[coverage_layer(&self.config.tables.coverage, self.config.target_crs(), &records)])?;
        Ok(RunSummary { coverage: Some(CoverageSummary::of(&records)), ..Default::default() })
    }

    /// Group sidewalks into islands.
    pub fn identify_islands(&self, schema: &str) -> Result<RunSummary> {
        let sidewalks = self.load(schema, &self.config.tables.sidewalks)?;
        let islands = detect_islands(&sidewalks, &self.config.islands())?;

        self.store.publish(schema, &[island_layer(&self.config.tables.islands, self.config.target_crs(), &sidewalks, &islands)])?;
        Ok(RunSummary { islands: Some(IslandSummary::of(&islands)), ..Default::default() })
    }

    /// All three analyses in one batch, published together.
    pub fn run_all(&self, schema: &str) -> Result<RunSummary> {
        let (sidewalks, centerlines) = self.load_both(schema)?;
        let config = self.config;

        let (nodes, records) = rayon::join(
            || build_nodes(&sidewalks, &config.snap()),
            || classify(&centerlines, &sidewalks, &config.coverage()),
        );
        let (nodes, records) = (nodes?, records?);
        let islands = detect_islands(&sidewalks, &config.islands())?;

        let crs = config.target_crs();
        self.store.publish(schema, &[
            node_layer(&config.tables.nodes, crs, &nodes),
            coverage_layer(&config.tables.coverage, crs, &records),
            island_layer(&config.tables.islands, crs, &sidewalks, &islands),
        ])?;

        let summary = RunSummary {
            nodes: Some(NodeSummary::of(&sidewalks, &nodes)),
            coverage: Some(CoverageSummary::of(&records)),
            islands: Some(IslandSummary::of(&islands)),
        };
        info!(schema, nodes = nodes.len(), centerlines = records.len(), islands = islands.len(), "completed batch run");
        Ok(summary)
    }
}
