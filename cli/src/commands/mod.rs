pub mod islands;
pub mod nodes;
pub mod run;
pub mod segments;

use anyhow::{Context, Result};
use sidewalk_gaps::{AnalysisConfig, GeoJsonStore, SnapStrategy};

use crate::cli::Cli;

/// Config file (or defaults) with command-line overrides applied.
pub fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    let o = &cli.overrides;
    if let Some(v) = o.target_epsg { config.target_epsg = v }
    if let Some(v) = o.snap_tolerance { config.snap_tolerance = v }
    if o.strict_snapping { config.snap_strategy = SnapStrategy::Strict }
    if let Some(v) = o.buffer_distance { config.buffer_distance = v }
    if let Some(v) = o.parallel_tolerance { config.parallel_tolerance = v }
    if let Some(v) = o.full_threshold { config.full_threshold = v }
    if let Some(v) = o.min_parallel_fraction { config.min_parallel_fraction = v }
    if let Some(v) = o.adjacency_distance { config.adjacency_distance = v }

    config.validate().context("Invalid analysis settings")?;
    Ok(config)
}

pub fn open_store(cli: &Cli) -> Result<GeoJsonStore> {
    if !cli.data_dir.is_dir() {
        anyhow::bail!("Data directory does not exist: {}", cli.data_dir.display());
    }
    Ok(GeoJsonStore::new(&cli.data_dir))
}
