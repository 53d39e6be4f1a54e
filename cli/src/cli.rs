use std::path::PathBuf;

/// Sidewalk gap analysis CLI
#[derive(clap::Parser, Debug)]
#[command(name = "sidewalk", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Root directory of the GeoJSON store (<data-dir>/<schema>/<table>.geojson)
    #[arg(short, long, default_value = ".", value_hint = clap::ValueHint::DirPath, global = true)]
    pub data_dir: PathBuf,

    /// JSON file with analysis settings; missing fields keep their defaults
    #[arg(short, long, value_hint = clap::ValueHint::FilePath, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Commands,
}

/// Individual settings that take precedence over the config file.
#[derive(clap::Args, Debug, Default)]
pub struct Overrides {
    /// EPSG code of the planar working CRS
    #[arg(long, global = true)]
    pub target_epsg: Option<u32>,

    /// Endpoint snapping tolerance, in CRS units
    #[arg(long, global = true)]
    pub snap_tolerance: Option<f64>,

    /// Only merge endpoints that are all within tolerance of each other
    #[arg(long, global = true)]
    pub strict_snapping: bool,

    /// Half-width of the strip around a centerline, in CRS units
    #[arg(long, global = true)]
    pub buffer_distance: Option<f64>,

    /// Maximum sidewalk angle to a centerline, in degrees
    #[arg(long, global = true)]
    pub parallel_tolerance: Option<f64>,

    /// Coverage fraction at or above which a centerline is fully covered
    #[arg(long, global = true)]
    pub full_threshold: Option<f64>,

    /// Coverage fraction above which a centerline is partially covered
    #[arg(long, global = true)]
    pub min_parallel_fraction: Option<f64>,

    /// Maximum gap between connected sidewalks, in CRS units
    #[arg(long, global = true)]
    pub adjacency_distance: Option<f64>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Build the sidewalk node table
    MakeNodes(MakeNodesArgs),

    /// Classify centerlines by sidewalk coverage
    AnalyzeSegments(SchemaArgs),

    /// Group sidewalks into connected islands
    IdentifyIslands(SchemaArgs),

    /// Run all three analyses and publish them together
    RunAll(SchemaArgs),
}

#[derive(clap::Args, Debug)]
pub struct MakeNodesArgs {
    /// Schema holding the sidewalk table
    #[arg(short, long, default_value = "public")]
    pub schema: String,
}

#[derive(clap::Args, Debug)]
pub struct SchemaArgs {
    /// Schema holding the source tables; outputs are written beside them
    pub schema: String,
}
