use anyhow::{Context, Result};
use sidewalk_gaps::Pipeline;
use tracing::info;

use super::{load_config, open_store};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::SchemaArgs) -> Result<()> {
    let config = load_config(cli)?;
    let store = open_store(cli)?;
    info!(schema = %args.schema, data_dir = %cli.data_dir.display(), "starting batch run");

    let summary = Pipeline::new(&store, &config)?
        .run_all(&args.schema)
        .with_context(|| format!("run-all failed for schema {}", args.schema))?;

    print!("{summary}");
    Ok(())
}
