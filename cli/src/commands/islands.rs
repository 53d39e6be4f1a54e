use anyhow::{Context, Result};
use sidewalk_gaps::Pipeline;

use super::{load_config, open_store};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::SchemaArgs) -> Result<()> {
    let config = load_config(cli)?;
    let store = open_store(cli)?;

    let summary = Pipeline::new(&store, &config)?
        .identify_islands(&args.schema)
        .with_context(|| format!("identify-islands failed for schema {}", args.schema))?;

    print!("{summary}");
    Ok(())
}
