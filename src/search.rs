use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::SearchArgs;
use crate::fetch::HttpLoader;

pub async fn run(args: SearchArgs) -> anyhow::Result<()> {
    let (config, base_dir) = crate::config::load(PathBuf::from(&args.config).as_path())?;
    let loader = Arc::new(HttpLoader::new(base_dir)?);
    let catalog = crate::fetch::load_all(loader, &config.sources).await;

    let hits = crate::filter::search(&catalog, &args.query);
    for record in &hits {
        println!("{}  [{}]", record.display_title(), record.source_key);
    }
    tracing::info!(query = %args.query, hits = hits.len(), "search finished");
    Ok(())
}
