// Dataset builder: pulls career stats from stats.nba.com and writes the
// rookie-to-year-6 training table as CSV. Rerunning overwrites the file
// wholesale, so a run is always internally consistent.

use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};

use hooparc::config;
use hooparc::dataset::{assemble, write_csv};
use hooparc::source::nba::NbaStatsClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing().context("failed to initialize tracing")?;
    info!("dataset build starting");

    let config = config::load_config().context("failed to load configuration")?;
    let dataset_config = &config.dataset;

    let source = NbaStatsClient::new().context("failed to build stats client")?;
    let rows = assemble(&source, dataset_config)
        .await
        .context("failed to assemble dataset")?;

    if rows.is_empty() {
        warn!("no qualifying players found; leaving any existing dataset untouched");
        return Ok(());
    }

    let path = Path::new(&dataset_config.path);
    write_csv(path, &rows).with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote {} rows to {}", rows.len(), path.display());

    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hooparc=info,warn")),
        )
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
