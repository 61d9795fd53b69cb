// Model bank trainer: reads the dataset CSV and fits one gradient boosted
// regressor per (statistic, year) target, then writes the artifacts and
// manifest under the configured models directory.

use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};

use hooparc::config;
use hooparc::train::train_model_bank;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing().context("failed to initialize tracing")?;
    info!("model training starting");

    let config = config::load_config().context("failed to load configuration")?;
    let dataset_path = Path::new(&config.dataset.path);
    let models_dir = Path::new(&config.training.models_dir);

    let report = train_model_bank(dataset_path, models_dir, &config.training)
        .await
        .context("training run failed")?;

    info!(
        "trained {} of 15 targets from {} rows ({} dropped)",
        report.entries.len(),
        report.rows_used,
        report.rows_total - report.rows_used
    );
    if !report.failed.is_empty() {
        let failed: Vec<String> = report.failed.iter().map(|k| k.to_string()).collect();
        warn!("targets missing from the bank: {}", failed.join(", "));
    }

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
