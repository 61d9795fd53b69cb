// Prediction service entry point.
//
// Startup sequence:
// 1. Initialize tracing (terminal, env-filtered)
// 2. Load config (copying defaults into config/ on first run)
// 3. Load the model bank from the manifest
// 4. Serve HTTP until shutdown
//
// A missing or partial model bank is not fatal: the service starts and
// reports its state through /health, and /predict answers 503 until a
// trained bank is in place.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use hooparc::bank::ModelBank;
use hooparc::config;
use hooparc::server::{create_routes, ServerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing().context("failed to initialize tracing")?;
    info!("prediction service starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    let models_dir = std::path::PathBuf::from(&config.training.models_dir);

    // 3. Load the model bank
    let bank = match ModelBank::load(&models_dir) {
        Ok(bank) => {
            info!("model bank loaded: {} models", bank.len());
            bank
        }
        Err(e) => {
            warn!("model bank unavailable ({e}); serving without models");
            ModelBank::default()
        }
    };

    let state = ServerState {
        bank: Arc::new(bank),
        models_dir: config.training.models_dir.clone(),
    };

    // 4. Serve HTTP
    let routes = create_routes(state);
    let addr = ([127, 0, 0, 1], config.server.port);
    info!("listening on http://127.0.0.1:{}", config.server.port);
    warp::serve(routes).run(addr).await;

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
