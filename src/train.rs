// Model bank training: one independent regressor per (statistic, year).
//
// All 15 targets share one cleaned dataset and one set of hyperparameters.
// Targets fan out across blocking tasks and are joined before the manifest
// is written, so the manifest only ever lists artifacts that exist. A
// failed target is logged and left out; it never aborts the other 14.

use crate::bank::{Manifest, ManifestEntry};
use crate::config::TrainingConfig;
use crate::dataset::{read_csv, DatasetError, FeatureLabelRow};
use crate::model::{
    mean_absolute_error, GbmParams, GradientBoostedRegressor, ModelError, TargetKey, N_FEATURES,
};
use chrono::Utc;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("dataset at {path} contains no usable rows")]
    EmptyDataset { path: PathBuf },

    #[error("failed to create models directory {path}: {source}")]
    ModelsDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write manifest: {0}")]
    Manifest(#[from] crate::bank::BankError),
}

/// Outcome of a full training run.
#[derive(Debug)]
pub struct TrainReport {
    pub entries: Vec<ManifestEntry>,
    pub failed: Vec<TargetKey>,
    pub rows_total: usize,
    pub rows_used: usize,
}

impl From<&TrainingConfig> for GbmParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            n_trees: config.n_trees,
            max_depth: config.max_depth,
            learning_rate: config.learning_rate,
            subsample: config.subsample,
            colsample: config.colsample,
            lambda: config.lambda,
            seed: config.seed,
        }
    }
}

/// Train the full model bank from a dataset artifact and persist it, one
/// JSON artifact per target plus the manifest.
pub async fn train_model_bank(
    dataset_path: &Path,
    models_dir: &Path,
    config: &TrainingConfig,
) -> Result<TrainReport, TrainError> {
    let rows = read_csv(dataset_path)?;
    let rows_total = rows.len();

    // Rows with any non-finite needed column are dropped once, shared by
    // all targets.
    let usable: Vec<FeatureLabelRow> = rows.into_iter().filter(|r| r.all_finite()).collect();
    let rows_used = usable.len();
    if usable.is_empty() {
        return Err(TrainError::EmptyDataset {
            path: dataset_path.to_path_buf(),
        });
    }
    info!("dataset: {rows_used} usable of {rows_total} rows");

    std::fs::create_dir_all(models_dir).map_err(|e| TrainError::ModelsDir {
        path: models_dir.to_path_buf(),
        source: e,
    })?;

    let features: Arc<Vec<[f64; N_FEATURES]>> =
        Arc::new(usable.iter().map(|r| r.features()).collect());
    let rows = Arc::new(usable);

    // Fan out: each target trains and persists its own artifact.
    let mut handles = Vec::new();
    for key in TargetKey::all() {
        let features = Arc::clone(&features);
        let rows = Arc::clone(&rows);
        let config = config.clone();
        let dir = models_dir.to_path_buf();
        handles.push((
            key,
            tokio::task::spawn_blocking(move || train_one_target(key, &features, &rows, &config, &dir)),
        ));
    }

    // Join barrier: the manifest is written only after every target has
    // either persisted its artifact or failed.
    let mut entries = Vec::new();
    let mut failed = Vec::new();
    for (key, handle) in handles {
        match handle.await {
            Ok(Ok(entry)) => entries.push(entry),
            Ok(Err(e)) => {
                error!("target {key} failed: {e}");
                failed.push(key);
            }
            Err(e) => {
                error!("training task for {key} panicked: {e}");
                failed.push(key);
            }
        }
    }

    let manifest = Manifest {
        built_at: Utc::now(),
        entries: entries.clone(),
    };
    manifest.write(models_dir)?;
    info!(
        "model bank written: {} targets trained, {} failed",
        entries.len(),
        failed.len()
    );

    Ok(TrainReport {
        entries,
        failed,
        rows_total,
        rows_used,
    })
}

/// Train, evaluate, and persist one target. Runs on a blocking thread.
fn train_one_target(
    key: TargetKey,
    features: &[[f64; N_FEATURES]],
    rows: &[FeatureLabelRow],
    config: &TrainingConfig,
    models_dir: &Path,
) -> Result<ManifestEntry, ModelError> {
    let labels: Vec<f64> = rows.iter().map(|r| r.label(key)).collect();
    let (train_idx, test_idx) = split_indices(rows.len(), config.test_fraction, config.seed);

    let x_train: Vec<[f64; N_FEATURES]> = train_idx.iter().map(|&i| features[i]).collect();
    let y_train: Vec<f64> = train_idx.iter().map(|&i| labels[i]).collect();

    let model = GradientBoostedRegressor::fit(&x_train, &y_train, &GbmParams::from(config));

    let predictions: Vec<f64> = test_idx.iter().map(|&i| model.predict(&features[i])).collect();
    let held_out: Vec<f64> = test_idx.iter().map(|&i| labels[i]).collect();
    let mae = mean_absolute_error(&predictions, &held_out);
    info!(
        "trained {key}: {} train / {} test rows, MAE {mae:.3}",
        train_idx.len(),
        test_idx.len()
    );

    let file = format!("gbm_{key}.json");
    model.save(&models_dir.join(&file))?;

    Ok(ManifestEntry {
        stat: key.stat(),
        year: key.year(),
        file,
        mae,
    })
}

/// Seeded shuffled train/test split. The test partition gets
/// `round(n * test_fraction)` rows, capped so at least one row trains.
fn split_indices(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64 * test_fraction).round() as usize).min(n.saturating_sub(1));
    let test = indices.split_off(n - n_test);
    (indices, test)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
