// Gradient-boosted regression trees with squared loss.
//
// Deliberately small: 4 input features, a few hundred depth-limited trees,
// deterministic given the seed. Trained artifacts serialize to JSON and
// must predict identically after a save/load round trip.

use crate::model::tree::{RegressionTree, TreeParams};
use crate::model::N_FEATURES;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to access model file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to (de)serialize model {path}: {source}")]
    Serde {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Hyperparameters, shared across all targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbmParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Fraction of rows offered to each tree.
    pub subsample: f64,
    /// Fraction of features offered to each tree.
    pub colsample: f64,
    /// L2 regularization on leaf values.
    pub lambda: f64,
    pub seed: u64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            n_trees: 400,
            max_depth: 4,
            learning_rate: 0.05,
            subsample: 0.9,
            colsample: 0.9,
            lambda: 2.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedRegressor {
    base: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedRegressor {
    /// Fit the ensemble. `x` and `y` must have equal, non-zero length.
    pub fn fit(x: &[[f64; N_FEATURES]], y: &[f64], params: &GbmParams) -> Self {
        debug_assert_eq!(x.len(), y.len());
        let n = y.len();
        let base = if n == 0 {
            0.0
        } else {
            y.iter().sum::<f64>() / n as f64
        };

        let tree_params = TreeParams {
            max_depth: params.max_depth,
            lambda: params.lambda,
            min_samples_leaf: 1,
        };

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(params.seed);
        let mut predictions = vec![base; n];
        let mut trees = Vec::with_capacity(params.n_trees);

        for _ in 0..params.n_trees {
            if n == 0 {
                break;
            }
            let residuals: Vec<f64> = y
                .iter()
                .zip(predictions.iter())
                .map(|(yi, pi)| yi - pi)
                .collect();

            let rows = sample_fraction(n, params.subsample, &mut rng);
            let features = sample_fraction(N_FEATURES, params.colsample, &mut rng);

            let tree = RegressionTree::fit(x, &residuals, &rows, &features, &tree_params);
            for (pred, xi) in predictions.iter_mut().zip(x.iter()) {
                *pred += params.learning_rate * tree.predict(xi);
            }
            trees.push(tree);
        }

        Self {
            base,
            learning_rate: params.learning_rate,
            trees,
        }
    }

    pub fn predict(&self, features: &[f64; N_FEATURES]) -> f64 {
        self.base
            + self.learning_rate
                * self
                    .trees
                    .iter()
                    .map(|t| t.predict(features))
                    .sum::<f64>()
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let file = std::fs::File::create(path).map_err(|e| ModelError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::to_writer(BufWriter::new(file), self).map_err(|e| ModelError::Serde {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let file = std::fs::File::open(path).map_err(|e| ModelError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| ModelError::Serde {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Shuffled fraction of `0..n` without replacement, at least one element,
/// returned in ascending order.
fn sample_fraction(n: usize, rate: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    if rate < 1.0 {
        indices.shuffle(rng);
        let keep = ((n as f64 * rate).round() as usize).clamp(1, n);
        indices.truncate(keep);
        indices.sort_unstable();
    }
    indices
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
