// The model bank: every trained regressor keyed by (statistic, year).
//
// The bank is an immutable value object. It is built once (from the
// manifest on disk, or directly from models in tests), shared behind an
// `Arc`, and never mutated; reloading means constructing a new bank.

use crate::model::{GradientBoostedRegressor, Stat, TargetKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// File name of the manifest written next to the model artifacts.
pub const MANIFEST_FILE: &str = "manifest.json";

/// One trained target as recorded at training time. The artifact reference
/// is explicit; filenames are never parsed to recover keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub stat: Stat,
    pub year: u8,
    pub file: String,
    /// Held-out mean absolute error logged at training time.
    pub mae: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub built_at: DateTime<Utc>,
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn read(models_dir: &Path) -> Result<Self, BankError> {
        let path = models_dir.join(MANIFEST_FILE);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BankError::ManifestNotFound { path: path.clone() }
            } else {
                BankError::ManifestIo {
                    path: path.clone(),
                    source: e,
                }
            }
        })?;
        serde_json::from_str(&text).map_err(|e| BankError::ManifestParse { path, source: e })
    }

    pub fn write(&self, models_dir: &Path) -> Result<(), BankError> {
        let path = models_dir.join(MANIFEST_FILE);
        let text = serde_json::to_string_pretty(self).map_err(|e| BankError::ManifestParse {
            path: path.clone(),
            source: e,
        })?;
        std::fs::write(&path, text).map_err(|e| BankError::ManifestIo { path, source: e })
    }
}

#[derive(Debug, Error)]
pub enum BankError {
    #[error("model manifest not found at {path}")]
    ManifestNotFound { path: PathBuf },

    #[error("failed to read model manifest {path}: {source}")]
    ManifestIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse model manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Default)]
pub struct ModelBank {
    models: HashMap<TargetKey, GradientBoostedRegressor>,
}

impl ModelBank {
    /// Load every model the manifest lists. Entries whose artifact is
    /// missing or corrupt are skipped with a warning; the bank degrades to
    /// fewer available targets rather than refusing to load.
    pub fn load(models_dir: &Path) -> Result<Self, BankError> {
        let manifest = Manifest::read(models_dir)?;
        let mut models = HashMap::new();

        for entry in &manifest.entries {
            let Some(key) = TargetKey::new(entry.stat, entry.year) else {
                warn!(
                    "manifest entry {}_y{} has an out-of-range year, skipping",
                    entry.stat, entry.year
                );
                continue;
            };
            let path = models_dir.join(&entry.file);
            match GradientBoostedRegressor::load(&path) {
                Ok(model) => {
                    models.insert(key, model);
                }
                Err(e) => {
                    warn!("skipping model for {key}: {e}");
                }
            }
        }

        info!(
            "model bank loaded: {} of {} manifest entries usable",
            models.len(),
            manifest.entries.len()
        );
        Ok(Self { models })
    }

    /// Build a bank directly from models. Used by tests and callers that
    /// construct banks in memory.
    pub fn from_models<I>(models: I) -> Self
    where
        I: IntoIterator<Item = (TargetKey, GradientBoostedRegressor)>,
    {
        Self {
            models: models.into_iter().collect(),
        }
    }

    pub fn get(&self, key: TargetKey) -> Option<&GradientBoostedRegressor> {
        self.models.get(&key)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Sorted canonical key strings, for the health endpoint.
    pub fn target_keys(&self) -> Vec<String> {
        let mut keys: Vec<TargetKey> = self.models.keys().copied().collect();
        keys.sort();
        keys.into_iter().map(|k| k.to_string()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GbmParams;
    use std::path::PathBuf;

    fn tiny_model() -> GradientBoostedRegressor {
        let x = [[79.0, 10.0, 3.0, 4.0], [75.0, 20.0, 5.0, 6.0]];
        let y = [12.0, 22.0];
        let params = GbmParams {
            n_trees: 5,
            subsample: 1.0,
            colsample: 1.0,
            ..GbmParams::default()
        };
        GradientBoostedRegressor::fit(&x, &y, &params)
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_bank(dir: &Path, keys: &[(Stat, u8)]) {
        let model = tiny_model();
        let mut entries = Vec::new();
        for &(stat, year) in keys {
            let file = format!("gbm_{stat}_y{year}.json");
            model.save(&dir.join(&file)).unwrap();
            entries.push(ManifestEntry {
                stat,
                year,
                file,
                mae: 1.5,
            });
        }
        Manifest {
            built_at: Utc::now(),
            entries,
        }
        .write(dir)
        .unwrap();
    }

    #[test]
    fn loads_all_manifest_entries() {
        let dir = temp_dir("hooparc_bank_load");
        write_bank(&dir, &[(Stat::Ppg, 2), (Stat::Apg, 3), (Stat::Rpg, 6)]);

        let bank = ModelBank::load(&dir).unwrap();
        assert_eq!(bank.len(), 3);
        assert!(bank.get(TargetKey::new(Stat::Apg, 3).unwrap()).is_some());
        assert!(bank.get(TargetKey::new(Stat::Rpg, 5).unwrap()).is_none());
        assert_eq!(bank.target_keys(), vec!["ppg_y2", "apg_y3", "rpg_y6"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_artifact_is_skipped_not_fatal() {
        let dir = temp_dir("hooparc_bank_corrupt");
        write_bank(&dir, &[(Stat::Ppg, 2), (Stat::Ppg, 3)]);
        std::fs::write(dir.join("gbm_ppg_y3.json"), "{ not json").unwrap();

        let bank = ModelBank::load(&dir).unwrap();
        assert_eq!(bank.len(), 1);
        assert!(bank.get(TargetKey::new(Stat::Ppg, 2).unwrap()).is_some());
        assert!(bank.get(TargetKey::new(Stat::Ppg, 3).unwrap()).is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_artifact_is_skipped_not_fatal() {
        let dir = temp_dir("hooparc_bank_missing");
        write_bank(&dir, &[(Stat::Ppg, 2), (Stat::Rpg, 4)]);
        std::fs::remove_file(dir.join("gbm_rpg_y4.json")).unwrap();

        let bank = ModelBank::load(&dir).unwrap();
        assert_eq!(bank.len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let dir = temp_dir("hooparc_bank_no_manifest");
        match ModelBank::load(&dir) {
            Err(BankError::ManifestNotFound { .. }) => {}
            other => panic!("expected ManifestNotFound, got: {other:?}"),
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn out_of_range_manifest_year_is_skipped() {
        let dir = temp_dir("hooparc_bank_bad_year");
        let model = tiny_model();
        model.save(&dir.join("gbm_ppg_y9.json")).unwrap();
        Manifest {
            built_at: Utc::now(),
            entries: vec![ManifestEntry {
                stat: Stat::Ppg,
                year: 9,
                file: "gbm_ppg_y9.json".into(),
                mae: 0.0,
            }],
        }
        .write(&dir)
        .unwrap();

        let bank = ModelBank::load(&dir).unwrap();
        assert!(bank.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn manifest_roundtrip() {
        let dir = temp_dir("hooparc_manifest_roundtrip");
        let manifest = Manifest {
            built_at: Utc::now(),
            entries: vec![ManifestEntry {
                stat: Stat::Apg,
                year: 4,
                file: "gbm_apg_y4.json".into(),
                mae: 0.87,
            }],
        };
        manifest.write(&dir).unwrap();
        let back = Manifest::read(&dir).unwrap();
        assert_eq!(back.entries.len(), 1);
        assert_eq!(back.entries[0].stat, Stat::Apg);
        assert_eq!(back.entries[0].year, 4);
        assert_eq!(back.entries[0].file, "gbm_apg_y4.json");
        assert!((back.entries[0].mae - 0.87).abs() < f64::EPSILON);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
