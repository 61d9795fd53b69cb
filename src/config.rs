// Configuration loading and parsing (pipeline.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire pipeline.toml file.
#[derive(Debug, Clone, Deserialize)]
struct PipelineFile {
    dataset: DatasetConfig,
    training: TrainingConfig,
    server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub training: TrainingConfig,
    pub server: ServerConfig,
}

/// Dataset-build settings. `max_players` caps the number of players checked
/// against the upstream source; omit it for a full run.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub start_season: i32,
    #[serde(default)]
    pub max_players: Option<usize>,
    pub fetch_delay_ms: u64,
    pub path: String,
}

/// Training settings shared by all 15 (statistic, year) targets.
/// The seed fixes the train/test split and per-tree subsampling so that
/// evaluation numbers are reproducible across runs.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub subsample: f64,
    pub colsample: f64,
    pub lambda: f64,
    pub test_fraction: f64,
    pub seed: u64,
    pub models_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/pipeline.toml` relative to
/// the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy
/// defaults. Prefer `load_config()` which handles default initialization.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("pipeline.toml");
    let text = std::fs::read_to_string(&path).map_err(|_| ConfigError::FileNotFound {
        path: path.clone(),
    })?;
    let file: PipelineFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let config = Config {
        dataset: file.dataset,
        training: file.training,
        server: file.server,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure `config/pipeline.toml` exists by copying missing files from
/// `defaults/`. Returns the list of files that were copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // File already exists in config/, keep it.
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, copying default config files first if needed.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    // The BAA (predecessor of the NBA) started play in 1946; anything
    // earlier cannot be a valid season floor.
    if config.dataset.start_season < 1946 {
        return Err(ConfigError::ValidationError {
            field: "dataset.start_season".into(),
            message: format!("must be 1946 or later, got {}", config.dataset.start_season),
        });
    }

    if config.dataset.path.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "dataset.path".into(),
            message: "must not be empty".into(),
        });
    }

    let t = &config.training;
    if t.n_trees == 0 {
        return Err(ConfigError::ValidationError {
            field: "training.n_trees".into(),
            message: "must be > 0".into(),
        });
    }
    if t.max_depth == 0 {
        return Err(ConfigError::ValidationError {
            field: "training.max_depth".into(),
            message: "must be > 0".into(),
        });
    }
    if t.learning_rate <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "training.learning_rate".into(),
            message: format!("must be > 0, got {}", t.learning_rate),
        });
    }
    for (name, val) in [
        ("training.subsample", t.subsample),
        ("training.colsample", t.colsample),
    ] {
        if !(val > 0.0 && val <= 1.0) {
            return Err(ConfigError::ValidationError {
                field: name.into(),
                message: format!("must be in (0.0, 1.0], got {val}"),
            });
        }
    }
    if t.lambda < 0.0 {
        return Err(ConfigError::ValidationError {
            field: "training.lambda".into(),
            message: format!("must be >= 0, got {}", t.lambda),
        });
    }
    if !(t.test_fraction > 0.0 && t.test_fraction < 1.0) {
        return Err(ConfigError::ValidationError {
            field: "training.test_fraction".into(),
            message: format!("must be in (0.0, 1.0), got {}", t.test_fraction),
        });
    }
    if t.models_dir.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "training.models_dir".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
