// Regressor and target-key types.
//
// Every regressor in the bank shares the same input contract: the 4 ordered
// features [height_in, rookie_ppg, rookie_apg, rookie_rpg]. Targets are
// identified by a (statistic, year) key with the canonical string form
// "ppg_y4".

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod gbm;
pub mod tree;

pub use gbm::{GbmParams, GradientBoostedRegressor, ModelError};

/// Number of input features shared by every regressor.
pub const N_FEATURES: usize = 4;

/// The three projected per-game statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stat {
    Ppg,
    Apg,
    Rpg,
}

impl Stat {
    pub const ALL: [Stat; 3] = [Stat::Ppg, Stat::Apg, Stat::Rpg];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stat::Ppg => "ppg",
            Stat::Apg => "apg",
            Stat::Rpg => "rpg",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one independently trained regressor: a statistic at a career
/// year in 2..=6. Construction is validated, so a `TargetKey` always names
/// a real label column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetKey {
    stat: Stat,
    year: u8,
}

impl TargetKey {
    pub const MIN_YEAR: u8 = 2;
    pub const MAX_YEAR: u8 = 6;

    pub fn new(stat: Stat, year: u8) -> Option<Self> {
        (Self::MIN_YEAR..=Self::MAX_YEAR)
            .contains(&year)
            .then_some(Self { stat, year })
    }

    pub fn stat(&self) -> Stat {
        self.stat
    }

    pub fn year(&self) -> u8 {
        self.year
    }

    /// All 15 targets, statistic-major then year-ascending.
    pub fn all() -> impl Iterator<Item = TargetKey> {
        Stat::ALL.into_iter().flat_map(|stat| {
            (Self::MIN_YEAR..=Self::MAX_YEAR).map(move |year| TargetKey { stat, year })
        })
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_y{}", self.stat, self.year)
    }
}

/// Mean absolute error over a held-out partition. Empty input yields 0.0.
pub fn mean_absolute_error(predictions: &[f64], labels: &[f64]) -> f64 {
    if predictions.is_empty() {
        return 0.0;
    }
    predictions
        .iter()
        .zip(labels.iter())
        .map(|(p, l)| (p - l).abs())
        .sum::<f64>()
        / predictions.len() as f64
}
