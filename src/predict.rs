// Trajectory composition: one player's 4 features against the model bank.
//
// A target whose model is absent yields an explicit `None` cell (JSON
// `null`), never a fabricated 0.0; a numeric zero in the output is always a
// genuine prediction. The one mandatory short-circuit: an empty bank is an
// error, not an all-null projection.

use crate::bank::ModelBank;
use crate::model::{Stat, TargetKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single prediction request: the 4 shared regressor inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInput {
    pub height_in: f64,
    pub rookie_ppg: f64,
    pub rookie_apg: f64,
    pub rookie_rpg: f64,
}

impl PlayerInput {
    pub fn features(&self) -> [f64; 4] {
        [
            self.height_in,
            self.rookie_ppg,
            self.rookie_apg,
            self.rookie_rpg,
        ]
    }
}

/// One projected season. `None` means no model is available for that cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearProjection {
    pub year: u8,
    #[serde(rename = "PPG")]
    pub ppg: Option<f64>,
    #[serde(rename = "APG")]
    pub apg: Option<f64>,
    #[serde(rename = "RPG")]
    pub rpg: Option<f64>,
}

/// The assembled multi-year projection, years ascending 2..=6.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub yearly: Vec<YearProjection>,
    pub summary: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PredictError {
    #[error("no models loaded")]
    NoModels,
}

/// Compose the full projection for one player.
pub fn project(bank: &ModelBank, input: &PlayerInput) -> Result<Projection, PredictError> {
    if bank.is_empty() {
        return Err(PredictError::NoModels);
    }

    let features = input.features();
    let cell = |stat: Stat, year: u8| {
        TargetKey::new(stat, year)
            .and_then(|key| bank.get(key))
            .map(|model| round1(model.predict(&features)))
    };

    let yearly: Vec<YearProjection> = (TargetKey::MIN_YEAR..=TargetKey::MAX_YEAR)
        .map(|year| YearProjection {
            year,
            ppg: cell(Stat::Ppg, year),
            apg: cell(Stat::Apg, year),
            rpg: cell(Stat::Rpg, year),
        })
        .collect();

    let summary = summarize(input, &yearly);
    Ok(Projection { yearly, summary })
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn summarize(input: &PlayerInput, yearly: &[YearProjection]) -> String {
    let year6_ppg = yearly.last().and_then(|y| y.ppg);
    match year6_ppg {
        Some(ppg) => format!(
            "Starting from {:.1} PPG, projected PPG trends to ~{:.1} by Year 6. \
             APG and RPG follow similar patterns given rookie profile and height.",
            input.rookie_ppg, ppg
        ),
        None => format!(
            "Starting from {:.1} PPG; the Year 6 PPG model is unavailable, \
             so no trend estimate is given.",
            input.rookie_ppg
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
