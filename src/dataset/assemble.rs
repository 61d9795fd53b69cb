// Dataset assembly: sequential fetch loop over the player universe, plus
// the CSV artifact read/write.
//
// The fetch loop is deliberately sequential with a fixed delay between
// upstream calls; the source rate-limits hard, so this must not be
// parallelized without re-deriving the budget.

use crate::config::DatasetConfig;
use crate::dataset::extract::{extract, FeatureLabelRow};
use crate::source::{SourceError, StatsSource};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to access dataset file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

/// Walk the player universe, fetch each career, and collect the rows that
/// qualify. Per-player fetch failures drop the player with a warning; only
/// a failure to enumerate the universe itself is an error.
pub async fn assemble<S>(
    source: &S,
    config: &DatasetConfig,
) -> Result<Vec<FeatureLabelRow>, SourceError>
where
    S: StatsSource + ?Sized,
{
    let players = source.list_players().await?;
    let cap = config.max_players.unwrap_or(players.len());
    let delay = Duration::from_millis(config.fetch_delay_ms);
    info!(
        "assembling dataset: {} players in universe, processing up to {cap}",
        players.len()
    );

    let mut rows = Vec::new();
    let mut checked = 0usize;
    let mut kept = 0usize;

    for player in players {
        if checked >= cap {
            break;
        }

        match source.career(player.id).await {
            Ok(record) => {
                if let Some(row) = extract(&record, config.start_season) {
                    rows.push(row);
                    kept += 1;
                }
            }
            Err(e) => {
                warn!("dropping player {} ({}): {e}", player.id, player.name);
            }
        }

        checked += 1;
        if checked % 25 == 0 {
            info!("checked {checked}, collected {kept}");
        }

        // Hard per-call throttle, applied after every fetch.
        tokio::time::sleep(delay).await;
    }

    let rows = dedup_last_wins(rows);
    if rows.is_empty() {
        warn!("collected 0 usable rows");
    } else {
        info!("collected {} usable rows from {checked} players", rows.len());
    }
    Ok(rows)
}

/// Deduplicate by player id, keeping the last occurrence at its last
/// position.
fn dedup_last_wins(rows: Vec<FeatureLabelRow>) -> Vec<FeatureLabelRow> {
    let mut out: Vec<FeatureLabelRow> = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(pos) = out.iter().position(|r| r.player_id == row.player_id) {
            out.remove(pos);
        }
        out.push(row);
    }
    out
}

/// Persist the dataset as a single CSV artifact, overwriting wholesale.
pub fn write_csv(path: &Path, rows: &[FeatureLabelRow]) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DatasetError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| DatasetError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    for row in rows {
        writer.serialize(row).map_err(|e| DatasetError::Csv {
            path: path.display().to_string(),
            source: e,
        })?;
    }
    writer.flush().map_err(|e| DatasetError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

/// Load a previously written dataset artifact.
pub fn read_csv(path: &Path) -> Result<Vec<FeatureLabelRow>, DatasetError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| DatasetError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut rows = Vec::new();
    for result in reader.deserialize::<FeatureLabelRow>() {
        let row = result.map_err(|e| DatasetError::Csv {
            path: path.display().to_string(),
            source: e,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
