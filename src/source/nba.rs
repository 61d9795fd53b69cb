// NBA stats API client.
//
// The API answers every endpoint with the same tabular envelope: a list of
// result sets, each with a `headers` array and a `rowSet` of rows. Columns
// are resolved by header name rather than position so upstream reordering
// does not silently corrupt the dataset.

use super::{CareerRecord, PlayerListing, SeasonLine, SourceError, StatsSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::info;

const BASE_URL: &str = "https://stats.nba.com/stats";

// The stats API rejects requests without browser-looking headers.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
const REFERER: &str = "https://www.nba.com/";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "resultSets")]
    result_sets: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(default)]
    name: String,
    headers: Vec<String>,
    #[serde(rename = "rowSet")]
    row_set: Vec<Vec<Value>>,
}

impl ResultSet {
    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Numeric cell lookup. The API mixes JSON numbers and numeric strings;
/// anything else becomes `None` and is handled by exclusion downstream.
fn cell_f64(row: &[Value], idx: usize) -> Option<f64> {
    match row.get(idx)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn cell_str(row: &[Value], idx: usize) -> Option<&str> {
    row.get(idx)?.as_str()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Production `StatsSource` backed by the NBA stats API.
pub struct NbaStatsClient {
    client: Client,
    base_url: String,
}

impl NbaStatsClient {
    pub fn new() -> Result<Self, SourceError> {
        Self::with_base_url(BASE_URL)
    }

    /// Build a client against a custom base URL. Exposed for tests.
    pub fn with_base_url(base_url: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(SourceError::Client)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Envelope, SourceError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::REFERER, REFERER)
            .query(query)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SourceError::Http {
                endpoint: endpoint.to_string(),
                source: e,
            })?;

        response.json().await.map_err(|e| SourceError::Http {
            endpoint: endpoint.to_string(),
            source: e,
        })
    }

    /// Fetch the height descriptor from `commonplayerinfo`. A missing or
    /// unexpected payload yields `None`; the player is then excluded by the
    /// extractor, not failed here.
    async fn fetch_height(&self, player_id: i64) -> Result<Option<String>, SourceError> {
        let envelope = self
            .fetch(
                "commonplayerinfo",
                &[("PlayerID", player_id.to_string())],
            )
            .await?;

        let Some(set) = envelope.result_sets.first() else {
            return Ok(None);
        };
        let Some(height_idx) = set.column("HEIGHT") else {
            return Ok(None);
        };
        let Some(row) = set.row_set.first() else {
            return Ok(None);
        };
        Ok(cell_str(row, height_idx).map(|s| s.to_string()))
    }

    /// Fetch per-game regular-season stat lines from `playercareerstats`.
    async fn fetch_seasons(&self, player_id: i64) -> Result<Vec<SeasonLine>, SourceError> {
        let envelope = self
            .fetch(
                "playercareerstats",
                &[
                    ("PlayerID", player_id.to_string()),
                    ("PerMode", "PerGame".to_string()),
                ],
            )
            .await?;

        let set = envelope
            .result_sets
            .iter()
            .find(|s| s.name == "SeasonTotalsRegularSeason")
            .or_else(|| envelope.result_sets.first())
            .ok_or_else(|| SourceError::Payload {
                endpoint: "playercareerstats".to_string(),
                message: "no result sets in response".to_string(),
            })?;

        let season_idx = set.column("SEASON_ID").ok_or_else(|| SourceError::Payload {
            endpoint: "playercareerstats".to_string(),
            message: "missing SEASON_ID column".to_string(),
        })?;
        let pts_idx = set.column("PTS");
        let ast_idx = set.column("AST");
        let reb_idx = set.column("REB");

        let mut seasons = Vec::with_capacity(set.row_set.len());
        for row in &set.row_set {
            // SEASON_ID looks like "1996-97"; the start year is the prefix.
            let Some(season_start) = cell_str(row, season_idx)
                .and_then(|s| s.get(..4))
                .and_then(|s| s.parse::<i32>().ok())
            else {
                continue;
            };
            seasons.push(SeasonLine {
                season_start,
                pts: pts_idx.and_then(|i| cell_f64(row, i)),
                ast: ast_idx.and_then(|i| cell_f64(row, i)),
                reb: reb_idx.and_then(|i| cell_f64(row, i)),
            });
        }

        Ok(seasons)
    }
}

#[async_trait]
impl StatsSource for NbaStatsClient {
    async fn list_players(&self) -> Result<Vec<PlayerListing>, SourceError> {
        let envelope = self
            .fetch(
                "commonallplayers",
                &[
                    ("IsOnlyCurrentSeason", "0".to_string()),
                    ("LeagueID", "00".to_string()),
                ],
            )
            .await?;

        let set = envelope
            .result_sets
            .first()
            .ok_or_else(|| SourceError::Payload {
                endpoint: "commonallplayers".to_string(),
                message: "no result sets in response".to_string(),
            })?;

        let id_idx = set.column("PERSON_ID").ok_or_else(|| SourceError::Payload {
            endpoint: "commonallplayers".to_string(),
            message: "missing PERSON_ID column".to_string(),
        })?;
        let name_idx = set.column("DISPLAY_FIRST_LAST");

        let mut players = Vec::with_capacity(set.row_set.len());
        for row in &set.row_set {
            let Some(id) = cell_f64(row, id_idx).map(|v| v as i64) else {
                continue;
            };
            let name = name_idx
                .and_then(|i| cell_str(row, i))
                .unwrap_or_default()
                .to_string();
            players.push(PlayerListing { id, name });
        }

        info!("player universe: {} players", players.len());
        Ok(players)
    }

    async fn career(&self, player_id: i64) -> Result<CareerRecord, SourceError> {
        let height = self.fetch_height(player_id).await?;
        let seasons = self.fetch_seasons(player_id).await?;
        Ok(CareerRecord {
            player_id,
            height,
            seasons,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
