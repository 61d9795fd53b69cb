// Upstream player-statistics source.
//
// The pipeline only ever talks to the `StatsSource` trait; the production
// implementation hits the NBA stats API, and tests inject fakes. The source
// is treated as unreliable: any field may come back missing, so the domain
// types carry `Option`s and eligibility is decided downstream.

use async_trait::async_trait;
use thiserror::Error;

pub mod nba;

pub use nba::NbaStatsClient;

/// One entry in the player universe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerListing {
    pub id: i64,
    pub name: String,
}

/// One per-season per-game stat line. A missing stat stays `None` rather
/// than turning into a default; the extractor decides what to do with it.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonLine {
    pub season_start: i32,
    pub pts: Option<f64>,
    pub ast: Option<f64>,
    pub reb: Option<f64>,
}

/// A player's full career as reported upstream. Season order is not
/// guaranteed chronological.
#[derive(Debug, Clone, PartialEq)]
pub struct CareerRecord {
    pub player_id: i64,
    /// Height descriptor as reported, e.g. "6-7". May be absent or garbage.
    pub height: Option<String>,
    pub seasons: Vec<SeasonLine>,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("unexpected payload from {endpoint}: {message}")]
    Payload { endpoint: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
}

/// The upstream collaborator seam. `list_players` enumerates the player
/// universe; `career` fetches one player's height and per-season stats.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn list_players(&self) -> Result<Vec<PlayerListing>, SourceError>;

    async fn career(&self, player_id: i64) -> Result<CareerRecord, SourceError>;
}
