use std::path::PathBuf;

use crate::model::{EventId, MapId, MatchId, PlayerId, TeamId};

/// Failures talking to the stats source. Each query is independent, so callers decide
/// per stage whether one of these is fatal.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("element not found: {context}")]
    ElementNotFound { context: &'static str },

    #[error("could not parse {what} from '{value}'")]
    Parse { what: &'static str, value: String },

    #[error("invalid selector: {0}")]
    Selector(String),
}

/// Failures reading, writing or restructuring the persisted dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config error in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("match {match_id} is listed by event {first} and event {second}")]
    MatchOwnedTwice { match_id: MatchId, first: EventId, second: EventId },

    #[error("map {map_id} / player {player_id} appears more than once")]
    DuplicateMapPlayer { map_id: MapId, player_id: PlayerId },

    #[error("player {0} is referenced but missing from the player pool")]
    UnknownPlayer(PlayerId),

    #[error("team {0} is referenced but missing from the team collection")]
    UnknownTeam(TeamId),

    #[error(transparent)]
    Source(#[from] SourceError),
}
