use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::DatasetError;
use crate::model::{EventId, TeamId};
use crate::source::HistoryQuery;

/*
    Everything a run needs to know about the event under study and how politely to ask the
    source for it. Defaults describe the PGL Major Stockholm 2021 playoffs; a TOML file can
    override any subset of fields and command line flags override the file.
*/
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatasetContext {
    pub event_id: EventId,

    // Maps played after this date are ignored when building team histories
    pub cutoff: Option<NaiveDate>,
    // How many of a team's players must be on the server for a map to count
    pub min_players: usize,

    pub data_dir: PathBuf,

    pub base_url: String,
    pub request_delay_ms: u64,
    pub request_jitter_ms: u64,
    pub timeout_secs: u64,
}

impl Default for DatasetContext {
    fn default() -> Self {
        Self {
            event_id: 4866,

            cutoff: NaiveDate::from_ymd_opt(2021, 11, 7),
            min_players: 4,

            data_dir: PathBuf::from("data"),

            base_url: "https://www.hltv.org".to_string(),
            request_delay_ms: 1500,
            request_jitter_ms: 1000,
            timeout_secs: 30,
        }
    }
}

impl DatasetContext {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let text = fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&text).map_err(|source| DatasetError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn history_query(&self, universe: BTreeSet<TeamId>) -> HistoryQuery {
        HistoryQuery {
            universe,
            cutoff: self.cutoff,
            min_players: self.min_players,
        }
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
