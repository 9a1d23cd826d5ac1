// Record types shared by every stage. All collections are keyed by the id the stats source
// assigned, and BTreeMaps keep the JSON files in a stable order between runs.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_number_from_string;
use serde_json::Value;

pub type TeamId = u32;
pub type PlayerId = u32;
pub type MatchId = u32;
pub type MapId = u32;
pub type EventId = u32;

pub type Teams = BTreeMap<TeamId, Team>;
pub type Players = BTreeMap<PlayerId, Player>;
pub type Matches = BTreeMap<MatchId, Match>;
pub type Events = BTreeMap<EventId, Event>;
pub type Maps = BTreeMap<MapId, MapRecord>;
pub type MapPicks = BTreeMap<MatchId, Vec<MapPick>>;
pub type MapPlayers = BTreeMap<MapPlayerKey, MapPlayerEntry>;

/// map id -> the two teams that played it
pub type CandidateMap = BTreeMap<MapId, TeamPair>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Team {
    pub name: String,
    // Players registered for the event under study
    #[serde(default)]
    pub major_roster: Vec<PlayerId>,
    // Everyone who may show up in the team's history, roster first
    #[serde(default)]
    pub players: Vec<PlayerId>,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            major_roster: Vec::new(),
            players: Vec::new(),
        }
    }
}

/// Anything beyond the name is whatever the source reported; we never look inside it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Player {
    pub name: String,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }
}

/// An unordered pair of teams. Always stored smallest id first so that both teams'
/// histories describe a map with the same value.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(from = "(TeamId, TeamId)", into = "(TeamId, TeamId)")]
pub struct TeamPair(TeamId, TeamId);

impl TeamPair {
    pub fn new(a: TeamId, b: TeamId) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    pub fn first(&self) -> TeamId { self.0 }
    pub fn second(&self) -> TeamId { self.1 }

    pub fn contains(&self, id: TeamId) -> bool {
        self.0 == id || self.1 == id
    }

    pub fn other(&self, id: TeamId) -> Option<TeamId> {
        if self.0 == id {
            Some(self.1)
        } else if self.1 == id {
            Some(self.0)
        } else {
            None
        }
    }
}

impl From<(TeamId, TeamId)> for TeamPair {
    fn from((a, b): (TeamId, TeamId)) -> Self {
        Self::new(a, b)
    }
}

impl From<TeamPair> for (TeamId, TeamId) {
    fn from(pair: TeamPair) -> Self {
        (pair.0, pair.1)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Match {
    pub teams: TeamPair,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub map_ids: Vec<MapId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub match_ids: Vec<MatchId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MapRecord {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub match_id: MatchId,
    pub map_name: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub team_1_id: TeamId,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub team_2_id: TeamId,
    pub team_1_score: u16,
    pub team_2_score: u16,
    #[serde(default)]
    pub picked_by: Option<TeamId>,
}

impl MapRecord {
    pub fn teams(&self) -> TeamPair {
        TeamPair::new(self.team_1_id, self.team_2_id)
    }

    pub fn winner(&self) -> Option<TeamId> {
        match self.team_1_score.cmp(&self.team_2_score) {
            std::cmp::Ordering::Greater => Some(self.team_1_id),
            std::cmp::Ordering::Less => Some(self.team_2_id),
            std::cmp::Ordering::Equal => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PickAction {
    Removed,
    Picked,
    LeftOver,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MapPick {
    pub order: u8,
    // None for the map left over at the end of the veto
    pub team_name: Option<String>,
    pub map_name: String,
    pub action: PickAction,
}

/// Composite key of the map-player collection.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapPlayerKey {
    pub map_id: MapId,
    pub player_id: PlayerId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct MapPlayerEntry {
    pub team_id: TeamId,
    pub stats: BTreeMap<String, Value>,
}

/// On-disk shape of one map-player association: the key spelled out as two fields.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MapPlayerRow {
    #[serde(flatten)]
    pub key: MapPlayerKey,
    #[serde(flatten)]
    pub entry: MapPlayerEntry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_pair_is_order_insensitive() {
        assert_eq!(TeamPair::new(9565, 4608), TeamPair::new(4608, 9565));
        assert_eq!(TeamPair::new(9565, 4608).first(), 4608);
        assert_eq!(TeamPair::new(9565, 4608).other(4608), Some(9565));
        assert_eq!(TeamPair::new(9565, 4608).other(1), None);
    }

    #[test]
    fn team_pair_normalizes_when_read_back() {
        let pair: TeamPair = serde_json::from_str("[6665, 5995]").unwrap();
        assert_eq!(pair, TeamPair::new(5995, 6665));
        assert_eq!(serde_json::to_string(&pair).unwrap(), "[5995,6665]");
    }

    #[test]
    fn map_record_accepts_stringified_ids() {
        let json = r#"{
            "match_id": "2352373", "map_name": "Inferno", "date": "2021-11-07",
            "team_1_id": "4608", "team_2_id": 5995, "team_1_score": 16, "team_2_score": 12
        }"#;
        let map: MapRecord = serde_json::from_str(json).unwrap();
        assert_eq!(map.match_id, 2352373);
        assert_eq!(map.team_1_id, 4608);
        assert_eq!(map.winner(), Some(4608));
        assert_eq!(map.picked_by, None);
    }

    #[test]
    fn map_player_row_flattens_key() {
        let row = MapPlayerRow {
            key: MapPlayerKey { map_id: 125000, player_id: 7998 },
            entry: MapPlayerEntry { team_id: 4608, stats: BTreeMap::from([("kills".to_string(), Value::from(24))]) },
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["map_id"], 125000);
        assert_eq!(value["player_id"], 7998);
        assert_eq!(value["stats"]["kills"], 24);

        let back: MapPlayerRow = serde_json::from_value(value).unwrap();
        assert_eq!(back, row);
    }
}
