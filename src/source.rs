// The boundary to wherever the statistics come from. Every query is a blocking call that
// may fail on its own; nothing here assumes the calls are made in any particular order.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::SourceError;
use crate::grouping;
use crate::history;
use crate::model::*;

pub use crate::history::{HistoryQuery, MapAppearance};

/// Everything the per-map stats page tells us.
#[derive(Debug, Clone, PartialEq)]
pub struct MapStats {
    pub map_id: MapId,
    pub match_id: MatchId,
    pub event_id: EventId,
    pub event_name: String,
    pub date: NaiveDate,
    pub map_name: String,
    pub team_1: TeamMapStats,
    pub team_2: TeamMapStats,
}

impl MapStats {
    pub fn teams(&self) -> TeamPair {
        TeamPair::new(self.team_1.team_id, self.team_2.team_id)
    }

    pub fn side(&self, team_id: TeamId) -> Option<&TeamMapStats> {
        [&self.team_1, &self.team_2].into_iter().find(|t| t.team_id == team_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamMapStats {
    pub team_id: TeamId,
    pub name: String,
    pub score: u16,
    pub players: Vec<PlayerMapStats>,
}

impl TeamMapStats {
    pub fn lineup(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.player_id).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerMapStats {
    pub player_id: PlayerId,
    pub name: String,
    pub stats: BTreeMap<String, Value>,
}

pub trait StatsSource {
    /// Teams that took part in an event, in the order the source lists them.
    fn get_event_teams(&self, event_id: EventId) -> Result<Vec<(TeamId, String)>, SourceError>;

    /// The players a team registered for an event.
    fn get_team_players(&self, team_id: TeamId, event_id: EventId) -> Result<Vec<(PlayerId, Player)>, SourceError>;

    /// Raw map history for a team. Implementations may use the query to avoid fetching
    /// rows that can't qualify, but callers filter again regardless.
    fn team_map_history(&self, team_id: TeamId, query: &HistoryQuery) -> Result<Vec<MapAppearance>, SourceError>;

    fn get_map_stats(&self, map_id: MapId) -> Result<MapStats, SourceError>;

    fn get_match_picks(&self, match_id: MatchId) -> Result<Vec<MapPick>, SourceError>;

    /// Candidate maps from one team's point of view.
    fn get_match_history(&self, team_id: TeamId, roster: &[PlayerId], query: &HistoryQuery) -> Result<CandidateMap, SourceError> {
        let appearances = self.team_map_history(team_id, query)?;
        Ok(history::select_candidates(team_id, roster, &appearances, query))
    }

    /// Map records for every map referenced by `matches`, plus the ids that turned out to be
    /// unusable and should be reconciled away.
    fn get_map_metadata(&self, teams: &Teams, matches: &Matches, picks: &MapPicks) -> (Maps, Vec<MapId>) {
        grouping::collect_map_metadata(self, teams, matches, picks)
    }
}
