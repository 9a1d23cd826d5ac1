// Turns one team's raw map history into candidate map ids. Nothing here is trusted yet;
// the aggregator decides what survives.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::model::{CandidateMap, MapId, PlayerId, TeamId, TeamPair};
use crate::util::roster_overlap;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    // Opponents outside this set don't produce candidates
    pub universe: BTreeSet<TeamId>,
    pub cutoff: Option<NaiveDate>,
    pub min_players: usize,
}

/// One map as it appears in a team's history, seen from that team's side.
#[derive(Debug, Clone, PartialEq)]
pub struct MapAppearance {
    pub map_id: MapId,
    pub date: NaiveDate,
    pub team_id: TeamId,
    pub opponent_id: TeamId,
    // The five players `team_id` fielded on the map
    pub lineup: Vec<PlayerId>,
}

impl HistoryQuery {
    pub fn admits(&self, team_id: TeamId, roster: &[PlayerId], appearance: &MapAppearance) -> bool {
        if appearance.team_id != team_id || appearance.opponent_id == team_id {
            return false;
        }
        if !self.universe.contains(&appearance.opponent_id) {
            return false;
        }
        if self.cutoff.is_some_and(|cutoff| appearance.date > cutoff) {
            return false;
        }

        roster_overlap(roster, &appearance.lineup) >= self.min_players
    }
}

/// Candidates from a single team's history: every admitted map keyed by id and paired with
/// the opponent.
pub fn select_candidates(
    team_id: TeamId,
    roster: &[PlayerId],
    appearances: &[MapAppearance],
    query: &HistoryQuery,
) -> CandidateMap {
    appearances
        .iter()
        .filter(|a| query.admits(team_id, roster, a))
        .map(|a| (a.map_id, TeamPair::new(team_id, a.opponent_id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAVI: TeamId = 4608;
    const G2: TeamId = 5995;
    const OUTSIDER: TeamId = 11111;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn appearance(map_id: MapId, opponent_id: TeamId, day: NaiveDate, lineup: &[PlayerId]) -> MapAppearance {
        MapAppearance { map_id, date: day, team_id: NAVI, opponent_id, lineup: lineup.to_vec() }
    }

    fn query(min_players: usize) -> HistoryQuery {
        HistoryQuery {
            universe: BTreeSet::from([NAVI, G2]),
            cutoff: Some(date(2021, 11, 7)),
            min_players,
        }
    }

    #[test]
    fn roster_threshold() {
        let roster = [1, 2, 3, 4, 5];
        let history = [appearance(100, G2, date(2021, 10, 1), &[1, 2, 3, 8, 9])];

        assert!(select_candidates(NAVI, &roster, &history, &query(4)).is_empty());

        let three = select_candidates(NAVI, &roster, &history, &query(3));
        assert_eq!(three.get(&100), Some(&TeamPair::new(NAVI, G2)));
    }

    #[test]
    fn opponents_outside_the_universe_are_skipped() {
        let roster = [1, 2, 3, 4, 5];
        let history = [
            appearance(100, OUTSIDER, date(2021, 10, 1), &roster),
            appearance(101, G2, date(2021, 10, 1), &roster),
        ];

        let candidates = select_candidates(NAVI, &roster, &history, &query(5));
        assert_eq!(candidates.keys().copied().collect::<Vec<_>>(), vec![101]);
    }

    #[test]
    fn cutoff_is_inclusive() {
        let roster = [1, 2, 3, 4, 5];
        let history = [
            appearance(100, G2, date(2021, 11, 7), &roster),
            appearance(101, G2, date(2021, 11, 8), &roster),
        ];

        let candidates = select_candidates(NAVI, &roster, &history, &query(5));
        assert!(candidates.contains_key(&100));
        assert!(!candidates.contains_key(&101));

        let mut open = query(5);
        open.cutoff = None;
        assert_eq!(select_candidates(NAVI, &roster, &history, &open).len(), 2);
    }

    #[test]
    fn rows_for_other_teams_are_ignored() {
        let roster = [1, 2, 3, 4, 5];
        let mut foreign = appearance(100, NAVI, date(2021, 10, 1), &roster);
        foreign.team_id = G2;

        assert!(select_candidates(NAVI, &roster, &[foreign], &query(1)).is_empty());
    }
}
