// Two-sided confirmation. A map only counts once both teams' histories, queried
// independently, report it against each other.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::model::{CandidateMap, MapId, PlayerId, TeamId, TeamPair, Teams};
use crate::source::{HistoryQuery, StatsSource};

/// Folds per-team candidate sets into the confirmed set.
///
/// A map is confirmed when one team of its pair reports it and the other team reports it
/// with the same pair. Anything reported by one side only is dropped, as is a report that
/// names a pair the reporter isn't part of. The result does not depend on the order of
/// `histories`.
pub fn confirm_maps<I>(histories: I) -> CandidateMap
where
    I: IntoIterator<Item = (TeamId, CandidateMap)>,
{
    // (map, pair) -> the team that first reported it
    let mut pending: BTreeMap<(MapId, TeamPair), TeamId> = BTreeMap::new();
    let mut confirmed = CandidateMap::new();

    for (team_id, candidates) in histories {
        for (map_id, pair) in candidates {
            if !pair.contains(team_id) {
                debug!(map_id, team_id, "report for a pair the team is not in ignored");
                continue;
            }

            match pending.get(&(map_id, pair)) {
                Some(&first) if first != team_id => {
                    pending.remove(&(map_id, pair));
                    confirmed.insert(map_id, pair);
                }
                Some(_) => {}
                None => {
                    pending.insert((map_id, pair), team_id);
                }
            }
        }
    }

    debug!(unconfirmed = pending.len(), confirmed = confirmed.len(), "confirmation finished");
    confirmed
}

/// Queries every team's history and returns the maps both sides agree on.
///
/// `rosters` maps each team to the players whose presence qualifies a map. Teams are
/// queried one at a time; a team whose query fails contributes nothing.
pub fn collect_confirmed_maps<S>(source: &S, rosters: &BTreeMap<TeamId, Vec<PlayerId>>, query: &HistoryQuery) -> CandidateMap
where
    S: StatsSource + ?Sized,
{
    let histories = rosters.iter().map(|(&team_id, roster)| {
        let candidates = match source.get_match_history(team_id, roster, query) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(team_id, error = %e, "history query failed, team contributes no candidates");
                CandidateMap::new()
            }
        };
        debug!(team_id, candidates = candidates.len(), "history scanned");
        (team_id, candidates)
    });

    let confirmed = confirm_maps(histories);
    info!(teams = rosters.len(), confirmed = confirmed.len(), "map ids confirmed");
    confirmed
}

/// Historical rosters for every team, as used for the qualifying threshold.
pub fn rosters_of(teams: &Teams) -> BTreeMap<TeamId, Vec<PlayerId>> {
    teams.iter().map(|(&id, team)| (id, team.players.clone())).collect()
}
