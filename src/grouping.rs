// Builds the match and event collections around the confirmed maps, and resolves per-map
// metadata for them.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::model::*;
use crate::source::{MapStats, StatsSource};

/// Groups confirmed maps into the matches and events they were played in. A map whose stats
/// can't be fetched is left out; it will simply not appear in any match.
pub fn group_maps<S>(source: &S, confirmed: &CandidateMap) -> (Matches, Events)
where
    S: StatsSource + ?Sized,
{
    let mut matches = Matches::new();
    let mut events = Events::new();
    let mut owners: BTreeMap<MatchId, EventId> = BTreeMap::new();

    for (&map_id, pair) in confirmed {
        let stats = match source.get_map_stats(map_id) {
            Ok(stats) => stats,
            Err(e) => {
                warn!(map_id, error = %e, "map context unavailable, map skipped");
                continue;
            }
        };

        if stats.teams() != *pair {
            warn!(map_id, match_id = stats.match_id, "map page names different teams than both histories, map skipped");
            continue;
        }

        let event_id = *owners.entry(stats.match_id).or_insert(stats.event_id);
        if event_id != stats.event_id {
            warn!(map_id, match_id = stats.match_id, event_id, other = stats.event_id, "match reported under two events, keeping the first");
        }

        let m = matches.entry(stats.match_id).or_insert_with(|| Match {
            teams: stats.teams(),
            date: Some(stats.date),
            map_ids: Vec::new(),
        });
        if !m.map_ids.contains(&map_id) {
            m.map_ids.push(map_id);
        }

        let event = events.entry(event_id).or_insert_with(|| Event {
            name: stats.event_name.clone(),
            match_ids: Vec::new(),
        });
        if !event.match_ids.contains(&stats.match_id) {
            event.match_ids.push(stats.match_id);
        }
    }

    info!(maps = confirmed.len(), matches = matches.len(), events = events.len(), "maps grouped");
    (matches, events)
}

/// Veto for every match. Matches whose veto can't be fetched get no entry.
pub fn collect_picks<S>(source: &S, matches: &Matches) -> MapPicks
where
    S: StatsSource + ?Sized,
{
    let mut picks = MapPicks::new();
    for &match_id in matches.keys() {
        match source.get_match_picks(match_id) {
            Ok(veto) => {
                picks.insert(match_id, veto);
            }
            Err(e) => warn!(match_id, error = %e, "veto unavailable"),
        }
    }
    picks
}

/// Why a map was rejected while resolving its metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    Unavailable(String),
    ForeignTeam(TeamId),
    WrongMatch { reported: MatchId },
    WrongTeams,
}

/// Turns a fetched stats page into the stored record, or says why the map can't be used.
pub fn map_record(stats: &MapStats, match_id: MatchId, m: &Match, teams: &Teams, veto: Option<&[MapPick]>) -> Result<MapRecord, Rejection> {
    for side in [&stats.team_1, &stats.team_2] {
        if !teams.contains_key(&side.team_id) {
            return Err(Rejection::ForeignTeam(side.team_id));
        }
    }
    if stats.match_id != match_id {
        return Err(Rejection::WrongMatch { reported: stats.match_id });
    }
    if stats.teams() != m.teams {
        return Err(Rejection::WrongTeams);
    }

    Ok(MapRecord {
        match_id,
        map_name: stats.map_name.clone(),
        date: Some(stats.date),
        team_1_id: stats.team_1.team_id,
        team_2_id: stats.team_2.team_id,
        team_1_score: stats.team_1.score,
        team_2_score: stats.team_2.score,
        picked_by: veto.and_then(|v| picked_by(v, &stats.map_name, m.teams, teams)),
    })
}

// Team in `pair` whose name picked `map_name` in the veto. Deciders have no picker.
pub fn picked_by(veto: &[MapPick], map_name: &str, pair: TeamPair, teams: &Teams) -> Option<TeamId> {
    let pick = veto
        .iter()
        .find(|p| p.action == PickAction::Picked && p.map_name.eq_ignore_ascii_case(map_name))?;
    let team_name = pick.team_name.as_deref()?;

    [pair.first(), pair.second()]
        .into_iter()
        .find(|id| teams.get(id).is_some_and(|t| t.name.eq_ignore_ascii_case(team_name)))
}

/// Resolves metadata for every map referenced by `matches`. Maps that fail to resolve are
/// returned as invalid instead of aborting the run.
pub fn collect_map_metadata<S>(source: &S, teams: &Teams, matches: &Matches, picks: &MapPicks) -> (Maps, Vec<MapId>)
where
    S: StatsSource + ?Sized,
{
    let mut maps = Maps::new();
    let mut invalid = Vec::new();

    for (&match_id, m) in matches {
        let veto = picks.get(&match_id).map(Vec::as_slice);

        for &map_id in &m.map_ids {
            let record = source
                .get_map_stats(map_id)
                .map_err(|e| Rejection::Unavailable(e.to_string()))
                .and_then(|stats| map_record(&stats, match_id, m, teams, veto));

            match record {
                Ok(record) => {
                    debug!(map_id, match_id, map = %record.map_name, "map resolved");
                    maps.insert(map_id, record);
                }
                Err(reason) => {
                    warn!(map_id, match_id, ?reason, "map rejected");
                    invalid.push(map_id);
                }
            }
        }
    }

    info!(resolved = maps.len(), invalid = invalid.len(), "map metadata collected");
    (maps, invalid)
}
