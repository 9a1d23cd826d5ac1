// Folding per-team player queries into the shared player pool and the teams' rosters.

use tracing::{debug, info, warn};

use crate::error::{DatasetError, SourceError};
use crate::model::{EventId, MapId, MapPlayerEntry, MapPlayerKey, MapPlayers, Player, PlayerId, Players, Team, TeamId, Teams};
use crate::source::{MapStats, StatsSource};

/// Sets both roster lists of `team` to the queried players, in query order, and adds the
/// player records to the pool.
///
/// A player already in the pool with a different record is overwritten. Which record should
/// win when two teams report the same player differently is undecided; the conflict is
/// logged so it can at least be spotted.
pub fn merge_team_players(team_id: TeamId, team: &mut Team, pool: &mut Players, queried: Vec<(PlayerId, Player)>) {
    let mut ids: Vec<PlayerId> = Vec::with_capacity(queried.len());
    for (id, _) in &queried {
        if !ids.contains(id) {
            ids.push(*id);
        }
    }
    team.major_roster = ids.clone();
    team.players = ids;

    for (player_id, player) in queried {
        if let Some(existing) = pool.get(&player_id) {
            if *existing != player {
                warn!(player_id, team_id, old = %existing.name, new = %player.name, "conflicting player record, keeping the latest");
            }
        }
        pool.insert(player_id, player);
    }
}

/// Queries the event roster of every team, one team at a time. Rosters are required input
/// for everything after this, so the first failed query aborts.
pub fn collect_rosters<S>(source: &S, event_id: EventId, teams: &mut Teams, pool: &mut Players) -> Result<(), SourceError>
where
    S: StatsSource + ?Sized,
{
    for (&team_id, team) in teams.iter_mut() {
        let queried = source.get_team_players(team_id, event_id)?;
        debug!(team_id, team = %team.name, players = queried.len(), "roster fetched");
        merge_team_players(team_id, team, pool, queried);
    }

    info!(teams = teams.len(), players = pool.len(), "rosters merged");
    Ok(())
}

/// Records every player fielded on a map. New players join the pool (existing records are
/// kept as they are) and are appended to their team's historical player list. The current
/// roster is never changed here.
///
/// Both sides must be known teams; otherwise nothing is recorded and `UnknownTeam` is returned.
pub fn record_map_players(
    map_id: MapId,
    stats: &MapStats,
    teams: &mut Teams,
    pool: &mut Players,
    map_players: &mut MapPlayers,
) -> Result<(), DatasetError> {
    let sides = [&stats.team_1, &stats.team_2];
    if let Some(side) = sides.iter().find(|s| !teams.contains_key(&s.team_id)) {
        warn!(map_id, team_id = side.team_id, "map side is not a known team");
        return Err(DatasetError::UnknownTeam(side.team_id));
    }

    for side in sides {
        let team = teams.get_mut(&side.team_id).ok_or(DatasetError::UnknownTeam(side.team_id))?;

        for p in &side.players {
            pool.entry(p.player_id).or_insert_with(|| Player::new(p.name.clone()));
            if !team.players.contains(&p.player_id) {
                debug!(map_id, player_id = p.player_id, team_id = side.team_id, "historical player added");
                team.players.push(p.player_id);
            }

            map_players.insert(
                MapPlayerKey { map_id, player_id: p.player_id },
                MapPlayerEntry { team_id: side.team_id, stats: p.stats.clone() },
            );
        }
    }

    Ok(())
}
