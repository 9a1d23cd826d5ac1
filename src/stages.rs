// Stage sequencing. Each stage reads what it needs from the data directory, does one step of
// the build and writes its results back, so any stage can be re-run on its own.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::aggregator::{collect_confirmed_maps, rosters_of};
use crate::context::DatasetContext;
use crate::data_loader::*;
use crate::error::DatasetError;
use crate::export::export_map_player_csv;
use crate::grouping::{collect_picks, group_maps};
use crate::model::*;
use crate::reconcile::EventTree;
use crate::report::output_report;
use crate::roster::{collect_rosters, record_map_players};
use crate::source::StatsSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum Stage {
    Teams,
    Players,
    MapIds,
    Matches,
    MapInfo,
    MapPlayers,
    Csv,
    Report,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Teams,
        Stage::Players,
        Stage::MapIds,
        Stage::Matches,
        Stage::MapInfo,
        Stage::MapPlayers,
        Stage::Csv,
        Stage::Report,
    ];
}

pub fn run_stages<S>(stages: &[Stage], source: &S, store: &DataStore, ctx: &DatasetContext) -> Result<(), DatasetError>
where
    S: StatsSource + ?Sized,
{
    for &stage in stages {
        info!(?stage, dir = %store.dir().display(), "stage started");
        run_stage(stage, source, store, ctx)?;
    }
    Ok(())
}

pub fn run_stage<S>(stage: Stage, source: &S, store: &DataStore, ctx: &DatasetContext) -> Result<(), DatasetError>
where
    S: StatsSource + ?Sized,
{
    match stage {
        Stage::Teams => fetch_teams(source, store, ctx),
        Stage::Players => fetch_players(source, store, ctx),
        Stage::MapIds => confirm_map_ids(source, store, ctx),
        Stage::Matches => build_matches(source, store),
        Stage::MapInfo => resolve_maps(source, store),
        Stage::MapPlayers => fetch_map_players(source, store),
        Stage::Csv => export_csv(store),
        Stage::Report => report(store),
    }
}

// The event's team list replaces the file. Teams still attending keep their rosters.
fn fetch_teams<S: StatsSource + ?Sized>(source: &S, store: &DataStore, ctx: &DatasetContext) -> Result<(), DatasetError> {
    let mut previous: Teams = store.read_or_default(TEAM_FILE)?;

    let mut teams = Teams::new();
    for (team_id, name) in source.get_event_teams(ctx.event_id)? {
        let mut team = previous.remove(&team_id).unwrap_or_else(|| Team::new(name.clone()));
        team.name = name;
        teams.insert(team_id, team);
    }

    if !previous.is_empty() {
        let dropped: Vec<TeamId> = previous.keys().copied().collect();
        info!(?dropped, "teams no longer attending dropped");
    }
    info!(event_id = ctx.event_id, teams = teams.len(), "event teams fetched");
    store.write(TEAM_FILE, &teams)
}

fn fetch_players<S: StatsSource + ?Sized>(source: &S, store: &DataStore, ctx: &DatasetContext) -> Result<(), DatasetError> {
    let mut teams: Teams = store.read(TEAM_FILE)?;
    let mut players: Players = store.read_or_default(PLAYER_FILE)?;

    collect_rosters(source, ctx.event_id, &mut teams, &mut players)?;

    store.write(TEAM_FILE, &teams)?;
    store.write(PLAYER_FILE, &players)
}

fn confirm_map_ids<S: StatsSource + ?Sized>(source: &S, store: &DataStore, ctx: &DatasetContext) -> Result<(), DatasetError> {
    let teams: Teams = store.read(TEAM_FILE)?;
    let query = ctx.history_query(teams.keys().copied().collect());

    let confirmed = collect_confirmed_maps(source, &rosters_of(&teams), &query);
    store.write(MAP_IDS_FILE, &confirmed)
}

fn build_matches<S: StatsSource + ?Sized>(source: &S, store: &DataStore) -> Result<(), DatasetError> {
    let confirmed: CandidateMap = store.read(MAP_IDS_FILE)?;

    let (matches, events) = group_maps(source, &confirmed);
    // Refuse to persist a tree the reconciler couldn't work with later
    let tree = EventTree::new(events, matches)?;
    let picks = collect_picks(source, tree.matches());

    store.write(MATCH_FILE, tree.matches())?;
    store.write(EVENT_FILE, tree.events())?;
    store.write(MAP_PICKS_FILE, &picks)
}

fn resolve_maps<S: StatsSource + ?Sized>(source: &S, store: &DataStore) -> Result<(), DatasetError> {
    let teams: Teams = store.read(TEAM_FILE)?;
    let matches: Matches = store.read(MATCH_FILE)?;
    let events: Events = store.read(EVENT_FILE)?;
    let picks: MapPicks = store.read_or_default(MAP_PICKS_FILE)?;
    let mut confirmed: CandidateMap = store.read_or_default(MAP_IDS_FILE)?;

    let mut tree = EventTree::new(events, matches)?;
    let (maps, invalid) = source.get_map_metadata(&teams, tree.matches(), &picks);
    info!(invalid = invalid.len(), "invalid maps found");

    let invalid: BTreeSet<MapId> = invalid.into_iter().collect();
    tree.remove_invalid_maps(&invalid);
    confirmed.retain(|map_id, _| !invalid.contains(map_id));

    store.write(MAP_FILE, &maps)?;
    store.write(MATCH_FILE, tree.matches())?;
    store.write(EVENT_FILE, tree.events())?;
    store.write(MAP_IDS_FILE, &confirmed)
}

fn fetch_map_players<S: StatsSource + ?Sized>(source: &S, store: &DataStore) -> Result<(), DatasetError> {
    let maps: Maps = store.read(MAP_FILE)?;
    let mut teams: Teams = store.read(TEAM_FILE)?;
    let mut players: Players = store.read(PLAYER_FILE)?;

    let mut map_players = MapPlayers::new();
    for &map_id in maps.keys() {
        match source.get_map_stats(map_id) {
            Ok(stats) => record_map_players(map_id, &stats, &mut teams, &mut players, &mut map_players)?,
            Err(e) => warn!(map_id, error = %e, "player stats unavailable"),
        }
    }
    info!(maps = maps.len(), rows = map_players.len(), "map players collected");

    store.write_map_players(&map_players)?;
    store.write(TEAM_FILE, &teams)?;
    store.write(PLAYER_FILE, &players)
}

fn export_csv(store: &DataStore) -> Result<(), DatasetError> {
    let map_players = store.read_map_players()?;
    let players: Players = store.read(PLAYER_FILE)?;
    export_map_player_csv(&store.path(MAP_PLAYER_CSV), &map_players, &players)
}

fn report(store: &DataStore) -> Result<(), DatasetError> {
    let teams: Teams = store.read(TEAM_FILE)?;
    let maps: Maps = store.read_or_default(MAP_FILE)?;
    let matches: Matches = store.read_or_default(MATCH_FILE)?;
    let events: Events = store.read_or_default(EVENT_FILE)?;

    output_report(&teams, &maps, &matches, &events);
    Ok(())
}
