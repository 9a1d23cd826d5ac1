use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::error::DatasetError;
use crate::model::{MapPlayers, Players};

const FIXED_COLUMNS: [&str; 4] = ["map_id", "player_id", "player_name", "team_id"];

// Flattens the map-player collection into one row per (map, player). Stat columns are the
// union of every row's stat names, sorted, and left blank where a row doesn't have one.
pub fn write_map_player_csv<W: Write>(writer: W, map_players: &MapPlayers, players: &Players) -> Result<usize, DatasetError> {
    let stat_columns: BTreeSet<&str> = map_players
        .values()
        .flat_map(|entry| entry.stats.keys().map(String::as_str))
        .collect();

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(FIXED_COLUMNS.iter().copied().chain(stat_columns.iter().copied()))?;

    for (key, entry) in map_players {
        let player = players.get(&key.player_id).ok_or(DatasetError::UnknownPlayer(key.player_id))?;

        let mut record = vec![
            key.map_id.to_string(),
            key.player_id.to_string(),
            player.name.clone(),
            entry.team_id.to_string(),
        ];
        record.extend(stat_columns.iter().map(|col| entry.stats.get(*col).map(cell).unwrap_or_default()));
        wtr.write_record(&record)?;
    }

    wtr.flush().map_err(csv::Error::from)?;
    Ok(map_players.len())
}

pub fn export_map_player_csv(path: &Path, map_players: &MapPlayers, players: &Players) -> Result<(), DatasetError> {
    let file = std::fs::File::create(path).map_err(|source| DatasetError::Io { path: path.to_path_buf(), source })?;
    let rows = write_map_player_csv(file, map_players, players)?;
    info!(rows, path = %path.display(), "map-player csv written");
    Ok(())
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
