// Whole-file JSON persistence. Every collection lives in its own file under the data
// directory, keyed by the stringified source id. A file that is missing or malformed when a
// stage needs it stops the run.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use crate::error::DatasetError;
use crate::model::{MapPlayerRow, MapPlayers};

pub const TEAM_FILE: &str = "team.json";
pub const PLAYER_FILE: &str = "player.json";
pub const MAP_IDS_FILE: &str = "map_ids.json";
pub const MATCH_FILE: &str = "match.json";
pub const EVENT_FILE: &str = "event.json";
pub const MAP_PICKS_FILE: &str = "map_picks.json";
pub const MAP_FILE: &str = "map.json";
pub const MAP_PLAYER_FILE: &str = "map_player.json";
pub const MAP_PLAYER_CSV: &str = "map_player.csv";

#[derive(Debug, Clone)]
pub struct DataStore {
    dir: PathBuf,
}

impl DataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn read<T: DeserializeOwned>(&self, name: &str) -> Result<T, DatasetError> {
        let path = self.path(name);
        let file = File::open(&path).map_err(|source| DatasetError::Io { path: path.clone(), source })?;

        let value = serde_json::from_reader(BufReader::new(file)).map_err(|source| DatasetError::Json { path: path.clone(), source })?;
        debug!(path = %path.display(), "loaded");
        Ok(value)
    }

    /// Like `read`, but a file that doesn't exist yet reads as an empty collection.
    pub fn read_or_default<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T, DatasetError> {
        match self.read(name) {
            Err(DatasetError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => Ok(T::default()),
            other => other,
        }
    }

    pub fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), DatasetError> {
        fs::create_dir_all(&self.dir).map_err(|source| DatasetError::Io { path: self.dir.clone(), source })?;

        let path = self.path(name);
        let io_err = |source| DatasetError::Io { path: path.clone(), source };
        let mut writer = BufWriter::new(File::create(&path).map_err(io_err)?);

        let mut ser = serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
        value.serialize(&mut ser).map_err(|source| DatasetError::Json { path: path.clone(), source })?;
        writer.write_all(b"\n").map_err(io_err)?;
        writer.flush().map_err(io_err)?;

        debug!(path = %path.display(), "written");
        Ok(())
    }

    /// The map-player file is a list of rows, each spelling out its (map, player) key.
    /// The same key twice means the file was edited by hand or corrupted.
    pub fn read_map_players(&self) -> Result<MapPlayers, DatasetError> {
        let rows: Vec<MapPlayerRow> = self.read(MAP_PLAYER_FILE)?;

        let mut map_players = MapPlayers::new();
        for row in rows {
            if map_players.insert(row.key, row.entry).is_some() {
                return Err(DatasetError::DuplicateMapPlayer { map_id: row.key.map_id, player_id: row.key.player_id });
            }
        }
        Ok(map_players)
    }

    pub fn write_map_players(&self, map_players: &MapPlayers) -> Result<(), DatasetError> {
        let rows: Vec<MapPlayerRow> = map_players
            .iter()
            .map(|(key, entry)| MapPlayerRow { key: *key, entry: entry.clone() })
            .collect();
        self.write(MAP_PLAYER_FILE, &rows)
    }
}
