//! Builds a dataset of the teams, players, matches and maps of one tournament from per-team
//! match histories, keeping only the maps both teams' histories agree on, and keeps the
//! event -> match -> map tree consistent as maps are found to be invalid.

pub mod aggregator;
pub mod context;
pub mod data_loader;
pub mod error;
pub mod export;
pub mod grouping;
pub mod history;
pub mod hltv;
pub mod model;
pub mod reconcile;
pub mod report;
pub mod roster;
pub mod source;
pub mod stages;
pub mod util;

pub use context::DatasetContext;
pub use data_loader::DataStore;
pub use error::{DatasetError, SourceError};
pub use reconcile::{remove_invalid_maps, EventTree};
pub use source::StatsSource;
pub use stages::Stage;
