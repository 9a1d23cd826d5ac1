use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use major_dataset::hltv::HltvClient;
use major_dataset::stages::{run_stages, Stage};
use major_dataset::{DataStore, DatasetContext};

/*
    Stages are meant to be run in order the first time (or all at once with no arguments),
    then individually when one of them needs redoing. Every stage reads its inputs from and
    writes its outputs to the data directory.
*/
#[derive(Debug, Parser)]
#[command(version, about = "Builds a cross-checked map dataset for one tournament")]
struct Args {
    /// Stages to run, in order. Defaults to every stage.
    #[arg(value_enum)]
    stages: Vec<Stage>,

    /// TOML file overriding the built-in run settings
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[arg(long)]
    event_id: Option<u32>,

    /// Ignore maps played after this date (YYYY-MM-DD)
    #[arg(long, conflicts_with = "no_cutoff")]
    cutoff: Option<NaiveDate>,

    #[arg(long)]
    no_cutoff: bool,

    /// Roster players that must be on the server for a map to count
    #[arg(long)]
    min_players: Option<usize>,

    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn context(&self) -> anyhow::Result<DatasetContext> {
        let mut ctx = match &self.config {
            Some(path) => DatasetContext::load(path)?,
            None => DatasetContext::default(),
        };

        if let Some(dir) = &self.data_dir { ctx.data_dir = dir.clone(); }
        if let Some(id) = self.event_id { ctx.event_id = id; }
        if let Some(cutoff) = self.cutoff { ctx.cutoff = Some(cutoff); }
        if self.no_cutoff { ctx.cutoff = None; }
        if let Some(n) = self.min_players { ctx.min_players = n; }

        Ok(ctx)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .init();

    let ctx = args.context()?;
    info!(
        event_id = ctx.event_id,
        cutoff = ?ctx.cutoff,
        min_players = ctx.min_players,
        data_dir = %ctx.data_dir.display(),
        "configuration loaded"
    );

    let stages = if args.stages.is_empty() { Stage::ALL.to_vec() } else { args.stages.clone() };
    let source = HltvClient::new(&ctx).context("building HTTP client")?;
    let store = DataStore::new(ctx.data_dir.clone());

    run_stages(&stages, &source, &store, &ctx).context("stage failed")?;
    info!("done");
    Ok(())
}
