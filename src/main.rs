use std::sync::Arc;

use clap::Parser;
use log::{error, LevelFilter};

mod adapters;
mod blob_store;
mod cli;
mod config;
mod database;
mod error;
mod expand;
mod http_client;
mod model;
mod orchestrator;
mod parsers;
mod persistence;
mod queue;
mod rate_limiter;
mod run_stats;
mod state;
mod utils;

use cli::{Cli, Command};
use config::{AppConfig, ChainRegistry};
use queue::MemoryQueue;
use state::App;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    utils::logging::setup(level);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err:?}");
            1
        }
    };
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = AppConfig::from_env()?;
    ChainRegistry::init();

    let db = database::init(&config.database_url).await;
    let blob_store: Arc<dyn blob_store::BlobStore> = Arc::new(blob_store::FsBlobStore::new("data/blobs"));
    let client = http_client::build();
    let adapters = adapters::AdapterRegistry::build(client);
    let queue: Arc<dyn queue::Queue> = Arc::new(MemoryQueue::new());

    App::init(config, db, blob_store, adapters, queue);

    let exit_code = match cli.command {
        Command::Discover { chain, date, output } => cli::discover::run(&chain, date, output).await?,
        Command::Fetch { chain, url, out_dir, json } => cli::fetch::run(&chain, &url, out_dir.as_deref(), json).await?,
        Command::Parse { chain, file, limit, json, skip_invalid } => {
            cli::parse::run(&chain, &file, limit, json, skip_invalid).await?
        }
        Command::Run { chain, date, store, dry_run, output } => {
            cli::run::run(&chain, date, store.as_deref(), dry_run, output).await?
        }
        Command::Stores(args) => cli::stores::run(&args).await?,
    };

    Ok(exit_code)
}
