pub mod discover;
pub mod fetch;
pub mod parse;
pub mod run;
pub mod stores;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use crate::model::chain::ChainId;

/// `-o json|table` (§6.4, §E of SPEC_FULL.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

#[derive(Debug, Parser)]
#[command(name = "cijene-ingest", version, about = "Croatian retail price disclosure ingestion")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Repeat for more verbosity: `-v` = debug, `-vv` = trace.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lists the files a chain's adapter currently discovers.
    Discover {
        #[arg(short = 'c', long = "chain")]
        chain: String,
        #[arg(short = 'd', long = "date")]
        date: Option<NaiveDate>,
        #[arg(short = 'o', long = "output", default_value = "table")]
        output: OutputFormat,
    },
    /// Fetches one URL or local file and stores it under the blob root.
    Fetch {
        #[arg(short = 'c', long = "chain")]
        chain: String,
        #[arg(short = 'u', long = "url")]
        url: String,
        #[arg(short = 'o', long = "out-dir")]
        out_dir: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Parses a single file and prints the normalized rows / issues.
    Parse {
        #[arg(short = 'c', long = "chain")]
        chain: String,
        #[arg(short = 'f', long = "file")]
        file: String,
        #[arg(short = 'l', long = "limit")]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
        #[arg(long = "skip-invalid")]
        skip_invalid: bool,
    },
    /// Runs the full discover-fetch-expand-parse-persist pipeline.
    Run {
        #[arg(short = 'c', long = "chain")]
        chain: String,
        #[arg(short = 'd', long = "date")]
        date: Option<NaiveDate>,
        #[arg(short = 's', long = "store")]
        store: Option<String>,
        #[arg(long = "dry-run")]
        dry_run: bool,
        #[arg(short = 'o', long = "output", default_value = "table")]
        output: OutputFormat,
    },
    /// Store administration: exactly one sub-action per invocation.
    Stores(stores::StoresArgs),
}

/// Maps a `--chain` flag to a `ChainId`, the CLI's own validation point
/// for the closed chain set (§6.4: "exit 0 on success, 1 on invalid
/// argument").
pub fn parse_chain(raw: &str) -> anyhow::Result<ChainId> {
    raw.parse::<ChainId>().map_err(|_| anyhow::anyhow!("unknown chain id: {raw}"))
}
