use chrono::NaiveDate;

use crate::cli::{parse_chain, OutputFormat};
use crate::orchestrator::single_process;
use crate::state::App;

pub async fn run(
    chain: &str,
    date: Option<NaiveDate>,
    store: Option<&str>,
    dry_run: bool,
    output: OutputFormat,
) -> anyhow::Result<i32> {
    let chain_id = parse_chain(chain)?;
    let app = App::get();
    let adapter = app.adapters.get(chain_id);

    let summary = single_process::run(&app.db, app.blob_store.as_ref(), adapter, chain_id, date, store, dry_run).await;

    match output {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(std::io::stdout(), &summary)?;
            println!();
        }
        OutputFormat::Table => {
            println!("discovered:        {}", summary.discovered);
            println!("fetched:           {}", summary.fetched);
            println!("skipped duplicate: {}", summary.skipped_duplicate);
            println!("expanded:          {}", summary.expanded);
            println!("parsed:            {}", summary.parsed);
            println!("total rows:        {}", summary.total_rows);
            println!("valid rows:        {}", summary.valid_rows);
            println!("persisted:         {}", summary.persisted);
            println!("price changes:     {}", summary.price_changes);
            println!("unchanged:         {}", summary.unchanged);
            println!("failed:            {}", summary.failed);
            for error in &summary.errors {
                println!("  ! {error}");
            }
        }
    }

    Ok(summary.exit_code())
}
