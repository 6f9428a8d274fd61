use chrono::NaiveDate;

use crate::cli::{parse_chain, OutputFormat};
use crate::state::App;

pub async fn run(chain: &str, date: Option<NaiveDate>, output: OutputFormat) -> anyhow::Result<i32> {
    let chain_id = parse_chain(chain)?;
    let app = App::get();
    let adapter = app.adapters.get(chain_id);

    adapter.set_discovery_date(date);
    let files = adapter.discover().await;

    match output {
        OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), &files)?,
        OutputFormat::Table => {
            println!("{:<40} {:<8} {:<12} URL", "FILENAME", "TYPE", "SIZE");
            for file in &files {
                let size = file.size.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
                println!("{:<40} {:<8} {:<12} {}", file.filename, file.file_type, size, file.url);
            }
            println!("{} file(s) discovered", files.len());
        }
    }

    Ok(0)
}
