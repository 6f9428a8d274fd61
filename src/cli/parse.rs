use crate::cli::parse_chain;
use crate::state::App;

pub async fn run(chain: &str, file: &str, limit: Option<usize>, json: bool, skip_invalid: bool) -> anyhow::Result<i32> {
    let chain_id = parse_chain(chain)?;
    let app = App::get();
    let adapter = app.adapters.get(chain_id);

    let content = tokio::fs::read(file).await?;
    let filename = std::path::Path::new(file).file_name().and_then(|n| n.to_str()).unwrap_or(file);
    let mut result = adapter.parse(&content, filename);

    let validations: Vec<_> = result.rows.iter().map(|row| adapter.validate_row(row)).collect();
    let invalid_count = validations.iter().filter(|v| !v.is_valid).count();

    if let Some(limit) = limit {
        result.rows.truncate(limit);
    }

    if json {
        let summary = serde_json::json!({
            "totalRows": result.total_rows,
            "validRows": result.valid_rows,
            "invalidRows": invalid_count,
            "errors": result.errors.len(),
            "warnings": result.warnings.len(),
            "rows": result.rows,
        });
        serde_json::to_writer_pretty(std::io::stdout(), &summary)?;
        println!();
    } else {
        println!("total rows:   {}", result.total_rows);
        println!("valid rows:   {}", result.valid_rows);
        println!("invalid rows: {invalid_count}");
        println!("errors:       {}", result.errors.len());
        println!("warnings:     {}", result.warnings.len());
        for issue in result.errors.iter().take(10) {
            println!("  error row {}: {}", issue.row_number, issue.message);
        }
    }

    Ok(if invalid_count > 0 && !skip_invalid { 2 } else { 0 })
}
