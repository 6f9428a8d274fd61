use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::adapters::ChainAdapter;
use crate::blob_store::BlobStore;
use crate::database::entity::run_files;
use crate::expand;
use crate::model::{ChainId, DiscoveredFile, IdentifierType};
use crate::persistence;
use crate::run_stats;

use super::RunSummary;

/// Sequential five-phase runner (§4.3 "Single-process mode"): discover,
/// then per-file fetch/expand/parse/persist. Each file's own failure is
/// non-fatal to the run; it only marks that file failed (§7 "Fetch").
pub async fn run(
    db: &DatabaseConnection,
    blob_store: &dyn BlobStore,
    adapter: Arc<dyn ChainAdapter>,
    chain_id: ChainId,
    business_date: Option<NaiveDate>,
    store_filter: Option<&str>,
    dry_run: bool,
) -> RunSummary {
    let chain_slug = chain_id.slug();
    let mut summary = RunSummary::default();

    let run = match run_stats::start_run(db, chain_slug).await {
        Ok(run) => run,
        Err(err) => {
            summary.push_error(format!("failed to start run: {err}"));
            return summary;
        }
    };
    summary.run_id = Some(run.id);

    adapter.set_discovery_date(business_date);
    let mut files = adapter.discover().await;
    files = filter_by_date(files, business_date);
    if let Some(filter) = store_filter {
        files.retain(|file| matches_store_filter(adapter.as_ref(), file, filter));
    }
    summary.discovered = files.len();

    if files.is_empty() {
        if let Err(err) = run_stats::complete_empty_run(db, run.id).await {
            summary.push_error(format!("failed to mark empty run complete: {err}"));
        }
        return summary;
    }

    if let Err(err) = run_stats::record_total_files(db, run.id, files.len()).await {
        summary.push_error(format!("failed to record total files: {err}"));
    }

    for file in files {
        run_one_file(db, blob_store, adapter.as_ref(), chain_slug, run.id, &file, dry_run, &mut summary).await;
    }

    summary
}

fn filter_by_date(files: Vec<DiscoveredFile>, business_date: Option<NaiveDate>) -> Vec<DiscoveredFile> {
    let Some(requested) = business_date else {
        return files;
    };
    let any_dated = files.iter().any(|f| f.last_modified.is_some());
    if !any_dated {
        return files;
    }
    files.into_iter().filter(|f| f.last_modified.map(|ts| ts.date_naive() == requested).unwrap_or(true)).collect()
}

fn matches_store_filter(adapter: &dyn ChainAdapter, file: &DiscoveredFile, filter: &str) -> bool {
    adapter.extract_store_identifier(file).map(|id| id.value == filter).unwrap_or(false)
}

async fn run_one_file(
    db: &DatabaseConnection,
    blob_store: &dyn BlobStore,
    adapter: &dyn ChainAdapter,
    chain_slug: &str,
    run_id: Uuid,
    file: &DiscoveredFile,
    dry_run: bool,
    summary: &mut RunSummary,
) {
    let run_file = run_files::ActiveModel {
        id: Set(Uuid::new_v4()),
        run_id: Set(run_id),
        filename: Set(file.filename.clone()),
        url: Set(file.url.clone()),
        status: Set(run_stats::FILE_STATUS_PENDING.to_string()),
        hash: Set(None),
    };
    let run_file = match run_file.insert(db).await {
        Ok(model) => model,
        Err(err) => {
            summary.push_error(format!("{}: failed to record run file: {err}", file.filename));
            return;
        }
    };

    let fetched = match adapter.fetch(file).await {
        Ok(fetched) => fetched,
        Err(err) => {
            summary.push_error(format!("{}: fetch failed: {err}", file.filename));
            let _ = run_stats::complete_file(db, run_file.id, true).await;
            return;
        }
    };
    summary.fetched += 1;

    let blob_key = format!("{chain_slug}/{}", file.filename);
    let already_stored = blob_store.head(&blob_key).await.ok().flatten();
    if already_stored.as_deref() == Some(fetched.content_hash.as_str()) {
        summary.skipped_duplicate += 1;
    } else if !dry_run {
        let metadata = HashMap::from([
            ("filename".to_string(), file.filename.clone()),
            ("type".to_string(), file.file_type.to_string()),
            ("url".to_string(), file.url.clone()),
            ("sha256".to_string(), fetched.content_hash.clone()),
        ]);
        if let Err(err) = blob_store.put(&blob_key, &fetched.content, metadata).await {
            summary.push_error(format!("{}: blob store write failed: {err}", file.filename));
        }
    }

    let entries = match expand::expand(&fetched) {
        Ok(entries) => entries,
        Err(err) => {
            summary.push_error(format!("{}: expand failed: {err}", file.filename));
            let _ = run_stats::complete_file(db, run_file.id, true).await;
            return;
        }
    };
    summary.expanded += entries.len();

    let identifier = adapter.extract_store_identifier(file);
    let metadata = adapter.extract_store_metadata(file);
    let mut file_failed = false;

    for entry in &entries {
        let parsed = adapter.parse(&entry.content, &entry.filename);
        summary.parsed += 1;
        summary.total_rows += parsed.total_rows;
        summary.valid_rows += parsed.valid_rows;
        for issue in parsed.errors.iter().take(10) {
            summary.push_error(format!("{}: row {}: {}", entry.filename, issue.row_number, issue.message));
        }

        // Rows carry their own store identifier only on multi-store files
        // (e.g. eurospin's `poslovnica` column); on single-store files the
        // row has none and the group must resolve against the file-level
        // identifier extracted from the filename/URL, not a placeholder
        // (§4.2 "Filename -> store identifier strategies").
        let mut groups: HashMap<Option<String>, Vec<crate::model::NormalizedRow>> = HashMap::new();
        for row in parsed.rows {
            let key = if row.store_identifier.trim().is_empty() { None } else { Some(row.store_identifier.clone()) };
            groups.entry(key).or_default().push(row);
        }

        for (key, rows) in groups {
            let valid_rows: Vec<_> = rows.into_iter().filter(|row| adapter.validate_row(row).is_valid).collect();
            if valid_rows.is_empty() || dry_run {
                continue;
            }

            let resolution_value = key.unwrap_or_else(|| {
                identifier.as_ref().map(|id| id.value.clone()).unwrap_or_else(|| "unknown".to_string())
            });
            let identifier_type = identifier.as_ref().map(|id| id.identifier_type).unwrap_or(IdentifierType::Unresolved);
            let outcome =
                persistence::persist_rows(db, chain_slug, identifier_type, &resolution_value, &valid_rows, metadata.as_ref()).await;
            match outcome {
                Ok(outcome) => {
                    summary.persisted += outcome.persisted;
                    summary.price_changes += outcome.price_changes;
                    summary.unchanged += outcome.unchanged;
                    for error in outcome.errors.iter().take(10) {
                        summary.push_error(format!("{}: {error}", file.filename));
                    }
                    if outcome.failed > 0 {
                        file_failed = true;
                    }
                }
                Err(err) => {
                    summary.push_error(format!("{}: persist failed for store {resolution_value}: {err}", file.filename));
                    file_failed = true;
                }
            }
        }
    }

    if let Err(err) = run_stats::complete_file(db, run_file.id, file_failed).await {
        summary.push_error(format!("{}: failed to finalize run file: {err}", file.filename));
    }
}
