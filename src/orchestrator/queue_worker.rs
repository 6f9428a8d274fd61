use std::collections::HashMap;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use log::{info, warn};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::adapters::AdapterRegistry;
use crate::blob_store::BlobStore;
use crate::database::entity::{run_chunks, run_files};
use crate::expand;
use crate::model::queue::{MessageBody, RerunTarget};
use crate::model::{DiscoveredFile, IdentifierType, NormalizedRow, QueueMessage, StoreMetadata};
use crate::persistence;
use crate::queue::Queue;
use crate::run_stats;

/// Default fan-out for one `receive` batch (§5 "Queue mode: a worker
/// processes message batches with bounded parallelism (default 5)").
pub const DEFAULT_CONCURRENCY: usize = 5;

const VISIBILITY_TIMEOUT: Duration = Duration::from_secs(300);

/// Message kinds whose exhaustion (max retries reached) additionally
/// fails the owning run, not just the message (§4.3 "Retries and DLQ").
fn is_run_fatal(body: &MessageBody) -> bool {
    matches!(body, MessageBody::Discover { .. } | MessageBody::Parse { .. } | MessageBody::ParseChunked { .. })
}

/// Drains one batch from the queue and processes its messages with
/// bounded concurrency, applying the retry/backoff/DLQ contract to
/// whatever the handler reports (§4.3).
pub async fn process_batch(
    db: &DatabaseConnection,
    blob_store: &dyn BlobStore,
    adapters: &AdapterRegistry,
    queue: &dyn Queue,
    max_retries: u32,
) {
    let batch = queue.receive(DEFAULT_CONCURRENCY, VISIBILITY_TIMEOUT).await;
    stream::iter(batch)
        .for_each_concurrent(DEFAULT_CONCURRENCY, |message| async move {
            handle_one(db, blob_store, adapters, queue, message, max_retries).await;
        })
        .await;
}

async fn handle_one(
    db: &DatabaseConnection,
    blob_store: &dyn BlobStore,
    adapters: &AdapterRegistry,
    queue: &dyn Queue,
    message: QueueMessage,
    max_retries: u32,
) {
    let result = handle_message(db, blob_store, adapters, queue, &message).await;
    match result {
        Ok(()) => queue.ack(message.id).await,
        Err(err) => {
            warn!("queue message {} ({:?}) failed: {err}", message.id, message.body);
            if message.delivery_attempt < max_retries {
                let delay = backoff_delay(message.delivery_attempt + 1);
                info!("retrying message {} in {delay:?}", message.id);
                queue.retry_after(message, delay).await;
            } else {
                warn!("message {} exhausted retries, moving to dead-letter queue", message.id);
                if is_run_fatal(&message.body) {
                    if let Err(fail_err) = run_stats::fail_run(db, message.run_id).await {
                        warn!("failed to mark run {} failed: {fail_err}", message.run_id);
                    }
                }
                queue.dead_letter(message).await;
            }
        }
    }
}

/// `min(60 * 2^(attempts-1), 3600)` seconds (§4.3 "Retries and DLQ").
fn backoff_delay(attempts: u32) -> Duration {
    let seconds = 60u64.saturating_mul(1u64 << attempts.saturating_sub(1).min(62));
    Duration::from_secs(seconds.min(3600))
}

/// Extracts the file-level store identifier/metadata from a bare
/// filename + URL, used both when a file is first expanded and when a
/// rerun message has to recompute it from `run_files`/`run_chunks`
/// bookkeeping alone (§4.2).
fn file_identifier(
    adapter: &dyn crate::adapters::ChainAdapter,
    filename: &str,
    url: &str,
) -> (IdentifierType, Option<String>, Option<StoreMetadata>) {
    let discovered = DiscoveredFile {
        url: url.to_string(),
        filename: filename.to_string(),
        file_type: crate::model::chain::FileType::from_filename(filename).unwrap_or(crate::model::chain::FileType::Csv),
        size: None,
        last_modified: None,
        metadata: HashMap::new(),
    };
    let identifier = adapter.extract_store_identifier(&discovered);
    let metadata = adapter.extract_store_metadata(&discovered);
    let identifier_type = identifier.as_ref().map(|id| id.identifier_type).unwrap_or(IdentifierType::Unresolved);
    let identifier_value = identifier.map(|id| id.value);
    (identifier_type, identifier_value, metadata)
}

/// Resolves the value a row group should persist against: the row's own
/// `storeIdentifier` when it carried one, else the file-level identifier,
/// else the `"unknown"` placeholder when neither is available (§4.2,
/// §4.5 "Resolution").
fn resolution_value(key: Option<String>, identifier_value: &Option<String>) -> String {
    key.or_else(|| identifier_value.clone()).unwrap_or_else(|| "unknown".to_string())
}

fn group_by_store_identifier(rows: Vec<NormalizedRow>) -> HashMap<Option<String>, Vec<NormalizedRow>> {
    let mut groups: HashMap<Option<String>, Vec<NormalizedRow>> = HashMap::new();
    for row in rows {
        let key = if row.store_identifier.trim().is_empty() { None } else { Some(row.store_identifier.clone()) };
        groups.entry(key).or_default().push(row);
    }
    groups
}

async fn handle_message(
    db: &DatabaseConnection,
    blob_store: &dyn BlobStore,
    adapters: &AdapterRegistry,
    queue: &dyn Queue,
    message: &QueueMessage,
) -> anyhow::Result<()> {
    let adapter = adapters.get(message.chain);
    let chain_slug = message.chain.slug();

    match &message.body {
        MessageBody::Discover { business_date, .. } => {
            adapter.set_discovery_date(*business_date);
            let files = adapter.discover().await;
            run_stats::record_total_files(db, message.run_id, files.len()).await?;
            let fetch_messages: Vec<QueueMessage> = files
                .into_iter()
                .map(|file| {
                    QueueMessage::new(
                        message.run_id,
                        message.chain,
                        MessageBody::Fetch { url: file.url, filename: file.filename },
                    )
                })
                .collect();
            for chunk in fetch_messages.chunks(crate::model::queue::MAX_BATCH_SEND) {
                queue.send_batch(chunk.to_vec()).await;
            }
            Ok(())
        }

        MessageBody::Fetch { url, filename } => {
            let discovered = crate::model::DiscoveredFile {
                url: url.clone(),
                filename: filename.clone(),
                file_type: crate::model::chain::FileType::from_filename(filename)
                    .unwrap_or(crate::model::chain::FileType::Csv),
                size: None,
                last_modified: None,
                metadata: HashMap::new(),
            };
            let fetched = adapter.fetch(&discovered).await?;
            let blob_key = format!("{}/{chain_slug}/{filename}", message.run_id);
            let already = blob_store.head(&blob_key).await?;
            if already.as_deref() != Some(fetched.content_hash.as_str()) {
                let metadata = HashMap::from([
                    ("filename".to_string(), filename.clone()),
                    ("url".to_string(), url.clone()),
                    ("sha256".to_string(), fetched.content_hash.clone()),
                ]);
                blob_store.put(&blob_key, &fetched.content, metadata).await?;
            }
            queue
                .send_batch(vec![QueueMessage::new(
                    message.run_id,
                    message.chain,
                    MessageBody::Expand { run_file_id: Uuid::new_v4(), blob_key },
                )])
                .await;
            Ok(())
        }

        MessageBody::Expand { run_file_id, blob_key } => {
            let stored = blob_store.get(blob_key).await?.ok_or_else(|| anyhow::anyhow!("blob {blob_key} missing"))?;
            let filename = stored.metadata.get("filename").cloned().unwrap_or_else(|| blob_key.clone());
            let discovered = crate::model::DiscoveredFile {
                url: stored.metadata.get("url").cloned().unwrap_or_default(),
                filename: filename.clone(),
                file_type: crate::model::chain::FileType::from_filename(&filename)
                    .unwrap_or(crate::model::chain::FileType::Csv),
                size: None,
                last_modified: None,
                metadata: HashMap::new(),
            };
            let fetched = crate::model::FetchedFile {
                discovered,
                content: stored.bytes,
                content_hash: stored.metadata.get("sha256").cloned().unwrap_or_default(),
            };
            let entries = expand::expand(&fetched)?;
            run_stats::record_total_entries(db, message.run_id, entries.len()).await?;
            let (identifier_type, identifier_value, store_metadata) =
                file_identifier(adapter.as_ref(), &filename, &fetched.discovered.url);
            for entry in entries {
                let entry_key = format!("{}/{chain_slug}/expanded/{blob_key}/{}", message.run_id, entry.filename);
                blob_store.put(&entry_key, &entry.content, HashMap::new()).await?;
                queue
                    .send_batch(vec![QueueMessage::new(
                        message.run_id,
                        message.chain,
                        MessageBody::Parse {
                            run_file_id: *run_file_id,
                            blob_key: entry_key,
                            filename: entry.filename,
                            identifier_type,
                            identifier_value: identifier_value.clone(),
                            store_metadata: store_metadata.clone(),
                        },
                    )])
                    .await;
            }
            Ok(())
        }

        MessageBody::Parse { run_file_id, blob_key, filename, identifier_type, identifier_value, store_metadata } => {
            let stored = blob_store.get(blob_key).await?.ok_or_else(|| anyhow::anyhow!("blob {blob_key} missing"))?;
            let parsed = adapter.parse(&stored.bytes, filename);
            run_stats::increment_processed_entries(db, message.run_id, 1).await?;

            let groups = group_by_store_identifier(parsed.rows);
            for (key, rows) in groups {
                let resolved = resolution_value(key, identifier_value);
                let rows_key = format!("{}/{chain_slug}/rows/{resolved}/{}", message.run_id, Uuid::new_v4());
                let payload = serde_json::to_vec(&rows)?;
                blob_store.put(&rows_key, &payload, HashMap::new()).await?;
                queue
                    .send_batch(vec![QueueMessage::new(
                        message.run_id,
                        message.chain,
                        MessageBody::Persist {
                            run_file_id: *run_file_id,
                            store_identifier: resolved,
                            identifier_type: *identifier_type,
                            store_metadata: store_metadata.clone(),
                            rows_blob_key: rows_key,
                        },
                    )])
                    .await;
            }
            Ok(())
        }

        MessageBody::ParseChunked {
            run_file_id,
            blob_key,
            filename,
            chunk_size,
            identifier_type,
            identifier_value,
            store_metadata,
        } => {
            let stored = blob_store.get(blob_key).await?.ok_or_else(|| anyhow::anyhow!("blob {blob_key} missing"))?;
            let parsed = adapter.parse(&stored.bytes, filename);
            run_stats::increment_processed_entries(db, message.run_id, 1).await?;

            let chunk_size = (*chunk_size).max(1);
            for (chunk_index, chunk) in parsed.rows.chunks(chunk_size).enumerate() {
                let start_row = chunk_index * chunk_size;
                let chunk_key = format!("{}/{chain_slug}/chunks/{}/{chunk_index}", message.run_id, run_file_id);
                let payload = serde_json::to_vec(chunk)?;
                blob_store.put(&chunk_key, &payload, HashMap::new()).await?;

                let run_chunk = run_chunks::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    run_file_id: Set(*run_file_id),
                    chunk_index: Set(chunk_index as i32),
                    status: Set(run_stats::FILE_STATUS_PENDING.to_string()),
                    start_row: Set(start_row as i32),
                    end_row: Set((start_row + chunk.len()) as i32),
                    row_count: Set(chunk.len() as i32),
                    blob_key: Set(chunk_key),
                };
                let run_chunk = run_chunk.insert(db).await?;
                queue
                    .send_batch(vec![QueueMessage::new(
                        message.run_id,
                        message.chain,
                        MessageBody::PersistChunk {
                            run_chunk_id: run_chunk.id,
                            identifier_type: *identifier_type,
                            identifier_value: identifier_value.clone(),
                            store_metadata: store_metadata.clone(),
                        },
                    )])
                    .await;
            }
            Ok(())
        }

        MessageBody::Persist { store_identifier, identifier_type, store_metadata, rows_blob_key, .. } => {
            let stored = blob_store.get(rows_blob_key).await?.ok_or_else(|| anyhow::anyhow!("blob {rows_blob_key} missing"))?;
            let rows: Vec<NormalizedRow> = serde_json::from_slice(&stored.bytes)?;
            let outcome =
                persistence::persist_rows(db, chain_slug, *identifier_type, store_identifier, &rows, store_metadata.as_ref()).await?;
            if outcome.failed > 0 {
                return Err(anyhow::anyhow!("{} of {} rows failed to persist for store {store_identifier}", outcome.failed, outcome.total));
            }
            Ok(())
        }

        MessageBody::PersistChunk { run_chunk_id, identifier_type, identifier_value, store_metadata } => {
            let chunk = run_chunks::Entity::find_by_id(*run_chunk_id)
                .one(db)
                .await?
                .ok_or_else(|| anyhow::anyhow!("run chunk {run_chunk_id} not found"))?;
            let stored = blob_store.get(&chunk.blob_key).await?.ok_or_else(|| anyhow::anyhow!("blob {} missing", chunk.blob_key))?;
            let rows: Vec<NormalizedRow> = serde_json::from_slice(&stored.bytes)?;

            let groups = group_by_store_identifier(rows);

            let mut chunk_failed = false;
            for (key, rows) in groups {
                let resolved = resolution_value(key, identifier_value);
                match persistence::persist_rows(db, chain_slug, *identifier_type, &resolved, &rows, store_metadata.as_ref()).await {
                    Ok(outcome) if outcome.failed == 0 => {}
                    _ => chunk_failed = true,
                }
            }

            let mut active: run_chunks::ActiveModel = chunk.clone().into();
            active.status = Set(if chunk_failed { run_stats::FILE_STATUS_FAILED } else { run_stats::FILE_STATUS_COMPLETED }.to_string());
            active.update(db).await?;

            let remaining = run_chunks::Entity::find()
                .filter(run_chunks::Column::RunFileId.eq(chunk.run_file_id))
                .filter(run_chunks::Column::Status.eq(run_stats::FILE_STATUS_PENDING))
                .one(db)
                .await?;
            if remaining.is_none() {
                let any_failed = run_chunks::Entity::find()
                    .filter(run_chunks::Column::RunFileId.eq(chunk.run_file_id))
                    .filter(run_chunks::Column::Status.eq(run_stats::FILE_STATUS_FAILED))
                    .one(db)
                    .await?
                    .is_some();
                run_stats::complete_file(db, chunk.run_file_id, any_failed).await?;
            }

            if chunk_failed {
                return Err(anyhow::anyhow!("chunk {run_chunk_id} had persist failures"));
            }
            Ok(())
        }

        MessageBody::Rerun { target } => {
            match target {
                RerunTarget::Run { run_id } => {
                    let files = run_files::Entity::find().filter(run_files::Column::RunId.eq(*run_id)).all(db).await?;
                    for file in files {
                        let blob_key = format!("{run_id}/{chain_slug}/{}", file.filename);
                        if !blob_store.exists(&blob_key).await? {
                            warn!("rerun {run_id}: blob for {} missing, skipping", file.filename);
                            continue;
                        }
                        let (identifier_type, identifier_value, store_metadata) =
                            file_identifier(adapter.as_ref(), &file.filename, &file.url);
                        queue
                            .send_batch(vec![QueueMessage::new(
                                message.run_id,
                                message.chain,
                                MessageBody::Parse {
                                    run_file_id: file.id,
                                    blob_key,
                                    filename: file.filename,
                                    identifier_type,
                                    identifier_value,
                                    store_metadata,
                                },
                            )])
                            .await;
                    }
                    Ok(())
                }
                RerunTarget::File { run_file_id } => {
                    let file = run_files::Entity::find_by_id(*run_file_id)
                        .one(db)
                        .await?
                        .ok_or_else(|| anyhow::anyhow!("run file {run_file_id} not found"))?;
                    let blob_key = format!("{}/{chain_slug}/{}", file.run_id, file.filename);
                    let (identifier_type, identifier_value, store_metadata) =
                        file_identifier(adapter.as_ref(), &file.filename, &file.url);
                    queue
                        .send_batch(vec![QueueMessage::new(
                            message.run_id,
                            message.chain,
                            MessageBody::Parse {
                                run_file_id: file.id,
                                blob_key,
                                filename: file.filename,
                                identifier_type,
                                identifier_value,
                                store_metadata,
                            },
                        )])
                        .await;
                    Ok(())
                }
                RerunTarget::Chunk { run_chunk_id } => {
                    let chunk = run_chunks::Entity::find_by_id(*run_chunk_id)
                        .one(db)
                        .await?
                        .ok_or_else(|| anyhow::anyhow!("run chunk {run_chunk_id} not found"))?;
                    let file = run_files::Entity::find_by_id(chunk.run_file_id)
                        .one(db)
                        .await?
                        .ok_or_else(|| anyhow::anyhow!("run file {} not found", chunk.run_file_id))?;
                    let (identifier_type, identifier_value, store_metadata) =
                        file_identifier(adapter.as_ref(), &file.filename, &file.url);
                    queue
                        .send_batch(vec![QueueMessage::new(
                            message.run_id,
                            message.chain,
                            MessageBody::PersistChunk { run_chunk_id: *run_chunk_id, identifier_type, identifier_value, store_metadata },
                        )])
                        .await;
                    Ok(())
                }
            }
        }

        MessageBody::EnrichStore { store_id, task_kind } => {
            info!("enrichment task {task_kind} requested for store {store_id}; delegated to the enrichment worker");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_delay_doubles_and_caps_at_one_hour() {
        assert_eq!(backoff_delay(1), Duration::from_secs(60));
        assert_eq!(backoff_delay(2), Duration::from_secs(120));
        assert_eq!(backoff_delay(3), Duration::from_secs(240));
        assert_eq!(backoff_delay(20), Duration::from_secs(3600));
    }

    #[test]
    fn discover_parse_and_parse_chunked_are_run_fatal_kinds() {
        assert!(is_run_fatal(&MessageBody::Discover { business_date: None, store_filter: None }));
        assert!(is_run_fatal(&MessageBody::ParseChunked {
            run_file_id: Uuid::new_v4(),
            blob_key: String::new(),
            filename: String::new(),
            chunk_size: 100,
            identifier_type: IdentifierType::Unresolved,
            identifier_value: None,
            store_metadata: None,
        }));
        assert!(!is_run_fatal(&MessageBody::Fetch { url: String::new(), filename: String::new() }));
    }

    #[test]
    fn resolution_value_prefers_the_row_key_then_the_file_identifier_then_unknown() {
        assert_eq!(resolution_value(Some("PJ50-1".to_string()), &Some("ignored".to_string())), "PJ50-1");
        assert_eq!(resolution_value(None, &Some("PJ50-1".to_string())), "PJ50-1");
        assert_eq!(resolution_value(None, &None), "unknown");
    }
}
