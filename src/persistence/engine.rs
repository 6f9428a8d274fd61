use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set, TransactionTrait};
use uuid::Uuid;

use crate::database::entity::{retailer_item_barcodes, retailer_items, store_item_price_periods, store_item_states};
use crate::error::PersistError;
use crate::model::{IdentifierType, NormalizedRow, StoreMetadata};

use super::batch;
use super::price_signature::compute_price_signature;
use super::store_resolution::resolve_store;

/// `{ total, persisted, priceChanges, unchanged, failed, errors[], storeId? }`
/// (§4.5). One instance per `(storeIdentifier, rows)` group.
#[derive(Debug, Clone, Default)]
pub struct PersistOutcome {
    pub total: usize,
    pub persisted: usize,
    pub price_changes: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub store_id: Option<Uuid>,
}

const RETAILER_ITEM_COLUMNS: usize = 11;
const BARCODE_COLUMNS: usize = 4;

/// Persists one `(storeIdentifier, rows)` group end to end: resolution,
/// then the two-phase lookup/write batch (§4.5).
pub async fn persist_rows(
    db: &DatabaseConnection,
    chain_slug: &str,
    identifier_type: IdentifierType,
    store_identifier: &str,
    rows: &[NormalizedRow],
    auto_register: Option<&StoreMetadata>,
) -> Result<PersistOutcome, PersistError> {
    let mut outcome = PersistOutcome {
        total: rows.len(),
        ..Default::default()
    };

    let store_id = match resolve_store(db, chain_slug, identifier_type, store_identifier, auto_register).await? {
        Some(id) => id,
        None => {
            outcome.failed = rows.len();
            outcome.errors.push(format!("store identifier '{store_identifier}' did not resolve"));
            return Ok(outcome);
        }
    };
    outcome.store_id = Some(store_id);

    // Phase 1: lookups.
    let external_id_rows: Vec<&NormalizedRow> = rows.iter().filter(|r| r.external_id.is_some()).collect();
    let external_ids: Vec<String> = external_id_rows.iter().filter_map(|r| r.external_id.clone()).collect();

    let mut by_external_id: HashMap<String, retailer_items::Model> = HashMap::new();
    for chunk in batch::chunks(&external_ids, RETAILER_ITEM_COLUMNS) {
        let found = retailer_items::Entity::find()
            .filter(retailer_items::Column::ChainSlug.eq(chain_slug))
            .filter(retailer_items::Column::ExternalId.is_in(chunk.to_vec()))
            .all(db)
            .await
            .map_err(PersistError::Database)?;
        for item in found {
            if let Some(external_id) = item.external_id.clone() {
                by_external_id.insert(external_id, item);
            }
        }
    }

    let unmatched_by_external_id: Vec<&NormalizedRow> = rows
        .iter()
        .filter(|row| row.external_id.as_deref().map(|id| !by_external_id.contains_key(id)).unwrap_or(true))
        .collect();
    let names_to_match: Vec<String> = unmatched_by_external_id.iter().map(|r| r.name.clone()).collect();

    let mut by_name: HashMap<String, retailer_items::Model> = HashMap::new();
    for chunk in batch::chunks(&names_to_match, RETAILER_ITEM_COLUMNS) {
        let found = retailer_items::Entity::find()
            .filter(retailer_items::Column::ChainSlug.eq(chain_slug))
            .filter(retailer_items::Column::Name.is_in(chunk.to_vec()))
            .all(db)
            .await
            .map_err(PersistError::Database)?;
        for item in found {
            by_name.insert(item.name.clone(), item);
        }
    }

    // Resolve (row -> retailer_item_id), tracking which rows are brand new.
    let mut row_item_ids: Vec<Uuid> = Vec::with_capacity(rows.len());
    let mut new_rows: Vec<(&NormalizedRow, Uuid)> = Vec::new();
    let mut matched_by_external_id: Vec<(&NormalizedRow, retailer_items::Model)> = Vec::new();
    let mut matched_by_name: Vec<(&NormalizedRow, retailer_items::Model)> = Vec::new();

    for row in rows {
        if let Some(existing) = row.external_id.as_deref().and_then(|id| by_external_id.get(id)) {
            row_item_ids.push(existing.id);
            matched_by_external_id.push((row, existing.clone()));
            continue;
        }
        if let Some(existing) = by_name.get(&row.name) {
            row_item_ids.push(existing.id);
            matched_by_name.push((row, existing.clone()));
            continue;
        }
        let new_id = Uuid::new_v4();
        row_item_ids.push(new_id);
        new_rows.push((row, new_id));
    }

    let all_item_ids: Vec<Uuid> = row_item_ids.clone();
    let mut existing_barcodes: HashMap<Uuid, HashSet<String>> = HashMap::new();
    for chunk in batch::chunks(&all_item_ids, BARCODE_COLUMNS) {
        let found = retailer_item_barcodes::Entity::find()
            .filter(retailer_item_barcodes::Column::RetailerItemId.is_in(chunk.to_vec()))
            .all(db)
            .await
            .map_err(PersistError::Database)?;
        for barcode in found {
            existing_barcodes.entry(barcode.retailer_item_id).or_default().insert(barcode.barcode);
        }
    }

    let mut existing_states: HashMap<Uuid, store_item_states::Model> = HashMap::new();
    for chunk in batch::chunks(&all_item_ids, 17) {
        let found = store_item_states::Entity::find()
            .filter(store_item_states::Column::StoreId.eq(store_id))
            .filter(store_item_states::Column::RetailerItemId.is_in(chunk.to_vec()))
            .all(db)
            .await
            .map_err(PersistError::Database)?;
        for state in found {
            existing_states.insert(state.retailer_item_id, state);
        }
    }

    // Phase 2: writes.
    let now = Utc::now();

    for (row, existing) in &matched_by_external_id {
        let mut active: retailer_items::ActiveModel = existing.clone().into();
        active.name = Set(row.name.clone());
        active.description = Set(row.description.clone());
        active.category = Set(row.category.clone());
        active.subcategory = Set(row.subcategory.clone());
        active.brand = Set(row.brand.clone());
        active.unit = Set(row.unit.clone());
        active.unit_quantity = Set(row.unit_quantity.clone());
        active.image_url = Set(row.image_url.clone());
        active.updated_at = Set(now);
        if let Err(err) = active.update(db).await {
            outcome.errors.push(err.to_string());
        }
    }

    for (row, existing) in &matched_by_name {
        let mut active: retailer_items::ActiveModel = existing.clone().into();
        if existing.description.is_none() {
            active.description = Set(row.description.clone());
        }
        if existing.category.is_none() {
            active.category = Set(row.category.clone());
        }
        if existing.subcategory.is_none() {
            active.subcategory = Set(row.subcategory.clone());
        }
        if existing.brand.is_none() {
            active.brand = Set(row.brand.clone());
        }
        if existing.unit.is_none() {
            active.unit = Set(row.unit.clone());
        }
        if existing.unit_quantity.is_none() {
            active.unit_quantity = Set(row.unit_quantity.clone());
        }
        if existing.image_url.is_none() {
            active.image_url = Set(row.image_url.clone());
        }
        active.updated_at = Set(now);
        if let Err(err) = active.update(db).await {
            outcome.errors.push(err.to_string());
        }
    }

    for chunk in new_rows.chunks(batch::batch_size(RETAILER_ITEM_COLUMNS)) {
        let models: Vec<retailer_items::ActiveModel> = chunk
            .iter()
            .map(|(row, id)| retailer_items::ActiveModel {
                id: Set(*id),
                chain_slug: Set(chain_slug.to_string()),
                external_id: Set(row.external_id.clone()),
                name: Set(row.name.clone()),
                description: Set(row.description.clone()),
                category: Set(row.category.clone()),
                subcategory: Set(row.subcategory.clone()),
                brand: Set(row.brand.clone()),
                unit: Set(row.unit.clone()),
                unit_quantity: Set(row.unit_quantity.clone()),
                image_url: Set(row.image_url.clone()),
                updated_at: Set(now),
            })
            .collect();
        if !models.is_empty() {
            if let Err(err) = retailer_items::Entity::insert_many(models).exec(db).await {
                outcome.errors.push(err.to_string());
            }
        }
    }

    // New barcodes: additive only, first barcode on a previously bare item
    // is primary (§3.7, §8 "Barcode monotonicity").
    let mut new_barcode_models = Vec::new();
    for (row, item_id) in rows.iter().zip(row_item_ids.iter().copied()) {
        let known = existing_barcodes.entry(item_id).or_default();
        let had_any_before = !known.is_empty();
        for (idx, barcode) in row.barcodes.iter().enumerate() {
            if known.insert(barcode.clone()) {
                new_barcode_models.push(retailer_item_barcodes::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    retailer_item_id: Set(item_id),
                    barcode: Set(barcode.clone()),
                    is_primary: Set(!had_any_before && idx == 0),
                });
            }
        }
    }
    for chunk in new_barcode_models.chunks(batch::batch_size(BARCODE_COLUMNS)) {
        if !chunk.is_empty() {
            if let Err(err) = retailer_item_barcodes::Entity::insert_many(chunk.to_vec()).exec(db).await {
                outcome.errors.push(err.to_string());
            }
        }
    }

    // Price states and periods.
    for (row, item_id) in rows.iter().zip(row_item_ids.iter().copied()) {
        match upsert_price_state(db, store_id, item_id, row, existing_states.get(&item_id), now).await {
            Ok(PriceUpdate::Unchanged) => {
                outcome.unchanged += 1;
                outcome.persisted += 1;
            }
            Ok(PriceUpdate::Changed) | Ok(PriceUpdate::Created) => {
                outcome.price_changes += 1;
                outcome.persisted += 1;
            }
            Err(err) => {
                outcome.failed += 1;
                outcome.errors.push(err.to_string());
            }
        }
    }

    Ok(outcome)
}

enum PriceUpdate {
    Created,
    Changed,
    Unchanged,
}

async fn upsert_price_state(
    db: &DatabaseConnection,
    store_id: Uuid,
    retailer_item_id: Uuid,
    row: &NormalizedRow,
    existing: Option<&store_item_states::Model>,
    now: chrono::DateTime<Utc>,
) -> Result<PriceUpdate, sea_orm::DbErr> {
    let signature = compute_price_signature(row);

    match existing {
        None => {
            let state_id = Uuid::new_v4();
            let row = row.clone();
            db.transaction::<_, PriceUpdate, DbErr>(|txn| {
                Box::pin(async move {
                    let state = store_item_states::ActiveModel {
                        id: Set(state_id),
                        store_id: Set(store_id),
                        retailer_item_id: Set(retailer_item_id),
                        current_price: Set(row.price),
                        previous_price: Set(None),
                        discount_price: Set(row.discount_price),
                        discount_start: Set(row.discount_start),
                        discount_end: Set(row.discount_end),
                        unit_price: Set(row.unit_price),
                        unit_price_base_quantity: Set(row.unit_price_base_quantity.clone()),
                        unit_price_base_unit: Set(row.unit_price_base_unit.clone()),
                        lowest_price_30d: Set(row.lowest_price_30d),
                        anchor_price: Set(row.anchor_price),
                        anchor_price_as_of: Set(row.anchor_price_as_of),
                        price_signature: Set(signature),
                        last_seen_at: Set(now),
                        updated_at: Set(now),
                    };
                    state.insert(txn).await?;

                    let period = store_item_price_periods::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        store_item_state_id: Set(state_id),
                        price: Set(row.price),
                        discount_price: Set(row.discount_price),
                        started_at: Set(now),
                        ended_at: Set(None),
                    };
                    period.insert(txn).await?;

                    Ok(PriceUpdate::Created)
                })
            })
            .await
            .map_err(flatten_txn_err)
        }
        Some(existing) if existing.price_signature == signature => {
            let mut active: store_item_states::ActiveModel = existing.clone().into();
            active.last_seen_at = Set(now);
            active.update(db).await?;
            Ok(PriceUpdate::Unchanged)
        }
        Some(existing) => {
            let existing = existing.clone();
            let row = row.clone();
            // Close the open period, insert the replacement, and roll the
            // state forward inside one transaction (§5 "Ordering
            // guarantees") so no observer can see two open periods.
            db.transaction::<_, PriceUpdate, DbErr>(|txn| {
                Box::pin(async move {
                    let open_period = store_item_price_periods::Entity::find()
                        .filter(store_item_price_periods::Column::StoreItemStateId.eq(existing.id))
                        .filter(store_item_price_periods::Column::EndedAt.is_null())
                        .one(txn)
                        .await?;
                    if let Some(open_period) = open_period {
                        let mut close: store_item_price_periods::ActiveModel = open_period.into();
                        close.ended_at = Set(Some(now));
                        close.update(txn).await?;
                    }

                    let new_period = store_item_price_periods::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        store_item_state_id: Set(existing.id),
                        price: Set(row.price),
                        discount_price: Set(row.discount_price),
                        started_at: Set(now),
                        ended_at: Set(None),
                    };
                    new_period.insert(txn).await?;

                    let mut active: store_item_states::ActiveModel = existing.clone().into();
                    active.previous_price = Set(Some(existing.current_price));
                    active.current_price = Set(row.price);
                    active.discount_price = Set(row.discount_price);
                    active.discount_start = Set(row.discount_start);
                    active.discount_end = Set(row.discount_end);
                    active.unit_price = Set(row.unit_price);
                    active.unit_price_base_quantity = Set(row.unit_price_base_quantity.clone());
                    active.unit_price_base_unit = Set(row.unit_price_base_unit.clone());
                    active.lowest_price_30d = Set(row.lowest_price_30d);
                    active.anchor_price = Set(row.anchor_price);
                    active.anchor_price_as_of = Set(row.anchor_price_as_of);
                    active.price_signature = Set(signature);
                    active.last_seen_at = Set(now);
                    active.updated_at = Set(now);
                    active.update(txn).await?;

                    Ok(PriceUpdate::Changed)
                })
            })
            .await
            .map_err(flatten_txn_err)
        }
    }
}

fn flatten_txn_err(err: sea_orm::TransactionError<DbErr>) -> DbErr {
    match err {
        sea_orm::TransactionError::Connection(err) => err,
        sea_orm::TransactionError::Transaction(err) => err,
    }
}
