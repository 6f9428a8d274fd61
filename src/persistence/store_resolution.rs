use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::config::chain_display_names;
use crate::database::entity::{chains, store_identifiers, stores};
use crate::error::StoreResolutionError;
use crate::model::{IdentifierType, StoreMetadata};

/// Looks up `store_identifiers` joined to `stores` by `(chain, type,
/// value)`; when absent and `auto_register` is given (and the identifier
/// is not `Unresolved`), registers a new pending virtual-adjacent store
/// and returns its id (§4.5 "Resolution").
pub async fn resolve_store(
    db: &DatabaseConnection,
    chain_slug: &str,
    identifier_type: IdentifierType,
    value: &str,
    auto_register: Option<&StoreMetadata>,
) -> Result<Option<Uuid>, StoreResolutionError> {
    if let Some(store_id) = lookup(db, chain_slug, identifier_type, value).await? {
        return Ok(Some(store_id));
    }

    let Some(metadata) = auto_register else {
        return Ok(None);
    };
    if identifier_type == IdentifierType::Unresolved {
        return Ok(None);
    }

    ensure_chain_exists(db, chain_slug).await?;

    match auto_register_store(db, chain_slug, identifier_type, value, metadata).await {
        Ok(store_id) => Ok(Some(store_id)),
        // A concurrent caller won the race on the (chain, type, value)
        // unique key; defer to it rather than erroring (§5 "Shared
        // resources").
        Err(DbErr::RecordNotInserted) | Err(DbErr::Query(_)) | Err(DbErr::Exec(_)) => {
            lookup(db, chain_slug, identifier_type, value).await
        }
        Err(err) => Err(StoreResolutionError::Database(err)),
    }
}

async fn lookup(
    db: &DatabaseConnection,
    chain_slug: &str,
    identifier_type: IdentifierType,
    value: &str,
) -> Result<Option<Uuid>, StoreResolutionError> {
    let existing = store_identifiers::Entity::find()
        .filter(store_identifiers::Column::ChainSlug.eq(chain_slug))
        .filter(store_identifiers::Column::IdentifierType.eq(identifier_type.to_string()))
        .filter(store_identifiers::Column::Value.eq(value))
        .one(db)
        .await
        .map_err(StoreResolutionError::Database)?;

    Ok(existing.map(|row| row.store_id))
}

async fn ensure_chain_exists(db: &DatabaseConnection, chain_slug: &str) -> Result<(), StoreResolutionError> {
    let exists = chains::Entity::find()
        .filter(chains::Column::Slug.eq(chain_slug))
        .one(db)
        .await
        .map_err(StoreResolutionError::Database)?;
    if exists.is_some() {
        return Ok(());
    }

    let display_name = chain_display_names().get(chain_slug).copied().unwrap_or(chain_slug).to_string();
    let model = chains::ActiveModel {
        id: Set(Uuid::new_v4()),
        slug: Set(chain_slug.to_string()),
        display_name: Set(display_name),
    };
    // A concurrent insert racing on the slug unique key is not an error:
    // either writer's row satisfies the caller.
    let _ = model.insert(db).await;
    Ok(())
}

async fn auto_register_store(
    db: &DatabaseConnection,
    chain_slug: &str,
    identifier_type: IdentifierType,
    value: &str,
    metadata: &StoreMetadata,
) -> Result<Uuid, DbErr> {
    let store_id = Uuid::new_v4();
    let store = stores::ActiveModel {
        id: Set(store_id),
        chain_slug: Set(chain_slug.to_string()),
        name: Set(metadata.name.clone()),
        address: Set(metadata.address.clone()),
        city: Set(metadata.city.clone()),
        postal_code: Set(None),
        lat: Set(None),
        lon: Set(None),
        is_virtual: Set(true),
        status: Set("pending".to_string()),
        price_source_store_id: Set(None),
    };
    store.insert(db).await?;

    let identifier = store_identifiers::ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(store_id),
        chain_slug: Set(chain_slug.to_string()),
        identifier_type: Set(identifier_type.to_string()),
        value: Set(value.to_string()),
    };
    identifier.insert(db).await?;

    log::info!("auto-registered pending store {store_id} for {chain_slug}:{identifier_type}:{value}; needs geocoding");
    Ok(store_id)
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;
    use crate::database::entity::stores;

    #[tokio::test]
    async fn resolve_store_returns_the_existing_match_without_registering() {
        let known_store = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![store_identifiers::Model {
                id: Uuid::new_v4(),
                store_id: known_store,
                chain_slug: "konzum".to_string(),
                identifier_type: "filename_code".to_string(),
                value: "123".to_string(),
            }]])
            .into_connection();

        let resolved = resolve_store(&db, "konzum", IdentifierType::FilenameCode, "123", None).await.unwrap();
        assert_eq!(resolved, Some(known_store));
    }

    #[tokio::test]
    async fn resolve_store_returns_none_when_unmatched_and_auto_register_is_absent() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<store_identifiers::Model>::new()])
            .into_connection();

        let resolved = resolve_store(&db, "konzum", IdentifierType::FilenameCode, "missing", None).await.unwrap();
        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn resolve_store_returns_none_for_an_unresolved_identifier_even_with_auto_register() {
        let metadata = StoreMetadata {
            name: "Unknown".to_string(),
            address: None,
            city: None,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<store_identifiers::Model>::new()])
            .into_connection();

        let resolved = resolve_store(&db, "konzum", IdentifierType::Unresolved, "n/a", Some(&metadata)).await.unwrap();
        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn resolve_store_auto_registers_a_pending_virtual_store_when_unmatched() {
        let metadata = StoreMetadata {
            name: "Konzum Ilica".to_string(),
            address: Some("Ilica 1".to_string()),
            city: Some("Zagreb".to_string()),
        };
        let store_id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<store_identifiers::Model>::new()])
            .append_query_results([Vec::<chains::Model>::new()])
            .append_query_results([vec![chains::Model {
                id: Uuid::new_v4(),
                slug: "konzum".to_string(),
                display_name: "Konzum".to_string(),
            }]])
            .append_query_results([vec![stores::Model {
                id: store_id,
                chain_slug: "konzum".to_string(),
                name: metadata.name.clone(),
                address: metadata.address.clone(),
                city: metadata.city.clone(),
                postal_code: None,
                lat: None,
                lon: None,
                is_virtual: true,
                status: "pending".to_string(),
                price_source_store_id: None,
            }]])
            .append_query_results([vec![store_identifiers::Model {
                id: Uuid::new_v4(),
                store_id,
                chain_slug: "konzum".to_string(),
                identifier_type: "filename_code".to_string(),
                value: "999".to_string(),
            }]])
            .into_connection();

        let resolved = resolve_store(&db, "konzum", IdentifierType::FilenameCode, "999", Some(&metadata)).await.unwrap();
        assert!(resolved.is_some());
    }
}
