use clap::Args;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::database::entity::stores;
use crate::state::App;

/// Store administration sub-actions (§6.4). Exactly one of these may be
/// given per invocation; `--chain` additionally names the owning chain
/// for `--add` and `--import-csv`.
#[derive(Debug, Args)]
pub struct StoresArgs {
    #[arg(long)]
    pending: bool,
    #[arg(long = "chain")]
    chain: Option<String>,
    #[arg(long)]
    approve: Option<Uuid>,
    #[arg(long)]
    reject: Option<Uuid>,
    #[arg(long)]
    show: Option<Uuid>,
    #[arg(long)]
    add: bool,
    #[arg(long)]
    name: Option<String>,
    #[arg(long = "price-source")]
    price_source: Option<Uuid>,
    #[arg(long)]
    link: Option<Uuid>,
    #[arg(long = "import-csv")]
    import_csv: Option<String>,
}

pub async fn run(args: &StoresArgs) -> anyhow::Result<i32> {
    let app = App::get();
    let db = &app.db;

    if let Some(id) = args.approve {
        let store = stores::Entity::find_by_id(id).one(db).await?.ok_or_else(|| anyhow::anyhow!("store {id} not found"))?;
        let mut active: stores::ActiveModel = store.into();
        active.status = Set("active".to_string());
        active.update(db).await?;
        println!("approved {id}");
        return Ok(0);
    }

    if let Some(id) = args.reject {
        let store = stores::Entity::find_by_id(id).one(db).await?.ok_or_else(|| anyhow::anyhow!("store {id} not found"))?;
        let mut active: stores::ActiveModel = store.into();
        active.status = Set("rejected".to_string());
        active.update(db).await?;
        println!("rejected {id}");
        return Ok(0);
    }

    if let Some(id) = args.show {
        let store = stores::Entity::find_by_id(id).one(db).await?.ok_or_else(|| anyhow::anyhow!("store {id} not found"))?;
        serde_json::to_writer_pretty(std::io::stdout(), &serde_json::json!({
            "id": store.id,
            "chainSlug": store.chain_slug,
            "name": store.name,
            "address": store.address,
            "city": store.city,
            "isVirtual": store.is_virtual,
            "status": store.status,
            "priceSourceStoreId": store.price_source_store_id,
        }))?;
        println!();
        return Ok(0);
    }

    if let Some(id) = args.link {
        let price_source = args.price_source.ok_or_else(|| anyhow::anyhow!("--link requires --price-source"))?;
        let store = stores::Entity::find_by_id(id).one(db).await?.ok_or_else(|| anyhow::anyhow!("store {id} not found"))?;
        let mut active: stores::ActiveModel = store.into();
        active.price_source_store_id = Set(Some(price_source));
        active.update(db).await?;
        println!("linked {id} -> {price_source}");
        return Ok(0);
    }

    if args.add {
        let name = args.name.clone().ok_or_else(|| anyhow::anyhow!("--add requires --name"))?;
        let chain_slug = args.chain.clone().ok_or_else(|| anyhow::anyhow!("--add requires --chain"))?;
        let store = stores::ActiveModel {
            id: Set(Uuid::new_v4()),
            chain_slug: Set(chain_slug),
            name: Set(name),
            address: Set(None),
            city: Set(None),
            postal_code: Set(None),
            lat: Set(None),
            lon: Set(None),
            is_virtual: Set(false),
            status: Set("active".to_string()),
            price_source_store_id: Set(args.price_source),
        };
        let store = store.insert(db).await?;
        println!("created store {}", store.id);
        return Ok(0);
    }

    if let Some(path) = &args.import_csv {
        let chain_slug = args.chain.clone().ok_or_else(|| anyhow::anyhow!("--import-csv requires --chain"))?;
        let content = tokio::fs::read(path).await?;
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(content.as_slice());
        let mut imported = 0usize;
        for record in reader.records() {
            let record = record?;
            let name = record.get(0).unwrap_or_default().trim().to_string();
            if name.is_empty() {
                continue;
            }
            let address = record.get(1).map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
            let city = record.get(2).map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
            let store = stores::ActiveModel {
                id: Set(Uuid::new_v4()),
                chain_slug: Set(chain_slug.clone()),
                name: Set(name),
                address: Set(address),
                city: Set(city),
                postal_code: Set(None),
                lat: Set(None),
                lon: Set(None),
                is_virtual: Set(false),
                status: Set("active".to_string()),
                price_source_store_id: Set(args.price_source),
            };
            store.insert(db).await?;
            imported += 1;
        }
        println!("imported {imported} store(s)");
        return Ok(0);
    }

    if args.pending {
        let pending = stores::Entity::find().filter(stores::Column::Status.eq("pending")).all(db).await?;
        for store in &pending {
            println!("{} {} ({})", store.id, store.name, store.chain_slug);
        }
        println!("{} pending store(s)", pending.len());
        return Ok(0);
    }

    if let Some(chain_slug) = &args.chain {
        let matched = stores::Entity::find().filter(stores::Column::ChainSlug.eq(chain_slug.as_str())).all(db).await?;
        for store in &matched {
            println!("{} {} ({})", store.id, store.name, store.status);
        }
        println!("{} store(s) for {chain_slug}", matched.len());
        return Ok(0);
    }

    Err(anyhow::anyhow!("stores requires exactly one sub-action (--pending, --chain, --approve, --reject, --show, --add, --link, --import-csv)"))
}
