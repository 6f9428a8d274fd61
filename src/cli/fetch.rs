use std::collections::HashMap;

use chrono::Utc;

use crate::blob_store::{BlobStore, FsBlobStore};
use crate::cli::parse_chain;
use crate::model::chain::FileType;
use crate::model::DiscoveredFile;
use crate::state::App;
use crate::utils::hashing::sha256_hex;

pub async fn run(chain: &str, url: &str, out_dir: Option<&str>, json: bool) -> anyhow::Result<i32> {
    let chain_id = parse_chain(chain)?;
    let app = App::get();
    let adapter = app.adapters.get(chain_id);

    let is_remote = url.starts_with("http://") || url.starts_with("https://");
    let filename = crate::adapters::BaseAdapter::filename_from_url(url);
    let file_type = FileType::from_filename(&filename).unwrap_or(FileType::Csv);

    let (content, content_hash) = if is_remote {
        let discovered = DiscoveredFile {
            url: url.to_string(),
            filename: filename.clone(),
            file_type,
            size: None,
            last_modified: None,
            metadata: HashMap::new(),
        };
        let fetched = adapter.fetch(&discovered).await?;
        (fetched.content, fetched.content_hash)
    } else {
        let bytes = tokio::fs::read(url).await?;
        let hash = sha256_hex(&bytes);
        (bytes, hash)
    };

    let out_root = out_dir.unwrap_or("data/fetched");
    let today = Utc::now().format("%Y-%m-%d");
    let key = format!("{chain}/{today}/{filename}");
    let store = FsBlobStore::new(out_root);
    store
        .put(&key, &content, HashMap::from([("sha256".to_string(), content_hash.clone())]))
        .await?;
    let stored_path = format!("{out_root}/{key}");

    if json {
        let summary = serde_json::json!({
            "sha256": content_hash,
            "size": content.len(),
            "type": file_type.to_string(),
            "storedPath": stored_path,
        });
        serde_json::to_writer_pretty(std::io::stdout(), &summary)?;
        println!();
    } else {
        println!("sha256: {content_hash}");
        println!("size:   {}", content.len());
        println!("type:   {file_type}");
        println!("stored: {stored_path}");
    }

    Ok(0)
}
