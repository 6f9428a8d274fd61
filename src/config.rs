use std::collections::HashMap;
use std::env;
use std::sync::OnceLock;

use crate::model::chain::{ChainConfig, ChainId, CsvDialect, Encoding, FileType, StoreResolution};

/// Process-wide configuration read from the environment (§6.6).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub ingestion_chains: Vec<ChainId>,
    pub max_retries: u32,
    pub sample_data_dir: Option<String>,
}

impl AppConfig {
    /// Loads configuration from the environment, after loading a local
    /// `.env` file if present (a no-op in production where the variables
    /// are already set).
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://data/cijene.db?mode=rwc".to_string());

        let ingestion_chains = match env::var("INGESTION_CHAINS") {
            Ok(raw) if !raw.trim().is_empty() => raw
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<ChainId>()
                        .map_err(|_| anyhow::anyhow!("unknown chain id in INGESTION_CHAINS: {s}"))
                })
                .collect::<anyhow::Result<Vec<_>>>()?,
            _ => ChainId::all().to_vec(),
        };

        let max_retries = env::var("MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        let sample_data_dir = env::var("SAMPLE_DATA_DIR").ok();

        Ok(AppConfig {
            database_url,
            ingestion_chains,
            max_retries,
            sample_data_dir,
        })
    }
}

/// The hard-coded slug -> display-name table used both by the chain
/// registry and by store auto-registration when a chain record needs to
/// be created on the fly (§4.5 "ensure the chain record exists").
pub fn chain_display_names() -> &'static HashMap<&'static str, &'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            ("konzum", "Konzum"),
            ("ktc", "KTC"),
            ("metro", "Metro Cash & Carry"),
            ("lidl", "Lidl Hrvatska"),
            ("dm", "dm-drogerie markt"),
            ("eurospin", "Eurospin Hrvatska"),
        ])
    })
}

fn chain_table() -> HashMap<ChainId, ChainConfig> {
    use ChainId::*;
    HashMap::from([
        (
            Konzum,
            ChainConfig {
                id: Konzum,
                display_name: "Konzum",
                base_url: "https://www.konzum.hr/cjenici",
                primary_file_type: FileType::Csv,
                supported_file_types: &[FileType::Csv],
                csv_dialect: Some(CsvDialect::comma(Encoding::Utf8)),
                uses_archives: false,
                store_resolution: StoreResolution::Filename,
                request_timeout_secs: 30,
            },
        ),
        (
            Ktc,
            ChainConfig {
                id: Ktc,
                display_name: "KTC",
                base_url: "https://www.ktc.hr/cjenici",
                primary_file_type: FileType::Csv,
                supported_file_types: &[FileType::Csv],
                csv_dialect: Some(CsvDialect::semicolon(Encoding::Windows1250)),
                uses_archives: false,
                store_resolution: StoreResolution::Filename,
                request_timeout_secs: 30,
            },
        ),
        (
            Metro,
            ChainConfig {
                id: Metro,
                display_name: "Metro Cash & Carry",
                base_url: "https://metro-cjenik.com.hr",
                primary_file_type: FileType::Zip,
                supported_file_types: &[FileType::Zip, FileType::Csv],
                csv_dialect: Some(CsvDialect::semicolon(Encoding::Windows1250)),
                uses_archives: true,
                store_resolution: StoreResolution::PortalId,
                request_timeout_secs: 30,
            },
        ),
        (
            Lidl,
            ChainConfig {
                id: Lidl,
                display_name: "Lidl Hrvatska",
                base_url: "https://tvrtka.lidl.hr/cijene",
                primary_file_type: FileType::Zip,
                supported_file_types: &[FileType::Zip, FileType::Csv],
                csv_dialect: Some(CsvDialect::semicolon(Encoding::Utf8)),
                uses_archives: true,
                store_resolution: StoreResolution::Filename,
                request_timeout_secs: 30,
            },
        ),
        (
            DmDrogerieMarkt,
            ChainConfig {
                id: DmDrogerieMarkt,
                display_name: "dm-drogerie markt",
                base_url: "https://www.dm.hr/cjenik",
                primary_file_type: FileType::Csv,
                supported_file_types: &[FileType::Csv],
                csv_dialect: Some(CsvDialect::comma(Encoding::Utf8)),
                uses_archives: false,
                store_resolution: StoreResolution::National,
                request_timeout_secs: 30,
            },
        ),
        (
            Eurospin,
            ChainConfig {
                id: Eurospin,
                display_name: "Eurospin Hrvatska",
                base_url: "https://www.eurospin.hr/cjenici",
                primary_file_type: FileType::Xml,
                supported_file_types: &[FileType::Xml],
                csv_dialect: None,
                uses_archives: false,
                store_resolution: StoreResolution::PortalId,
                request_timeout_secs: 30,
            },
        ),
    ])
}

/// Process-scoped, read-only-after-init chain registry (§3.1, §9 "Global
/// mutable state"). Built once via `ChainRegistry::init` and frozen into a
/// `OnceLock`; every lookup thereafter is infallible and lock-free.
pub struct ChainRegistry {
    chains: HashMap<ChainId, ChainConfig>,
}

static REGISTRY: OnceLock<ChainRegistry> = OnceLock::new();

impl ChainRegistry {
    /// Idempotent: later calls are no-ops, returning the already-frozen
    /// registry.
    pub fn init() -> &'static ChainRegistry {
        REGISTRY.get_or_init(|| ChainRegistry {
            chains: chain_table(),
        })
    }

    /// Panics if `init` has not yet run; every entry point calls `init`
    /// before doing anything else, so in practice this never panics.
    pub fn get() -> &'static ChainRegistry {
        REGISTRY.get().expect("ChainRegistry::init was not called")
    }

    pub fn config(&self, id: ChainId) -> &ChainConfig {
        self.chains
            .get(&id)
            .unwrap_or_else(|| panic!("chain {id} missing from registry"))
    }

    pub fn contains(&self, id: ChainId) -> bool {
        self.chains.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_an_entry_for_every_chain_id() {
        let registry = ChainRegistry::init();
        for id in ChainId::all() {
            assert!(registry.contains(*id), "missing registry entry for {id}");
        }
    }

    #[test]
    fn display_name_table_covers_every_configured_slug() {
        let registry = ChainRegistry::init();
        let names = chain_display_names();
        for id in ChainId::all() {
            let slug = registry.config(*id).id.slug();
            assert!(names.contains_key(slug), "missing display name for {slug}");
        }
    }
}
