use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Closed set of chain identifiers this build knows how to ingest.
///
/// The CLI's `--chain` flag is validated against this set (§6.4); adding a
/// new chain means adding a variant here, a registry entry in
/// `crate::config::chain_table`, and an adapter in `crate::adapters`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChainId {
    Konzum,
    Ktc,
    Metro,
    Lidl,
    DmDrogerieMarkt,
    Eurospin,
}

impl ChainId {
    pub fn slug(&self) -> &'static str {
        match self {
            ChainId::Konzum => "konzum",
            ChainId::Ktc => "ktc",
            ChainId::Metro => "metro",
            ChainId::Lidl => "lidl",
            ChainId::DmDrogerieMarkt => "dm",
            ChainId::Eurospin => "eurospin",
        }
    }

    pub fn all() -> &'static [ChainId] {
        &[
            ChainId::Konzum,
            ChainId::Ktc,
            ChainId::Metro,
            ChainId::Lidl,
            ChainId::DmDrogerieMarkt,
            ChainId::Eurospin,
        ]
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileType::Csv => "csv",
            FileType::Xml => "xml",
            FileType::Xlsx => "xlsx",
            FileType::Zip => "zip",
        };
        write!(f, "{s}")
    }
}

/// Discovered/fetched/expanded file type tag (§3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Csv,
    Xml,
    Xlsx,
    Zip,
}

impl FileType {
    /// Best-effort detection from a filename's extension, used when
    /// expanding ZIP subentries (§4.3 Expand) which carry no declared type.
    pub fn from_filename(name: &str) -> Option<FileType> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            Some(FileType::Csv)
        } else if lower.ends_with(".xml") {
            Some(FileType::Xml)
        } else if lower.ends_with(".xlsx") {
            Some(FileType::Xlsx)
        } else if lower.ends_with(".zip") {
            Some(FileType::Zip)
        } else {
            None
        }
    }
}

/// Text encoding for CSV/XLSX decoding (§3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    Utf8,
    Windows1250,
}

/// CSV dialect for filename-coded CSV chains (§3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvDialect {
    pub delimiter: u8,
    pub encoding: Encoding,
    pub has_header: bool,
}

impl CsvDialect {
    pub const fn comma(encoding: Encoding) -> Self {
        CsvDialect {
            delimiter: b',',
            encoding,
            has_header: true,
        }
    }

    pub const fn semicolon(encoding: Encoding) -> Self {
        CsvDialect {
            delimiter: b';',
            encoding,
            has_header: true,
        }
    }
}

/// How a chain's raw store code resolves to a `Store` row (§3.1, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreResolution {
    /// The identifier is embedded in the discovered file's name/URL.
    Filename,
    /// The identifier is a portal-assigned id (XML chains).
    PortalId,
    /// The chain publishes one national price list; the identifier is a
    /// fixed per-chain sentinel (§4.2 "National chains").
    National,
}

/// Immutable, process-start-bound configuration for one chain (§3.1).
///
/// Built once by `crate::config::chain_table` and frozen into the
/// `ChainRegistry`; never mutated after `ChainRegistry::init`.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub id: ChainId,
    pub display_name: &'static str,
    pub base_url: &'static str,
    pub primary_file_type: FileType,
    pub supported_file_types: &'static [FileType],
    pub csv_dialect: Option<CsvDialect>,
    pub uses_archives: bool,
    pub store_resolution: StoreResolution,
    pub request_timeout_secs: u64,
}
