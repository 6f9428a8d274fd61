pub mod chain;
pub mod discovered;
pub mod queue;
pub mod row;

pub use chain::{ChainConfig, ChainId, CsvDialect, Encoding, FileType, StoreResolution};
pub use discovered::{
    DiscoveredFile, ExpandedEntry, ExtractedIdentifier, FetchedFile, IdentifierType, StoreMetadata,
};
pub use queue::{MessageBody, QueueMessage};
pub use row::{NormalizedRow, RowValidation};
