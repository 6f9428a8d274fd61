pub mod batch;
pub mod engine;
pub mod price_signature;
pub mod store_resolution;

pub use engine::{persist_rows, PersistOutcome};
