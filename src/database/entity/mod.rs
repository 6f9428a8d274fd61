pub mod chains;
pub mod retailer_item_barcodes;
pub mod retailer_items;
pub mod run_chunks;
pub mod run_files;
pub mod runs;
pub mod store_identifiers;
pub mod store_item_price_periods;
pub mod store_item_states;
pub mod stores;
