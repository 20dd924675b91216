pub mod block_store;
pub mod daa_window_store;
pub mod metadata_store;
pub mod output_store;
pub mod transaction_store;

pub use block_store::{BlockRecord, BlockStore};
pub use daa_window_store::{DaaWindowEntry, DaaWindowStore, StagingArea};
pub use metadata_store::MetadataStore;
pub use output_store::{OutputRecord, OutputStore};
pub use transaction_store::{TransactionRecord, TransactionStore};
