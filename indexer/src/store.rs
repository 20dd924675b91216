use crate::config::Config;
use database::stores::{BlockStore, DaaWindowStore, MetadataStore, OutputStore, TransactionStore};
use database::Database;
use std::sync::Arc;

/// The bundle of replica stores sharing one database handle. Constructed
/// once and handed to every component; there is no global registry.
pub struct ReplicaStores {
    pub db: Arc<Database>,
    pub blocks: BlockStore,
    pub transactions: TransactionStore,
    pub outputs: OutputStore,
    pub daa_windows: DaaWindowStore,
    pub metadata: MetadataStore,
}

impl ReplicaStores {
    pub fn new(db: Arc<Database>, config: &Config) -> Arc<Self> {
        Arc::new(Self {
            blocks: BlockStore::new(db.clone(), config.block_cache_size),
            transactions: TransactionStore::new(db.clone()),
            outputs: OutputStore::new(db.clone()),
            daa_windows: DaaWindowStore::new(db.clone(), config.daa_window_cache_size),
            metadata: MetadataStore::new(db.clone()),
            db,
        })
    }
}
