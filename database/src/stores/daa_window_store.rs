use crate::cache::BoundedCache;
use crate::db::CF_DAA_WINDOW;
use crate::{Database, DbError, DbResult};
use consensus_core::{BlueWorkType, Hash};
use rocksdb::WriteBatch;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// One slot of a block's difficulty-adjustment ancestor window: the
/// sampled ancestor and its accumulated blue work. Entries are computed
/// once per block and never rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaaWindowEntry {
    pub ancestor: Hash,
    pub blue_work: BlueWorkType,
}

/// Uncommitted window writes scoped to one logical transaction. Staging
/// the same slot twice keeps the first value.
#[derive(Default)]
pub struct StagingArea {
    entries: HashMap<(Hash, u64), DaaWindowEntry>,
}

impl StagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff nothing is staged
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Durable, cached storage of per-block DAA window entries.
///
/// Resolution order on reads: staged writes, then the bounded cache
/// (negative entries short-circuit to `NotFound` without touching the
/// store), then rocksdb. The cache is advisory only; the store remains
/// the authority.
pub struct DaaWindowStore {
    db: Arc<Database>,
    cache: BoundedCache<(Hash, u64), DaaWindowEntry>,
}

impl DaaWindowStore {
    pub fn new(db: Arc<Database>, cache_size: usize) -> Self {
        Self { db, cache: BoundedCache::new(cache_size) }
    }

    /// Records an uncommitted write. Idempotent per (block, index) slot.
    pub fn stage(&self, staging: &mut StagingArea, block_hash: Hash, index: u64, entry: DaaWindowEntry) {
        staging.entries.entry((block_hash, index)).or_insert(entry);
    }

    pub fn get(&self, staging: &StagingArea, block_hash: Hash, index: u64) -> DbResult<DaaWindowEntry> {
        if let Some(entry) = staging.entries.get(&(block_hash, index)) {
            return Ok(*entry);
        }

        match self.cache.get(&(block_hash, index)) {
            Some(Some(entry)) => return Ok(entry),
            Some(None) => return Err(not_found(&block_hash, index)),
            None => {}
        }

        match self.db.get(CF_DAA_WINDOW, &window_key(&block_hash, index))? {
            Some(bytes) => {
                let entry: DaaWindowEntry = bincode::deserialize(&bytes)?;
                self.cache.add((block_hash, index), Some(entry));
                Ok(entry)
            }
            None => {
                self.cache.add((block_hash, index), None);
                Err(not_found(&block_hash, index))
            }
        }
    }

    /// Serializes every staged entry into `batch` and promotes it into
    /// the cache. The staged writes become durable atomically when the
    /// caller commits the batch.
    pub fn commit(&self, staging: &StagingArea, batch: &mut WriteBatch) -> DbResult<()> {
        for (&(block_hash, index), entry) in staging.entries.iter() {
            let serialized = bincode::serialize(entry)?;
            self.db.batch_put(batch, CF_DAA_WINDOW, &window_key(&block_hash, index), &serialized)?;
            self.cache.add((block_hash, index), Some(*entry));
        }
        trace!("committed {} daa window entries", staging.len());
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn window_key(block_hash: &Hash, index: u64) -> [u8; 40] {
    let mut key = [0u8; 40];
    key[0..32].copy_from_slice(block_hash.as_bytes());
    key[32..40].copy_from_slice(&index.to_le_bytes());
    key
}

fn not_found(block_hash: &Hash, index: u64) -> DbError {
    DbError::NotFound(format!("daa window entry ({block_hash}, {index})"))
}
