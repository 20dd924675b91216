use crate::cache::BoundedCache;
use crate::db::{CF_ACCEPTED_BLOCKS, CF_BLOCKS, CF_RAW_BLOCKS};
use crate::{Database, DbResult};
use consensus_core::header::Header;
use consensus_core::{BlueWorkType, Hash};
use rocksdb::{IteratorMode, WriteBatch};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Replicated view of one block. `is_chain_block` and the accepting
/// fields mutate only through the acceptance state machine; everything
/// else is immutable after materialization. Records are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub hash: Hash,
    /// Direct DAG parents in header order; empty only for genesis
    pub parents: Vec<Hash>,
    pub version: u16,
    pub hash_merkle_root: Hash,
    pub accepted_id_merkle_root: Hash,
    pub utxo_commitment: Hash,
    pub timestamp: u64,
    pub bits: u32,
    pub nonce: u64,
    pub daa_score: u64,
    pub blue_work: BlueWorkType,
    pub blue_score: u64,
    pub pruning_point: Hash,
    pub is_chain_block: bool,
    pub accepting_block_hash: Option<Hash>,
    pub accepting_block_blue_score: Option<u64>,
}

impl BlockRecord {
    /// Builds a fresh (unaccepted) record from a header. Genesis is the
    /// only parentless block and is a chain block by definition.
    pub fn from_header(header: &Header) -> Self {
        let parents = header.direct_parents().to_vec();
        let is_genesis = parents.is_empty();
        Self {
            hash: header.hash,
            parents,
            version: header.version,
            hash_merkle_root: header.hash_merkle_root,
            accepted_id_merkle_root: header.accepted_id_merkle_root,
            utxo_commitment: header.utxo_commitment,
            timestamp: header.timestamp,
            bits: header.bits,
            nonce: header.nonce,
            daa_score: header.daa_score,
            blue_work: header.blue_work,
            blue_score: header.blue_score,
            pruning_point: header.pruning_point,
            is_chain_block: is_genesis,
            accepting_block_hash: None,
            accepting_block_blue_score: None,
        }
    }
}

/// Store of replicated block records, their raw payloads and the inverse
/// accepted-blocks index. The persistent store is authoritative; the only
/// cached datum is block existence, which is safe to cache because
/// records are never deleted.
pub struct BlockStore {
    db: Arc<Database>,
    existence_cache: BoundedCache<Hash, ()>,
}

impl BlockStore {
    pub fn new(db: Arc<Database>, cache_size: usize) -> Self {
        Self { db, existence_cache: BoundedCache::new(cache_size) }
    }

    pub fn get(&self, hash: &Hash) -> DbResult<Option<BlockRecord>> {
        match self.db.get(CF_BLOCKS, hash.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn has(&self, hash: &Hash) -> DbResult<bool> {
        if matches!(self.existence_cache.get(hash), Some(Some(()))) {
            return Ok(true);
        }
        self.db.exists(CF_BLOCKS, hash.as_bytes())
    }

    /// Stages a record write; visible only after the batch commits
    pub fn stage(&self, batch: &mut WriteBatch, record: &BlockRecord) -> DbResult<()> {
        let serialized = bincode::serialize(record)?;
        self.db.batch_put(batch, CF_BLOCKS, record.hash.as_bytes(), &serialized)
    }

    /// Promotes a committed block into the existence cache. Must only be
    /// called after the staging batch was written.
    pub fn mark_known(&self, hash: Hash) {
        self.existence_cache.add(hash, Some(()));
    }

    pub fn stage_raw(&self, batch: &mut WriteBatch, hash: &Hash, raw: &[u8]) -> DbResult<()> {
        self.db.batch_put(batch, CF_RAW_BLOCKS, hash.as_bytes(), raw)
    }

    pub fn get_raw(&self, hash: &Hash) -> DbResult<Option<Vec<u8>>> {
        self.db.get(CF_RAW_BLOCKS, hash.as_bytes())
    }

    /// Inverse index: blocks whose acceptance is carried by `chain_block`
    pub fn stage_accepted_blocks(&self, batch: &mut WriteBatch, chain_block: &Hash, accepted: &[Hash]) -> DbResult<()> {
        let serialized = bincode::serialize(accepted)?;
        self.db.batch_put(batch, CF_ACCEPTED_BLOCKS, chain_block.as_bytes(), &serialized)
    }

    pub fn get_accepted_blocks(&self, chain_block: &Hash) -> DbResult<Vec<Hash>> {
        match self.db.get(CF_ACCEPTED_BLOCKS, chain_block.as_bytes())? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn delete_accepted_blocks(&self, batch: &mut WriteBatch, chain_block: &Hash) -> DbResult<()> {
        self.db.batch_delete(batch, CF_ACCEPTED_BLOCKS, chain_block.as_bytes())
    }

    /// The locally-known block with the highest blue score, if any.
    /// Full scan; used as the backfill cursor, not on hot paths.
    pub fn highest_blue_score_block(&self) -> DbResult<Option<(Hash, u64)>> {
        self.scan_highest(|_| true)
    }

    /// The chain block with the highest blue score, if any
    pub fn highest_chain_block(&self) -> DbResult<Option<(Hash, u64)>> {
        self.scan_highest(|record| record.is_chain_block)
    }

    fn scan_highest(&self, filter: impl Fn(&BlockRecord) -> bool) -> DbResult<Option<(Hash, u64)>> {
        let mut best: Option<(Hash, u64)> = None;
        for item in self.db.iterator(CF_BLOCKS, IteratorMode::Start)? {
            let (_, value) = item.map_err(crate::DbError::from)?;
            let record: BlockRecord = bincode::deserialize(&value)?;
            if filter(&record) && best.map_or(true, |(_, score)| record.blue_score > score) {
                best = Some((record.hash, record.blue_score));
            }
        }
        Ok(best)
    }
}
