use crate::db::{CF_ACCEPTED_TRANSACTIONS, CF_BLOCK_TRANSACTIONS, CF_TRANSACTIONS};
use crate::{Database, DbResult};
use consensus_core::subnets::SubnetworkId;
use consensus_core::tx::{Transaction, TransactionId};
use consensus_core::Hash;
use rocksdb::WriteBatch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Replicated view of one transaction. A transaction may be included by
/// many blocks but is accepted by at most one chain block at a time;
/// `accepting_block_hash == None` means currently unaccepted (possibly
/// reorganized out).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub hash: Hash,
    pub version: u16,
    pub lock_time: u64,
    pub subnetwork_id: SubnetworkId,
    pub gas: u64,
    pub payload: Vec<u8>,
    /// Outpoints spent by this transaction, in input order
    pub spent_outpoints: Vec<(TransactionId, u32)>,
    pub accepting_block_hash: Option<Hash>,
}

impl TransactionRecord {
    pub fn from_transaction(tx: &Transaction) -> Self {
        Self {
            id: tx.id(),
            hash: tx.hash(),
            version: tx.version,
            lock_time: tx.lock_time,
            subnetwork_id: tx.subnetwork_id,
            gas: tx.gas,
            payload: tx.payload.clone(),
            spent_outpoints: tx.inputs.iter().map(|input| (input.previous_outpoint.transaction_id, input.previous_outpoint.index)).collect(),
            accepting_block_hash: None,
        }
    }
}

/// Store of replicated transaction records, the ordered block inclusion
/// relation and the inverse accepted-transactions index
pub struct TransactionStore {
    db: Arc<Database>,
}

impl TransactionStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn get(&self, id: &TransactionId) -> DbResult<Option<TransactionRecord>> {
        match self.db.get(CF_TRANSACTIONS, id.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn has(&self, id: &TransactionId) -> DbResult<bool> {
        self.db.exists(CF_TRANSACTIONS, id.as_bytes())
    }

    pub fn stage(&self, batch: &mut WriteBatch, record: &TransactionRecord) -> DbResult<()> {
        let serialized = bincode::serialize(record)?;
        self.db.batch_put(batch, CF_TRANSACTIONS, record.id.as_bytes(), &serialized)
    }

    /// Records that `block` includes `tx_id` at position `index`
    pub fn stage_inclusion(&self, batch: &mut WriteBatch, block: &Hash, index: u32, tx_id: &TransactionId) -> DbResult<()> {
        self.db.batch_put(batch, CF_BLOCK_TRANSACTIONS, &inclusion_key(block, index), tx_id.as_bytes())
    }

    /// The ids of the transactions included by `block`, in in-block order
    pub fn get_block_transactions(&self, block: &Hash) -> DbResult<Vec<TransactionId>> {
        let hits = self.db.prefix_scan(CF_BLOCK_TRANSACTIONS, block.as_bytes())?;
        hits.iter().map(|(_, value)| TransactionId::try_from_slice(value).map_err(|_| crate::DbError::InvalidData("transaction id".into()))).collect()
    }

    /// Inverse index: transactions accepted by `chain_block`
    pub fn stage_accepted_transactions(&self, batch: &mut WriteBatch, chain_block: &Hash, accepted: &[TransactionId]) -> DbResult<()> {
        let serialized = bincode::serialize(accepted)?;
        self.db.batch_put(batch, CF_ACCEPTED_TRANSACTIONS, chain_block.as_bytes(), &serialized)
    }

    pub fn get_accepted_transactions(&self, chain_block: &Hash) -> DbResult<Vec<TransactionId>> {
        match self.db.get(CF_ACCEPTED_TRANSACTIONS, chain_block.as_bytes())? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn delete_accepted_transactions(&self, batch: &mut WriteBatch, chain_block: &Hash) -> DbResult<()> {
        self.db.batch_delete(batch, CF_ACCEPTED_TRANSACTIONS, chain_block.as_bytes())
    }
}

/// Inclusion keys sort by block then by big-endian index so a prefix scan
/// yields transactions in in-block order
fn inclusion_key(block: &Hash, index: u32) -> [u8; 36] {
    let mut key = [0u8; 36];
    key[0..32].copy_from_slice(block.as_bytes());
    key[32..36].copy_from_slice(&index.to_be_bytes());
    key
}
