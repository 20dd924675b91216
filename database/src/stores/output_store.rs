use crate::db::CF_TRANSACTION_OUTPUTS;
use crate::{Database, DbResult};
use consensus_core::tx::{ScriptPublicKey, TransactionId, TransactionOutput};
use rocksdb::WriteBatch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Replicated view of one transaction output. `is_spent` is true iff some
/// accepted transaction input references this outpoint; it flips only
/// through the acceptance state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub value: u64,
    pub script_public_key: ScriptPublicKey,
    pub is_spent: bool,
}

impl OutputRecord {
    pub fn from_output(output: &TransactionOutput) -> Self {
        Self { value: output.value, script_public_key: output.script_public_key.clone(), is_spent: false }
    }
}

/// Store of transaction outputs keyed by (owning transaction id, index)
pub struct OutputStore {
    db: Arc<Database>,
}

impl OutputStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn get(&self, tx_id: &TransactionId, index: u32) -> DbResult<Option<OutputRecord>> {
        match self.db.get(CF_TRANSACTION_OUTPUTS, &output_key(tx_id, index))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn stage(&self, batch: &mut WriteBatch, tx_id: &TransactionId, index: u32, record: &OutputRecord) -> DbResult<()> {
        let serialized = bincode::serialize(record)?;
        self.db.batch_put(batch, CF_TRANSACTION_OUTPUTS, &output_key(tx_id, index), &serialized)
    }
}

fn output_key(tx_id: &TransactionId, index: u32) -> [u8; 36] {
    let mut key = [0u8; 36];
    key[0..32].copy_from_slice(tx_id.as_bytes());
    key[32..36].copy_from_slice(&index.to_be_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_core::Hash;
    use tempfile::TempDir;

    #[test]
    fn outputs_start_unspent_and_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let db = Arc::new(Database::open(tmp.path()).unwrap());
        let store = OutputStore::new(db.clone());

        let tx_id = Hash::from_u64_word(1);
        let record = OutputRecord::from_output(&TransactionOutput::new(5000, ScriptPublicKey::new(0, vec![0xaa])));
        assert!(!record.is_spent);

        let mut batch = db.batch();
        store.stage(&mut batch, &tx_id, 0, &record).unwrap();
        db.write_batch(batch).unwrap();

        assert_eq!(store.get(&tx_id, 0).unwrap(), Some(record));
        assert_eq!(store.get(&tx_id, 1).unwrap(), None);
    }
}
