//! The chain acceptance state machine: applies and reverts selected
//! parent chain membership against the replicated block, transaction and
//! output records. Every operation stages all of its writes into one
//! batch and commits only after the last invariant check passed, so a
//! violation leaves the store untouched.

use crate::error::{IndexerError, Result};
use crate::store::ReplicaStores;
use consensus_core::tx::TransactionId;
use consensus_core::Hash;
use rpc_core::AddedChainBlock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

pub struct AcceptanceEngine {
    stores: Arc<ReplicaStores>,
}

impl AcceptanceEngine {
    pub fn new(stores: Arc<ReplicaStores>) -> Self {
        Self { stores }
    }

    /// Reverts a block that left the selected parent chain: unspends the
    /// outputs consumed by its accepted transactions, clears every
    /// acceptance reference pointing at it and drops its chain flag.
    pub fn unaccept_block(&self, hash: &Hash) -> Result<()> {
        let mut record = self
            .stores
            .blocks
            .get(hash)?
            .ok_or_else(|| IndexerError::InconsistentState(format!("removed chain block {hash} is unknown")))?;
        if !record.is_chain_block {
            return Err(IndexerError::InconsistentState(format!("removed block {hash} is not a chain block")));
        }

        let mut batch = self.stores.db.batch();
        // Outpoints already flipped within this operation; later checks
        // must see staged state, not just the committed one
        let mut unspent: HashSet<(TransactionId, u32)> = HashSet::new();

        for tx_id in self.stores.transactions.get_accepted_transactions(hash)? {
            let mut tx = self
                .stores
                .transactions
                .get(&tx_id)?
                .ok_or_else(|| IndexerError::InconsistentState(format!("accepted transaction {tx_id} is unknown")))?;

            for &(prev_id, prev_index) in &tx.spent_outpoints {
                let mut output = self.stores.outputs.get(&prev_id, prev_index)?.ok_or_else(|| {
                    IndexerError::InconsistentState(format!("spent outpoint ({prev_id}, {prev_index}) is unknown"))
                })?;
                if !output.is_spent || unspent.contains(&(prev_id, prev_index)) {
                    return Err(IndexerError::InconsistentState(format!(
                        "outpoint ({prev_id}, {prev_index}) is not spent while unaccepting {hash}"
                    )));
                }
                output.is_spent = false;
                unspent.insert((prev_id, prev_index));
                self.stores.outputs.stage(&mut batch, &prev_id, prev_index, &output)?;
            }

            tx.accepting_block_hash = None;
            self.stores.transactions.stage(&mut batch, &tx)?;
        }

        for accepted_hash in self.stores.blocks.get_accepted_blocks(hash)? {
            if accepted_hash == *hash {
                // A chain block usually carries its own acceptance
                record.accepting_block_hash = None;
                record.accepting_block_blue_score = None;
            } else {
                let mut accepted = self.stores.blocks.get(&accepted_hash)?.ok_or_else(|| {
                    IndexerError::InconsistentState(format!("accepted block {accepted_hash} is unknown"))
                })?;
                accepted.accepting_block_hash = None;
                accepted.accepting_block_blue_score = None;
                self.stores.blocks.stage(&mut batch, &accepted)?;
            }
        }

        record.is_chain_block = false;
        self.stores.blocks.stage(&mut batch, &record)?;
        self.stores.transactions.delete_accepted_transactions(&mut batch, hash)?;
        self.stores.blocks.delete_accepted_blocks(&mut batch, hash)?;

        self.stores.db.write_batch(batch)?;
        debug!("unaccepted chain block {hash}");
        Ok(())
    }

    /// Applies a block newly admitted to the selected parent chain: marks
    /// the outputs consumed by the accepted transactions spent, wires the
    /// acceptance references and raises the chain flag.
    pub fn accept_block(&self, added: &AddedChainBlock) -> Result<()> {
        let mut record = self
            .stores
            .blocks
            .get(&added.hash)?
            .ok_or_else(|| IndexerError::InconsistentState(format!("added chain block {} is unknown", added.hash)))?;
        if record.is_chain_block {
            return Err(IndexerError::InconsistentState(format!("added block {} is already a chain block", added.hash)));
        }

        let mut batch = self.stores.db.batch();
        let mut spent: HashSet<(TransactionId, u32)> = HashSet::new();
        let mut accepted_tx_ids: Vec<TransactionId> = Vec::new();

        for accepted in &added.accepted_blocks {
            if accepted.hash == added.hash {
                record.accepting_block_hash = Some(added.hash);
                record.accepting_block_blue_score = Some(record.blue_score);
            } else {
                let mut nested = self.stores.blocks.get(&accepted.hash)?.ok_or_else(|| {
                    IndexerError::InconsistentState(format!("accepted block {} is unknown", accepted.hash))
                })?;
                nested.accepting_block_hash = Some(added.hash);
                nested.accepting_block_blue_score = Some(record.blue_score);
                self.stores.blocks.stage(&mut batch, &nested)?;
            }

            for tx_id in &accepted.accepted_transaction_ids {
                let mut tx = self
                    .stores
                    .transactions
                    .get(tx_id)?
                    .ok_or_else(|| IndexerError::InconsistentState(format!("accepted transaction {tx_id} is unknown")))?;

                for &(prev_id, prev_index) in &tx.spent_outpoints {
                    let mut output = self.stores.outputs.get(&prev_id, prev_index)?.ok_or_else(|| {
                        IndexerError::InconsistentState(format!("spent outpoint ({prev_id}, {prev_index}) is unknown"))
                    })?;
                    if output.is_spent || spent.contains(&(prev_id, prev_index)) {
                        return Err(IndexerError::InconsistentState(format!(
                            "outpoint ({prev_id}, {prev_index}) is already spent while accepting {}",
                            added.hash
                        )));
                    }
                    output.is_spent = true;
                    spent.insert((prev_id, prev_index));
                    self.stores.outputs.stage(&mut batch, &prev_id, prev_index, &output)?;
                }

                tx.accepting_block_hash = Some(accepted.hash);
                self.stores.transactions.stage(&mut batch, &tx)?;
                accepted_tx_ids.push(*tx_id);
            }
        }

        record.is_chain_block = true;
        self.stores.blocks.stage(&mut batch, &record)?;
        self.stores.transactions.stage_accepted_transactions(&mut batch, &added.hash, &accepted_tx_ids)?;
        let accepted_hashes: Vec<Hash> = added.accepted_blocks.iter().map(|accepted| accepted.hash).collect();
        self.stores.blocks.stage_accepted_blocks(&mut batch, &added.hash, &accepted_hashes)?;

        self.stores.db.write_batch(batch)?;
        debug!("accepted chain block {} carrying {} transactions", added.hash, accepted_tx_ids.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use consensus_core::header::Header;
    use consensus_core::subnets::{SUBNETWORK_ID_COINBASE, SUBNETWORK_ID_NATIVE};
    use consensus_core::tx::{ScriptPublicKey, Transaction, TransactionInput, TransactionOutpoint, TransactionOutput};
    use consensus_core::{BlueWorkType, ZERO_HASH};
    use database::stores::{BlockRecord, OutputRecord, TransactionRecord};
    use database::Database;
    use rpc_core::AcceptedBlock;
    use tempfile::TempDir;

    fn open_stores() -> (TempDir, Arc<ReplicaStores>) {
        let tmp = TempDir::new().unwrap();
        let db = Arc::new(Database::open(tmp.path()).unwrap());
        let stores = ReplicaStores::new(db, &Config::default());
        (tmp, stores)
    }

    fn header(word: u64, parents: Vec<Hash>, blue_score: u64) -> Header {
        let mut header = Header::new_finalized(
            1,
            if parents.is_empty() { Vec::new() } else { vec![parents] },
            ZERO_HASH,
            ZERO_HASH,
            ZERO_HASH,
            1000 + word,
            0x1f00ffff,
            word,
            blue_score,
            BlueWorkType::from(word),
            blue_score,
            ZERO_HASH,
        );
        header.hash = Hash::from_u64_word(word);
        header
    }

    fn coinbase_tx(word: u64) -> Transaction {
        Transaction::new(0, Vec::new(), vec![TransactionOutput::new(5000, ScriptPublicKey::new(0, vec![word as u8]))], 0, SUBNETWORK_ID_COINBASE, 0, word.to_le_bytes().to_vec())
    }

    fn spending_tx(prev: TransactionId, prev_index: u32) -> Transaction {
        Transaction::new(
            0,
            vec![TransactionInput::new(TransactionOutpoint::new(prev, prev_index), vec![1], u64::MAX, 1)],
            vec![TransactionOutput::new(4000, ScriptPublicKey::new(0, vec![0xbb]))],
            0,
            SUBNETWORK_ID_NATIVE,
            0,
            vec![],
        )
    }

    /// Installs a block record plus its transactions/outputs as
    /// materialization would
    fn install_block(stores: &ReplicaStores, header: &Header, txs: &[Transaction]) {
        let mut batch = stores.db.batch();
        let record = BlockRecord::from_header(header);
        stores.blocks.stage(&mut batch, &record).unwrap();
        for (index, tx) in txs.iter().enumerate() {
            let tx_record = TransactionRecord::from_transaction(tx);
            if !stores.transactions.has(&tx_record.id).unwrap() {
                stores.transactions.stage(&mut batch, &tx_record).unwrap();
                for (out_index, output) in tx.outputs.iter().enumerate() {
                    stores.outputs.stage(&mut batch, &tx_record.id, out_index as u32, &OutputRecord::from_output(output)).unwrap();
                }
            }
            stores.transactions.stage_inclusion(&mut batch, &header.hash, index as u32, &tx_record.id).unwrap();
        }
        stores.db.write_batch(batch).unwrap();
        stores.blocks.mark_known(header.hash);
    }

    fn self_accepting(hash: Hash, tx_ids: Vec<TransactionId>) -> AddedChainBlock {
        AddedChainBlock { hash, accepted_blocks: vec![AcceptedBlock { hash, accepted_transaction_ids: tx_ids }] }
    }

    #[test]
    fn accept_marks_chain_membership_and_acceptance() {
        let (_tmp, stores) = open_stores();
        let engine = AcceptanceEngine::new(stores.clone());

        let genesis = header(1, Vec::new(), 0);
        install_block(&stores, &genesis, &[coinbase_tx(1)]);

        let b_coinbase = coinbase_tx(2);
        let b = header(2, vec![genesis.hash], 1);
        install_block(&stores, &b, &[b_coinbase.clone()]);

        assert!(!stores.blocks.get(&b.hash).unwrap().unwrap().is_chain_block);
        engine.accept_block(&self_accepting(b.hash, vec![b_coinbase.id()])).unwrap();

        let record = stores.blocks.get(&b.hash).unwrap().unwrap();
        assert!(record.is_chain_block);
        assert_eq!(record.accepting_block_hash, Some(b.hash));
        assert_eq!(record.accepting_block_blue_score, Some(1));

        let tx = stores.transactions.get(&b_coinbase.id()).unwrap().unwrap();
        assert_eq!(tx.accepting_block_hash, Some(b.hash));
        // Coinbase spends nothing, so its own output stays unspent
        assert!(!stores.outputs.get(&b_coinbase.id(), 0).unwrap().unwrap().is_spent);
    }

    #[test]
    fn accept_spends_previous_outputs_and_unaccept_reverts() {
        let (_tmp, stores) = open_stores();
        let engine = AcceptanceEngine::new(stores.clone());

        let genesis = header(1, Vec::new(), 0);
        let genesis_coinbase = coinbase_tx(1);
        install_block(&stores, &genesis, &[genesis_coinbase.clone()]);

        let spender = spending_tx(genesis_coinbase.id(), 0);
        let b_coinbase = coinbase_tx(2);
        let b = header(2, vec![genesis.hash], 1);
        install_block(&stores, &b, &[b_coinbase.clone(), spender.clone()]);

        engine.accept_block(&self_accepting(b.hash, vec![b_coinbase.id(), spender.id()])).unwrap();
        assert!(stores.outputs.get(&genesis_coinbase.id(), 0).unwrap().unwrap().is_spent);

        engine.unaccept_block(&b.hash).unwrap();
        let record = stores.blocks.get(&b.hash).unwrap().unwrap();
        assert!(!record.is_chain_block);
        assert_eq!(record.accepting_block_hash, None);
        assert!(!stores.outputs.get(&genesis_coinbase.id(), 0).unwrap().unwrap().is_spent);
        assert_eq!(stores.transactions.get(&spender.id()).unwrap().unwrap().accepting_block_hash, None);
        assert!(stores.transactions.get_accepted_transactions(&b.hash).unwrap().is_empty());
    }

    #[test]
    fn unaccept_of_non_chain_block_fails_and_changes_nothing() {
        let (_tmp, stores) = open_stores();
        let engine = AcceptanceEngine::new(stores.clone());

        let genesis = header(1, Vec::new(), 0);
        install_block(&stores, &genesis, &[coinbase_tx(1)]);
        let b_coinbase = coinbase_tx(2);
        let b = header(2, vec![genesis.hash], 1);
        install_block(&stores, &b, &[b_coinbase.clone()]);

        let before_block = stores.blocks.get(&b.hash).unwrap().unwrap();
        let before_tx = stores.transactions.get(&b_coinbase.id()).unwrap().unwrap();
        let before_output = stores.outputs.get(&b_coinbase.id(), 0).unwrap().unwrap();

        let err = engine.unaccept_block(&b.hash).unwrap_err();
        assert!(matches!(err, IndexerError::InconsistentState(_)));

        assert_eq!(stores.blocks.get(&b.hash).unwrap().unwrap(), before_block);
        assert_eq!(stores.transactions.get(&b_coinbase.id()).unwrap().unwrap(), before_tx);
        assert_eq!(stores.outputs.get(&b_coinbase.id(), 0).unwrap().unwrap(), before_output);
    }

    #[test]
    fn double_accept_fails() {
        let (_tmp, stores) = open_stores();
        let engine = AcceptanceEngine::new(stores.clone());

        let genesis = header(1, Vec::new(), 0);
        install_block(&stores, &genesis, &[coinbase_tx(1)]);
        let b_coinbase = coinbase_tx(2);
        let b = header(2, vec![genesis.hash], 1);
        install_block(&stores, &b, &[b_coinbase.clone()]);

        let added = self_accepting(b.hash, vec![b_coinbase.id()]);
        engine.accept_block(&added).unwrap();
        assert!(matches!(engine.accept_block(&added), Err(IndexerError::InconsistentState(_))));
    }

    #[test]
    fn double_spend_in_one_event_rolls_back_entirely() {
        let (_tmp, stores) = open_stores();
        let engine = AcceptanceEngine::new(stores.clone());

        let genesis = header(1, Vec::new(), 0);
        let genesis_coinbase = coinbase_tx(1);
        install_block(&stores, &genesis, &[genesis_coinbase.clone()]);

        // Two transactions spending the same outpoint inside one event
        let spender_a = spending_tx(genesis_coinbase.id(), 0);
        let mut spender_b = spending_tx(genesis_coinbase.id(), 0);
        spender_b.lock_time = 1; // distinct id
        let b_coinbase = coinbase_tx(2);
        let b = header(2, vec![genesis.hash], 1);
        install_block(&stores, &b, &[b_coinbase.clone(), spender_a.clone(), spender_b.clone()]);

        let added = self_accepting(b.hash, vec![b_coinbase.id(), spender_a.id(), spender_b.id()]);
        assert!(matches!(engine.accept_block(&added), Err(IndexerError::InconsistentState(_))));

        // Nothing was committed, including the first (valid) spend
        assert!(!stores.outputs.get(&genesis_coinbase.id(), 0).unwrap().unwrap().is_spent);
        assert!(!stores.blocks.get(&b.hash).unwrap().unwrap().is_chain_block);
        assert_eq!(stores.transactions.get(&spender_a.id()).unwrap().unwrap().accepting_block_hash, None);
    }
}
