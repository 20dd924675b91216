//! The sync engine: backfills block and selected-parent-chain history,
//! then follows the node's live notifications. All store writes funnel
//! through this single task; readers elsewhere only ever observe
//! committed batches.

use crate::acceptance::AcceptanceEngine;
use crate::error::Result;
use crate::store::ReplicaStores;
use consensus_core::Hash;
use database::stores::{BlockRecord, OutputRecord, TransactionRecord};
use rpc_core::{ChainChangedNotification, RpcApi, RpcBlock};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

const FLAG_HISTORY_SYNCED: &str = "history_synced";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    FetchingHistory,
    LiveSyncing,
    Stopped,
}

/// Cloneable handle that stops the engine between notification batches.
/// In-flight atomic batches always run to commit; the engine never stops
/// mid-transaction.
#[derive(Clone)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.0.send(true);
    }
}

pub struct SyncEngine {
    rpc: Arc<dyn RpcApi>,
    stores: Arc<ReplicaStores>,
    acceptance: AcceptanceEngine,
    /// Chain deltas awaiting all of their referenced blocks, in arrival order
    pending_chain_changes: VecDeque<ChainChangedNotification>,
    state_tx: watch::Sender<SyncState>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl SyncEngine {
    pub fn new(rpc: Arc<dyn RpcApi>, stores: Arc<ReplicaStores>) -> Self {
        let (state_tx, _) = watch::channel(SyncState::FetchingHistory);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            rpc,
            acceptance: AcceptanceEngine::new(stores.clone()),
            stores,
            pending_chain_changes: VecDeque::new(),
            state_tx,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    pub fn state(&self) -> SyncState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state_tx.subscribe()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown_tx.clone())
    }

    /// Runs the engine to completion: historical backfill, then the live
    /// notification loop until shutdown. Transient RPC failures surface
    /// to the caller; no page or notification is silently skipped.
    pub async fn run(&mut self) -> Result<()> {
        // Subscribing before the backfill so that nothing published while
        // we page through history is lost; the live loop drains whatever
        // queued up meanwhile.
        let mut block_added = self.rpc.subscribe_block_added().await?;
        let mut chain_changed = self.rpc.subscribe_chain_changed().await?;

        self.set_state(SyncState::FetchingHistory);
        info!("syncing block history");
        self.sync_missing_blocks().await?;
        info!("syncing selected parent chain history");
        self.sync_chain_history().await?;
        self.stores.metadata.set_flag(FLAG_HISTORY_SYNCED, true)?;

        self.set_state(SyncState::LiveSyncing);
        info!("historical sync complete, entering live sync");

        let mut shutdown = self.shutdown_rx.clone();
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                _ = shutdown.changed() => {}
                maybe_block = block_added.recv() => match maybe_block {
                    Some(block) => {
                        trace!("block added notification: {}", block.hash());
                        self.add_block_and_missing_ancestors(block).await?;
                    }
                    None => {
                        warn!("block-added stream closed, stopping live sync");
                        break;
                    }
                },
                maybe_note = chain_changed.recv() => match maybe_note {
                    Some(note) => {
                        trace!(
                            "chain changed notification: {} removed, {} added",
                            note.removed_chain_block_hashes.len(),
                            note.added_chain_blocks.len()
                        );
                        self.pending_chain_changes.push_back(note);
                    }
                    None => {
                        warn!("chain-changed stream closed, stopping live sync");
                        break;
                    }
                },
            }
            self.apply_ready_chain_changes()?;
        }

        self.set_state(SyncState::Stopped);
        info!("sync engine stopped");
        Ok(())
    }

    fn set_state(&self, state: SyncState) {
        // send_replace updates the value even with no live subscribers
        self.state_tx.send_replace(state);
    }

    /// Pages historical blocks starting from the highest-blue-score block
    /// known locally until the node returns a page with nothing new
    async fn sync_missing_blocks(&mut self) -> Result<()> {
        loop {
            let low_hash = self.stores.blocks.highest_blue_score_block()?.map(|(hash, _)| hash);
            let page = self.rpc.get_blocks(low_hash, true, true).await?;
            if page.blocks.is_empty() {
                break;
            }
            let mut any_new = false;
            for block in page.blocks {
                any_new |= self.add_block_and_missing_ancestors(block).await?;
            }
            // A page consisting solely of already-known blocks means the
            // cursor cannot advance; we are caught up
            if !any_new {
                break;
            }
        }
        Ok(())
    }

    /// Pages the selected-parent-chain delta from the highest-blue-score
    /// chain block known locally and applies it, healing any referenced
    /// block the node has not pushed to us yet
    async fn sync_chain_history(&mut self) -> Result<()> {
        loop {
            let low_hash = self.stores.blocks.highest_chain_block()?.map(|(hash, _)| hash);
            let response = self.rpc.get_chain_from_block(low_hash, false).await?;
            if response.removed_chain_block_hashes.is_empty() && response.added_chain_blocks.is_empty() {
                break;
            }
            let note = ChainChangedNotification {
                removed_chain_block_hashes: response.removed_chain_block_hashes,
                added_chain_blocks: response.added_chain_blocks,
            };
            self.heal_missing_references(&note).await?;
            self.apply_chain_change(&note)?;
        }
        Ok(())
    }

    /// Fetches and materializes every block a chain delta references but
    /// the local store does not know yet
    async fn heal_missing_references(&mut self, note: &ChainChangedNotification) -> Result<()> {
        let referenced: Vec<Hash> = note.referenced_hashes().collect();
        for hash in referenced {
            if !self.stores.blocks.has(&hash)? {
                debug!("fetching chain-referenced block {hash}");
                let block = self.rpc.get_block(hash, true).await?;
                self.add_block_and_missing_ancestors(block).await?;
            }
        }
        Ok(())
    }

    /// Applies, in arrival order, every pending chain delta whose
    /// referenced blocks are all known locally; the rest stay queued for
    /// the next pass. Deltas are deferred, never skipped or reordered.
    fn apply_ready_chain_changes(&mut self) -> Result<()> {
        let mut retained = VecDeque::with_capacity(self.pending_chain_changes.len());
        while let Some(note) = self.pending_chain_changes.pop_front() {
            if self.is_ready(&note)? {
                self.apply_chain_change(&note)?;
            } else {
                trace!("deferring chain delta referencing unknown blocks");
                retained.push_back(note);
            }
        }
        self.pending_chain_changes = retained;
        Ok(())
    }

    /// A chain delta is applicable once every hash it mentions (removed,
    /// added and nested accepted blocks) exists locally
    fn is_ready(&self, note: &ChainChangedNotification) -> Result<bool> {
        for hash in note.referenced_hashes() {
            if !self.stores.blocks.has(&hash)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Applies one chain delta: removals first (deepest reorg point
    /// outward), then additions, each inside its own atomic batch
    fn apply_chain_change(&self, note: &ChainChangedNotification) -> Result<()> {
        if !note.removed_chain_block_hashes.is_empty() {
            info!("chain reorganization: {} blocks leave the selected chain", note.removed_chain_block_hashes.len());
        }
        for removed in &note.removed_chain_block_hashes {
            self.acceptance.unaccept_block(removed)?;
        }
        for added in &note.added_chain_blocks {
            self.acceptance.accept_block(added)?;
        }
        Ok(())
    }

    /// Materializes a block after first materializing any locally-unknown
    /// ancestors, depth first, so parents always land before children.
    /// Returns whether the requested block was newly inserted.
    pub async fn add_block_and_missing_ancestors(&self, block: RpcBlock) -> Result<bool> {
        let target = block.hash();
        let mut scheduled: HashSet<Hash> = HashSet::from([target]);
        let mut stack: Vec<RpcBlock> = vec![block];
        let mut target_was_new = false;

        while let Some(current) = stack.last() {
            let current_hash = current.hash();
            let parents: Vec<Hash> = current.block.header.direct_parents().to_vec();

            let mut missing = Vec::new();
            for parent in parents {
                // A scheduled parent sits above us on the stack and will
                // be materialized before we are popped again
                if !scheduled.contains(&parent) && !self.stores.blocks.has(&parent)? {
                    missing.push(parent);
                }
            }

            if missing.is_empty() {
                let current = stack.pop().expect("stack is non-empty");
                let inserted = self.materialize_block(&current)?;
                if current_hash == target {
                    target_was_new = inserted;
                }
            } else {
                for parent_hash in missing {
                    debug!("healing ancestor gap: fetching {parent_hash} for {current_hash}");
                    let parent = self.rpc.get_block(parent_hash, true).await?;
                    if parent.hash() != parent_hash {
                        return Err(crate::error::IndexerError::InconsistentState(format!(
                            "node returned block {} for requested hash {parent_hash}",
                            parent.hash()
                        )));
                    }
                    scheduled.insert(parent_hash);
                    stack.push(parent);
                }
            }
        }

        Ok(target_was_new)
    }

    /// Inserts a block record, its raw payload and every contained
    /// transaction/output in one atomic batch. A no-op for blocks that
    /// already exist. Genesis (no parents) enters as a chain block.
    fn materialize_block(&self, rpc_block: &RpcBlock) -> Result<bool> {
        let hash = rpc_block.hash();
        if self.stores.blocks.has(&hash)? {
            trace!("block {hash} already materialized");
            return Ok(false);
        }

        let record = BlockRecord::from_header(&rpc_block.block.header);
        let mut batch = self.stores.db.batch();
        self.stores.blocks.stage(&mut batch, &record)?;
        if !rpc_block.raw.is_empty() {
            self.stores.blocks.stage_raw(&mut batch, &hash, &rpc_block.raw)?;
        }

        for (index, tx) in rpc_block.block.transactions.iter().enumerate() {
            let tx_record = TransactionRecord::from_transaction(tx);
            // A transaction included by several blocks keeps its first
            // record (and any acceptance state it already carries)
            if !self.stores.transactions.has(&tx_record.id)? {
                self.stores.transactions.stage(&mut batch, &tx_record)?;
                for (out_index, output) in tx.outputs.iter().enumerate() {
                    self.stores.outputs.stage(&mut batch, &tx_record.id, out_index as u32, &OutputRecord::from_output(output))?;
                }
            }
            self.stores.transactions.stage_inclusion(&mut batch, &hash, index as u32, &tx_record.id)?;
        }

        self.stores.db.write_batch(batch)?;
        self.stores.blocks.mark_known(hash);
        debug!("materialized block {hash} ({} transactions)", rpc_block.block.transactions.len());
        Ok(true)
    }
}
