//! RPC data models and types

use consensus_core::{block::Block, tx::TransactionId, Hash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// RPC error type
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum RpcError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },
}

/// Node-side data about a block that is not derivable from the block
/// itself
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlockVerboseData {
    pub is_chain_block: bool,
}

/// A block as delivered by the node: parsed form, opaque raw payload and
/// verbose consensus data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    pub block: Block,
    /// Serialized block bytes exactly as the node shipped them
    pub raw: Vec<u8>,
    pub verbose: RpcBlockVerboseData,
}

impl RpcBlock {
    pub fn hash(&self) -> Hash {
        self.block.header.hash
    }
}

/// One page of historical blocks; an empty page terminates paging
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBlocksResponse {
    pub blocks: Vec<RpcBlock>,
}

/// A block newly admitted to the selected parent chain, together with the
/// blocks (and their transactions) whose acceptance it carries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedChainBlock {
    pub hash: Hash,
    pub accepted_blocks: Vec<AcceptedBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedBlock {
    pub hash: Hash,
    pub accepted_transaction_ids: Vec<TransactionId>,
}

/// A selected-parent-chain delta: blocks that left the chain and blocks
/// that joined it, each in application order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainChangedNotification {
    pub removed_chain_block_hashes: Vec<Hash>,
    pub added_chain_blocks: Vec<AddedChainBlock>,
}

impl ChainChangedNotification {
    /// Every block hash this notification refers to: removed hashes,
    /// added hashes and the accepted blocks nested inside
    pub fn referenced_hashes(&self) -> impl Iterator<Item = Hash> + '_ {
        self.removed_chain_block_hashes.iter().copied().chain(self.added_chain_blocks.iter().flat_map(|added| {
            std::iter::once(added.hash).chain(added.accepted_blocks.iter().map(|accepted| accepted.hash))
        }))
    }
}

/// Response of `get_chain_from_block`; `blocks` is populated only when
/// the caller asked for the chain blocks themselves
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetChainFromBlockResponse {
    pub removed_chain_block_hashes: Vec<Hash>,
    pub added_chain_blocks: Vec<AddedChainBlock>,
    pub blocks: Vec<RpcBlock>,
}
