//! RPC API trait definitions

use async_trait::async_trait;
use consensus_core::Hash;
use tokio::sync::mpsc;

use crate::model::*;

/// Client-side view of the node RPC surface consumed by this core. The
/// concrete transport (wire framing, reconnect policy) lives elsewhere;
/// implementations only have to honor these contracts:
///
/// - `get_blocks` pages blocks with a blue score not below `start_hash`'s
///   and returns an empty page once the caller has caught up;
/// - `get_chain_from_block` returns the selected-parent-chain delta from
///   `start_hash` to the current tip;
/// - the subscription methods hand out bounded receivers that the
///   transport's notification pump feeds in arrival order.
#[async_trait]
pub trait RpcApi: Send + Sync {
    async fn get_block(&self, hash: Hash, include_transactions: bool) -> Result<RpcBlock, RpcError>;

    async fn get_blocks(&self, start_hash: Option<Hash>, include_raw: bool, include_verbose: bool)
        -> Result<GetBlocksResponse, RpcError>;

    async fn get_chain_from_block(&self, start_hash: Option<Hash>, include_blocks: bool)
        -> Result<GetChainFromBlockResponse, RpcError>;

    async fn subscribe_block_added(&self) -> Result<mpsc::Receiver<RpcBlock>, RpcError>;

    async fn subscribe_chain_changed(&self) -> Result<mpsc::Receiver<ChainChangedNotification>, RpcError>;
}
