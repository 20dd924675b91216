use crate::block::Block;
use crate::constants::{BLOCK_VERSION, INITIAL_BLOCK_REWARD, UNITS_PER_COIN};
use crate::header::Header;
use crate::merkle::calc_hash_merkle_root;
use crate::subnets::SUBNETWORK_ID_COINBASE;
use crate::tx::{ScriptPublicKey, Transaction, TransactionOutput};
use crate::{Hash, ZERO_HASH};

/// The constants uniquely representing the genesis block
#[derive(Clone, Debug)]
pub struct GenesisBlock {
    pub hash: Hash,
    pub version: u16,
    pub hash_merkle_root: Hash,
    pub utxo_commitment: Hash,
    pub timestamp: u64,
    pub bits: u32,
    pub nonce: u64,
    pub daa_score: u64,
    pub coinbase_payload: &'static [u8],
}

impl GenesisBlock {
    pub fn build_genesis_transactions(&self) -> Vec<Transaction> {
        let reward = INITIAL_BLOCK_REWARD * UNITS_PER_COIN;
        let output = TransactionOutput::new(reward, ScriptPublicKey::new(0, Vec::new()));
        vec![Transaction::new(0, Vec::new(), vec![output], 0, SUBNETWORK_ID_COINBASE, 0, self.coinbase_payload.to_vec())]
    }
}

impl From<&GenesisBlock> for Header {
    fn from(genesis: &GenesisBlock) -> Self {
        Header::new_finalized(
            genesis.version,
            Vec::new(),
            genesis.hash_merkle_root,
            ZERO_HASH,
            genesis.utxo_commitment,
            genesis.timestamp,
            genesis.bits,
            genesis.nonce,
            genesis.daa_score,
            0u64.into(),
            0,
            ZERO_HASH,
        )
    }
}

impl From<&GenesisBlock> for Block {
    fn from(genesis: &GenesisBlock) -> Self {
        Block::new(genesis.into(), genesis.build_genesis_transactions())
    }
}

/// Deterministic development genesis. Network deployments pin their own
/// canonical values.
pub fn default_genesis() -> GenesisBlock {
    static COINBASE_PAYLOAD: &[u8] = b"Vanta deterministic genesis";

    let mut genesis = GenesisBlock {
        hash: ZERO_HASH,
        version: BLOCK_VERSION,
        hash_merkle_root: ZERO_HASH,
        utxo_commitment: ZERO_HASH,
        timestamp: 1704067200000,
        bits: 0x207fffff,
        nonce: 0,
        daa_score: 0,
        coinbase_payload: COINBASE_PAYLOAD,
    };
    genesis.hash_merkle_root = calc_hash_merkle_root(genesis.build_genesis_transactions().iter());
    let header: Header = (&genesis).into();
    genesis.hash = header.hash;
    genesis
}
