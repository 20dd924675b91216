use serde::{Deserialize, Serialize};

use crate::{
    constants::BLOCK_VERSION, errors::ConsensusError, header::Header, merkle::calc_hash_merkle_root, tx::Transaction,
};

/// Complete block structure including header and transactions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        Self { header, transactions }
    }

    pub fn hash(&self) -> crate::Hash {
        self.header.hash
    }

    /// Validates the block's structural rules. Proof-of-work and contextual
    /// rules are checked by the owning node; this only covers what is
    /// derivable from the block alone.
    pub fn validate_structure(&self) -> Result<(), ConsensusError> {
        if self.header.version != BLOCK_VERSION {
            return Err(ConsensusError::InvalidBlockVersion);
        }

        if self.transactions.is_empty() {
            return Err(ConsensusError::EmptyTransactionList);
        }

        // Exactly one coinbase, and it must come first
        if !self.transactions[0].is_coinbase() || self.transactions[1..].iter().any(|tx| tx.is_coinbase()) {
            return Err(ConsensusError::InvalidCoinbaseTransaction);
        }

        if calc_hash_merkle_root(self.transactions.iter()) != self.header.hash_merkle_root {
            return Err(ConsensusError::InvalidMerkleRoot);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subnets::SUBNETWORK_ID_COINBASE;
    use crate::{BlueWorkType, Hash, ZERO_HASH};

    fn build_block() -> Block {
        let coinbase = Transaction::new(0, Vec::new(), Vec::new(), 0, SUBNETWORK_ID_COINBASE, 0, vec![7]);
        let merkle_root = calc_hash_merkle_root([coinbase.clone()].iter());
        let header = Header::new_finalized(
            BLOCK_VERSION,
            vec![vec![Hash::from_u64_word(1)]],
            merkle_root,
            ZERO_HASH,
            ZERO_HASH,
            1699545600000,
            0x1f00ffff,
            0,
            0,
            BlueWorkType::from(0u64),
            0,
            ZERO_HASH,
        );
        Block::new(header, vec![coinbase])
    }

    #[test]
    fn structurally_valid_block() {
        assert!(build_block().validate_structure().is_ok());
    }

    #[test]
    fn rejects_missing_coinbase() {
        let mut block = build_block();
        block.transactions.clear();
        assert!(matches!(block.validate_structure(), Err(ConsensusError::EmptyTransactionList)));
    }

    #[test]
    fn rejects_wrong_merkle_root() {
        let mut block = build_block();
        block.header.hash_merkle_root = ZERO_HASH;
        assert!(matches!(block.validate_structure(), Err(ConsensusError::InvalidMerkleRoot)));
    }
}
