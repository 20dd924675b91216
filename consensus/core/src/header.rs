use serde::{Deserialize, Serialize};

use crate::{hashing, BlueWorkType, Hash};

/// A block header. The `hash` field is a cache of the header hash and is
/// kept in sync by the constructors and [`Header::finalize`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub hash: Hash,
    pub version: u16,
    /// Parent hashes per proof-of-work level. Level zero holds the direct
    /// DAG parents; genesis is the only block where all levels are empty.
    pub parents_by_level: Vec<Vec<Hash>>,
    pub hash_merkle_root: Hash,
    pub accepted_id_merkle_root: Hash,
    pub utxo_commitment: Hash,
    /// Timestamp in milliseconds
    pub timestamp: u64,
    /// Compact difficulty target
    pub bits: u32,
    pub nonce: u64,
    pub daa_score: u64,
    pub blue_work: BlueWorkType,
    pub blue_score: u64,
    pub pruning_point: Hash,
}

impl Header {
    #[allow(clippy::too_many_arguments)]
    pub fn new_finalized(
        version: u16,
        parents_by_level: Vec<Vec<Hash>>,
        hash_merkle_root: Hash,
        accepted_id_merkle_root: Hash,
        utxo_commitment: Hash,
        timestamp: u64,
        bits: u32,
        nonce: u64,
        daa_score: u64,
        blue_work: BlueWorkType,
        blue_score: u64,
        pruning_point: Hash,
    ) -> Self {
        let mut header = Self {
            hash: Default::default(),
            version,
            parents_by_level,
            hash_merkle_root,
            accepted_id_merkle_root,
            utxo_commitment,
            timestamp,
            bits,
            nonce,
            daa_score,
            blue_work,
            blue_score,
            pruning_point,
        };
        header.finalize();
        header
    }

    /// Recomputes the cached hash. Must be called after mutating any
    /// hashed field (e.g. after the solver commits a winning nonce).
    pub fn finalize(&mut self) {
        self.hash = hashing::header::calculate_hash(self);
    }

    /// The block's direct DAG parents (level-zero parents)
    pub fn direct_parents(&self) -> &[Hash] {
        if self.parents_by_level.is_empty() {
            &[]
        } else {
            &self.parents_by_level[0]
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.direct_parents().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ZERO_HASH;

    fn build_header(nonce: u64) -> Header {
        Header::new_finalized(
            1,
            vec![vec![Hash::from_u64_word(1)]],
            ZERO_HASH,
            ZERO_HASH,
            ZERO_HASH,
            1699545600000,
            0x1f00ffff,
            nonce,
            0,
            BlueWorkType::from(0u64),
            0,
            ZERO_HASH,
        )
    }

    #[test]
    fn hash_commits_to_nonce() {
        let a = build_header(0);
        let b = build_header(1);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn finalize_refreshes_cached_hash() {
        let mut header = build_header(0);
        let original = header.hash;
        header.nonce = 42;
        header.finalize();
        assert_ne!(header.hash, original);
        assert_eq!(header.hash, build_header(42).hash);
    }

    #[test]
    fn genesis_has_no_direct_parents() {
        let mut header = build_header(0);
        header.parents_by_level = Vec::new();
        header.finalize();
        assert!(header.is_genesis());
        assert!(header.direct_parents().is_empty());
    }
}
