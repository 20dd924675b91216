use vanta_hashes::hashers::{BlockHash, HasherBase};

use crate::header::Header;
use crate::Hash;

/// Computes the hash of a block header
pub fn calculate_hash(header: &Header) -> Hash {
    hash_override_nonce_time(header, header.nonce, header.timestamp)
}

/// Computes the header hash while overriding the nonce and timestamp
/// fields. PoW routines use this with both overrides zeroed to obtain the
/// pre-pow hash.
pub fn hash_override_nonce_time(header: &Header, nonce: u64, timestamp: u64) -> Hash {
    let mut hasher = BlockHash::new();
    hasher.update(header.version.to_le_bytes());

    // Parents are length-prefixed per level so that shifting a hash across
    // level boundaries can never produce a colliding serialization.
    hasher.update((header.parents_by_level.len() as u64).to_le_bytes());
    for parent_level in &header.parents_by_level {
        hasher.update((parent_level.len() as u64).to_le_bytes());
        for parent in parent_level {
            hasher.update(parent.as_bytes());
        }
    }

    hasher.update(header.hash_merkle_root.as_bytes());
    hasher.update(header.accepted_id_merkle_root.as_bytes());
    hasher.update(header.utxo_commitment.as_bytes());
    hasher.update(timestamp.to_le_bytes());
    hasher.update(header.bits.to_le_bytes());
    hasher.update(nonce.to_le_bytes());
    hasher.update(header.daa_score.to_le_bytes());
    hasher.update(header.blue_score.to_le_bytes());
    hasher.update(header.blue_work.to_le_bytes());
    hasher.update(header.pruning_point.as_bytes());

    hasher.finalize()
}
