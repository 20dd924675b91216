use vanta_hashes::hashers::{HasherBase, MerkleBranchHash};

use crate::tx::Transaction;
use crate::{Hash, ZERO_HASH};

/// Computes the merkle root over the transactions' hashes. An odd node at
/// any level is paired with itself, and an empty set yields the zero hash.
pub fn calc_hash_merkle_root<'a>(txs: impl Iterator<Item = &'a Transaction>) -> Hash {
    let mut level: Vec<Hash> = txs.map(|tx| tx.hash()).collect();
    if level.is_empty() {
        return ZERO_HASH;
    }
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = pair[0];
                let right = if pair.len() == 2 { pair[1] } else { pair[0] };
                merkle_hash(left, right)
            })
            .collect();
    }
    level[0]
}

fn merkle_hash(left: Hash, right: Hash) -> Hash {
    let mut hasher = MerkleBranchHash::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subnets::SUBNETWORK_ID_COINBASE;

    fn coinbase_with_payload(payload: Vec<u8>) -> Transaction {
        Transaction::new(0, Vec::new(), Vec::new(), 0, SUBNETWORK_ID_COINBASE, 0, payload)
    }

    #[test]
    fn empty_set_is_zero() {
        assert_eq!(calc_hash_merkle_root(std::iter::empty::<&Transaction>()), ZERO_HASH);
    }

    #[test]
    fn single_tx_root_is_its_hash() {
        let tx = coinbase_with_payload(vec![1]);
        assert_eq!(calc_hash_merkle_root([tx.clone()].iter()), tx.hash());
    }

    #[test]
    fn root_commits_to_order() {
        let a = coinbase_with_payload(vec![1]);
        let b = coinbase_with_payload(vec![2]);
        let ab = calc_hash_merkle_root([a.clone(), b.clone()].iter());
        let ba = calc_hash_merkle_root([b, a].iter());
        assert_ne!(ab, ba);
    }
}
