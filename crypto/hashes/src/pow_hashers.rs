use crate::hashers::{HasherBase, HeavyHash, ProofOfWorkHash};
use crate::Hash;

/// Hash writer that follows the block header PoW hashing rule:
/// `PRE_POW_HASH || TIME || 32 zero byte padding || NONCE`, all
/// fixed-width little-endian fields.
///
/// The writer is constructed once per mining/validation state with the
/// nonce-independent prefix already absorbed, so each attempt only pays
/// for the nonce suffix.
#[derive(Clone)]
pub struct PowHash(ProofOfWorkHash);

impl PowHash {
    pub fn new(pre_pow_hash: Hash, timestamp: u64) -> Self {
        let mut inner = ProofOfWorkHash::new();
        inner.update(pre_pow_hash.as_bytes());
        inner.update(timestamp.to_le_bytes());
        inner.update([0u8; 32]);
        Self(inner)
    }

    #[inline]
    pub fn finalize_with_nonce(&self, nonce: u64) -> Hash {
        let mut inner = self.0.clone();
        inner.update(nonce.to_le_bytes());
        inner.finalize()
    }
}

/// Final digest of the matrix transform step.
pub fn heavy_hash(data: &[u8; 32]) -> Hash {
    let mut hasher = HeavyHash::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_pow_hash() {
        let pre_hash = Hash::from_bytes(hex!("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"));
        let hasher = PowHash::new(pre_hash, 1234567890);

        let hash = hasher.finalize_with_nonce(42);
        // Finalization does not consume the shared prefix
        assert_eq!(hash, hasher.finalize_with_nonce(42));
        assert_ne!(hash, hasher.finalize_with_nonce(43));
    }

    #[test]
    fn test_heavy_hash_differs_from_pow_domain() {
        let bytes = [7u8; 32];
        let heavy = heavy_hash(&bytes);
        let pow = PowHash::new(Hash::from_bytes(bytes), 0).finalize_with_nonce(0);
        assert_ne!(heavy, pow);
    }
}
