// public for benchmarks
#[doc(hidden)]
pub mod matrix;
#[doc(hidden)]
pub mod xoshiro;

use crate::matrix::Matrix;
use consensus_core::{constants::MAX_BLOCK_LEVEL, hashing, header::Header, BlockLevel};
use primitive_types::U256;
use vanta_hashes::{Hash, PowHash};

/// State is an intermediate data structure with pre-computed values to
/// speed up mining and verification of a single header. `timestamp` and
/// `nonce` are the only mutable inputs; everything else is derived once
/// from the nonce/time-independent header fields.
pub struct State {
    pub(crate) matrix: Matrix,
    pub target: U256,
    pub(crate) pre_pow_hash: Hash,
    pub timestamp: u64,
    pub nonce: u64,
}

impl State {
    pub fn new(header: &Header) -> Self {
        let target = compact_to_target(header.bits);
        // Zero out the time and nonce to produce the pre-pow hash
        let pre_pow_hash = hashing::header::hash_override_nonce_time(header, 0, 0);
        let matrix = Matrix::generate(pre_pow_hash);

        Self { matrix, target, pre_pow_hash, timestamp: header.timestamp, nonce: header.nonce }
    }

    /// PRE_POW_HASH || TIME || 32 zero byte padding || NONCE, hashed and
    /// folded through the heavy-hash matrix. The result is interpreted as
    /// a little-endian integer.
    #[inline]
    #[must_use]
    pub fn calculate_pow(&self) -> U256 {
        let hash = PowHash::new(self.pre_pow_hash, self.timestamp).finalize_with_nonce(self.nonce);
        let hash = self.matrix.heavy_hash(hash);
        U256::from_little_endian(hash.as_bytes())
    }

    /// The pow hash must be less or equal than the claimed target
    #[inline]
    #[must_use]
    pub fn check_pow(&self) -> (bool, U256) {
        let pow = self.calculate_pow();
        (pow <= self.target, pow)
    }
}

/// Decompresses a compact-bits difficulty encoding into a full target
pub fn compact_to_target(bits: u32) -> U256 {
    let size = (bits >> 24) as usize;
    let word = bits & 0x007fffff;
    if size <= 3 {
        U256::from(word >> (8 * (3 - size)))
    } else {
        U256::from(word) << (8 * (size - 3))
    }
}

/// Compresses a target back into compact-bits form (lossy beyond the
/// three mantissa bytes)
pub fn target_to_compact(target: U256) -> u32 {
    let size = (target.bits() as u32 + 7) / 8;
    let mut compact = if size <= 3 {
        (target.low_u64() << (8 * (3 - size))) as u32
    } else {
        let shifted = target >> (8 * (size - 3));
        shifted.low_u64() as u32
    };
    // The mantissa is signed in the legacy encoding; renormalize if the
    // sign bit would be set
    if compact & 0x00800000 != 0 {
        compact >>= 8;
        return compact | ((size + 1) << 24);
    }
    compact | (size << 24)
}

pub fn calc_block_level(header: &Header) -> BlockLevel {
    if header.direct_parents().is_empty() {
        return MAX_BLOCK_LEVEL; // Genesis has the max block level
    }

    let state = State::new(header);
    let pow = state.calculate_pow();
    calc_level_from_pow(pow)
}

/// The block level is the number of consecutive unset low bits of the pow
/// value, scanned starting at bit one and capped at the maximum level. A
/// numerically smaller pow value therefore tends to yield a deeper level.
pub fn calc_level_from_pow(pow: U256) -> BlockLevel {
    let mut level: BlockLevel = 0;
    while level < MAX_BLOCK_LEVEL && !pow.bit(level as usize + 1) {
        level += 1;
    }
    level
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_core::{BlueWorkType, ZERO_HASH};

    fn build_header(bits: u32, nonce: u64) -> Header {
        Header::new_finalized(
            1,
            vec![vec![Hash::from_u64_word(1)]],
            ZERO_HASH,
            ZERO_HASH,
            ZERO_HASH,
            1699545600000,
            bits,
            nonce,
            0,
            BlueWorkType::from(0u64),
            0,
            ZERO_HASH,
        )
    }

    #[test]
    fn pow_value_is_deterministic() {
        let state = State::new(&build_header(0x1f00ffff, 12345));
        assert_eq!(state.calculate_pow(), state.calculate_pow());
    }

    #[test]
    fn pow_state_keeps_original_time_and_nonce() {
        let header = build_header(0x1f00ffff, 777);
        let state = State::new(&header);
        assert_eq!(state.nonce, 777);
        assert_eq!(state.timestamp, header.timestamp);
    }

    #[test]
    fn pre_pow_hash_ignores_time_and_nonce() {
        let a = State::new(&build_header(0x1f00ffff, 1));
        let b = State::new(&build_header(0x1f00ffff, 2));
        assert_eq!(a.pre_pow_hash, b.pre_pow_hash);
    }

    #[test]
    fn check_pow_is_monotone_in_target() {
        // An all-ones target accepts everything; a zero target accepts
        // nothing above zero. Success at a strict target implies success
        // at every looser one.
        let mut state = State::new(&build_header(0x207fffff, 0));
        let pow = state.calculate_pow();

        state.target = U256::MAX;
        assert!(state.check_pow().0);

        state.target = pow;
        assert!(state.check_pow().0);

        if pow > U256::zero() {
            state.target = pow - U256::one();
            assert!(!state.check_pow().0);
        }
    }

    #[test]
    fn genesis_gets_max_level() {
        let mut header = build_header(0x1f00ffff, 0);
        header.parents_by_level = Vec::new();
        header.finalize();
        assert_eq!(calc_block_level(&header), MAX_BLOCK_LEVEL);
    }

    #[test]
    fn level_counts_low_zero_bits() {
        // bit 1 set -> level 0
        assert_eq!(calc_level_from_pow(U256::from(0b10u64)), 0);
        // bits 1..=3 clear, bit 4 set -> level 3
        assert_eq!(calc_level_from_pow(U256::from(0b10000u64)), 3);
        // zero pow value saturates at the cap
        assert_eq!(calc_level_from_pow(U256::zero()), MAX_BLOCK_LEVEL);
    }

    #[test]
    fn compact_bits_roundtrip() {
        for bits in [0x1d00ffffu32, 0x1f00ffff, 0x207fffff] {
            let target = compact_to_target(bits);
            assert_eq!(target_to_compact(target), bits);
        }
    }
}
