use consensus_core::block::Block;
use consensus_pow::State;
use rand::RngCore;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MiningError {
    /// Every nonce from the starting point to the end of the u64 space
    /// failed the target. Retrying with identical parameters cannot
    /// succeed; the caller must rebuild the block (new time/target).
    #[error("nonce space exhausted without satisfying the target")]
    NonceSpaceExhausted,
}

/// Searches for a nonce satisfying the block's own difficulty target,
/// starting from a caller-supplied random point and walking upward to the
/// end of the nonce space. On success the winning nonce is committed into
/// the header and its cached hash refreshed.
pub fn solve_block(block: &mut Block, rng: &mut impl RngCore) -> Result<(), MiningError> {
    let mut state = State::new(&block.header);

    let start = rng.next_u64();
    let mut attempts: u64 = 0;
    for nonce in start..=u64::MAX {
        state.nonce = nonce;
        attempts += 1;
        if state.check_pow().0 {
            log::debug!("solved block {} with nonce {} after {} attempts", block.header.hash, nonce, attempts);
            block.header.nonce = nonce;
            block.header.finalize();
            return Ok(());
        }
    }

    Err(MiningError::NonceSpaceExhausted)
}
