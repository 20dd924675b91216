//! Block solving: nonce search against a header's own difficulty target.

pub mod solver;

pub use solver::{solve_block, MiningError};
