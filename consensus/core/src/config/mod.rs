pub mod genesis;

pub use genesis::{default_genesis, GenesisBlock};
