use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("Invalid block version")]
    InvalidBlockVersion,

    #[error("Invalid merkle root")]
    InvalidMerkleRoot,

    #[error("Invalid proof of work")]
    InvalidProofOfWork,

    #[error("Invalid coinbase transaction")]
    InvalidCoinbaseTransaction,

    #[error("Empty transaction list")]
    EmptyTransactionList,

    #[error("Invalid difficulty target")]
    InvalidDifficultyTarget,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Other error: {0}")]
    Other(String),
}
