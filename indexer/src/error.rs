use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Database error: {0}")]
    Database(#[from] database::DbError),

    #[error("RPC error: {0}")]
    Rpc(#[from] rpc_core::RpcError),

    /// The replica and the upstream consensus output disagree. This is a
    /// bug on one of the two sides, never a transient condition: the
    /// caller must stop rather than keep writing.
    #[error("Inconsistent replica state: {0}")]
    InconsistentState(String),
}

pub type Result<T> = std::result::Result<T, IndexerError>;
