#[derive(Debug, thiserror::Error)]
pub enum DeriveError {
    #[error(transparent)]
    Rpc(#[from] indexer_rpc::RpcError),

    #[error("malformed transfer log: {0}")]
    Decode(String),
}
