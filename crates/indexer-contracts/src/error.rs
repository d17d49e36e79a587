#[derive(Debug, thiserror::Error)]
pub enum ContractsError {
    #[error(transparent)]
    Rpc(#[from] indexer_rpc::RpcError),
}
