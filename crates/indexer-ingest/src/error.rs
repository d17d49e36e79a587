#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Rpc(#[from] indexer_rpc::RpcError),

    #[error(transparent)]
    Store(#[from] indexer_store::StoreError),

    #[error(transparent)]
    Derive(#[from] indexer_derive::DeriveError),

    #[error(transparent)]
    Contracts(#[from] indexer_contracts::ContractsError),
}
