#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Store(#[from] indexer_store::StoreError),

    #[error(transparent)]
    Rpc(#[from] indexer_rpc::RpcError),

    #[error("database url is not valid: {0}")]
    InvalidDatabaseUrl(String),

    #[error("backup command failed: {0}")]
    BackupFailed(String),

    #[error("restore command failed: {0}")]
    RestoreFailed(String),

    #[error("schema recreation failed: {0}")]
    RecreateFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("health checks failed {0} consecutive times, exiting for external restart")]
    Unhealthy(u32),
}
