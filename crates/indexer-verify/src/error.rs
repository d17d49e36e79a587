//! Verification error kinds (spec.md §7). Names match the spec's logical
//! kinds so the HTTP collaborator can map them 1:1 onto response shapes.

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error(transparent)]
    Rpc(#[from] indexer_rpc::RpcError),

    #[error(transparent)]
    Store(#[from] indexer_store::StoreError),

    #[error("solc error: {0}")]
    CompileError(String),

    #[error("compiled bytecode does not match on-chain code")]
    BytecodeMismatch,

    #[error("metadata hash matches but leading code does not (check constructor args/libraries)")]
    MetadataOnlyMatch,

    #[error("circular import detected: {0}")]
    CircularImport(String),

    #[error("source exceeds the {0} byte cap")]
    SourceTooLarge(usize),

    #[error("constructor arguments must be hex: {0}")]
    InvalidConstructorArgs(String),

    #[error("{0} has no on-chain code")]
    NotAContract(indexer_types::Address),

    #[error("contract {0} is not verified")]
    NotVerified(indexer_types::Address),

    #[error("import not found: {0}")]
    ImportNotFound(String),
}
