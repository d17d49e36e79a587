//! RPC error kinds (spec.md §7).

/// A single endpoint's failure, kept around for aggregation into
/// [`RpcError::AllProvidersFailed`].
#[derive(Debug, Clone)]
pub struct EndpointFailure {
    pub endpoint: String,
    pub message: String,
}

impl std::fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.message)
    }
}

/// Errors surfaced by [`crate::pool::RpcPool`].
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Every configured endpoint failed for this call.
    #[error("all RPC providers failed: {}", join_failures(.0))]
    AllProvidersFailed(Vec<EndpointFailure>),
    /// The pool has no configured endpoints at all.
    #[error("no RPC endpoints configured")]
    NoEndpoints,
    /// The chain head moved backward relative to what the caller expected.
    #[error("block not found or head moved back: {0}")]
    BlockNotFound(u64),
    /// A single-endpoint transport/decoding failure, not yet aggregated.
    #[error("rpc call failed on {endpoint}: {message}")]
    Single { endpoint: String, message: String },
}

fn join_failures(failures: &[EndpointFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
