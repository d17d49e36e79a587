//! Redundant, health-aware fan-out over several EVM JSON-RPC endpoints
//! (spec.md §4.A).
//!
//! [`RpcPool`] is the single entry point: construct it from an ordered list
//! of endpoint URLs, spawn its health checker, and call the methods in
//! [`ops`] — every one of them already knows how to fail over.

pub mod error;
pub mod ops;
pub mod pool;
pub mod types;

pub use error::{EndpointFailure, RpcError};
pub use pool::RpcPool;
pub use types::{LogFilter, RawLog, Receipt};
