//! Block ingestion pipeline (spec.md §4.C): the single long-lived task
//! that advances `latest_processed_block` strictly forward, turning each
//! height into a committed set of rows via `indexer-store`,
//! `indexer-derive`, and `indexer-contracts`.

pub mod error;
pub mod pipeline;
pub mod state;

pub use error::IngestError;
pub use pipeline::{IngestConfig, Pipeline};
pub use state::IngestPhase;
