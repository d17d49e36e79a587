//! Token/NFT derivation (spec.md §4.D): decodes ERC-20/721/1155 transfer
//! logs and resolves NFT metadata. Balance maintenance itself lives in
//! `indexer-store`'s trigger — this crate only produces the transfer rows
//! and metadata the store and ingestion pipeline persist.

pub mod decode;
pub mod error;
pub mod metadata;
pub mod nft;
pub mod probe;
pub mod signatures;

pub use decode::decode_transfer_logs;
pub use error::DeriveError;
pub use metadata::{fetch_metadata, normalize_uri, ResolvedMetadata};
pub use nft::{fetch_collection_fields, resolve_token_uri};
pub use probe::confirm_token_type;
