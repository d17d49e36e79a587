//! Shared domain model for the EVM chain indexer.
//!
//! This crate is intentionally inert: no I/O, no RPC, no SQL. It gives every
//! other crate in the workspace ([`indexer-rpc`](../indexer_rpc/index.html),
//! `indexer-store`, `indexer-ingest`, `indexer-derive`, `indexer-contracts`,
//! `indexer-verify`, `indexer-supervisor`) a common vocabulary for
//! addresses, amounts, and the entities in spec.md §3.
//!
//! # Modules
//!
//! - [`address`] — normalized, lowercase `0x`-prefixed addresses
//! - [`amount`] — arbitrary-precision, non-negative token amounts
//! - [`model`] — `Block`, `Transaction`, `TokenTransfer`, `TokenBalance`,
//!   `NftToken`, `NftCollection`, `Contract`, `ContractVerification`

pub mod address;
pub mod amount;
pub mod model;

pub use address::{Address, AddressParseError};
pub use amount::{AmountParseError, TokenAmount};
pub use model::*;
