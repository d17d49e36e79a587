//! Contract-creation detection (spec.md §4.E): for each candidate address,
//! check for on-chain code and, if present, probe for the ERC standards it
//! implements, degrading to [`indexer_types::ContractType::Unknown`] on any
//! probe failure rather than failing detection outright.

pub mod detect;
pub mod error;

pub use detect::detect_contract;
pub use error::ContractsError;
