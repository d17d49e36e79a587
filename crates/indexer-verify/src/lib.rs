//! Deterministic Solidity recompilation and bytecode-matching contract
//! verification (spec.md §4.F).

mod bytecode;
mod cache;
mod compiler;
mod engine;
mod error;
mod evm_version;
mod import_resolver;
mod libraries;
mod request;

pub use bytecode::BytecodeComparison;
pub use engine::VerifyEngine;
pub use error::VerifyError;
pub use evm_version::default_evm_version;
pub use request::{VerifyRequest, VerifyResult};
