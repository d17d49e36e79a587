//! Wire-shaped types returned by [`crate::ops`], plus conversions into the
//! shared domain model in `indexer-types`.
//!
//! These stay separate from `indexer_types::model` because the RPC tier
//! speaks in raw logs/receipts the derivation layer (`indexer-derive`)
//! still has to interpret; only ingestion (`indexer-ingest`) knows how to
//! combine a [`Receipt`]'s logs with a committed [`indexer_types::Block`].

use alloy_primitives::{Address, Bytes, B256, U256};
use indexer_types::{Address as IAddress, TokenAmount};

/// A decoded event log, prior to any ERC-20/721/1155 interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: IAddress,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub log_index: u32,
    pub transaction_hash: B256,
    pub transaction_index: u32,
    pub block_number: u64,
}

/// A transaction receipt (spec.md §4.A `receipt`).
#[derive(Debug, Clone)]
pub struct Receipt {
    pub transaction_hash: B256,
    pub status: Option<bool>,
    pub gas_used: TokenAmount,
    pub logs: Vec<RawLog>,
    /// Set when this transaction deployed a contract (spec.md §4.C step 4's
    /// "contract-creation candidate").
    pub contract_address: Option<IAddress>,
}

/// A filter for `eth_getLogs` (spec.md §4.A `logs`).
#[derive(Debug, Clone)]
pub struct LogFilter {
    pub from_block: u64,
    pub to_block: u64,
    pub address: Option<Address>,
    pub topics: Vec<Option<B256>>,
}

pub(crate) fn u256_amount(value: U256) -> TokenAmount {
    TokenAmount::from_u256(value)
}
