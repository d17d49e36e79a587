//! Domain model — spec.md §3.
//!
//! These are plain data structs shared by every component. Persistence
//! concerns (row mapping, triggers) live in `indexer-store`; RPC wire shapes
//! live in `indexer-rpc`. This module is the vocabulary both speak.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::TokenAmount;

/// 32-byte hash (block hash, tx hash, topic). Alloy already renders this as
/// lowercase `0x`-prefixed hex via `Display`/`Serialize`.
pub type Hash32 = B256;

/// A processed block (spec.md §3, `Block`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub number: u64,
    pub hash: Hash32,
    pub parent_hash: Hash32,
    pub timestamp: i64,
    pub transactions_count: u32,
    pub gas_used: TokenAmount,
    pub gas_limit: TokenAmount,
    pub base_fee_per_gas: Option<TokenAmount>,
    pub miner: Option<Address>,
    pub nonce: Option<String>,
    pub difficulty: Option<TokenAmount>,
    pub extra_data: Option<String>,
}

/// A transaction within a [`Block`] (spec.md §3, `Transaction`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: Hash32,
    pub block_number: u64,
    pub from: Address,
    /// `None` for contract-creation transactions.
    pub to: Option<Address>,
    pub value: TokenAmount,
    pub gas_price: TokenAmount,
    pub gas_limit: TokenAmount,
    pub gas_used: TokenAmount,
    pub input_data: String,
    pub nonce: u64,
    pub transaction_index: u32,
    /// `None` when the receipt predates Byzantium's status field.
    pub status: Option<bool>,
    pub timestamp: i64,
}

/// The token standard a [`TokenTransfer`]/[`Contract`] implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenType {
    Erc20,
    Erc721,
    Erc1155,
}

/// Classification of a detected [`Contract`] (spec.md §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContractType {
    Erc20,
    Erc721,
    Erc1155,
    Unknown,
}

impl From<TokenType> for ContractType {
    fn from(value: TokenType) -> Self {
        match value {
            TokenType::Erc20 => ContractType::Erc20,
            TokenType::Erc721 => ContractType::Erc721,
            TokenType::Erc1155 => ContractType::Erc1155,
        }
    }
}

/// A decoded token transfer, derived from receipt logs (spec.md §3, §4.D).
///
/// Identity is the tuple `(transaction_hash, token_address, from, to, token_id)`
/// (I4: re-inserting the same tuple updates rather than duplicates).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransfer {
    pub transaction_hash: Hash32,
    pub log_index: u32,
    pub token_address: Address,
    pub from: Address,
    pub to: Address,
    pub token_id: Option<TokenAmount>,
    pub block_number: u64,
    pub transaction_index: u32,
    pub value: TokenAmount,
    pub token_type: TokenType,
    pub timestamp: i64,
}

impl TokenTransfer {
    pub fn is_mint(&self) -> bool {
        self.from.is_zero()
    }

    pub fn is_burn(&self) -> bool {
        self.to.is_zero()
    }
}

/// A materialized balance row, maintained by the store (spec.md §3, §4.B).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub address: Address,
    pub token_address: Address,
    pub token_id: Option<TokenAmount>,
    pub balance: TokenAmount,
    pub token_type: TokenType,
    pub is_creator: bool,
    pub updated_at: i64,
}

/// An NFT's current ownership and metadata (spec.md §3, `NFTToken`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftToken {
    pub token_address: Address,
    pub token_id: TokenAmount,
    pub owner_address: Address,
    pub metadata_uri: Option<String>,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub last_updated: i64,
}

/// Collection-level NFT metadata (spec.md §3, `NFTCollection`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftCollection {
    pub token_address: Address,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub total_supply: Option<TokenAmount>,
    pub owner_count: Option<u64>,
    pub last_updated: i64,
}

/// A detected contract and, once verified, its verification record
/// (spec.md §3, `Contract` + `ContractVerification`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub address: Address,
    pub creator: Address,
    pub creation_tx: Hash32,
    pub block_number: u64,
    pub timestamp: i64,
    pub contract_type: ContractType,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub total_supply: Option<TokenAmount>,
    pub bytecode: Option<String>,
    pub verified: bool,
    pub verification: Option<ContractVerification>,
}

/// Source mode of a [`ContractVerification`] record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceInput {
    Single(String),
    MultiFile(std::collections::BTreeMap<String, String>),
}

impl SourceInput {
    pub fn is_multi_file(&self) -> bool {
        matches!(self, SourceInput::MultiFile(_))
    }
}

/// A 1:1 extension of [`Contract`] recording how it was verified
/// (spec.md §3, `ContractVerification`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractVerification {
    pub address: Address,
    pub source: SourceInput,
    pub abi: serde_json::Value,
    pub compiler_version: String,
    pub optimization_used: bool,
    pub runs: u32,
    pub constructor_arguments: Option<String>,
    pub libraries: std::collections::BTreeMap<String, Address>,
    pub evm_version: String,
    pub is_multi_file: bool,
    pub main_file: Option<String>,
    pub verification_metadata: Option<serde_json::Value>,
    pub verified_at: i64,
}

/// Singleton tracking forward progress (spec.md §3, `IngestState`, invariant I1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestState {
    pub latest_processed_block: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_and_burn_detection() {
        let transfer = TokenTransfer {
            transaction_hash: Hash32::ZERO,
            log_index: 0,
            token_address: Address::ZERO,
            from: Address::ZERO,
            to: "0x0000000000000000000000000000000000000001"
                .parse()
                .unwrap(),
            token_id: None,
            block_number: 1,
            transaction_index: 0,
            value: "100".parse().unwrap(),
            token_type: TokenType::Erc20,
            timestamp: 0,
        };
        assert!(transfer.is_mint());
        assert!(!transfer.is_burn());
    }

    #[test]
    fn contract_type_from_token_type() {
        assert_eq!(ContractType::from(TokenType::Erc721), ContractType::Erc721);
    }
}
