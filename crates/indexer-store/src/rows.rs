//! Row <-> domain-model conversions. Amount-bearing columns are `TEXT`
//! (see migrations/0001_init.sql) so every conversion here goes through
//! `TokenAmount`'s `FromStr`/`Display`, never a numeric sqlx type.

use std::collections::BTreeMap;
use std::str::FromStr;

use alloy_primitives::B256;
use indexer_types::{
    Address, Block, Contract, ContractType, ContractVerification, NftCollection, NftToken,
    SourceInput, TokenAmount, TokenBalance, TokenTransfer, TokenType, Transaction,
};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::error::StoreError;

fn parse_address(s: &str) -> Result<Address, StoreError> {
    Address::from_str(s).map_err(|e| StoreError::Decode(e.to_string()))
}

fn parse_hash(s: &str) -> Result<B256, StoreError> {
    B256::from_str(s).map_err(|e| StoreError::Decode(e.to_string()))
}

fn parse_amount(s: &str) -> Result<TokenAmount, StoreError> {
    TokenAmount::from_str(s).map_err(|e| StoreError::Decode(e.to_string()))
}

fn parse_amount_opt(s: Option<String>) -> Result<Option<TokenAmount>, StoreError> {
    s.map(|v| parse_amount(&v)).transpose()
}

pub(crate) fn block_from_row(row: &PgRow) -> Result<Block, StoreError> {
    Ok(Block {
        number: row.try_get::<i64, _>("number")? as u64,
        hash: parse_hash(row.try_get::<String, _>("hash")?.as_str())?,
        parent_hash: parse_hash(row.try_get::<String, _>("parent_hash")?.as_str())?,
        timestamp: row.try_get("timestamp")?,
        transactions_count: row.try_get::<i32, _>("transactions_count")? as u32,
        gas_used: parse_amount(&row.try_get::<String, _>("gas_used")?)?,
        gas_limit: parse_amount(&row.try_get::<String, _>("gas_limit")?)?,
        base_fee_per_gas: parse_amount_opt(row.try_get("base_fee_per_gas")?)?,
        miner: row
            .try_get::<Option<String>, _>("miner")?
            .map(|s| parse_address(&s))
            .transpose()?,
        nonce: row.try_get("nonce")?,
        difficulty: parse_amount_opt(row.try_get("difficulty")?)?,
        extra_data: row.try_get("extra_data")?,
    })
}

pub(crate) fn transaction_from_row(row: &PgRow) -> Result<Transaction, StoreError> {
    Ok(Transaction {
        hash: parse_hash(&row.try_get::<String, _>("hash")?)?,
        block_number: row.try_get::<i64, _>("block_number")? as u64,
        from: parse_address(&row.try_get::<String, _>("from")?)?,
        to: row
            .try_get::<Option<String>, _>("to")?
            .map(|s| parse_address(&s))
            .transpose()?,
        value: parse_amount(&row.try_get::<String, _>("value")?)?,
        gas_price: parse_amount(&row.try_get::<String, _>("gas_price")?)?,
        gas_limit: parse_amount(&row.try_get::<String, _>("gas_limit")?)?,
        gas_used: parse_amount(&row.try_get::<String, _>("gas_used")?)?,
        input_data: row.try_get("input_data")?,
        nonce: row.try_get::<i64, _>("nonce")? as u64,
        transaction_index: row.try_get::<i32, _>("transaction_index")? as u32,
        status: row.try_get("status")?,
        timestamp: row.try_get("timestamp")?,
    })
}

pub(crate) fn token_transfer_from_row(row: &PgRow) -> Result<TokenTransfer, StoreError> {
    let token_type = match row.try_get::<String, _>("token_type")?.as_str() {
        "ERC20" => TokenType::Erc20,
        "ERC721" => TokenType::Erc721,
        "ERC1155" => TokenType::Erc1155,
        other => return Err(StoreError::Decode(format!("unknown token_type {other}"))),
    };
    Ok(TokenTransfer {
        transaction_hash: parse_hash(&row.try_get::<String, _>("transaction_hash")?)?,
        log_index: row.try_get::<i32, _>("log_index")? as u32,
        token_address: parse_address(&row.try_get::<String, _>("token_address")?)?,
        from: parse_address(&row.try_get::<String, _>("from")?)?,
        to: parse_address(&row.try_get::<String, _>("to")?)?,
        token_id: parse_amount_opt(row.try_get("token_id")?)?,
        block_number: row.try_get::<i64, _>("block_number")? as u64,
        transaction_index: row.try_get::<i32, _>("transaction_index")? as u32,
        value: parse_amount(&row.try_get::<String, _>("value")?)?,
        token_type,
        timestamp: row.try_get("timestamp")?,
    })
}

pub(crate) fn token_balance_from_row(row: &PgRow) -> Result<TokenBalance, StoreError> {
    let token_type = match row.try_get::<String, _>("token_type")?.as_str() {
        "ERC20" => TokenType::Erc20,
        "ERC721" => TokenType::Erc721,
        "ERC1155" => TokenType::Erc1155,
        other => return Err(StoreError::Decode(format!("unknown token_type {other}"))),
    };
    Ok(TokenBalance {
        address: parse_address(&row.try_get::<String, _>("address")?)?,
        token_address: parse_address(&row.try_get::<String, _>("token_address")?)?,
        token_id: parse_amount_opt(row.try_get("token_id")?)?,
        balance: parse_amount(&row.try_get::<String, _>("balance")?)?,
        token_type,
        is_creator: row.try_get("is_creator")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn nft_token_from_row(row: &PgRow) -> Result<NftToken, StoreError> {
    Ok(NftToken {
        token_address: parse_address(&row.try_get::<String, _>("token_address")?)?,
        token_id: parse_amount(&row.try_get::<String, _>("token_id")?)?,
        owner_address: parse_address(&row.try_get::<String, _>("owner_address")?)?,
        metadata_uri: row.try_get("metadata_uri")?,
        name: row.try_get("name")?,
        image_url: row.try_get("image_url")?,
        metadata: row.try_get("metadata")?,
        last_updated: row.try_get("last_updated")?,
    })
}

pub(crate) fn nft_collection_from_row(row: &PgRow) -> Result<NftCollection, StoreError> {
    Ok(NftCollection {
        token_address: parse_address(&row.try_get::<String, _>("token_address")?)?,
        name: row.try_get("name")?,
        symbol: row.try_get("symbol")?,
        total_supply: parse_amount_opt(row.try_get("total_supply")?)?,
        owner_count: row
            .try_get::<Option<i64>, _>("owner_count")?
            .map(|v| v as u64),
        last_updated: row.try_get("last_updated")?,
    })
}

pub(crate) fn contract_from_row(row: &PgRow) -> Result<Contract, StoreError> {
    let contract_type = match row.try_get::<String, _>("contract_type")?.as_str() {
        "ERC20" => ContractType::Erc20,
        "ERC721" => ContractType::Erc721,
        "ERC1155" => ContractType::Erc1155,
        "UNKNOWN" => ContractType::Unknown,
        other => return Err(StoreError::Decode(format!("unknown contract_type {other}"))),
    };

    let verified: bool = row.try_get("verified")?;
    let verification = if verified {
        let abi: Option<serde_json::Value> = row.try_get("abi")?;
        let source_code: Option<String> = row.try_get("source_code")?;
        let source_files: Option<serde_json::Value> = row.try_get("source_files")?;
        let is_multi_file: Option<bool> = row.try_get("is_multi_file")?;
        let libraries_json: Option<serde_json::Value> = row.try_get("libraries")?;

        let source = if is_multi_file.unwrap_or(false) {
            let map: BTreeMap<String, String> = source_files
                .map(serde_json::from_value)
                .transpose()?
                .unwrap_or_default();
            SourceInput::MultiFile(map)
        } else {
            SourceInput::Single(source_code.unwrap_or_default())
        };

        let libraries: BTreeMap<String, Address> = match libraries_json {
            Some(v) => {
                let raw: BTreeMap<String, String> = serde_json::from_value(v)?;
                raw.into_iter()
                    .map(|(k, addr)| parse_address(&addr).map(|a| (k, a)))
                    .collect::<Result<_, _>>()?
            }
            None => BTreeMap::new(),
        };

        Some(ContractVerification {
            address: parse_address(&row.try_get::<String, _>("address")?)?,
            source,
            abi: abi.unwrap_or(serde_json::Value::Null),
            compiler_version: row.try_get::<Option<String>, _>("compiler_version")?.unwrap_or_default(),
            optimization_used: row.try_get::<Option<bool>, _>("optimization_used")?.unwrap_or(false),
            runs: row.try_get::<Option<i32>, _>("runs")?.unwrap_or(0) as u32,
            constructor_arguments: row.try_get("constructor_arguments")?,
            libraries,
            evm_version: row.try_get::<Option<String>, _>("evm_version")?.unwrap_or_default(),
            is_multi_file: is_multi_file.unwrap_or(false),
            main_file: row.try_get("main_file")?,
            verification_metadata: row.try_get("verification_metadata")?,
            verified_at: row.try_get::<Option<i64>, _>("verified_at")?.unwrap_or(0),
        })
    } else {
        None
    };

    Ok(Contract {
        address: parse_address(&row.try_get::<String, _>("address")?)?,
        creator: row
            .try_get::<Option<String>, _>("creator")?
            .map(|s| parse_address(&s))
            .transpose()?
            .unwrap_or(Address::ZERO),
        creation_tx: parse_hash(&row.try_get::<String, _>("creation_tx")?)?,
        block_number: row.try_get::<i64, _>("block_number")? as u64,
        timestamp: row.try_get("timestamp")?,
        contract_type,
        name: row.try_get("name")?,
        symbol: row.try_get("symbol")?,
        decimals: row.try_get::<Option<i16>, _>("decimals")?.map(|d| d as u8),
        total_supply: parse_amount_opt(row.try_get("total_supply")?)?,
        bytecode: row.try_get("bytecode")?,
        verified,
        verification,
    })
}
