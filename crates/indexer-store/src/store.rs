//! Postgres persistence (spec.md §4.B).
//!
//! Every write goes through [`sqlx::PgExecutor`] generics rather than a
//! fixed `&PgPool`, so the same function works against the pool directly or
//! against a [`sqlx::Transaction`] opened with [`Store::begin`] — the
//! Ingestion Pipeline commits a whole block's worth of writes atomically
//! that way.

use std::collections::BTreeMap;

use indexer_types::{
    Address, Block, Contract, ContractVerification, IngestState, NftCollection, NftToken,
    TokenBalance, TokenTransfer, Transaction,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgExecutor, PgPool, Postgres};
use tracing::instrument;

use crate::error::StoreError;
use crate::rows;

/// A transaction handle for grouping a block's writes atomically.
pub type Tx<'c> = sqlx::Transaction<'c, Postgres>;

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connects and runs pending migrations, matching the teacher's
    /// bootstrap-on-connect convention.
    #[instrument(skip_all)]
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        let store = Store { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Tx<'_>, StoreError> {
        Ok(self.pool.begin().await?)
    }

    // -- blocks ----------------------------------------------------------

    pub async fn insert_block(&self, block: &Block) -> Result<(), StoreError> {
        insert_block(&self.pool, block).await
    }

    pub async fn get_block(&self, number: u64) -> Result<Option<Block>, StoreError> {
        get_block(&self.pool, number).await
    }

    pub async fn latest_stored_block(&self) -> Result<Option<u64>, StoreError> {
        let row = sqlx::query("SELECT MAX(number) AS n FROM blocks")
            .fetch_one(&self.pool)
            .await?;
        Ok(sqlx::Row::try_get::<Option<i64>, _>(&row, "n")?.map(|n| n as u64))
    }

    // -- transactions ------------------------------------------------------

    pub async fn insert_transaction(&self, tx: &Transaction) -> Result<(), StoreError> {
        insert_transaction(&self.pool, tx).await
    }

    pub async fn get_transaction(&self, hash: &str) -> Result<Option<Transaction>, StoreError> {
        let row = sqlx::query("SELECT * FROM transactions WHERE hash = $1")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(rows::transaction_from_row).transpose()
    }

    /// Paginated, newest-first transactions touching `address` as sender or
    /// recipient (spec.md §4.B read surface).
    pub async fn transactions_by_address(
        &self,
        address: Address,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, StoreError> {
        let addr = address.as_lowercase_hex();
        let rows = sqlx::query(
            r#"SELECT * FROM transactions
               WHERE "from" = $1 OR "to" = $1
               ORDER BY block_number DESC, transaction_index DESC
               LIMIT $2 OFFSET $3"#,
        )
        .bind(addr)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(rows::transaction_from_row).collect()
    }

    // -- token transfers / balances ----------------------------------------

    /// Idempotent per I4: re-inserting the same `(tx_hash, token, from, to,
    /// token_id)` tuple updates in place rather than duplicating. The
    /// `AFTER INSERT` trigger only fires on the true-insert path, so a
    /// conflicting re-insert never double-applies balance effects.
    pub async fn insert_token_transfer(&self, transfer: &TokenTransfer) -> Result<(), StoreError> {
        insert_token_transfer(&self.pool, transfer).await
    }

    pub async fn token_balance(
        &self,
        address: Address,
        token_address: Address,
        token_id: Option<&str>,
    ) -> Result<Option<TokenBalance>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM token_balances WHERE address = $1 AND token_address = $2 AND COALESCE(token_id, '') = COALESCE($3, '')",
        )
        .bind(address.as_lowercase_hex())
        .bind(token_address.as_lowercase_hex())
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(rows::token_balance_from_row).transpose()
    }

    /// Top holders by balance (spec.md §4.B), ordered descending, with the
    /// percentage of `total_supply` each holds computed in SQL to avoid
    /// precision loss from casting through a float in Rust.
    pub async fn token_holders(
        &self,
        token_address: Address,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<(TokenBalance, Option<f64>)>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT tb.*,
                      CASE WHEN c.total_supply IS NOT NULL AND c.total_supply::numeric > 0
                           THEN (tb.balance::numeric / c.total_supply::numeric * 100)::float8
                           ELSE NULL END AS pct
               FROM token_balances tb
               LEFT JOIN contracts c ON c.address = tb.token_address
               WHERE tb.token_address = $1 AND tb.balance::numeric > 0
               ORDER BY tb.balance::numeric DESC
               LIMIT $2 OFFSET $3"#,
        )
        .bind(token_address.as_lowercase_hex())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let balance = rows::token_balance_from_row(row)?;
                let pct: Option<f64> = sqlx::Row::try_get(row, "pct")?;
                Ok((balance, pct))
            })
            .collect()
    }

    pub async fn holder_count(&self, token_address: Address) -> Result<i64, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM token_balances WHERE token_address = $1 AND balance::numeric > 0",
        )
        .bind(token_address.as_lowercase_hex())
        .fetch_one(&self.pool)
        .await?;
        Ok(sqlx::Row::try_get(&row, "n")?)
    }

    // -- NFTs ----------------------------------------------------------

    pub async fn upsert_nft_token(&self, token: &NftToken) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO nft_tokens
                 (token_address, token_id, owner_address, metadata_uri, name, image_url, metadata, last_updated)
               VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
               ON CONFLICT (token_address, token_id) DO UPDATE SET
                 owner_address = EXCLUDED.owner_address,
                 metadata_uri = EXCLUDED.metadata_uri,
                 name = EXCLUDED.name,
                 image_url = EXCLUDED.image_url,
                 metadata = EXCLUDED.metadata,
                 last_updated = EXCLUDED.last_updated"#,
        )
        .bind(token.token_address.as_lowercase_hex())
        .bind(token.token_id.as_decimal_string())
        .bind(token.owner_address.as_lowercase_hex())
        .bind(&token.metadata_uri)
        .bind(&token.name)
        .bind(&token.image_url)
        .bind(&token.metadata)
        .bind(token.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_nft_token(
        &self,
        token_address: Address,
        token_id: &str,
    ) -> Result<Option<NftToken>, StoreError> {
        let row = sqlx::query("SELECT * FROM nft_tokens WHERE token_address = $1 AND token_id = $2")
            .bind(token_address.as_lowercase_hex())
            .bind(token_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(rows::nft_token_from_row).transpose()
    }

    pub async fn upsert_nft_collection(&self, collection: &NftCollection) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO nft_collections (token_address, name, symbol, total_supply, owner_count, last_updated)
               VALUES ($1,$2,$3,$4,$5,$6)
               ON CONFLICT (token_address) DO UPDATE SET
                 name = EXCLUDED.name,
                 symbol = EXCLUDED.symbol,
                 total_supply = EXCLUDED.total_supply,
                 owner_count = EXCLUDED.owner_count,
                 last_updated = EXCLUDED.last_updated"#,
        )
        .bind(collection.token_address.as_lowercase_hex())
        .bind(&collection.name)
        .bind(&collection.symbol)
        .bind(collection.total_supply.map(|a| a.as_decimal_string()))
        .bind(collection.owner_count.map(|n| n as i64))
        .bind(collection.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_nft_collection(&self, token_address: Address) -> Result<Option<NftCollection>, StoreError> {
        let row = sqlx::query("SELECT * FROM nft_collections WHERE token_address = $1")
            .bind(token_address.as_lowercase_hex())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(rows::nft_collection_from_row).transpose()
    }

    // -- contracts / verification ----------------------------------------

    pub async fn insert_contract(&self, contract: &Contract) -> Result<(), StoreError> {
        insert_contract(&self.pool, contract).await
    }

    pub async fn get_contract(&self, address: Address) -> Result<Option<Contract>, StoreError> {
        let row = sqlx::query("SELECT * FROM contracts WHERE address = $1")
            .bind(address.as_lowercase_hex())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(rows::contract_from_row).transpose()
    }

    pub async fn is_contract(&self, address: Address) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM contracts WHERE address = $1) AS e")
            .bind(address.as_lowercase_hex())
            .fetch_one(&self.pool)
            .await?;
        Ok(sqlx::Row::try_get(&row, "e")?)
    }

    /// Persists a successful verification (spec.md §4.F), flipping
    /// `contracts.verified` and filling in the 1:1 `ContractVerification`
    /// columns. Keyed on address: a later verification of the same
    /// contract replaces the earlier record.
    pub async fn upsert_verification(
        &self,
        verification: &ContractVerification,
    ) -> Result<(), StoreError> {
        let (source_code, source_files) = match &verification.source {
            indexer_types::SourceInput::Single(s) => (Some(s.clone()), None),
            indexer_types::SourceInput::MultiFile(files) => {
                (None, Some(serde_json::to_value(files)?))
            }
        };
        let libraries: BTreeMap<String, String> = verification
            .libraries
            .iter()
            .map(|(k, v)| (k.clone(), v.as_lowercase_hex()))
            .collect();

        sqlx::query(
            r#"UPDATE contracts SET
                 verified = TRUE,
                 source_code = $2,
                 source_files = $3,
                 abi = $4,
                 compiler_version = $5,
                 optimization_used = $6,
                 runs = $7,
                 constructor_arguments = $8,
                 libraries = $9,
                 evm_version = $10,
                 is_multi_file = $11,
                 main_file = $12,
                 verification_metadata = $13,
                 verified_at = $14
               WHERE address = $1"#,
        )
        .bind(verification.address.as_lowercase_hex())
        .bind(source_code)
        .bind(source_files)
        .bind(&verification.abi)
        .bind(&verification.compiler_version)
        .bind(verification.optimization_used)
        .bind(verification.runs as i32)
        .bind(&verification.constructor_arguments)
        .bind(serde_json::to_value(&libraries)?)
        .bind(&verification.evm_version)
        .bind(verification.is_multi_file)
        .bind(&verification.main_file)
        .bind(&verification.verification_metadata)
        .bind(verification.verified_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -- ingest state (I1) ----------------------------------------------

    pub async fn ingest_state(&self) -> Result<IngestState, StoreError> {
        let row = sqlx::query("SELECT latest_processed_block FROM ingest_state WHERE singleton")
            .fetch_one(&self.pool)
            .await?;
        Ok(IngestState {
            latest_processed_block: sqlx::Row::try_get::<i64, _>(&row, "latest_processed_block")? as u64,
        })
    }

    /// Advances the forward-progress marker. Never regresses: I1 requires
    /// `latest_processed_block` to be monotonically non-decreasing, so a
    /// lower value is silently ignored rather than erroring — ingestion
    /// retries naturally produce repeats or no-ops, never regressions.
    pub async fn advance_ingest_state(&self, block_number: u64) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE ingest_state SET latest_processed_block = $1 WHERE singleton AND latest_processed_block < $1",
        )
        .bind(block_number as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub async fn insert_block<'c, E>(executor: E, block: &Block) -> Result<(), StoreError>
where
    E: PgExecutor<'c>,
{
    sqlx::query(
        r#"INSERT INTO blocks
             (number, hash, parent_hash, timestamp, transactions_count, gas_used, gas_limit,
              base_fee_per_gas, miner, nonce, difficulty, extra_data)
           VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
           ON CONFLICT (number) DO UPDATE SET
             hash = EXCLUDED.hash,
             parent_hash = EXCLUDED.parent_hash"#,
    )
    .bind(block.number as i64)
    .bind(block.hash.to_string())
    .bind(block.parent_hash.to_string())
    .bind(block.timestamp)
    .bind(block.transactions_count as i32)
    .bind(block.gas_used.as_decimal_string())
    .bind(block.gas_limit.as_decimal_string())
    .bind(block.base_fee_per_gas.map(|a| a.as_decimal_string()))
    .bind(block.miner.map(|a| a.as_lowercase_hex()))
    .bind(&block.nonce)
    .bind(block.difficulty.map(|a| a.as_decimal_string()))
    .bind(&block.extra_data)
    .execute(executor)
    .await?;
    Ok(())
}

async fn get_block(pool: &PgPool, number: u64) -> Result<Option<Block>, StoreError> {
    let row: Option<PgRow> = sqlx::query("SELECT * FROM blocks WHERE number = $1")
        .bind(number as i64)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(rows::block_from_row).transpose()
}

pub async fn insert_transaction<'c, E>(executor: E, tx: &Transaction) -> Result<(), StoreError>
where
    E: PgExecutor<'c>,
{
    sqlx::query(
        r#"INSERT INTO transactions
             (hash, block_number, "from", "to", value, gas_price, gas_limit, gas_used,
              input_data, nonce, transaction_index, status, timestamp)
           VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
           ON CONFLICT (hash) DO UPDATE SET
             status = EXCLUDED.status,
             gas_used = EXCLUDED.gas_used"#,
    )
    .bind(tx.hash.to_string())
    .bind(tx.block_number as i64)
    .bind(tx.from.as_lowercase_hex())
    .bind(tx.to.map(|a| a.as_lowercase_hex()))
    .bind(tx.value.as_decimal_string())
    .bind(tx.gas_price.as_decimal_string())
    .bind(tx.gas_limit.as_decimal_string())
    .bind(tx.gas_used.as_decimal_string())
    .bind(&tx.input_data)
    .bind(tx.nonce as i64)
    .bind(tx.transaction_index as i32)
    .bind(tx.status)
    .bind(tx.timestamp)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn insert_token_transfer<'c, E>(
    executor: E,
    transfer: &TokenTransfer,
) -> Result<(), StoreError>
where
    E: PgExecutor<'c>,
{
    let token_type = match transfer.token_type {
        indexer_types::TokenType::Erc20 => "ERC20",
        indexer_types::TokenType::Erc721 => "ERC721",
        indexer_types::TokenType::Erc1155 => "ERC1155",
    };
    sqlx::query(
        r#"INSERT INTO token_transfers
             (transaction_hash, log_index, token_address, "from", "to", token_id,
              block_number, transaction_index, value, token_type, timestamp)
           VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
           ON CONFLICT (transaction_hash, token_address, "from", "to", COALESCE(token_id, ''))
           DO UPDATE SET value = EXCLUDED.value, timestamp = EXCLUDED.timestamp"#,
    )
    .bind(transfer.transaction_hash.to_string())
    .bind(transfer.log_index as i32)
    .bind(transfer.token_address.as_lowercase_hex())
    .bind(transfer.from.as_lowercase_hex())
    .bind(transfer.to.as_lowercase_hex())
    .bind(transfer.token_id.map(|a| a.as_decimal_string()))
    .bind(transfer.block_number as i64)
    .bind(transfer.transaction_index as i32)
    .bind(transfer.value.as_decimal_string())
    .bind(token_type)
    .bind(transfer.timestamp)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn insert_contract<'c, E>(executor: E, contract: &Contract) -> Result<(), StoreError>
where
    E: PgExecutor<'c>,
{
    let contract_type = match contract.contract_type {
        indexer_types::ContractType::Erc20 => "ERC20",
        indexer_types::ContractType::Erc721 => "ERC721",
        indexer_types::ContractType::Erc1155 => "ERC1155",
        indexer_types::ContractType::Unknown => "UNKNOWN",
    };
    sqlx::query(
        r#"INSERT INTO contracts
             (address, creator, creation_tx, block_number, timestamp, contract_type,
              name, symbol, decimals, total_supply, bytecode, verified)
           VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,FALSE)
           ON CONFLICT (address) DO UPDATE SET
             creator = COALESCE(contracts.creator, EXCLUDED.creator),
             name = COALESCE(contracts.name, EXCLUDED.name),
             symbol = COALESCE(contracts.symbol, EXCLUDED.symbol),
             decimals = COALESCE(contracts.decimals, EXCLUDED.decimals),
             total_supply = COALESCE(contracts.total_supply, EXCLUDED.total_supply),
             bytecode = COALESCE(contracts.bytecode, EXCLUDED.bytecode)"#,
    )
    .bind(contract.address.as_lowercase_hex())
    .bind(if contract.creator.is_zero() {
        None
    } else {
        Some(contract.creator.as_lowercase_hex())
    })
    .bind(contract.creation_tx.to_string())
    .bind(contract.block_number as i64)
    .bind(contract.timestamp)
    .bind(contract_type)
    .bind(&contract.name)
    .bind(&contract.symbol)
    .bind(contract.decimals.map(|d| d as i16))
    .bind(contract.total_supply.map(|a| a.as_decimal_string()))
    .bind(&contract.bytecode)
    .execute(executor)
    .await?;
    Ok(())
}
