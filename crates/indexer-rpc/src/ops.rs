//! Upper-layer RPC operations (spec.md §4.A "Methods exposed to upper layers").
//!
//! Every method here goes through [`RpcPool::execute`], so callers get
//! health-aware failover for free and never talk to a single endpoint
//! directly.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::Provider;
use alloy_rpc_types_eth::{BlockNumberOrTag, BlockTransactionsKind, Filter, TransactionRequest};
use indexer_types::{Address as IAddress, Block, TokenAmount, Transaction};

use crate::error::RpcError;
use crate::pool::RpcPool;
use crate::types::{u256_amount, LogFilter, RawLog, Receipt};

impl RpcPool {
    /// `eth_blockNumber`.
    pub async fn latest_block(&self) -> Result<u64, RpcError> {
        self.execute(|provider| async move {
            provider
                .get_block_number()
                .await
                .map_err(|e| RpcError::Single {
                    endpoint: "<pooled>".into(),
                    message: e.to_string(),
                })
        })
        .await
    }

    /// `eth_getBlockByNumber` without transaction bodies.
    pub async fn block_by_number(&self, number: u64) -> Result<Block, RpcError> {
        self.execute(|provider| async move {
            let block = provider
                .get_block_by_number(BlockNumberOrTag::Number(number))
                .await
                .map_err(to_single)?
                .ok_or(RpcError::BlockNotFound(number))?;
            Ok(convert_block(&block))
        })
        .await
    }

    /// `eth_getBlockByNumber` with the `true` (full transactions) flag.
    pub async fn block_with_transactions(
        &self,
        number: u64,
    ) -> Result<(Block, Vec<Transaction>), RpcError> {
        self.execute(|provider| async move {
            let block = provider
                .get_block_by_number(BlockNumberOrTag::Number(number))
                .full()
                .await
                .map_err(to_single)?
                .ok_or(RpcError::BlockNotFound(number))?;
            let converted = convert_block(&block);
            let txs = block
                .transactions
                .into_transactions()
                .map(|tx| convert_transaction(&tx, converted.timestamp))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((converted, txs))
        })
        .await
    }

    /// `eth_getTransactionByHash`.
    pub async fn transaction(&self, hash: B256) -> Result<Option<Transaction>, RpcError> {
        self.execute(|provider| async move {
            let tx = provider
                .get_transaction_by_hash(hash)
                .await
                .map_err(to_single)?;
            match tx {
                Some(tx) => {
                    let block_timestamp = match tx.block_number() {
                        Some(n) => provider
                            .get_block_by_number(BlockNumberOrTag::Number(n))
                            .await
                            .map_err(to_single)?
                            .map(|b| b.header.timestamp as i64)
                            .unwrap_or(0),
                        None => 0,
                    };
                    Ok(Some(convert_transaction(&tx, block_timestamp)?))
                }
                None => Ok(None),
            }
        })
        .await
    }

    /// `eth_getTransactionReceipt`.
    pub async fn receipt(&self, hash: B256) -> Result<Option<Receipt>, RpcError> {
        self.execute(|provider| async move {
            let receipt = provider
                .get_transaction_receipt(hash)
                .await
                .map_err(to_single)?;
            Ok(receipt.map(|r| convert_receipt(&r)))
        })
        .await
    }

    /// `eth_getCode`.
    pub async fn code(&self, address: Address) -> Result<Bytes, RpcError> {
        self.execute(move |provider| async move {
            provider.get_code_at(address).await.map_err(to_single)
        })
        .await
    }

    /// `eth_getBalance`.
    pub async fn balance(&self, address: Address) -> Result<U256, RpcError> {
        self.execute(move |provider| async move {
            provider.get_balance(address).await.map_err(to_single)
        })
        .await
    }

    /// `eth_getLogs`.
    pub async fn logs(&self, filter: LogFilter) -> Result<Vec<RawLog>, RpcError> {
        self.execute(move |provider| {
            let filter = filter.clone();
            async move {
                let mut f = Filter::new()
                    .from_block(filter.from_block)
                    .to_block(filter.to_block);
                if let Some(address) = filter.address {
                    f = f.address(address);
                }
                for topic in filter.topics.iter().flatten() {
                    f = f.event_signature(*topic);
                }
                let logs = provider.get_logs(&f).await.map_err(to_single)?;
                Ok(logs.iter().map(convert_log).collect())
            }
        })
        .await
    }

    /// `eth_call` against `address` with pre-encoded `calldata`.
    pub async fn call(&self, address: Address, calldata: Bytes) -> Result<Bytes, RpcError> {
        self.execute(move |provider| {
            let calldata = calldata.clone();
            async move {
                let tx = TransactionRequest::default()
                    .to(address)
                    .input(calldata.into());
                provider.call(tx).await.map_err(to_single)
            }
        })
        .await
    }

    /// `eth_pendingTransactions`. Best-effort and not wired into the main
    /// ingestion loop (spec.md §9 Open Questions #2): most public nodes
    /// don't expose a pending-tx feed, so failures here are expected and
    /// callers should treat this as advisory.
    pub async fn pending_transactions(&self) -> Result<Vec<Transaction>, RpcError> {
        self.execute(|provider| async move {
            let block = provider
                .get_block_by_number(BlockNumberOrTag::Pending)
                .full()
                .await
                .map_err(to_single)?
                .ok_or(RpcError::BlockNotFound(0))?;
            let timestamp = block.header.timestamp as i64;
            block
                .transactions
                .into_transactions()
                .map(|tx| convert_transaction(&tx, timestamp))
                .collect()
        })
        .await
    }
}

fn to_single<E: std::fmt::Display>(e: E) -> RpcError {
    RpcError::Single {
        endpoint: "<pooled>".into(),
        message: e.to_string(),
    }
}

fn convert_block(block: &alloy_rpc_types_eth::Block) -> Block {
    let header = &block.header;
    Block {
        number: header.number,
        hash: header.hash,
        parent_hash: header.parent_hash,
        timestamp: header.timestamp as i64,
        transactions_count: block.transactions.len() as u32,
        gas_used: TokenAmount::from_u256(U256::from(header.gas_used)),
        gas_limit: TokenAmount::from_u256(U256::from(header.gas_limit)),
        base_fee_per_gas: header
            .base_fee_per_gas
            .map(|v| TokenAmount::from_u256(U256::from(v))),
        miner: Some(IAddress::from(header.beneficiary)),
        nonce: Some(hex::encode(header.nonce.0)),
        difficulty: Some(TokenAmount::from_u256(header.difficulty)),
        extra_data: Some(hex::encode(&header.extra_data)),
    }
}

fn convert_transaction(
    tx: &alloy_rpc_types_eth::Transaction,
    block_timestamp: i64,
) -> Result<Transaction, RpcError> {
    Ok(Transaction {
        hash: *tx.inner.tx_hash(),
        block_number: tx.block_number.unwrap_or_default(),
        from: IAddress::from(tx.from),
        to: tx.to().map(IAddress::from),
        value: u256_amount(tx.value()),
        gas_price: TokenAmount::from_u256(U256::from(tx.gas_price().unwrap_or_default())),
        gas_limit: TokenAmount::from_u256(U256::from(tx.gas_limit())),
        gas_used: TokenAmount::ZERO,
        input_data: hex::encode(tx.input()),
        nonce: tx.nonce(),
        transaction_index: tx.transaction_index.unwrap_or_default() as u32,
        status: None,
        timestamp: block_timestamp,
    })
}

fn convert_receipt(receipt: &alloy_rpc_types_eth::TransactionReceipt) -> Receipt {
    Receipt {
        transaction_hash: receipt.transaction_hash,
        status: Some(receipt.status()),
        gas_used: TokenAmount::from_u256(U256::from(receipt.gas_used)),
        logs: receipt.logs().iter().map(convert_log).collect(),
        contract_address: receipt.contract_address.map(IAddress::from),
    }
}

fn convert_log(log: &alloy_rpc_types_eth::Log) -> RawLog {
    RawLog {
        address: IAddress::from(log.address()),
        topics: log.topics().to_vec(),
        data: log.data().data.clone(),
        log_index: log.log_index.unwrap_or_default() as u32,
        transaction_hash: log.transaction_hash.unwrap_or_default(),
        transaction_index: log.transaction_index.unwrap_or_default() as u32,
        block_number: log.block_number.unwrap_or_default(),
    }
}
