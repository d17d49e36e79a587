//! The ingestion loop itself (spec.md §4.C).

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use dashmap::DashSet;
use indexer_contracts::detect_contract;
use indexer_derive::{
    confirm_token_type, decode_transfer_logs, fetch_collection_fields, fetch_metadata, resolve_token_uri,
};
use indexer_rpc::RpcPool;
use indexer_store::Store;
use indexer_types::{Address, Block, NftCollection, NftToken, TokenAmount, TokenTransfer, TokenType, Transaction};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::IngestError;
use crate::state::IngestPhase;

/// Fixed timeout for off-chain metadata document fetches (spec.md §4.D).
const METADATA_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct IngestConfig {
    /// Heights newer than `head - confirmations` are not yet processed
    /// (backpressure loop in spec.md §4.C step 1).
    pub confirmations: u64,
    pub retry_backoff: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            confirmations: 2,
            retry_backoff: Duration::from_secs(5),
        }
    }
}

pub struct Pipeline {
    rpc: RpcPool,
    store: Store,
    config: IngestConfig,
    phase_tx: watch::Sender<IngestPhase>,
    http_client: reqwest::Client,
    /// Token addresses already confirmed via `confirm_token_type` this
    /// process's lifetime, so the probe only runs once per token.
    confirmed_token_types: DashSet<Address>,
}

impl Pipeline {
    pub fn new(rpc: RpcPool, store: Store, config: IngestConfig) -> Self {
        let (phase_tx, _) = watch::channel(IngestPhase::Idle);
        Pipeline {
            rpc,
            store,
            config,
            phase_tx,
            http_client: reqwest::Client::new(),
            confirmed_token_types: DashSet::new(),
        }
    }

    /// For the Supervisor (spec.md §4.G) to observe liveness without
    /// coupling to this crate's internals.
    pub fn subscribe_phase(&self) -> watch::Receiver<IngestPhase> {
        self.phase_tx.subscribe()
    }

    fn set_phase(&self, phase: IngestPhase) {
        let _ = self.phase_tx.send(phase);
    }

    /// Runs until `cancel` fires. Each height retries in place on failure
    /// (at-least-once externally, exactly-once internally via I4's
    /// idempotent inserts), never skipping forward.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), IngestError> {
        loop {
            if cancel.is_cancelled() {
                self.set_phase(IngestPhase::Stopped);
                return Ok(());
            }

            let state = self.store.ingest_state().await?;
            let height = state.latest_processed_block + 1;

            self.set_phase(IngestPhase::Fetching);
            let head = match self.rpc.latest_block().await {
                Ok(head) => head,
                Err(e) => {
                    warn!(error = %e, "latest_block failed, retrying");
                    if self.sleep_or_stop(&cancel).await {
                        return Ok(());
                    }
                    continue;
                }
            };

            if height + self.config.confirmations > head {
                if self.sleep_or_stop(&cancel).await {
                    return Ok(());
                }
                continue;
            }

            match self.process_height(height).await {
                Ok(()) => info!(height, "committed height"),
                Err(e) => {
                    error!(height, error = %e, "height processing failed, retrying");
                    if self.sleep_or_stop(&cancel).await {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn sleep_or_stop(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.config.retry_backoff) => false,
            _ = cancel.cancelled() => {
                self.set_phase(IngestPhase::Stopped);
                true
            }
        }
    }

    #[instrument(skip(self), fields(height))]
    async fn process_height(&self, height: u64) -> Result<(), IngestError> {
        self.set_phase(IngestPhase::Fetching);
        let (block, mut txs) = self.rpc.block_with_transactions(height).await?;
        txs.sort_by_key(|tx| tx.transaction_index);

        self.set_phase(IngestPhase::Deriving);
        let mut per_tx = Vec::with_capacity(txs.len());
        for tx in &txs {
            let receipt = self
                .rpc
                .receipt(tx.hash)
                .await?
                .ok_or_else(|| indexer_rpc::RpcError::BlockNotFound(height))?;
            let transfers = decode_transfer_logs(&receipt.logs, block.timestamp)?;
            per_tx.push((tx.clone(), transfers, receipt.contract_address));
        }

        self.derive_nft_state(&block, &per_tx).await?;

        self.set_phase(IngestPhase::Committing);
        self.commit_height(&block, &per_tx).await?;
        self.store.advance_ingest_state(height).await?;
        Ok(())
    }

    /// Resolves NFT ownership and collection metadata for every ERC-721/1155
    /// transfer this height carries (spec.md §2 component D "NFT ownership,
    /// collection metadata fetch", §4.D "Metadata resolution"). Also runs
    /// the on-chain confirmation of the topic-count heuristic the first
    /// time a token address is seen.
    async fn derive_nft_state(
        &self,
        block: &Block,
        per_tx: &[(Transaction, Vec<TokenTransfer>, Option<Address>)],
    ) -> Result<(), IngestError> {
        let mut latest: HashMap<(Address, String), (Address, TokenType, TokenAmount)> = HashMap::new();

        for (_, transfers, _) in per_tx {
            for transfer in transfers {
                if !matches!(transfer.token_type, TokenType::Erc721 | TokenType::Erc1155) {
                    continue;
                }
                let Some(token_id) = transfer.token_id else {
                    continue;
                };

                if self.confirmed_token_types.insert(transfer.token_address) {
                    confirm_token_type(&self.rpc, transfer.token_address, transfer.token_type).await;
                }

                latest.insert(
                    (transfer.token_address, token_id.as_decimal_string()),
                    (transfer.to, transfer.token_type, token_id),
                );
            }
        }

        for ((token_address, token_id_str), (owner, token_type, token_id)) in latest {
            let existing = self.store.get_nft_token(token_address, &token_id_str).await?;
            let (metadata_uri, name, image_url, metadata) = match existing {
                Some(prev) => (prev.metadata_uri, prev.name, prev.image_url, prev.metadata),
                None => match resolve_token_uri(&self.rpc, token_address, &token_id, token_type).await {
                    Some(uri) => match fetch_metadata(&self.http_client, &uri, METADATA_FETCH_TIMEOUT).await {
                        Some(resolved) => (Some(uri), resolved.name, resolved.image_url, Some(resolved.raw)),
                        None => (Some(uri), None, None, None),
                    },
                    None => (None, None, None, None),
                },
            };

            self.store
                .upsert_nft_token(&NftToken {
                    token_address,
                    token_id,
                    owner_address: owner,
                    metadata_uri,
                    name,
                    image_url,
                    metadata,
                    last_updated: block.timestamp,
                })
                .await?;

            if self.store.get_nft_collection(token_address).await?.is_none() {
                let (name, symbol, total_supply) = fetch_collection_fields(&self.rpc, token_address).await;
                self.store
                    .upsert_nft_collection(&NftCollection {
                        token_address,
                        name,
                        symbol,
                        total_supply,
                        owner_count: None,
                        last_updated: block.timestamp,
                    })
                    .await?;
            }
        }

        Ok(())
    }

    async fn commit_height(
        &self,
        block: &Block,
        per_tx: &[(Transaction, Vec<indexer_types::TokenTransfer>, Option<indexer_types::Address>)],
    ) -> Result<(), IngestError> {
        let mut db_tx = self.store.begin().await?;

        indexer_store::insert_block(&mut *db_tx, block).await?;

        let mut seen_this_height = HashSet::new();

        for (tx, transfers, created_address) in per_tx {
            indexer_store::insert_transaction(&mut *db_tx, tx).await?;

            for transfer in transfers {
                indexer_store::insert_token_transfer(&mut *db_tx, transfer).await?;
            }

            if let Some(address) = created_address {
                if let Some(contract) =
                    detect_contract(&self.rpc, *address, tx.from, tx.hash, block.number, block.timestamp).await?
                {
                    indexer_store::insert_contract(&mut *db_tx, &contract).await?;
                }
                seen_this_height.insert(*address);
            }

            let mut candidates: Vec<Address> = transfers.iter().map(|t| t.token_address).collect();
            if let Some(to) = tx.to {
                candidates.push(to);
            }

            for address in candidates {
                if !seen_this_height.insert(address) {
                    continue;
                }
                if self.store.get_contract(address).await?.is_some() {
                    continue;
                }
                if let Some(contract) =
                    detect_contract(&self.rpc, address, Address::ZERO, tx.hash, block.number, block.timestamp).await?
                {
                    indexer_store::insert_contract(&mut *db_tx, &contract).await?;
                }
            }
        }

        db_tx.commit().await.map_err(indexer_store::StoreError::from)?;
        Ok(())
    }
}
