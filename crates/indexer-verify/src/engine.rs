//! Verification orchestration (spec.md §4.F): validates a request, runs a
//! deterministic recompile, compares against on-chain bytecode, and
//! persists the result.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use indexer_rpc::RpcPool;
use indexer_store::Store;
use indexer_types::{Address, ContractVerification};
use regex::Regex;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::bytecode::{self, BytecodeComparison};
use crate::cache::{cache_key, ArtifactCache};
use crate::compiler;
use crate::error::VerifyError;
use crate::evm_version::default_evm_version;
use crate::libraries::bucket_libraries;
use crate::request::{VerifyRequest, VerifyResult};

const MAX_SOURCE_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(120);

fn constructor_args_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(0x)?[0-9a-fA-F]*$").expect("fixed valid pattern"))
}

fn current_unix_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub struct VerifyEngine {
    rpc: RpcPool,
    store: Store,
    cache: ArtifactCache,
    locks: DashMap<Address, Arc<Mutex<()>>>,
    compile_timeout: Duration,
}

impl VerifyEngine {
    pub fn new(rpc: RpcPool, store: Store) -> Self {
        VerifyEngine {
            rpc,
            store,
            cache: ArtifactCache::new(),
            locks: DashMap::new(),
            compile_timeout: DEFAULT_COMPILE_TIMEOUT,
        }
    }

    fn lock_for(&self, address: Address) -> Arc<Mutex<()>> {
        self.locks
            .entry(address)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    #[instrument(skip(self, request), fields(address = %request.address))]
    pub async fn verify(&self, request: VerifyRequest) -> Result<VerifyResult, VerifyError> {
        let byte_len = request.source_byte_len();
        if byte_len > MAX_SOURCE_BYTES {
            return Err(VerifyError::SourceTooLarge(MAX_SOURCE_BYTES));
        }

        let constructor_args_hex = request.constructor_arguments.as_deref().unwrap_or("");
        if !constructor_args_re().is_match(constructor_args_hex) {
            return Err(VerifyError::InvalidConstructorArgs(constructor_args_hex.to_string()));
        }
        let constructor_args = hex::decode(constructor_args_hex.trim_start_matches("0x"))
            .map_err(|e| VerifyError::InvalidConstructorArgs(e.to_string()))?;

        let onchain_code = self.rpc.code(request.address.inner()).await?;
        if onchain_code.is_empty() {
            return Err(VerifyError::NotAContract(request.address));
        }

        // Serialize concurrent verification attempts for the same address:
        // a second request piggybacks on the cache the first one fills.
        let lock = self.lock_for(request.address);
        let _guard = lock.lock().await;

        let evm_version = request
            .evm_version
            .clone()
            .unwrap_or_else(|| default_evm_version(&request.compiler_version).to_string());
        let bucketed_libraries = bucket_libraries(&request.libraries);

        let key = cache_key(
            request.source_code.as_deref(),
            request.source_files.as_ref(),
            &request.compiler_version,
            &request.contract_name,
            request.optimization_used,
            request.runs,
            &request.libraries,
            &evm_version,
            false,
        );

        let artifact = match self.cache.get(&key) {
            Some(artifact) => artifact,
            None => {
                let solc = compiler::resolve_solc(&request.compiler_version).await?;
                let input = compiler::build_input(
                    &request.contract_name,
                    request.source_code.as_deref(),
                    request.source_files.as_ref(),
                    request.optimization_used,
                    request.runs,
                    &bucketed_libraries,
                    &evm_version,
                )?;
                let artifact = tokio::time::timeout(
                    self.compile_timeout,
                    compiler::compile(solc, input, &request.contract_name),
                )
                .await
                .map_err(|_| VerifyError::CompileError("compilation timed out".to_string()))??;
                self.cache.insert(key, artifact.clone());
                artifact
            }
        };

        let args_for_compare = (!constructor_args.is_empty()).then_some(constructor_args.as_slice());
        let comparison = bytecode::compare(&onchain_code, &artifact.deployed_bytecode, args_for_compare);

        match comparison {
            BytecodeComparison::Verified => {
                let source = request
                    .source()
                    .expect("source presence already validated by source_byte_len/build_input");
                let verification = ContractVerification {
                    address: request.address,
                    source,
                    abi: artifact.abi.clone(),
                    compiler_version: request.compiler_version.clone(),
                    optimization_used: request.optimization_used,
                    runs: request.runs,
                    constructor_arguments: request.constructor_arguments.clone(),
                    libraries: request.libraries.clone(),
                    evm_version,
                    is_multi_file: request.is_multi_file(),
                    main_file: request.is_multi_file().then(|| request.contract_name.clone()),
                    verification_metadata: artifact.metadata.clone(),
                    verified_at: current_unix_timestamp(),
                };
                self.store.upsert_verification(&verification).await?;
                info!(address = %request.address, "contract verified");
                Ok(VerifyResult {
                    success: true,
                    message: "bytecode matches the submitted source".to_string(),
                    abi: Some(artifact.abi),
                    metadata: artifact.metadata,
                })
            }
            BytecodeComparison::MetadataOnlyMatch => {
                warn!(address = %request.address, "metadata-only match");
                Ok(VerifyResult {
                    success: false,
                    message: "metadata hash matches but the compiled code does not; check constructor arguments and libraries".to_string(),
                    abi: None,
                    metadata: None,
                })
            }
            BytecodeComparison::BytecodeMismatch => {
                warn!(address = %request.address, "bytecode mismatch");
                Ok(VerifyResult {
                    success: false,
                    message: "compiled bytecode does not match the on-chain code".to_string(),
                    abi: None,
                    metadata: None,
                })
            }
        }
    }

    pub async fn is_verified(&self, address: Address) -> Result<bool, VerifyError> {
        Ok(self.store.get_contract(address).await?.map(|c| c.verified).unwrap_or(false))
    }

    pub async fn verification(&self, address: Address) -> Result<ContractVerification, VerifyError> {
        let contract = self.store.get_contract(address).await?;
        contract
            .and_then(|c| c.verification)
            .ok_or(VerifyError::NotVerified(address))
    }

    pub async fn abi(&self, address: Address) -> Result<serde_json::Value, VerifyError> {
        Ok(self.verification(address).await?.abi)
    }

    pub async fn source(&self, address: Address) -> Result<indexer_types::SourceInput, VerifyError> {
        Ok(self.verification(address).await?.source)
    }
}
