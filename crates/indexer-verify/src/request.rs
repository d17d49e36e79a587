//! The public `verify` request/response shapes (spec.md §4.F).

use std::collections::BTreeMap;

use indexer_types::{Address, SourceInput};
use serde::{Deserialize, Serialize};

fn default_runs() -> u32 {
    200
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub address: Address,
    pub contract_name: String,
    pub compiler_version: String,
    #[serde(default)]
    pub optimization_used: bool,
    #[serde(default = "default_runs")]
    pub runs: u32,
    pub evm_version: Option<String>,
    pub source_code: Option<String>,
    pub source_files: Option<BTreeMap<String, String>>,
    pub constructor_arguments: Option<String>,
    #[serde(default)]
    pub libraries: BTreeMap<String, Address>,
}

impl VerifyRequest {
    pub fn is_multi_file(&self) -> bool {
        self.source_files.is_some()
    }

    pub fn source(&self) -> Option<SourceInput> {
        if let Some(files) = &self.source_files {
            Some(SourceInput::MultiFile(files.clone()))
        } else {
            self.source_code.clone().map(SourceInput::Single)
        }
    }

    /// Total byte size of every source entry, checked against
    /// `verification.max_source_bytes`.
    pub fn source_byte_len(&self) -> usize {
        match &self.source_files {
            Some(files) => files.values().map(|s| s.len()).sum(),
            None => self.source_code.as_ref().map_or(0, |s| s.len()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResult {
    pub success: bool,
    pub message: String,
    pub abi: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
}
