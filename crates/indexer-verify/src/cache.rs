//! Compile-result cache (spec.md §4.F). Keyed on a digest of every input
//! that affects the compiled bytecode, write-once-per-key: a hit returns
//! the prior artifact without invoking solc again.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use indexer_types::Address;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// The compiled output this engine needs out of a solc run.
#[derive(Debug, Clone)]
pub struct CompilationArtifact {
    pub abi: serde_json::Value,
    pub bytecode: Vec<u8>,
    pub deployed_bytecode: Vec<u8>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct CacheKeyInput<'a> {
    source_code: Option<&'a str>,
    source_files: Option<&'a BTreeMap<String, String>>,
    compiler_version: &'a str,
    contract_name: &'a str,
    optimization_used: bool,
    runs: u32,
    libraries: &'a BTreeMap<String, Address>,
    evm_version: &'a str,
    via_ir: bool,
}

#[allow(clippy::too_many_arguments)]
pub fn cache_key(
    source_code: Option<&str>,
    source_files: Option<&BTreeMap<String, String>>,
    compiler_version: &str,
    contract_name: &str,
    optimization_used: bool,
    runs: u32,
    libraries: &BTreeMap<String, Address>,
    evm_version: &str,
    via_ir: bool,
) -> String {
    let input = CacheKeyInput {
        source_code,
        source_files,
        compiler_version,
        contract_name,
        optimization_used,
        runs,
        libraries,
        evm_version,
        via_ir,
    };
    let json = serde_json::to_vec(&input).expect("cache key input is always serializable");
    let digest = Sha256::digest(json);
    hex::encode(digest)
}

#[derive(Clone, Default)]
pub struct ArtifactCache {
    inner: Arc<DashMap<String, CompilationArtifact>>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        ArtifactCache::default()
    }

    pub fn get(&self, key: &str) -> Option<CompilationArtifact> {
        self.inner.get(key).map(|entry| entry.clone())
    }

    /// Write-once-per-key: a concurrent second writer for the same key is
    /// a no-op, since both compiles started from identical inputs.
    pub fn insert(&self, key: String, artifact: CompilationArtifact) {
        self.inner.entry(key).or_insert(artifact);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_produce_the_same_key() {
        let libs = BTreeMap::new();
        let a = cache_key(Some("contract A {}"), None, "0.8.20", "A", true, 200, &libs, "shanghai", false);
        let b = cache_key(Some("contract A {}"), None, "0.8.20", "A", true, 200, &libs, "shanghai", false);
        assert_eq!(a, b);
    }

    #[test]
    fn differing_source_produces_a_different_key() {
        let libs = BTreeMap::new();
        let a = cache_key(Some("contract A {}"), None, "0.8.20", "A", true, 200, &libs, "shanghai", false);
        let b = cache_key(Some("contract B {}"), None, "0.8.20", "A", true, 200, &libs, "shanghai", false);
        assert_ne!(a, b);
    }
}
