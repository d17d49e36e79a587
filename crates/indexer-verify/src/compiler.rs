//! solc resolution and invocation (spec.md §4.F). Wraps `svm` for compiler
//! download/caching and `foundry-compilers` for the actual compile.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::str::FromStr;

use foundry_compilers::artifacts::{
    EvmVersion, Libraries, Optimizer, Settings, Source, Sources,
};
use foundry_compilers::CompilerInput;
use foundry_compilers::solc::Solc;
use indexer_types::Address;
use semver::Version;
use tracing::debug;

use crate::cache::CompilationArtifact;
use crate::error::VerifyError;
use crate::import_resolver::ImportResolver;

/// Ensures `version` is installed locally, downloading it via `svm` on a
/// cache miss, and returns a `Solc` handle pinned to that exact binary.
pub async fn resolve_solc(version: &str) -> Result<Solc, VerifyError> {
    let parsed = Version::parse(version.split('+').next().unwrap_or(version))
        .map_err(|e| VerifyError::CompileError(format!("invalid compiler version {version}: {e}")))?;

    let version_for_install = parsed.clone();
    let path: PathBuf = tokio::task::spawn_blocking(move || -> Result<PathBuf, VerifyError> {
        if !svm::has_version(&version_for_install.to_string()) {
            svm::blocking_install(&version_for_install)
                .map_err(|e| VerifyError::CompileError(format!("failed to install solc {version_for_install}: {e}")))?;
        }
        Ok(svm::version_path(&version_for_install.to_string()).join(format!("solc-{version_for_install}")))
    })
    .await
    .map_err(|e| VerifyError::CompileError(format!("solc install task panicked: {e}")))??;

    Solc::new(path).map_err(|e| VerifyError::CompileError(format!("failed to load solc {version}: {e}")))
}

/// Flattens a single source string into a one-file `Sources` map under
/// `contract_name.sol` — the resolver is unused for single-file input since
/// there is nothing to import from outside it.
fn single_file_sources(contract_name: &str, source_code: &str) -> Sources {
    let mut sources = Sources::new();
    sources.insert(
        PathBuf::from(format!("{contract_name}.sol")),
        Source::new(source_code),
    );
    sources
}

/// Resolves every import reachable from the entries in `source_files` and
/// builds the full `Sources` map solc needs, erroring on unresolvable or
/// circular imports (spec.md §4.F).
fn multi_file_sources(files: &BTreeMap<String, String>) -> Result<Sources, VerifyError> {
    let resolver = ImportResolver::new(files.clone());
    let import_re = regex::Regex::new(r#"import\s+(?:[^"';]+from\s+)?["']([^"']+)["']"#)
        .expect("import regex is a fixed valid pattern");

    let mut sources = Sources::new();
    let mut visited = HashSet::new();
    let mut queue: Vec<String> = files.keys().cloned().collect();

    while let Some(path) = queue.pop() {
        if !visited.insert(path.clone()) {
            continue;
        }
        let content = match files.get(&path) {
            Some(content) => content.clone(),
            None => {
                let (resolved_path, content) = resolver.resolve(&path)?;
                if resolved_path != path {
                    continue;
                }
                content.to_string()
            }
        };
        for capture in import_re.captures_iter(&content) {
            let import_path = &capture[1];
            let mut import_visited = HashSet::new();
            let (resolved_path, _) = resolver.resolve_tracked(&path, import_path, &mut import_visited)?;
            if !visited.contains(resolved_path) {
                queue.push(resolved_path.to_string());
            }
        }
        sources.insert(PathBuf::from(&path), Source::new(content));
    }

    Ok(sources)
}

#[allow(clippy::too_many_arguments)]
pub fn build_input(
    contract_name: &str,
    source_code: Option<&str>,
    source_files: Option<&BTreeMap<String, String>>,
    optimization_used: bool,
    runs: u32,
    libraries: &BTreeMap<String, BTreeMap<String, Address>>,
    evm_version: &str,
) -> Result<CompilerInput, VerifyError> {
    let sources = match source_files {
        Some(files) => multi_file_sources(files)?,
        None => single_file_sources(
            contract_name,
            source_code.ok_or_else(|| {
                VerifyError::CompileError("neither source_code nor source_files provided".into())
            })?,
        ),
    };

    let parsed_evm_version = EvmVersion::from_str(evm_version)
        .map_err(|e| VerifyError::CompileError(format!("unknown evm version {evm_version}: {e}")))?;

    let mut solc_libraries = Libraries::default();
    for (file, entries) in libraries {
        for (name, address) in entries {
            solc_libraries
                .libs
                .entry(PathBuf::from(file))
                .or_default()
                .insert(name.clone(), address.as_lowercase_hex());
        }
    }

    let settings = Settings {
        optimizer: Optimizer {
            enabled: Some(optimization_used),
            runs: Some(runs as usize),
            ..Default::default()
        },
        evm_version: Some(parsed_evm_version),
        libraries: solc_libraries,
        ..Default::default()
    };

    Ok(CompilerInput::with_sources(sources).settings(settings))
}

/// Runs `solc` on `input` and extracts the one contract named
/// `contract_name`, returning an error string on any solc-reported
/// diagnostic rather than surfacing partial output.
pub async fn compile(
    solc: Solc,
    input: CompilerInput,
    contract_name: &str,
) -> Result<CompilationArtifact, VerifyError> {
    let contract_name = contract_name.to_string();
    tokio::task::spawn_blocking(move || -> Result<CompilationArtifact, VerifyError> {
        let output = solc
            .compile(&input)
            .map_err(|e| VerifyError::CompileError(e.to_string()))?;

        if output.has_error() {
            let messages: Vec<String> = output
                .errors
                .iter()
                .filter(|e| e.severity.is_error())
                .map(|e| e.formatted_message.clone().unwrap_or_else(|| e.message.clone()))
                .collect();
            return Err(VerifyError::CompileError(messages.join("\n")));
        }

        for (_file, contracts) in output.contracts.iter() {
            if let Some(contract) = contracts.get(&contract_name) {
                let abi = contract
                    .abi
                    .as_ref()
                    .map(|abi| serde_json::to_value(abi))
                    .transpose()
                    .map_err(|e| VerifyError::CompileError(format!("abi serialization failed: {e}")))?
                    .unwrap_or(serde_json::Value::Null);
                let bytecode = contract
                    .evm
                    .as_ref()
                    .and_then(|evm| evm.bytecode.as_ref())
                    .and_then(|b| b.object.as_bytes())
                    .map(|b| b.to_vec())
                    .unwrap_or_default();
                let deployed_bytecode = contract
                    .evm
                    .as_ref()
                    .and_then(|evm| evm.deployed_bytecode.as_ref())
                    .and_then(|b| b.bytecode.as_ref())
                    .and_then(|b| b.object.as_bytes())
                    .map(|b| b.to_vec())
                    .unwrap_or_default();

                debug!(contract_name, bytecode_len = bytecode.len(), "compiled contract");

                return Ok(CompilationArtifact {
                    abi,
                    bytecode,
                    deployed_bytecode,
                    metadata: contract.metadata.as_ref().map(|m| serde_json::to_value(m).unwrap_or_default()),
                });
            }
        }

        Err(VerifyError::CompileError(format!(
            "contract {contract_name} not found in compiler output"
        )))
    })
    .await
    .map_err(|e| VerifyError::CompileError(format!("compile task panicked: {e}")))?
}
