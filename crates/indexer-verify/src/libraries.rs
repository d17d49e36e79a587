//! Library address bucketing (spec.md §4.F): entries with a `:` are
//! `file:library`; otherwise bucketed under `contract.sol`.

use std::collections::BTreeMap;

use indexer_types::Address;

const DEFAULT_FILE: &str = "contract.sol";

pub fn bucket_libraries(libraries: &BTreeMap<String, Address>) -> BTreeMap<String, BTreeMap<String, Address>> {
    let mut buckets: BTreeMap<String, BTreeMap<String, Address>> = BTreeMap::new();
    for (name, address) in libraries {
        let (file, lib_name) = match name.split_once(':') {
            Some((file, lib)) => (file.to_string(), lib.to_string()),
            None => (DEFAULT_FILE.to_string(), name.clone()),
        };
        buckets.entry(file).or_default().insert(lib_name, *address);
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_names_bucket_by_file() {
        let mut libs = BTreeMap::new();
        libs.insert("libs/Math.sol:Math".to_string(), Address::ZERO);
        let buckets = bucket_libraries(&libs);
        assert!(buckets["libs/Math.sol"].contains_key("Math"));
    }

    #[test]
    fn unqualified_names_default_to_contract_sol() {
        let mut libs = BTreeMap::new();
        libs.insert("Math".to_string(), Address::ZERO);
        let buckets = bucket_libraries(&libs);
        assert!(buckets[DEFAULT_FILE].contains_key("Math"));
    }
}
