//! NFT metadata resolution (spec.md §4.D).
//!
//! Fetch failures are soft: callers get `None` and a `warn!` log, never a
//! propagated error — a dead IPFS gateway shouldn't fail ingestion.

use std::time::Duration;

use serde_json::Value;
use tracing::warn;

const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// The subset of a token metadata JSON document this system extracts.
#[derive(Debug, Clone)]
pub struct ResolvedMetadata {
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub raw: Value,
}

/// Rewrites `ipfs://<cid>[/path]` to an HTTP(S) gateway URL; other schemes
/// pass through unchanged.
pub fn normalize_uri(uri: &str) -> String {
    match uri.strip_prefix("ipfs://") {
        Some(rest) => format!("{DEFAULT_IPFS_GATEWAY}{}", rest.trim_start_matches('/')),
        None => uri.to_string(),
    }
}

/// Fetches and parses a token metadata document with a fixed timeout.
pub async fn fetch_metadata(client: &reqwest::Client, uri: &str, timeout: Duration) -> Option<ResolvedMetadata> {
    let url = normalize_uri(uri);
    let response = match tokio::time::timeout(timeout, client.get(&url).send()).await {
        Ok(Ok(resp)) => resp,
        Ok(Err(e)) => {
            warn!(%url, error = %e, "metadata fetch failed");
            return None;
        }
        Err(_) => {
            warn!(%url, "metadata fetch timed out");
            return None;
        }
    };

    let raw: Value = match response.json().await {
        Ok(v) => v,
        Err(e) => {
            warn!(%url, error = %e, "metadata response was not valid JSON");
            return None;
        }
    };

    let name = raw.get("name").and_then(Value::as_str).map(str::to_string);
    let image_url = raw
        .get("image")
        .and_then(Value::as_str)
        .map(|s| normalize_uri(s));

    Some(ResolvedMetadata { name, image_url, raw })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_ipfs_scheme_to_gateway() {
        assert_eq!(
            normalize_uri("ipfs://bafy123/metadata.json"),
            "https://ipfs.io/ipfs/bafy123/metadata.json"
        );
    }

    #[test]
    fn leaves_http_uris_untouched() {
        assert_eq!(
            normalize_uri("https://example.com/1.json"),
            "https://example.com/1.json"
        );
    }
}
