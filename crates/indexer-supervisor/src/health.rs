//! Liveness supervision (spec.md §4.G): a 60-second health-check loop
//! covering RPC reachability, DB reachability, and the `blocks` table's
//! presence, escalating from ingestion restart to process exit.

use std::time::Duration;

use indexer_rpc::RpcPool;
use indexer_store::Store;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::error::SupervisorError;

const CHECK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
pub struct HealthConfig {
    /// Consecutive failed checks before the ingestion task is restarted.
    pub restart_after: u32,
    /// Consecutive failed checks before the process exits outright, so an
    /// external supervisor (systemd/docker) restarts the process group.
    pub exit_after: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        HealthConfig {
            restart_after: 3,
            exit_after: 10,
        }
    }
}

async fn check_rpc(rpc: &RpcPool) -> Result<(), String> {
    rpc.latest_block().await.map(|_| ()).map_err(|e| e.to_string())
}

async fn check_store(store: &Store) -> Result<(), String> {
    sqlx::query("SELECT 1 FROM blocks LIMIT 1")
        .execute(store.pool())
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Runs until `cancel` fires or the process should exit. `restart_ingestion`
/// is invoked (not awaited further than its own return) once the failure
/// streak crosses `config.restart_after`; it is expected to cancel and
/// respawn the ingestion task's own supervised handle.
pub async fn run_health_task(
    rpc: RpcPool,
    store: Store,
    config: HealthConfig,
    cancel: CancellationToken,
    mut restart_ingestion: impl FnMut(),
) -> Result<(), SupervisorError> {
    let mut interval = tokio::time::interval(CHECK_INTERVAL);
    let mut consecutive_failures: u32 = 0;
    let mut restarted_at_current_streak = false;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = cancel.cancelled() => return Ok(()),
        }

        let rpc_result = check_rpc(&rpc).await;
        let store_result = check_store(&store).await;

        match (&rpc_result, &store_result) {
            (Ok(()), Ok(())) => {
                consecutive_failures = 0;
                restarted_at_current_streak = false;
            }
            _ => {
                consecutive_failures += 1;
                if let Err(e) = &rpc_result {
                    warn!(error = %e, consecutive_failures, "rpc health check failed");
                }
                if let Err(e) = &store_result {
                    warn!(error = %e, consecutive_failures, "store health check failed");
                }
            }
        }

        if consecutive_failures >= config.exit_after {
            error!(consecutive_failures, "health checks exhausted, exiting process");
            return Err(SupervisorError::Unhealthy(consecutive_failures));
        }

        if consecutive_failures >= config.restart_after && !restarted_at_current_streak {
            warn!(consecutive_failures, "restarting ingestion task");
            restart_ingestion();
            restarted_at_current_streak = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_order_restart_before_exit() {
        let config = HealthConfig::default();
        assert!(config.restart_after < config.exit_after);
    }
}
