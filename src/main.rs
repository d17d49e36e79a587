//! EVM indexer entrypoint.
//!
//! Wires together schema bootstrap, the block ingestion pipeline, the RPC
//! health checker, the backup/health supervisor tasks, and a thin axum
//! read/verify HTTP surface, all sharing one `CancellationToken` rooted in
//! `SigDown`.
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `HOST`, `PORT` control binding address
//! - `CONFIG` points at the JSON config file (default `config.json`)
//! - `OTEL_*` variables enable tracing export

mod config;
mod http;
mod sig_down;
mod telemetry;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::http::Method;
use dotenvy::dotenv;
use indexer_ingest::{IngestConfig, Pipeline};
use indexer_rpc::RpcPool;
use tokio_util::sync::CancellationToken;
use tower_http::cors;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::sig_down::SigDown;
use crate::telemetry::Telemetry;

/// Owns the currently-running ingestion task and lets the Supervisor's
/// health checker cancel and respawn it without tearing down the rest of
/// the process (spec.md §4.G).
struct SupervisedIngestion {
    pipeline: Arc<Pipeline>,
    root_cancel: CancellationToken,
    current: Mutex<(CancellationToken, tokio::task::JoinHandle<()>)>,
}

impl SupervisedIngestion {
    fn spawn(pipeline: Arc<Pipeline>, root_cancel: CancellationToken) -> Arc<Self> {
        let task_token = root_cancel.child_token();
        let handle = spawn_ingestion_task(pipeline.clone(), task_token.clone());
        Arc::new(SupervisedIngestion {
            pipeline,
            root_cancel,
            current: Mutex::new((task_token, handle)),
        })
    }

    /// Cancels the in-flight ingestion task and starts a fresh one with a
    /// new child token, so the next cancellation only affects that task.
    fn restart(&self) {
        let mut guard = self.current.lock().expect("ingestion task lock poisoned");
        guard.0.cancel();
        let task_token = self.root_cancel.child_token();
        let handle = spawn_ingestion_task(self.pipeline.clone(), task_token.clone());
        *guard = (task_token, handle);
    }
}

fn spawn_ingestion_task(pipeline: Arc<Pipeline>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = pipeline.run(cancel).await {
            tracing::error!(error = %e, "ingestion task exited with an error");
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    // Held for its `Drop` impl, which flushes the OTEL exporters on shutdown.
    let _telemetry = Telemetry::new();

    let config = Config::load()?;

    let backup_config = indexer_supervisor::BackupConfig {
        backup_dir: config.backup().dir.clone(),
        honeypot_database: config.backup().honeypot_database.clone(),
    };

    let store = indexer_supervisor::bootstrap(config.database_url(), &backup_config).await?;

    let rpc = RpcPool::new(&config.rpc_urls())?;
    rpc.spawn_health_checker();

    let sig_down = SigDown::try_new()?;
    let cancel = sig_down.cancellation_token();

    let ingest_config = IngestConfig {
        confirmations: config.ingest().confirmations,
        retry_backoff: Duration::from_secs(config.ingest().retry_backoff_secs),
    };
    let pipeline = Arc::new(Pipeline::new(rpc.clone(), store.clone(), ingest_config));
    let ingest_phase = pipeline.subscribe_phase();
    let supervised_ingestion = SupervisedIngestion::spawn(pipeline, cancel.clone());

    let maintenance_url = config
        .backup()
        .maintenance_url
        .as_ref()
        .map(|url| url.inner().clone());
    tokio::spawn(indexer_supervisor::run_backup_task(
        config.database_url().to_string(),
        maintenance_url,
        backup_config,
        cancel.clone(),
    ));

    let health_config = indexer_supervisor::HealthConfig {
        restart_after: config.health().restart_after,
        exit_after: config.health().exit_after,
    };
    let health_rpc = rpc.clone();
    let health_store = store.clone();
    let health_cancel = cancel.clone();
    tokio::spawn(async move {
        let result = indexer_supervisor::run_health_task(
            health_rpc,
            health_store,
            health_config,
            health_cancel.clone(),
            move || supervised_ingestion.restart(),
        )
        .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "health checks exhausted, exiting process");
            std::process::exit(1);
        }
    });

    let verify_engine = Arc::new(indexer_verify::VerifyEngine::new(rpc, store.clone()));
    let app_state = http::AppState {
        verify_engine,
        store,
        ingest_phase,
        verify_slots: Arc::new(tokio::sync::Semaphore::new(num_cpus::get())),
    };

    let http_endpoints: Router = http::routes()
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(cors::Any),
        );

    let addr = SocketAddr::new(config.host(), config.port());
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap_or_else(|e| {
        tracing::error!("Failed to bind to {}: {}", addr, e);
        std::process::exit(1);
    });

    let shutdown_cancel = cancel.clone();
    let graceful_shutdown = async move { shutdown_cancel.cancelled().await };
    axum::serve(listener, http_endpoints)
        .with_graceful_shutdown(graceful_shutdown)
        .await?;

    cancel.cancel();
    Ok(())
}
