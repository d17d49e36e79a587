//! The thin read/verify HTTP surface (spec.md §6).
//!
//! - `POST /contracts/verify` – submit source for bytecode-matching verification
//! - `GET /contracts/:address/verified` – whether an address has a verified record
//! - `GET /contracts/:address/abi` – the verified ABI
//! - `GET /contracts/:address/source` – the verified source (single-file or multi-file)
//! - `GET /contracts/:address/verification` – the full verification record
//! - `GET /health` – liveness probe consulted by the Supervisor's own health checks

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use indexer_ingest::IngestPhase;
use indexer_store::Store;
use indexer_types::Address;
use indexer_verify::{VerifyEngine, VerifyError, VerifyRequest};
use serde::Serialize;
use tokio::sync::{watch, Semaphore};

#[derive(Clone)]
pub struct AppState {
    pub verify_engine: Arc<VerifyEngine>,
    pub store: Store,
    pub ingest_phase: watch::Receiver<IngestPhase>,
    /// Bounds concurrent `solc` invocations to `num_cpus::get()` (spec.md §5).
    pub verify_slots: Arc<Semaphore>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/contracts/verify", post(verify_contract))
        .route("/contracts/{address}/verified", get(is_verified))
        .route("/contracts/{address}/abi", get(abi))
        .route("/contracts/{address}/source", get(source))
        .route("/contracts/{address}/verification", get(verification))
        .route("/health", get(health))
}

async fn verify_contract(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let _permit = state
        .verify_slots
        .acquire()
        .await
        .expect("semaphore is never closed");
    let result = state.verify_engine.verify(request).await?;
    Ok(Json(result))
}

async fn is_verified(
    State(state): State<AppState>,
    Path(address): Path<Address>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.verify_engine.is_verified(address).await?))
}

async fn abi(
    State(state): State<AppState>,
    Path(address): Path<Address>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.verify_engine.abi(address).await?))
}

async fn source(
    State(state): State<AppState>,
    Path(address): Path<Address>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.verify_engine.source(address).await?))
}

async fn verification(
    State(state): State<AppState>,
    Path(address): Path<Address>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.verify_engine.verification(address).await?))
}

#[derive(Serialize)]
struct HealthBody {
    ingest_phase: IngestPhase,
    db_reachable: bool,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let db_reachable = sqlx::query("SELECT 1")
        .execute(state.store.pool())
        .await
        .is_ok();
    let status = if db_reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(HealthBody {
            ingest_phase: *state.ingest_phase.borrow(),
            db_reachable,
        }),
    )
}

/// Maps `VerifyError`'s logical kinds (spec.md §7) onto HTTP status codes.
struct ApiError(VerifyError);

impl From<VerifyError> for ApiError {
    fn from(error: VerifyError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            VerifyError::SourceTooLarge(_)
            | VerifyError::InvalidConstructorArgs(_)
            | VerifyError::CircularImport(_)
            | VerifyError::ImportNotFound(_) => StatusCode::BAD_REQUEST,
            VerifyError::NotAContract(_) | VerifyError::NotVerified(_) => StatusCode::NOT_FOUND,
            VerifyError::CompileError(_)
            | VerifyError::BytecodeMismatch
            | VerifyError::MetadataOnlyMatch => StatusCode::UNPROCESSABLE_ENTITY,
            VerifyError::Rpc(_) => StatusCode::SERVICE_UNAVAILABLE,
            VerifyError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}
