//! # REST API
//!
//! Builds the axum router that exposes the transaction workflow over HTTP.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                                | Description                        |
//! |--------|-------------------------------------|------------------------------------|
//! | GET    | `/health`                           | Liveness check                     |
//! | POST   | `/api/transactions/offer`           | Create a Pending offer             |
//! | GET    | `/api/transactions/:id`             | Transaction by ID                  |
//! | POST   | `/api/transactions/:id/sign`        | Verify signature and complete      |
//! | POST   | `/api/transactions/:id/fail`        | Abandon a Pending transaction      |
//! | GET    | `/api/senders/:sender/transactions` | A sender's transactions, newest first |
//! | POST   | `/api/identities`                   | Register a sender public key       |
//!
//! ## Error mapping
//!
//! `Validation` and `InvalidState` become 400, `NotFound` 404, and `Internal`
//! 500 with a generic body. Every error body is `{"error": "..."}`.

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use paysign_protocol::identity::{KeyRegistry, RegistryError, SenderId};
use paysign_protocol::storage::PaySignDb;
use paysign_protocol::transaction::{TransactionStatus, TransactionType, TransactionView};
use paysign_protocol::workflow::{TransactionService, WorkflowError};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: the service and registry are handles over shared trees.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The transaction workflow.
    pub service: TransactionService,
    /// Sender → public key registry, also the service's identity lookup.
    pub registry: KeyRegistry,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/transactions/offer", post(create_offer_handler))
        .route("/api/transactions/:id", get(get_transaction_handler))
        .route("/api/transactions/:id/sign", post(sign_handler))
        .route("/api/transactions/:id/fail", post(fail_handler))
        .route(
            "/api/senders/:sender/transactions",
            get(sender_transactions_handler),
        )
        .route("/api/identities", post(register_identity_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /api/transactions/offer`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferRequest {
    pub recipient_identifier: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// Decimal string. Strings keep the exact value; JSON numbers would not.
    pub amount: String,
    pub currency: String,
    #[serde(default)]
    pub metadata: Option<String>,
}

/// Body of `POST /api/transactions/:id/sign`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub sender_identifier: String,
    /// URL-safe Base64 of the DER signature over the canonical payload.
    pub signature: String,
}

/// Body of `POST /api/identities`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterIdentityRequest {
    pub sender_identifier: String,
    /// Standard Base64 of the DER SubjectPublicKeyInfo.
    pub public_key: String,
}

/// Response of `POST /api/identities`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub sender_identifier: String,
    pub public_key: String,
    pub registered_at: String,
}

/// Generic error body returned by every endpoint on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A [`WorkflowError`] on its way to becoming an HTTP response.
pub struct ApiError(WorkflowError);

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let (status, message) = match self.0 {
            WorkflowError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            WorkflowError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            WorkflowError::InvalidState(msg) => (StatusCode::BAD_REQUEST, msg),
            WorkflowError::Internal(detail) => {
                tracing::error!(kind, error = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        if !status.is_server_error() {
            tracing::debug!(kind, status = status.as_u16(), error = %message, "request rejected");
        }
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "version": state.version,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// `POST /api/transactions/offer`: creates a Pending offer.
async fn create_offer_handler(
    State(state): State<AppState>,
    Json(req): Json<OfferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let amount = Decimal::from_str(req.amount.trim()).map_err(|e| {
        WorkflowError::Validation(format!("amount {:?} is not a decimal: {}", req.amount, e))
    })?;

    let tx = state
        .service
        .create_offer(
            &req.recipient_identifier,
            req.tx_type,
            amount,
            &req.currency,
            req.metadata,
        )
        .await?;
    state.metrics.offers_created_total.inc();

    Ok((StatusCode::CREATED, Json(TransactionView::from(&tx))))
}

/// `GET /api/transactions/:id`
async fn get_transaction_handler(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<TransactionView>, ApiError> {
    let tx = state.service.get_by_id(id).await?;
    Ok(Json(TransactionView::from(&tx)))
}

/// `POST /api/transactions/:id/sign`: verifies the payer's signature and
/// completes the transaction.
///
/// A refused signature answers 400 and normally leaves the transaction
/// Failed, unless a concurrent caller completed it first.
async fn sign_handler(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(req): Json<SignRequest>,
) -> Result<Json<TransactionView>, ApiError> {
    let started = Instant::now();
    let outcome = state
        .service
        .sign_and_complete(id, &req.sender_identifier, &req.signature)
        .await;
    state
        .metrics
        .sign_latency_seconds
        .observe(started.elapsed().as_secs_f64());

    match outcome {
        Ok(tx) => {
            state.metrics.completions_total.inc();
            Ok(Json(TransactionView::from(&tx)))
        }
        Err(e) => {
            let rejected = e.is_signature_rejection();
            if rejected {
                state.metrics.signature_rejections_total.inc();
            }
            // Compensation is best effort and loses to a concurrent
            // completion, so count a failure only once it is on record.
            if rejected || matches!(e, WorkflowError::Internal(_)) {
                record_failure_if_settled(&state, id).await;
            }
            Err(e.into())
        }
    }
}

async fn record_failure_if_settled(state: &AppState, id: Uuid) {
    match state.service.get_by_id(id).await {
        Ok(tx) if tx.status() == TransactionStatus::Failed => state.metrics.failures_total.inc(),
        Ok(_) => {}
        Err(e) => tracing::warn!(
            transaction_id = %id,
            kind = e.kind(),
            "could not re-read transaction after failed sign attempt"
        ),
    }
}

/// `POST /api/transactions/:id/fail`
async fn fail_handler(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<TransactionView>, ApiError> {
    let tx = state.service.fail(id).await?;
    state.metrics.failures_total.inc();
    Ok(Json(TransactionView::from(&tx)))
}

/// `GET /api/senders/:sender/transactions`: newest first.
async fn sender_transactions_handler(
    Path(sender): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<TransactionView>>, ApiError> {
    let txs = state.service.list_by_sender(&sender).await?;
    Ok(Json(txs.iter().map(TransactionView::from).collect()))
}

/// `POST /api/identities`: registers a sender's public key.
///
/// Registration of an already known sender is a 400; keys are replaced
/// through rotation, not re-registration.
async fn register_identity_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterIdentityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let sender = SenderId::new(&req.sender_identifier).map_err(WorkflowError::from)?;
    let registry = state.registry.clone();
    let public_key = req.public_key;
    let task_sender = sender.clone();

    let record = tokio::task::spawn_blocking(move || registry.register(&task_sender, &public_key))
        .await
        .map_err(|e| WorkflowError::Internal(format!("registry task failed: {e}")))?
        .map_err(registry_error)?;

    Ok((
        StatusCode::CREATED,
        Json(IdentityResponse {
            sender_identifier: sender.to_string(),
            public_key: record.public_key,
            registered_at: record.registered_at.to_rfc3339(),
        }),
    ))
}

fn registry_error(e: RegistryError) -> WorkflowError {
    match e {
        RegistryError::AlreadyRegistered(_) | RegistryError::InvalidPublicKey => {
            WorkflowError::Validation(e.to_string())
        }
        RegistryError::UnknownIdentity(_) => WorkflowError::NotFound(e.to_string()),
        RegistryError::Db(_) => WorkflowError::Internal(e.to_string()),
    }
}

/// Assembles the state the router needs from an opened database.
pub fn build_state(
    version: String,
    db: PaySignDb,
    registry: KeyRegistry,
    metrics: SharedMetrics,
) -> AppState {
    let service = TransactionService::new(Arc::new(db), Arc::new(registry.clone()));
    AppState {
        version,
        service,
        registry,
        metrics,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
