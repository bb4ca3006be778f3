use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;

use staylock_core::client::BookingClient;
use staylock_core::config::ArbiterConfig;
use staylock_core::types::{
    AcquireOutcome, ConfirmOutcome, GuestDetails, LockToken, PropertyId, Reservation, SoftLock,
};

use crate::handlers::*;

/// Shared server state: the booking client plus the property directory that
/// backs the resource-existence check.
pub struct AppState {
    pub client: BookingClient,
    pub properties: RwLock<HashMap<PropertyId, String>>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(client: BookingClient) -> SharedState {
        Arc::new(Self {
            client,
            properties: RwLock::new(HashMap::new()),
        })
    }
}

pub fn router(state: SharedState, max_concurrency: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/properties", post(register_property))
        .route("/properties/{id}/availability", post(check_availability))
        .route("/properties/{id}/reservations", post(create_reservation))
        .route("/properties/{id}/reservations", get(list_reservations))
        .route("/properties/{id}/locks", get(list_locks))
        .route("/properties/{id}/locks/{token}", delete(release_lock))
        .route("/evict", post(evict_expired))
        .layer(ConcurrencyLimitLayer::new(max_concurrency))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(host: &str, port: u16, client: BookingClient, max_concurrency: usize) -> anyhow::Result<()> {
    let lease_minutes = client.lease_minutes();
    let app = router(AppState::new(client), max_concurrency);

    let addr = format!("{}:{}", host, port);
    tracing::info!(lease_minutes, max_concurrency, "Booking server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ─── Errors ─────────────────────────────────────────────────────────────────

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<staylock_core::Error> for ApiError {
    fn from(e: staylock_core::Error) -> Self {
        if e.is_invalid_input() {
            ApiError::BadRequest(e.to_string())
        } else {
            tracing::error!(error = %e, "Booking store failure");
            ApiError::Internal(e.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ApiResponse::<()>::err(msg))).into_response()
    }
}

/// Run a store-touching call off the async workers.
async fn blocking<T, F>(state: &SharedState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&BookingClient) -> staylock_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let client = state.client.clone();
    tokio::task::spawn_blocking(move || f(&client))
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {}", e)))?
        .map_err(ApiError::from)
}

async fn ensure_property(state: &SharedState, property_id: PropertyId) -> Result<(), ApiError> {
    if state.properties.read().await.contains_key(&property_id) {
        Ok(())
    } else {
        Err(ApiError::NotFound(format!("Property '{}' not found", property_id)))
    }
}

// ─── Handlers ───────────────────────────────────────────────────────────────

async fn health(State(state): State<SharedState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        properties: state.properties.read().await.len(),
        lease_minutes: state.client.lease_minutes(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

async fn register_property(
    State(state): State<SharedState>,
    Json(req): Json<RegisterPropertyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PropertyInfo>>), ApiError> {
    req.validate().map_err(ApiError::BadRequest)?;

    state
        .properties
        .write()
        .await
        .insert(PropertyId(req.property_id), req.name.clone());
    tracing::info!(property_id = req.property_id, name = %req.name, "Property registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(PropertyInfo {
            property_id: req.property_id,
            name: req.name,
        })),
    ))
}

async fn check_availability(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(req): Json<AvailabilityRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    req.validate().map_err(ApiError::BadRequest)?;
    let property_id = PropertyId(id);
    ensure_property(&state, property_id).await?;

    // First probe of a session gets a fresh token; later probes reuse theirs
    let token = req
        .lock_token
        .filter(|t| !t.trim().is_empty())
        .map(LockToken::new)
        .unwrap_or_else(LockToken::generate);

    let outcome = {
        let token = token.clone();
        blocking(&state, move |client| {
            client.check_availability(property_id, &req.check_in_date, &req.check_out_date, &token)
        })
        .await?
    };

    let lease_minutes = state.client.lease_minutes();
    match outcome {
        AcquireOutcome::Granted {
            interval,
            created_at,
        } => {
            tracing::info!(%property_id, lock_token = %token, %interval, "Availability confirmed");
            Ok((
                StatusCode::OK,
                Json(serde_json::json!({
                    "success": true,
                    "data": {
                        "lock_token": token,
                        "check_in_date": interval.start(),
                        "check_out_date": interval.end(),
                        "locked_at": created_at,
                        "lease_minutes": lease_minutes,
                    }
                })),
            ))
        }
        AcquireOutcome::Conflict { kind } => {
            tracing::info!(%property_id, lock_token = %token, reason = %kind, "Availability denied");
            Ok((
                StatusCode::CONFLICT,
                Json(serde_json::json!({
                    "success": false,
                    "reason": kind,
                    "error": conflict_message(kind, lease_minutes),
                    "lock_token": token,
                    "retry_after_minutes": kind.is_transient().then_some(lease_minutes),
                })),
            ))
        }
    }
}

async fn create_reservation(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    req.validate().map_err(ApiError::BadRequest)?;
    let property_id = PropertyId(id);
    ensure_property(&state, property_id).await?;

    let token = LockToken::new(req.lock_token.clone());
    let guest = GuestDetails::new(req.firstname, req.lastname, req.email);

    let outcome = {
        let token = token.clone();
        blocking(&state, move |client| {
            client.confirm_reservation(
                property_id,
                &req.check_in_date,
                &req.check_out_date,
                &token,
                guest,
            )
        })
        .await?
    };

    match outcome {
        ConfirmOutcome::Confirmed { reservation } => Ok((
            StatusCode::CREATED,
            Json(serde_json::json!({
                "success": true,
                "message": BOOKED_MESSAGE,
                "data": reservation,
            })),
        )),
        ConfirmOutcome::Conflict { kind } => {
            tracing::info!(%property_id, lock_token = %token, reason = %kind, "Reservation denied");
            Ok((
                StatusCode::CONFLICT,
                Json(serde_json::json!({
                    "success": false,
                    "reason": kind,
                    "error": BOOKED_IN_THE_MEANTIME_MESSAGE,
                })),
            ))
        }
    }
}

async fn list_reservations(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<Vec<Reservation>>>, ApiError> {
    let property_id = PropertyId(id);
    ensure_property(&state, property_id).await?;

    let reservations = blocking(&state, move |client| client.reservations(property_id)).await?;
    Ok(Json(ApiResponse::ok(reservations)))
}

async fn list_locks(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<Vec<SoftLock>>>, ApiError> {
    let property_id = PropertyId(id);
    ensure_property(&state, property_id).await?;

    let locks = blocking(&state, move |client| client.live_locks(property_id)).await?;
    Ok(Json(ApiResponse::ok(locks)))
}

async fn release_lock(
    State(state): State<SharedState>,
    Path((id, token)): Path<(u64, String)>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let property_id = PropertyId(id);
    ensure_property(&state, property_id).await?;

    let lock_token = LockToken::new(token.clone());
    let released = blocking(&state, move |client| client.release(property_id, &lock_token)).await?;
    if released {
        Ok(Json(ApiResponse::ok(format!("Lock '{}' released", token))))
    } else {
        Err(ApiError::NotFound(format!("Lock '{}' not found", token)))
    }
}

async fn evict_expired(State(state): State<SharedState>) -> Result<Json<ApiResponse<EvictResponse>>, ApiError> {
    let evicted = blocking(&state, |client| client.evict_expired()).await?;
    tracing::info!(evicted, "Expired soft locks evicted");
    Ok(Json(ApiResponse::ok(EvictResponse { evicted })))
}

// ─── Storage Backend Selection ──────────────────────────────────────────────

pub fn create_client(storage: &str, config: ArbiterConfig) -> anyhow::Result<BookingClient> {
    if storage == "memory" {
        tracing::info!("Storage backend: in-memory (bookings will not persist)");
        Ok(BookingClient::new(config))
    } else if let Some(path) = storage.strip_prefix("sqlite:") {
        #[cfg(feature = "sqlite")]
        {
            tracing::info!("Storage backend: SQLite ({})", path);
            BookingClient::with_sqlite(path, config)
                .map_err(|e| anyhow::anyhow!("failed to open SQLite database at '{}': {}", path, e))
        }
        #[cfg(not(feature = "sqlite"))]
        {
            let _ = path;
            anyhow::bail!(
                "SQLite storage requested but the `sqlite` feature is not enabled. \
                 Rebuild with: cargo build --features sqlite"
            )
        }
    } else {
        anyhow::bail!("Unknown storage backend: '{}'. Use 'memory' or 'sqlite:<path>'", storage)
    }
}
