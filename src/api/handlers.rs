//! Request Handlers
//!
//! Thin adapters from HTTP to the engine handle. Every command goes through
//! the round scheduler; nothing here touches round state directly.

use super::{errors::ApiError, middleware::RequestId, models::*, websocket::WebSocketManager};
use crate::{
    errors::RejectReason,
    games::{
        fairness::{verify_reveal, CrashDistribution},
        scheduler::EngineHandle,
        types::{BetId, BetReceipt, CashOutReceipt, Commitment, Multiplier, RoundId, RoundReport, RoundSnapshot},
    },
};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub engine: EngineHandle,
    pub distribution: CrashDistribution,
    pub version: String,
    pub websocket_manager: Arc<WebSocketManager>,
    pub metrics_enabled: bool,
}

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state.engine.snapshot();
    Json(HealthResponse {
        status: "Running".to_string(),
        version: state.version.clone(),
        round_id: snapshot.round_id,
        phase: snapshot.phase,
    })
}

/// GET /round
pub async fn round_handler(State(state): State<Arc<AppState>>) -> Json<RoundSnapshot> {
    Json(state.engine.snapshot())
}

/// GET /rounds/:round_id
pub async fn round_report_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<RoundId>,
) -> Result<Json<RoundReport>, ApiError> {
    state
        .engine
        .round_report(round_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(request_id.0, format!("Round {} not found", round_id)))
}

/// POST /bets
pub async fn place_bet_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlaceBetRequest>,
) -> Result<(StatusCode, Json<BetReceipt>), ApiError> {
    let auto_cashout = match request.auto_cashout {
        Some(value) => Some(
            Multiplier::from_decimal(value)
                .ok_or_else(|| ApiError::rejected(request_id.0.clone(), RejectReason::InvalidMultiplier))?,
        ),
        None => None,
    };

    let receipt = state
        .engine
        .place_bet(&request.account, request.amount, auto_cashout)
        .await
        .map_err(|reason| ApiError::rejected(request_id.0.clone(), reason))?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// POST /bets/:bet_id/cashout
pub async fn cash_out_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(bet_id): Path<String>,
    Json(request): Json<CashOutRequest>,
) -> Result<Json<CashOutReceipt>, ApiError> {
    let bet_id: BetId = bet_id
        .parse()
        .map_err(|e: String| ApiError::bad_request(request_id.0.clone(), e))?;

    state
        .engine
        .request_cash_out(&request.account, bet_id)
        .await
        .map(Json)
        .map_err(|reason| ApiError::rejected(request_id.0, reason))
}

/// GET /fairness/public-key
pub async fn public_key_handler(State(state): State<Arc<AppState>>) -> Json<PublicKeyResponse> {
    Json(PublicKeyResponse {
        public_key: state.engine.public_key_hex().to_string(),
        instant_crash_divisor: state.distribution.instant_crash_divisor,
        max_crash_multiplier: state.distribution.max_multiplier,
    })
}

/// POST /fairness/verify
pub async fn verify_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let public_key_hex = request
        .public_key
        .unwrap_or_else(|| state.engine.public_key_hex().to_string());
    let public_key = hex::decode(public_key_hex.trim_start_matches("0x"))
        .map_err(|e| ApiError::bad_request(request_id.0.clone(), format!("Invalid public key: {}", e)))?;
    let commitment = Commitment::from_hex(&request.commitment)
        .map_err(|e| ApiError::bad_request(request_id.0.clone(), e.to_string()))?;

    let response = match verify_reveal(&public_key, &commitment, &request.reveal, &state.distribution) {
        Ok(crash_point) => VerifyResponse {
            round_id: request.reveal.round_id,
            valid: true,
            crash_point: Some(crash_point),
            reason: None,
        },
        Err(e) => VerifyResponse {
            round_id: request.reveal.round_id,
            valid: false,
            crash_point: None,
            reason: Some(e.to_string()),
        },
    };

    Ok(Json(response))
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if !state.metrics_enabled {
        return (StatusCode::NOT_FOUND, [(header::CONTENT_TYPE, "text/plain")], String::new());
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.engine.metrics().render(),
    )
}
