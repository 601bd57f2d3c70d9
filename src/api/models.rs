//! API Request and Response Models

use crate::games::types::{Multiplier, RoundId, RoundPhase, SeedReveal};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub round_id: RoundId,
    pub phase: RoundPhase,
}

/// POST /bets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBetRequest {
    /// Account reference, resolved to a player id by the engine
    pub account: String,
    /// Wager in base units
    pub amount: u64,
    /// Decimal auto-cashout multiplier, e.g. `2.0`
    #[serde(default)]
    pub auto_cashout: Option<f64>,
}

/// POST /bets/:bet_id/cashout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashOutRequest {
    pub account: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    /// Hex schnorrkel public key that signs seed reveals
    pub public_key: String,
    pub instant_crash_divisor: u64,
    pub max_crash_multiplier: Multiplier,
}

/// POST /fairness/verify
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// Defaults to the house key of this server
    #[serde(default)]
    pub public_key: Option<String>,
    /// Hex commitment published when the round opened
    pub commitment: String,
    pub reveal: SeedReveal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub round_id: RoundId,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crash_point: Option<Multiplier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
