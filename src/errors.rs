//! Error types for the crash-round engine
//!
//! Command rejections carry a stable reason code that is safe to hand to
//! clients; engine-level failures are folded into [`CrashError`].

use crate::games::types::{BetId, RoundId, RoundPhase};
use serde::{Deserialize, Serialize};

/// Broad classification of a rejection, used by the API layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input: amount, multiplier, duplicate position, unknown bet
    Validation,
    /// Action attempted in the wrong round phase
    Phase,
    /// Engine is not accepting commands
    Unavailable,
}

/// Reason a bet or cash-out command was refused.
///
/// A rejected command never changes round or bet state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    #[error("round closed")]
    RoundClosed,

    #[error("amount out of bounds")]
    AmountOutOfBounds,

    #[error("invalid multiplier")]
    InvalidMultiplier,

    #[error("duplicate bet")]
    DuplicateBet,

    #[error("round not running")]
    RoundNotRunning,

    #[error("too late, already crashed")]
    TooLate,

    #[error("already settled")]
    AlreadySettled,

    #[error("bet is not active")]
    BetNotActive,

    #[error("unknown bet")]
    UnknownBet,

    #[error("unknown account")]
    UnknownAccount,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("engine unavailable")]
    EngineUnavailable,
}

impl RejectReason {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::RoundClosed => "ROUND_CLOSED",
            RejectReason::AmountOutOfBounds => "AMOUNT_OUT_OF_BOUNDS",
            RejectReason::InvalidMultiplier => "INVALID_MULTIPLIER",
            RejectReason::DuplicateBet => "DUPLICATE_BET",
            RejectReason::RoundNotRunning => "ROUND_NOT_RUNNING",
            RejectReason::TooLate => "TOO_LATE",
            RejectReason::AlreadySettled => "ALREADY_SETTLED",
            RejectReason::BetNotActive => "BET_NOT_ACTIVE",
            RejectReason::UnknownBet => "UNKNOWN_BET",
            RejectReason::UnknownAccount => "UNKNOWN_ACCOUNT",
            RejectReason::InsufficientFunds => "INSUFFICIENT_FUNDS",
            RejectReason::EngineUnavailable => "ENGINE_UNAVAILABLE",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RejectReason::AmountOutOfBounds
            | RejectReason::InvalidMultiplier
            | RejectReason::DuplicateBet
            | RejectReason::UnknownBet
            | RejectReason::UnknownAccount
            | RejectReason::InsufficientFunds => ErrorKind::Validation,
            RejectReason::RoundClosed
            | RejectReason::RoundNotRunning
            | RejectReason::TooLate
            | RejectReason::AlreadySettled
            | RejectReason::BetNotActive => ErrorKind::Phase,
            RejectReason::EngineUnavailable => ErrorKind::Unavailable,
        }
    }
}

/// Failures of the provable-fairness pipeline
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FairnessError {
    #[error("seed for round {round_id} is not available for reveal")]
    SeedUnavailable { round_id: RoundId },

    #[error("revealed seed does not match the commitment of round {round_id}")]
    CommitmentMismatch { round_id: RoundId },

    #[error("reveal signature is invalid")]
    InvalidSignature,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("malformed hex value: {0}")]
    MalformedHex(String),
}

/// Configuration loading and validation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Errors raised by the value-transfer collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("account {0} could not be resolved")]
    UnknownAccount(String),

    #[error("transfer for bet {0} was already processed")]
    AlreadyProcessed(BetId),

    #[error("player {0} cannot cover the wager")]
    InsufficientFunds(String),

    #[error("balance overflow for player {0}")]
    BalanceOverflow(String),

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Root error type for engine operations
#[derive(Debug, thiserror::Error)]
pub enum CrashError {
    #[error("validation error: {0}")]
    Validation(RejectReason),

    #[error("phase error: cannot {action} while round {round_id} is {phase}")]
    Phase {
        round_id: RoundId,
        phase: RoundPhase,
        action: &'static str,
    },

    #[error("round {round_id} voided: {reason}")]
    FairnessVoid {
        round_id: RoundId,
        reason: FairnessError,
    },

    #[error("settlement compute error for bet {bet_id}: {reason}")]
    SettlementCompute { bet_id: BetId, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Fairness error: {0}")]
    Fairness(#[from] FairnessError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RejectReason> for CrashError {
    fn from(reason: RejectReason) -> Self {
        CrashError::Validation(reason)
    }
}

/// Convenience type alias for Results
pub type CrashResult<T> = Result<T, CrashError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_reject_reason_messages() {
        assert_eq!(RejectReason::RoundClosed.to_string(), "round closed");
        assert_eq!(RejectReason::AmountOutOfBounds.to_string(), "amount out of bounds");
        assert_eq!(RejectReason::TooLate.to_string(), "too late, already crashed");
        assert_eq!(RejectReason::AlreadySettled.to_string(), "already settled");
    }

    #[test]
    fn test_reject_reason_kinds() {
        assert_eq!(RejectReason::DuplicateBet.kind(), ErrorKind::Validation);
        assert_eq!(RejectReason::InvalidMultiplier.kind(), ErrorKind::Validation);
        assert_eq!(RejectReason::InsufficientFunds.kind(), ErrorKind::Validation);
        assert_eq!(RejectReason::RoundClosed.kind(), ErrorKind::Phase);
        assert_eq!(RejectReason::AlreadySettled.kind(), ErrorKind::Phase);
        assert_eq!(RejectReason::EngineUnavailable.kind(), ErrorKind::Unavailable);
    }

    #[test]
    fn test_reject_reason_serializes_as_code() {
        let json = serde_json::to_string(&RejectReason::AmountOutOfBounds).unwrap();
        assert_eq!(json, "\"AMOUNT_OUT_OF_BOUNDS\"");
        assert_eq!(RejectReason::AmountOutOfBounds.code(), "AMOUNT_OUT_OF_BOUNDS");
    }

    #[test]
    fn test_phase_error_display() {
        let err = CrashError::Phase {
            round_id: 7,
            phase: RoundPhase::Betting,
            action: "settle",
        };
        assert_eq!(err.to_string(), "phase error: cannot settle while round 7 is betting");
    }

    #[test]
    fn test_error_source() {
        let err: CrashError = ConfigurationError::ValidationFailed("test".to_string()).into();
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.source().is_some());
    }
}
