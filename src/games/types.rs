use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::FairnessError;

/// Monotonically increasing round identifier
pub type RoundId = u64;

/// Player identifier (resolved account)
pub type PlayerId = String;

/// Wager and payout amounts in integer base units
pub type Amount = u64;

/// Fixed-point multiplier with two decimal places (`250` is 2.50x)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Multiplier(u64);

impl Multiplier {
    pub const ONE: Multiplier = Multiplier(100);
    pub const SCALE: u64 = 100;

    pub const fn from_hundredths(hundredths: u64) -> Self {
        Self(hundredths)
    }

    pub const fn hundredths(&self) -> u64 {
        self.0
    }

    /// Parse a decimal multiplier as submitted by clients, rounding to the nearest hundredth.
    /// Values below 1.0 are refused before rounding.
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 1.0 {
            return None;
        }
        let hundredths = (value * Self::SCALE as f64).round();
        if hundredths > u64::MAX as f64 {
            return None;
        }
        Some(Self(hundredths as u64))
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}x", self.0 / Self::SCALE, self.0 % Self::SCALE)
    }
}

/// Bet identity: the round it belongs to and its admission sequence number.
///
/// Serialized as the `"<round>-<sequence>"` string used in request paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BetId {
    pub round_id: RoundId,
    pub sequence: u32,
}

impl BetId {
    pub fn new(round_id: RoundId, sequence: u32) -> Self {
        Self { round_id, sequence }
    }
}

impl fmt::Display for BetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.round_id, self.sequence)
    }
}

impl FromStr for BetId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (round, seq) = s
            .split_once('-')
            .ok_or_else(|| format!("bet id '{}' must look like <round>-<sequence>", s))?;
        let round_id = round
            .parse()
            .map_err(|e| format!("invalid round in bet id '{}': {}", s, e))?;
        let sequence = seq
            .parse()
            .map_err(|e| format!("invalid sequence in bet id '{}': {}", s, e))?;
        Ok(Self { round_id, sequence })
    }
}

impl Serialize for BetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Round lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    Betting,
    Running,
    Crashed,
    Settled,
    /// Seed could not be revealed; every bet refunded
    Voided,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundPhase::Betting => write!(f, "betting"),
            RoundPhase::Running => write!(f, "running"),
            RoundPhase::Crashed => write!(f, "crashed"),
            RoundPhase::Settled => write!(f, "settled"),
            RoundPhase::Voided => write!(f, "voided"),
        }
    }
}

/// Bet lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Pending,
    Active,
    CashedOut,
    Crashed,
    Rejected,
    Voided,
}

impl BetStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BetStatus::CashedOut | BetStatus::Crashed | BetStatus::Rejected | BetStatus::Voided
        )
    }

    /// Pending -> Active -> {CashedOut | Crashed}; Rejected and Voided only from Pending.
    pub fn can_transition_to(&self, next: BetStatus) -> bool {
        matches!(
            (self, next),
            (BetStatus::Pending, BetStatus::Active)
                | (BetStatus::Pending, BetStatus::Rejected)
                | (BetStatus::Pending, BetStatus::Voided)
                | (BetStatus::Active, BetStatus::CashedOut)
                | (BetStatus::Active, BetStatus::Crashed)
        )
    }
}

/// What triggered a cash-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CashOutTrigger {
    Manual,
    Auto,
}

/// A single wager within a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub id: BetId,
    pub player_id: PlayerId,
    pub amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_cashout: Option<Multiplier>,
    pub placed_at: u64,
    pub status: BetStatus,
    /// Cash-out multiplier for wins, crash multiplier for losses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realized_multiplier: Option<Multiplier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<u64>,
}

/// 32-byte secret seed
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seed(pub [u8; 32]);

/// Published hash commitment to a round's seed
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Commitment(pub [u8; 32]);

macro_rules! hex_bytes32 {
    ($name:ident) => {
        impl $name {
            pub const ZERO: $name = $name([0u8; 32]);

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(value: &str) -> Result<Self, FairnessError> {
                let bytes = hex::decode(value.trim_start_matches("0x"))
                    .map_err(|e| FairnessError::MalformedHex(e.to_string()))?;
                let array: [u8; 32] = bytes.try_into().map_err(|_| {
                    FairnessError::MalformedHex(format!("{} must be 32 bytes", stringify!($name)))
                })?;
                Ok($name(array))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = String::deserialize(deserializer)?;
                $name::from_hex(&value).map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_bytes32!(Seed);
hex_bytes32!(Commitment);

/// Seed disclosure published when a round crashes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReveal {
    pub round_id: RoundId,
    pub seed: Seed,
    /// Previous round's revealed seed chained into the commitment
    pub previous_seed: Seed,
    /// Hex-encoded house signature over (round id, commitment, seed)
    pub signature: String,
}

/// Authoritative round record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub phase: RoundPhase,
    pub opened_at: u64,
    pub betting_deadline: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crashed_at: Option<u64>,
    pub commitment: Commitment,
}

/// Settlement result for a single bet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SettlementOutcome {
    Win,
    Loss,
    /// Payout could not be computed; held for manual reconciliation
    ReconciliationRequired { reason: String },
}

/// Immutable settlement record, one per bet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub bet_id: BetId,
    pub player_id: PlayerId,
    pub wager: Amount,
    #[serde(flatten)]
    pub outcome: SettlementOutcome,
    pub realized_multiplier: Multiplier,
    pub payout: Amount,
    pub settled_at: u64,
}

/// Refund issued for a bet of a voided round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRecord {
    pub bet_id: BetId,
    pub player_id: PlayerId,
    pub amount: Amount,
}

/// All settlement records of one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSettlement {
    pub round_id: RoundId,
    pub crash_point: Multiplier,
    pub records: Vec<SettlementRecord>,
    pub total_wagered: u128,
    pub total_payout: u128,
    /// Bets whose payout needs manual reconciliation
    pub flagged: Vec<BetId>,
}

/// Reply to an accepted bet, carrying the post-admission round state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetReceipt {
    pub bet_id: BetId,
    pub round_id: RoundId,
    pub player_id: PlayerId,
    pub amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_cashout: Option<Multiplier>,
    pub status: BetStatus,
    pub placed_at: u64,
    pub betting_deadline: u64,
    /// Players holding open bets in this round, including this one
    pub players: Vec<PlayerId>,
}

/// Reply to an accepted cash-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashOutReceipt {
    pub bet_id: BetId,
    pub round_id: RoundId,
    pub multiplier: Multiplier,
    pub trigger: CashOutTrigger,
    pub at: u64,
}

/// Read-only view of the live round for observers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub round_id: RoundId,
    pub phase: RoundPhase,
    pub commitment: Commitment,
    pub betting_deadline: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    pub elapsed_ms: u64,
    /// Current multiplier while running, the crash point once revealed
    pub multiplier: Multiplier,
    /// Only present once the round has crashed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crash_point: Option<Multiplier>,
    pub active_players: Vec<PlayerId>,
    pub bet_count: usize,
    pub server_time: u64,
}

/// Events pushed to subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundEvent {
    RoundOpened {
        round_id: RoundId,
        commitment: Commitment,
        betting_deadline: u64,
    },
    BetPlaced {
        bet_id: BetId,
        player_id: PlayerId,
        amount: Amount,
        #[serde(skip_serializing_if = "Option::is_none")]
        auto_cashout: Option<Multiplier>,
    },
    RunStarted {
        round_id: RoundId,
        started_at: u64,
        active_bets: usize,
    },
    CashedOut {
        bet_id: BetId,
        player_id: PlayerId,
        multiplier: Multiplier,
        trigger: CashOutTrigger,
        at: u64,
    },
    Crashed {
        round_id: RoundId,
        crash_point: Multiplier,
        crashed_at: u64,
        reveal: SeedReveal,
    },
    Settled {
        round_id: RoundId,
        records: usize,
        total_payout: u128,
        flagged: usize,
    },
    Voided {
        round_id: RoundId,
        reason: String,
        refunds: usize,
    },
}

/// Archived summary of a finished round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: Round,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crash_point: Option<Multiplier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reveal: Option<SeedReveal>,
    pub bets: Vec<Bet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<RoundSettlement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refunds: Vec<RefundRecord>,
}
