//! Settlement of finished rounds
//!
//! Turns the terminal bet states of a crashed round into immutable
//! settlement records. Settlement runs once per round; the stored result is
//! returned on every later call.

use crate::{
    errors::{CrashError, CrashResult},
    games::{
        engine::RoundEngine,
        types::{
            Amount, Bet, BetId, BetStatus, Multiplier, RoundPhase, RoundSettlement, SettlementOutcome,
            SettlementRecord,
        },
    },
};
use tracing::{info, warn};

/// Payout for a winning bet: wager x multiplier, truncated to base units
pub fn payout_for(bet_id: BetId, wager: Amount, multiplier: Multiplier) -> CrashResult<Amount> {
    let gross = (wager as u128)
        .checked_mul(multiplier.hundredths() as u128)
        .ok_or_else(|| CrashError::SettlementCompute {
            bet_id,
            reason: "payout product overflow".to_string(),
        })?
        / Multiplier::SCALE as u128;

    Amount::try_from(gross).map_err(|_| CrashError::SettlementCompute {
        bet_id,
        reason: format!("payout {} exceeds the amount range", gross),
    })
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SettlementProcessor;

impl SettlementProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Settle a crashed round, or return the stored settlement of a settled one
    pub fn settle(&self, engine: &mut RoundEngine, now: u64) -> CrashResult<RoundSettlement> {
        match engine.phase() {
            RoundPhase::Settled => {
                if let Some(settlement) = engine.settlement() {
                    return Ok(settlement.clone());
                }
            }
            RoundPhase::Crashed => {}
            phase => {
                return Err(CrashError::Phase {
                    round_id: engine.round_id(),
                    phase,
                    action: "settle",
                })
            }
        }

        let crash_point = engine.revealed_crash_point().ok_or(CrashError::Phase {
            round_id: engine.round_id(),
            phase: engine.phase(),
            action: "settle",
        })?;

        let mut records = Vec::with_capacity(engine.ledger().len());
        let mut flagged = Vec::new();
        let mut total_wagered: u128 = 0;
        let mut total_payout: u128 = 0;

        for bet in engine.ledger().bets() {
            let record = settle_bet(bet, crash_point, now);
            total_wagered += bet.amount as u128;
            total_payout += record.payout as u128;
            if matches!(record.outcome, SettlementOutcome::ReconciliationRequired { .. }) {
                flagged.push(bet.id);
            }
            records.push(record);
        }

        let settlement = RoundSettlement {
            round_id: engine.round_id(),
            crash_point,
            records,
            total_wagered,
            total_payout,
            flagged,
        };

        info!(
            "Round {} settled: {} records, wagered {}, paid {}, {} flagged",
            settlement.round_id,
            settlement.records.len(),
            total_wagered,
            total_payout,
            settlement.flagged.len()
        );

        engine.record_settlement(settlement.clone());
        Ok(settlement)
    }
}

fn settle_bet(bet: &Bet, crash_point: Multiplier, now: u64) -> SettlementRecord {
    let settled_at = bet.resolved_at.unwrap_or(now);
    let record = |outcome, realized_multiplier, payout| SettlementRecord {
        bet_id: bet.id,
        player_id: bet.player_id.clone(),
        wager: bet.amount,
        outcome,
        realized_multiplier,
        payout,
        settled_at,
    };

    match bet.status {
        BetStatus::CashedOut => {
            let multiplier = bet.realized_multiplier.unwrap_or(Multiplier::ONE);
            match payout_for(bet.id, bet.amount, multiplier) {
                Ok(payout) => record(SettlementOutcome::Win, multiplier, payout),
                Err(e) => {
                    warn!("{}; holding for manual reconciliation", e);
                    record(
                        SettlementOutcome::ReconciliationRequired { reason: e.to_string() },
                        multiplier,
                        0,
                    )
                }
            }
        }
        BetStatus::Crashed | BetStatus::Active => record(SettlementOutcome::Loss, crash_point, 0),
        status => {
            let reason = format!("bet {} reached settlement while {:?}", bet.id, status);
            warn!("{}", reason);
            record(SettlementOutcome::ReconciliationRequired { reason }, crash_point, 0)
        }
    }
}
