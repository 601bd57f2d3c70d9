//! Round state machine
//!
//! `RoundEngine` drives a single round from betting to settlement. It holds no
//! clock of its own: every operation receives the current time in epoch
//! milliseconds, and the owner is expected to call [`RoundEngine::advance`]
//! before applying a command so time-driven transitions are never skipped.

use crate::{
    errors::{CrashError, CrashResult, FairnessError, RejectReason},
    games::{
        clock::MultiplierClock,
        fairness::{resolve, SeedGenerator},
        ledger::{BetLedger, BettingRules},
        types::{
            Amount, BetId, BetReceipt, BetStatus, CashOutReceipt, CashOutTrigger, Multiplier, PlayerId,
            RefundRecord, Round, RoundEvent, RoundId, RoundPhase, RoundReport, RoundSettlement,
            RoundSnapshot, SeedReveal,
        },
    },
};
use tracing::{debug, error, info};

/// Per-round parameters shared by every round the scheduler opens
#[derive(Debug, Clone)]
pub struct RoundSettings {
    pub rules: BettingRules,
    pub betting_window_ms: u64,
    pub clock: MultiplierClock,
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            rules: BettingRules::default(),
            betting_window_ms: 5_000,
            clock: MultiplierClock::default(),
        }
    }
}

pub struct RoundEngine {
    round: Round,
    ledger: BetLedger,
    clock: MultiplierClock,
    /// Resolved at run start, never exposed before the crash
    crash_point: Option<Multiplier>,
    reveal: Option<SeedReveal>,
    settlement: Option<RoundSettlement>,
    refunds: Vec<RefundRecord>,
    void_reason: Option<FairnessError>,
}

impl RoundEngine {
    /// Commit to a seed and open the betting window
    pub fn open(round_id: RoundId, now: u64, settings: &RoundSettings, seeds: &SeedGenerator) -> Self {
        let commitment = seeds.commit(round_id);
        let round = Round {
            id: round_id,
            phase: RoundPhase::Betting,
            opened_at: now,
            betting_deadline: now.saturating_add(settings.betting_window_ms),
            started_at: None,
            crashed_at: None,
            commitment,
        };

        info!(
            "Round {} opened, betting until {} (commitment {})",
            round_id, round.betting_deadline, commitment
        );

        Self {
            round,
            ledger: BetLedger::new(round_id, settings.rules.clone()),
            clock: settings.clock,
            crash_point: None,
            reveal: None,
            settlement: None,
            refunds: Vec::new(),
            void_reason: None,
        }
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn round_id(&self) -> RoundId {
        self.round.id
    }

    pub fn phase(&self) -> RoundPhase {
        self.round.phase
    }

    pub fn ledger(&self) -> &BetLedger {
        &self.ledger
    }

    /// Crash point, only once the round has crashed
    pub fn revealed_crash_point(&self) -> Option<Multiplier> {
        match self.round.phase {
            RoundPhase::Crashed | RoundPhase::Settled => self.crash_point,
            _ => None,
        }
    }

    pub fn settlement(&self) -> Option<&RoundSettlement> {
        self.settlement.as_ref()
    }

    pub fn refunds(&self) -> &[RefundRecord] {
        &self.refunds
    }

    pub fn opened_event(&self) -> RoundEvent {
        RoundEvent::RoundOpened {
            round_id: self.round.id,
            commitment: self.round.commitment,
            betting_deadline: self.round.betting_deadline,
        }
    }

    /// Admit a bet while the betting window is open
    pub fn place_bet(
        &mut self,
        player_id: PlayerId,
        amount: Amount,
        auto_cashout: Option<Multiplier>,
        now: u64,
    ) -> Result<BetReceipt, RejectReason> {
        if self.round.phase != RoundPhase::Betting || now >= self.round.betting_deadline {
            return Err(RejectReason::RoundClosed);
        }

        let bet = self.ledger.admit(player_id, amount, auto_cashout, now)?.clone();
        debug!("Bet {} admitted for {} ({} units)", bet.id, bet.player_id, bet.amount);

        Ok(BetReceipt {
            bet_id: bet.id,
            round_id: self.round.id,
            player_id: bet.player_id,
            amount: bet.amount,
            auto_cashout: bet.auto_cashout,
            status: bet.status,
            placed_at: bet.placed_at,
            betting_deadline: self.round.betting_deadline,
            players: self.ledger.open_players(),
        })
    }

    /// Close betting and start the multiplier.
    ///
    /// The start instant is the betting deadline regardless of when this runs.
    /// A seed that cannot be revealed voids the round instead; that is still
    /// reported as `Ok` with a `Voided` event.
    pub fn start_run(&mut self, now: u64, seeds: &SeedGenerator) -> CrashResult<Vec<RoundEvent>> {
        if self.round.phase != RoundPhase::Betting || now < self.round.betting_deadline {
            return Err(CrashError::Phase {
                round_id: self.round.id,
                phase: self.round.phase,
                action: "start the run",
            });
        }

        let resolved = seeds
            .reveal(self.round.id)
            .and_then(|reveal| resolve(&self.round.commitment, &reveal, seeds.distribution()).map(|c| (reveal, c)));

        let (reveal, crash_point) = match resolved {
            Ok(resolved) => resolved,
            Err(reason) => return Ok(vec![self.void(reason, now)]),
        };

        let started_at = self.round.betting_deadline;
        let active_bets = self.ledger.activate_pending();
        self.crash_point = Some(crash_point);
        self.reveal = Some(reveal);
        self.round.started_at = Some(started_at);
        self.round.phase = RoundPhase::Running;

        info!("Round {} running with {} active bets", self.round.id, active_bets);

        Ok(vec![RoundEvent::RunStarted {
            round_id: self.round.id,
            started_at,
            active_bets,
        }])
    }

    fn void(&mut self, reason: FairnessError, now: u64) -> RoundEvent {
        let err = CrashError::FairnessVoid {
            round_id: self.round.id,
            reason: reason.clone(),
        };
        error!("{}; refunding {} bets", err, self.ledger.len());

        self.refunds = self.ledger.void_pending(now);
        self.round.phase = RoundPhase::Voided;
        self.void_reason = Some(reason.clone());

        RoundEvent::Voided {
            round_id: self.round.id,
            reason: reason.to_string(),
            refunds: self.refunds.len(),
        }
    }

    /// Manual cash-out at `at`, valued on the multiplier curve
    pub fn request_cash_out(
        &mut self,
        player_id: &str,
        bet_id: &BetId,
        at: u64,
    ) -> Result<CashOutReceipt, RejectReason> {
        let status = match self.ledger.get(bet_id) {
            Some(bet) if bet.player_id == player_id => bet.status,
            _ => return Err(RejectReason::UnknownBet),
        };

        match self.round.phase {
            RoundPhase::Betting | RoundPhase::Voided => return Err(RejectReason::RoundNotRunning),
            RoundPhase::Crashed | RoundPhase::Settled => {
                return Err(if status == BetStatus::CashedOut {
                    RejectReason::AlreadySettled
                } else {
                    RejectReason::TooLate
                });
            }
            RoundPhase::Running => {}
        }

        match status {
            BetStatus::Active => {}
            BetStatus::CashedOut | BetStatus::Crashed => return Err(RejectReason::AlreadySettled),
            _ => return Err(RejectReason::BetNotActive),
        }

        let (started_at, crash_point) = match (self.round.started_at, self.crash_point) {
            (Some(started_at), Some(crash_point)) => (started_at, crash_point),
            _ => return Err(RejectReason::RoundNotRunning),
        };

        let multiplier = self.clock.multiplier_at(at.saturating_sub(started_at));
        if multiplier >= crash_point {
            return Err(RejectReason::TooLate);
        }

        self.ledger
            .cash_out(bet_id, multiplier, at)
            .ok_or(RejectReason::AlreadySettled)?;

        debug!("Bet {} cashed out at {}", bet_id, multiplier);

        Ok(CashOutReceipt {
            bet_id: *bet_id,
            round_id: self.round.id,
            multiplier,
            trigger: CashOutTrigger::Manual,
            at,
        })
    }

    /// Apply every time-driven transition due at `now`
    pub fn advance(&mut self, now: u64, seeds: &SeedGenerator) -> Vec<RoundEvent> {
        let mut events = Vec::new();

        if self.round.phase == RoundPhase::Betting && now >= self.round.betting_deadline {
            match self.start_run(now, seeds) {
                Ok(mut started) => events.append(&mut started),
                Err(e) => error!("Round {} failed to start: {}", self.round.id, e),
            }
        }

        if self.round.phase == RoundPhase::Running {
            self.run_until(now, &mut events);
        }

        events
    }

    fn run_until(&mut self, now: u64, events: &mut Vec<RoundEvent>) {
        let (started_at, crash_point) = match (self.round.started_at, self.crash_point) {
            (Some(started_at), Some(crash_point)) => (started_at, crash_point),
            _ => return,
        };
        let current = self.clock.multiplier_at(now.saturating_sub(started_at));

        for (bet_id, target) in self.ledger.auto_cashouts_below(crash_point) {
            if target > current {
                break;
            }
            let at = started_at + self.clock.elapsed_for(target);
            if let Some(bet) = self.ledger.cash_out(&bet_id, target, at) {
                debug!("Bet {} auto cashed out at {}", bet_id, target);
                events.push(RoundEvent::CashedOut {
                    bet_id,
                    player_id: bet.player_id.clone(),
                    multiplier: target,
                    trigger: CashOutTrigger::Auto,
                    at,
                });
            }
        }

        if current < crash_point {
            return;
        }

        let crashed_at = started_at + self.clock.elapsed_for(crash_point);
        let losers = self.ledger.crash_active(crash_point, crashed_at);
        self.round.crashed_at = Some(crashed_at);
        self.round.phase = RoundPhase::Crashed;

        info!(
            "Round {} crashed at {} ({} bets lost)",
            self.round.id, crash_point, losers
        );

        if let Some(reveal) = self.reveal.clone() {
            events.push(RoundEvent::Crashed {
                round_id: self.round.id,
                crash_point,
                crashed_at,
                reveal,
            });
        }
    }

    /// Instant of the next time-driven transition, if one is pending
    pub fn next_transition_at(&self) -> Option<u64> {
        match self.round.phase {
            RoundPhase::Betting => Some(self.round.betting_deadline),
            RoundPhase::Running => {
                let started_at = self.round.started_at?;
                let crash_point = self.crash_point?;
                let crash_at = started_at + self.clock.elapsed_for(crash_point);
                let next_auto = self
                    .ledger
                    .auto_cashouts_below(crash_point)
                    .first()
                    .map(|(_, target)| started_at + self.clock.elapsed_for(*target));
                Some(next_auto.map_or(crash_at, |auto| auto.min(crash_at)))
            }
            _ => None,
        }
    }

    pub(crate) fn record_settlement(&mut self, settlement: RoundSettlement) {
        self.settlement = Some(settlement);
        self.round.phase = RoundPhase::Settled;
    }

    pub fn snapshot(&self, now: u64) -> RoundSnapshot {
        let (elapsed_ms, multiplier) = match (self.round.phase, self.round.started_at) {
            (RoundPhase::Running, Some(started_at)) => {
                let elapsed = now.saturating_sub(started_at);
                (elapsed, self.clock.multiplier_at(elapsed))
            }
            (RoundPhase::Crashed | RoundPhase::Settled, Some(started_at)) => {
                let elapsed = self.round.crashed_at.unwrap_or(now).saturating_sub(started_at);
                (elapsed, self.crash_point.unwrap_or(Multiplier::ONE))
            }
            _ => (0, Multiplier::ONE),
        };

        RoundSnapshot {
            round_id: self.round.id,
            phase: self.round.phase,
            commitment: self.round.commitment,
            betting_deadline: self.round.betting_deadline,
            started_at: self.round.started_at,
            elapsed_ms,
            multiplier,
            crash_point: self.revealed_crash_point(),
            active_players: self.ledger.open_players(),
            bet_count: self.ledger.len(),
            server_time: now,
        }
    }

    /// Audit record for the history archive
    pub fn report(&self) -> RoundReport {
        let revealed = self.revealed_crash_point().is_some();
        RoundReport {
            round: self.round.clone(),
            crash_point: self.revealed_crash_point(),
            reveal: if revealed { self.reveal.clone() } else { None },
            bets: self.ledger.bets().to_vec(),
            settlement: self.settlement.clone(),
            refunds: self.refunds.clone(),
        }
    }

    pub fn void_reason(&self) -> Option<&FairnessError> {
        self.void_reason.as_ref()
    }
}

/// Reason for a cash-out that targets an already archived round
pub fn late_cash_out_reason(report: &RoundReport, player_id: &str, bet_id: &BetId) -> RejectReason {
    let bet = report
        .bets
        .iter()
        .find(|bet| bet.id == *bet_id && bet.player_id == player_id);

    match bet {
        None => RejectReason::UnknownBet,
        Some(_) if report.round.phase == RoundPhase::Voided => RejectReason::RoundNotRunning,
        Some(bet) if bet.status == BetStatus::CashedOut => RejectReason::AlreadySettled,
        Some(_) => RejectReason::TooLate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::fairness::{
        crash_point_for, CrashDistribution, MemorySeedVault, ScriptedEntropy, SealedSeed, SeedVault,
    };
    use crate::games::types::Seed;
    use schnorrkel::{ExpansionMode, MiniSecretKey};
    use std::sync::Arc;

    const COIN: Amount = 1_000_000_000;
    const T0: u64 = 1_700_000_000_000;

    fn seed_with_crash(round_id: RoundId, hundredths: u64) -> Seed {
        let distribution = CrashDistribution::default();
        (0u64..)
            .map(|i| {
                let mut bytes = [0u8; 32];
                bytes[..8].copy_from_slice(&i.to_be_bytes());
                Seed(bytes)
            })
            .find(|seed| crash_point_for(seed, round_id, &distribution).hundredths() == hundredths)
            .unwrap()
    }

    fn generator_with(seeds: Vec<Seed>, vault: Arc<dyn SeedVault>) -> SeedGenerator {
        SeedGenerator::new(
            MiniSecretKey::from_bytes(&[9u8; 32])
                .unwrap()
                .expand_to_keypair(ExpansionMode::Ed25519),
            vault,
            Arc::new(ScriptedEntropy::new(seeds)),
            CrashDistribution::default(),
        )
    }

    /// Round 1 with a 5s window and a crash point of exactly 2.50x
    fn crash_at_250() -> (RoundEngine, SeedGenerator) {
        let seeds = generator_with(vec![seed_with_crash(1, 250)], Arc::new(MemorySeedVault::new()));
        let engine = RoundEngine::open(1, T0, &RoundSettings::default(), &seeds);
        (engine, seeds)
    }

    fn at_multiplier(engine: &RoundEngine, hundredths: u64) -> u64 {
        engine.round().started_at.unwrap() + engine.clock.elapsed_for(Multiplier::from_hundredths(hundredths))
    }

    #[test]
    fn test_bet_admission_window() {
        let (mut engine, _seeds) = crash_at_250();

        let receipt = engine.place_bet("alice".into(), COIN, None, T0 + 1_000).unwrap();
        assert_eq!(receipt.status, BetStatus::Pending);
        assert_eq!(receipt.players, vec!["alice".to_string()]);
        assert_eq!(receipt.betting_deadline, T0 + 5_000);

        assert_eq!(
            engine.place_bet("bob".into(), 20 * COIN, None, T0 + 1_000).unwrap_err(),
            RejectReason::AmountOutOfBounds
        );
        assert_eq!(engine.ledger().len(), 1);
    }

    #[test]
    fn test_bet_after_deadline_before_transition() {
        let (mut engine, _seeds) = crash_at_250();
        assert_eq!(engine.phase(), RoundPhase::Betting);
        assert_eq!(
            engine.place_bet("alice".into(), COIN, None, T0 + 6_000).unwrap_err(),
            RejectReason::RoundClosed
        );
        assert!(engine.ledger().is_empty());
    }

    #[test]
    fn test_run_start_promotes_all_pending() {
        let (mut engine, seeds) = crash_at_250();
        engine.place_bet("alice".into(), COIN, None, T0 + 100).unwrap();
        engine.place_bet("bob".into(), COIN, None, T0 + 200).unwrap();

        let events = engine.advance(T0 + 5_020, &seeds);
        assert!(matches!(
            events.as_slice(),
            [RoundEvent::RunStarted { active_bets: 2, started_at, .. }] if *started_at == T0 + 5_000
        ));
        assert_eq!(engine.ledger().count_with_status(BetStatus::Active), 2);
        assert_eq!(engine.snapshot(T0 + 5_020).crash_point, None);
        assert_eq!(
            engine.place_bet("carol".into(), COIN, None, T0 + 5_030).unwrap_err(),
            RejectReason::RoundClosed
        );
    }

    #[test]
    fn test_start_run_before_deadline_is_phase_error() {
        let (mut engine, seeds) = crash_at_250();
        assert!(matches!(
            engine.start_run(T0 + 10, &seeds),
            Err(CrashError::Phase { round_id: 1, phase: RoundPhase::Betting, .. })
        ));
    }

    #[test]
    fn test_auto_cashout_realizes_target() {
        let (mut engine, seeds) = crash_at_250();
        let bet = engine
            .place_bet("alice".into(), COIN, Some(Multiplier::from_hundredths(200)), T0 + 1_000)
            .unwrap();
        engine.advance(T0 + 5_000, &seeds);
        assert_eq!(engine.next_transition_at(), Some(at_multiplier(&engine, 200)));

        let events = engine.advance(at_multiplier(&engine, 220), &seeds);
        assert!(matches!(
            events.as_slice(),
            [RoundEvent::CashedOut { trigger: CashOutTrigger::Auto, multiplier, .. }]
                if *multiplier == Multiplier::from_hundredths(200)
        ));

        let cashed = engine.ledger().get(&bet.bet_id).unwrap();
        assert_eq!(cashed.status, BetStatus::CashedOut);
        assert_eq!(cashed.resolved_at, Some(at_multiplier(&engine, 200)));
    }

    #[test]
    fn test_uncashed_bet_crashes() {
        let (mut engine, seeds) = crash_at_250();
        let bet = engine.place_bet("alice".into(), COIN, None, T0 + 1_000).unwrap();
        engine.advance(T0 + 5_000, &seeds);
        let crash_instant = at_multiplier(&engine, 250);
        assert_eq!(engine.next_transition_at(), Some(crash_instant));

        assert!(engine.advance(crash_instant - 1, &seeds).is_empty());
        let events = engine.advance(crash_instant + 500, &seeds);
        match events.as_slice() {
            [RoundEvent::Crashed { crash_point, crashed_at, reveal, .. }] => {
                assert_eq!(*crash_point, Multiplier::from_hundredths(250));
                assert_eq!(*crashed_at, crash_instant);
                assert_eq!(reveal.round_id, 1);
            }
            other => panic!("unexpected events {:?}", other),
        }

        let lost = engine.ledger().get(&bet.bet_id).unwrap();
        assert_eq!(lost.status, BetStatus::Crashed);
        assert_eq!(lost.realized_multiplier, Some(Multiplier::from_hundredths(250)));
        assert_eq!(engine.snapshot(crash_instant + 600).crash_point, Some(Multiplier::from_hundredths(250)));
    }

    #[test]
    fn test_cash_out_race_same_millisecond() {
        let (mut engine, seeds) = crash_at_250();
        let bet = engine
            .place_bet("alice".into(), COIN, Some(Multiplier::from_hundredths(200)), T0 + 1_000)
            .unwrap();
        engine.advance(T0 + 5_000, &seeds);

        let instant = at_multiplier(&engine, 200);
        let events = engine.advance(instant, &seeds);
        assert_eq!(events.len(), 1);
        assert_eq!(
            engine.request_cash_out("alice", &bet.bet_id, instant).unwrap_err(),
            RejectReason::AlreadySettled
        );
    }

    #[test]
    fn test_manual_cash_out_rules() {
        let (mut engine, seeds) = crash_at_250();
        let bet = engine.place_bet("alice".into(), COIN, None, T0 + 1_000).unwrap();

        assert_eq!(
            engine.request_cash_out("alice", &bet.bet_id, T0 + 2_000).unwrap_err(),
            RejectReason::RoundNotRunning
        );

        engine.advance(T0 + 5_000, &seeds);
        assert_eq!(
            engine.request_cash_out("mallory", &bet.bet_id, T0 + 6_000).unwrap_err(),
            RejectReason::UnknownBet
        );
        assert_eq!(
            engine
                .request_cash_out("alice", &BetId::new(1, 99), T0 + 6_000)
                .unwrap_err(),
            RejectReason::UnknownBet
        );

        let when = at_multiplier(&engine, 150);
        engine.advance(when, &seeds);
        let receipt = engine.request_cash_out("alice", &bet.bet_id, when).unwrap();
        assert_eq!(receipt.multiplier, Multiplier::from_hundredths(150));
        assert_eq!(receipt.trigger, CashOutTrigger::Manual);
        assert_eq!(
            engine.request_cash_out("alice", &bet.bet_id, when + 1).unwrap_err(),
            RejectReason::AlreadySettled
        );
    }

    #[test]
    fn test_cash_out_at_crash_instant_is_too_late() {
        let (mut engine, seeds) = crash_at_250();
        let bet = engine.place_bet("alice".into(), COIN, None, T0 + 1_000).unwrap();
        engine.advance(T0 + 5_000, &seeds);

        // Request stamped at the crash instant, applied before the engine advanced
        let crash_instant = at_multiplier(&engine, 250);
        assert_eq!(
            engine.request_cash_out("alice", &bet.bet_id, crash_instant).unwrap_err(),
            RejectReason::TooLate
        );
        assert_eq!(engine.ledger().get(&bet.bet_id).unwrap().status, BetStatus::Active);

        engine.advance(crash_instant, &seeds);
        assert_eq!(
            engine.request_cash_out("alice", &bet.bet_id, crash_instant + 1).unwrap_err(),
            RejectReason::TooLate
        );
    }

    #[test]
    fn test_lost_seed_voids_round() {
        struct LostVault;
        impl SeedVault for LostVault {
            fn seal(&self, _round_id: RoundId, _sealed: SealedSeed) {}
            fn unseal(&self, _round_id: RoundId) -> Option<SealedSeed> {
                None
            }
        }

        let seeds = generator_with(vec![], Arc::new(LostVault));
        let mut engine = RoundEngine::open(1, T0, &RoundSettings::default(), &seeds);
        let bet = engine.place_bet("alice".into(), 2 * COIN, None, T0 + 10).unwrap();

        let events = engine.advance(T0 + 5_000, &seeds);
        assert!(matches!(events.as_slice(), [RoundEvent::Voided { refunds: 1, .. }]));
        assert_eq!(engine.phase(), RoundPhase::Voided);
        assert_eq!(engine.refunds()[0].amount, 2 * COIN);
        assert_eq!(engine.ledger().get(&bet.bet_id).unwrap().status, BetStatus::Voided);
        assert_eq!(engine.void_reason(), Some(&FairnessError::SeedUnavailable { round_id: 1 }));
        assert_eq!(engine.next_transition_at(), None);
        assert!(engine.report().crash_point.is_none());
    }

    #[test]
    fn test_instant_crash_has_no_winners() {
        let seeds = generator_with(vec![seed_with_crash(1, 100)], Arc::new(MemorySeedVault::new()));
        let mut engine = RoundEngine::open(1, T0, &RoundSettings::default(), &seeds);
        let bet = engine
            .place_bet("alice".into(), COIN, Some(Multiplier::ONE), T0 + 10)
            .unwrap();

        let events = engine.advance(T0 + 5_000, &seeds);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], RoundEvent::Crashed { crashed_at, .. } if crashed_at == T0 + 5_000));
        assert_eq!(engine.ledger().get(&bet.bet_id).unwrap().status, BetStatus::Crashed);
    }

    #[test]
    fn test_late_cash_out_against_archived_round() {
        let (mut engine, seeds) = crash_at_250();
        let winner = engine
            .place_bet("alice".into(), COIN, Some(Multiplier::from_hundredths(200)), T0 + 100)
            .unwrap();
        let loser = engine.place_bet("bob".into(), COIN, None, T0 + 200).unwrap();
        engine.advance(T0 + 60_000, &seeds);
        assert_eq!(engine.phase(), RoundPhase::Crashed);

        let report = engine.report();
        assert_eq!(
            late_cash_out_reason(&report, "alice", &winner.bet_id),
            RejectReason::AlreadySettled
        );
        assert_eq!(late_cash_out_reason(&report, "bob", &loser.bet_id), RejectReason::TooLate);
        assert_eq!(late_cash_out_reason(&report, "alice", &loser.bet_id), RejectReason::UnknownBet);
        assert_eq!(
            late_cash_out_reason(&report, "bob", &BetId::new(1, 9)),
            RejectReason::UnknownBet
        );
    }
}
