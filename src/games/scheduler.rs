//! Back-to-back round scheduling
//!
//! A single tokio task owns the live [`RoundEngine`] and applies every
//! transition, so bet admission, cash-outs, the crash and settlement are
//! totally ordered. Callers talk to it through a cloneable [`EngineHandle`].

use crate::{
    config::CrashConfig,
    errors::{RejectReason, TransferError},
    games::{
        accounts::{AccountResolver, FundsTransfer},
        engine::{late_cash_out_reason, RoundEngine, RoundSettings},
        fairness::SeedGenerator,
        history::RoundHistory,
        settlement::SettlementProcessor,
        types::{
            Amount, BetId, BetReceipt, CashOutReceipt, Multiplier, PlayerId, RefundRecord, RoundEvent,
            RoundId, RoundPhase, RoundReport, RoundSnapshot, SettlementOutcome, SettlementRecord,
        },
    },
    metrics::EngineMetrics,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, error, info};

/// Maps the runtime's monotonic clock onto epoch milliseconds.
///
/// Built on `tokio::time::Instant` so paused test time drives the engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineClock {
    origin: Instant,
    origin_ms: u64,
}

impl EngineClock {
    pub fn start() -> Self {
        let origin_ms = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        Self::with_origin(origin_ms)
    }

    pub fn with_origin(origin_ms: u64) -> Self {
        Self {
            origin: Instant::now(),
            origin_ms,
        }
    }

    pub fn now_ms(&self) -> u64 {
        let elapsed = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.origin_ms.saturating_add(elapsed)
    }

    pub fn instant_at(&self, ms: u64) -> Instant {
        self.origin + Duration::from_millis(ms.saturating_sub(self.origin_ms))
    }
}

enum Command {
    PlaceBet {
        player_id: PlayerId,
        amount: Amount,
        auto_cashout: Option<Multiplier>,
        reply: oneshot::Sender<Result<BetReceipt, RejectReason>>,
    },
    CashOut {
        player_id: PlayerId,
        bet_id: BetId,
        reply: oneshot::Sender<Result<CashOutReceipt, RejectReason>>,
    },
    Report {
        round_id: RoundId,
        reply: oneshot::Sender<Option<RoundReport>>,
    },
    Shutdown,
}

/// External services the scheduler depends on
#[derive(Clone)]
pub struct Collaborators {
    pub accounts: Arc<dyn AccountResolver>,
    pub transfers: Arc<dyn FundsTransfer>,
}

/// Cloneable client of the scheduler task
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<RoundSnapshot>,
    events: broadcast::Sender<RoundEvent>,
    history: Arc<RoundHistory>,
    accounts: Arc<dyn AccountResolver>,
    transfers: Arc<dyn FundsTransfer>,
    metrics: EngineMetrics,
    public_key_hex: String,
}

impl EngineHandle {
    async fn resolve(&self, account: &str) -> Result<PlayerId, RejectReason> {
        self.accounts.resolve(account).await.map_err(|e| {
            debug!("Account resolution failed: {}", e);
            self.metrics.record_rejection(RejectReason::UnknownAccount);
            RejectReason::UnknownAccount
        })
    }

    async fn request<T>(
        &self,
        command: Command,
        reply: oneshot::Receiver<Result<T, RejectReason>>,
    ) -> Result<T, RejectReason> {
        if self.commands.send(command).await.is_err() {
            self.metrics.record_rejection(RejectReason::EngineUnavailable);
            return Err(RejectReason::EngineUnavailable);
        }
        reply.await.unwrap_or_else(|_| {
            self.metrics.record_rejection(RejectReason::EngineUnavailable);
            Err(RejectReason::EngineUnavailable)
        })
    }

    async fn debit(&self, player_id: &str, amount: Amount) -> Result<(), RejectReason> {
        self.transfers.debit_wager(player_id, amount).await.map_err(|e| {
            debug!("Wager debit failed: {}", e);
            let reason = match e {
                TransferError::InsufficientFunds(_) => RejectReason::InsufficientFunds,
                TransferError::UnknownAccount(_) => RejectReason::UnknownAccount,
                _ => RejectReason::EngineUnavailable,
            };
            self.metrics.record_rejection(reason);
            reason
        })
    }

    /// Place a bet in the current round.
    ///
    /// The wager is debited before the bet is queued and returned if the
    /// round refuses it.
    pub async fn place_bet(
        &self,
        account: &str,
        amount: Amount,
        auto_cashout: Option<Multiplier>,
    ) -> Result<BetReceipt, RejectReason> {
        let player_id = self.resolve(account).await?;
        self.debit(&player_id, amount).await?;

        let (reply, rx) = oneshot::channel();
        let result = self
            .request(
                Command::PlaceBet {
                    player_id: player_id.clone(),
                    amount,
                    auto_cashout,
                    reply,
                },
                rx,
            )
            .await;

        if result.is_err() {
            if let Err(e) = self.transfers.return_wager(&player_id, amount).await {
                error!("Could not return refused wager of {} to {}: {}", amount, player_id, e);
            }
        }
        result
    }

    /// Cash out an active bet at the current multiplier
    pub async fn request_cash_out(&self, account: &str, bet_id: BetId) -> Result<CashOutReceipt, RejectReason> {
        let player_id = self.resolve(account).await?;
        let (reply, rx) = oneshot::channel();
        self.request(
            Command::CashOut {
                player_id,
                bet_id,
                reply,
            },
            rx,
        )
        .await
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn watch_snapshots(&self) -> watch::Receiver<RoundSnapshot> {
        self.snapshots.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoundEvent> {
        self.events.subscribe()
    }

    /// Archived report, or the live round's report so far
    pub async fn round_report(&self, round_id: RoundId) -> Option<RoundReport> {
        if let Some(report) = self.history.get(round_id) {
            return Some(report);
        }
        let (reply, rx) = oneshot::channel();
        self.commands.send(Command::Report { round_id, reply }).await.ok()?;
        rx.await.ok().flatten()
    }

    pub fn public_key_hex(&self) -> &str {
        &self.public_key_hex
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Ask the scheduler to stop after the current step
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }
}

pub struct RoundScheduler {
    settings: RoundSettings,
    seeds: SeedGenerator,
    settlement: SettlementProcessor,
    transfers: Arc<dyn FundsTransfer>,
    history: Arc<RoundHistory>,
    metrics: EngineMetrics,
    clock: EngineClock,
    tick: Duration,
    max_rounds: Option<u64>,
    commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<RoundSnapshot>,
    events: broadcast::Sender<RoundEvent>,
    next_round_id: RoundId,
    rounds_finished: u64,
}

impl RoundScheduler {
    /// Open the first round and start the scheduler task
    pub fn spawn(
        config: &CrashConfig,
        seeds: SeedGenerator,
        collaborators: Collaborators,
        metrics: EngineMetrics,
    ) -> (EngineHandle, JoinHandle<()>) {
        let clock = EngineClock::start();
        let settings = config.round_settings();
        let history = Arc::new(RoundHistory::new(config.scheduler.history_capacity));

        let engine = RoundEngine::open(1, clock.now_ms(), &settings, &seeds);
        let (snapshot_tx, snapshot_rx) = watch::channel(engine.snapshot(clock.now_ms()));
        let (command_tx, command_rx) = mpsc::channel(config.scheduler.command_buffer.max(1));
        let (event_tx, _) = broadcast::channel(config.scheduler.event_buffer.max(1));

        let handle = EngineHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            events: event_tx.clone(),
            history: history.clone(),
            accounts: collaborators.accounts,
            transfers: collaborators.transfers.clone(),
            metrics: metrics.clone(),
            public_key_hex: seeds.public_key_hex(),
        };

        let scheduler = RoundScheduler {
            settings,
            seeds,
            settlement: SettlementProcessor::new(),
            transfers: collaborators.transfers,
            history,
            metrics,
            clock,
            tick: config.tick_interval(),
            max_rounds: config.scheduler.max_rounds,
            commands: command_rx,
            snapshots: snapshot_tx,
            events: event_tx,
            next_round_id: 2,
            rounds_finished: 0,
        };

        let task = tokio::spawn(scheduler.run(engine));
        (handle, task)
    }

    async fn run(mut self, mut engine: RoundEngine) {
        info!("Round scheduler started");
        self.emit(engine.opened_event());

        loop {
            let now = self.clock.now_ms();
            let tick_ms = u64::try_from(self.tick.as_millis()).unwrap_or(u64::MAX);
            let wake_ms = engine
                .next_transition_at()
                .map_or(now.saturating_add(tick_ms), |at| at.min(now.saturating_add(tick_ms)));

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => {
                        info!("Round scheduler shutting down during round {}", engine.round_id());
                        break;
                    }
                    Some(command) => {
                        if !self.step(&mut engine) {
                            break;
                        }
                        self.apply(&mut engine, command);
                    }
                },
                _ = tokio::time::sleep_until(self.clock.instant_at(wake_ms.max(now))) => {}
            }

            if !self.step(&mut engine) {
                break;
            }
        }

        info!("Round scheduler stopped after {} rounds", self.rounds_finished);
    }

    /// Advance to now, finishing and replacing the round if it ended.
    /// Returns false once `max_rounds` is reached.
    fn step(&mut self, engine: &mut RoundEngine) -> bool {
        let now = self.clock.now_ms();
        for event in engine.advance(now, &self.seeds) {
            self.emit(event);
        }

        if matches!(engine.phase(), RoundPhase::Crashed | RoundPhase::Voided) {
            self.finish_round(engine, now);
            self.rounds_finished += 1;
            self.publish_snapshot(engine, now);

            if self.max_rounds.is_some_and(|max| self.rounds_finished >= max) {
                return false;
            }

            *engine = RoundEngine::open(self.next_round_id, now, &self.settings, &self.seeds);
            self.next_round_id += 1;
            self.emit(engine.opened_event());
        }

        self.publish_snapshot(engine, now);
        true
    }

    fn finish_round(&mut self, engine: &mut RoundEngine, now: u64) {
        match engine.phase() {
            RoundPhase::Crashed => match self.settlement.settle(engine, now) {
                Ok(settlement) => {
                    self.metrics
                        .record_payouts(settlement.total_payout, settlement.flagged.len());
                    self.emit(RoundEvent::Settled {
                        round_id: settlement.round_id,
                        records: settlement.records.len(),
                        total_payout: settlement.total_payout,
                        flagged: settlement.flagged.len(),
                    });

                    let wins: Vec<SettlementRecord> = settlement
                        .records
                        .into_iter()
                        .filter(|record| record.outcome == SettlementOutcome::Win && record.payout > 0)
                        .collect();
                    self.deliver_payouts(wins);
                }
                Err(e) => error!("Round {} could not be settled: {}", engine.round_id(), e),
            },
            RoundPhase::Voided => self.deliver_refunds(engine.refunds().to_vec()),
            _ => {}
        }

        self.history.record(engine.report());
    }

    fn deliver_payouts(&self, records: Vec<SettlementRecord>) {
        if records.is_empty() {
            return;
        }
        let transfers = self.transfers.clone();
        tokio::spawn(async move {
            for record in records {
                if let Err(e) = transfers.pay_out(&record).await {
                    error!("Payout for bet {} failed: {}", record.bet_id, e);
                }
            }
        });
    }

    fn deliver_refunds(&self, refunds: Vec<RefundRecord>) {
        if refunds.is_empty() {
            return;
        }
        let transfers = self.transfers.clone();
        tokio::spawn(async move {
            for refund in refunds {
                if let Err(e) = transfers.refund(&refund).await {
                    error!("Refund for bet {} failed: {}", refund.bet_id, e);
                }
            }
        });
    }

    fn apply(&mut self, engine: &mut RoundEngine, command: Command) {
        let now = self.clock.now_ms();
        match command {
            Command::PlaceBet {
                player_id,
                amount,
                auto_cashout,
                reply,
            } => {
                let result = engine.place_bet(player_id, amount, auto_cashout, now);
                match &result {
                    Ok(receipt) => self.emit(RoundEvent::BetPlaced {
                        bet_id: receipt.bet_id,
                        player_id: receipt.player_id.clone(),
                        amount: receipt.amount,
                        auto_cashout: receipt.auto_cashout,
                    }),
                    Err(reason) => self.reject("bet", *reason),
                }
                let _ = reply.send(result);
            }
            Command::CashOut {
                player_id,
                bet_id,
                reply,
            } => {
                let result = if bet_id.round_id == engine.round_id() {
                    engine.request_cash_out(&player_id, &bet_id, now)
                } else {
                    Err(self.archived_cash_out(&player_id, &bet_id))
                };
                match &result {
                    Ok(receipt) => self.emit(RoundEvent::CashedOut {
                        bet_id: receipt.bet_id,
                        player_id,
                        multiplier: receipt.multiplier,
                        trigger: receipt.trigger,
                        at: receipt.at,
                    }),
                    Err(reason) => self.reject("cash-out", *reason),
                }
                let _ = reply.send(result);
            }
            Command::Report { round_id, reply } => {
                let report = (engine.round_id() == round_id).then(|| engine.report());
                let _ = reply.send(report);
            }
            Command::Shutdown => {}
        }
        self.publish_snapshot(engine, now);
    }

    /// Cash-outs that reach the scheduler after their round was replaced
    fn archived_cash_out(&self, player_id: &str, bet_id: &BetId) -> RejectReason {
        match self.history.get(bet_id.round_id) {
            Some(report) => late_cash_out_reason(&report, player_id, bet_id),
            None => RejectReason::UnknownBet,
        }
    }

    fn reject(&self, action: &str, reason: RejectReason) {
        debug!("Rejected {}: {}", action, reason);
        self.metrics.record_rejection(reason);
    }

    fn emit(&self, event: RoundEvent) {
        self.metrics.observe(&event);
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn publish_snapshot(&self, engine: &RoundEngine, now: u64) {
        self.snapshots.send_replace(engine.snapshot(now));
    }
}
