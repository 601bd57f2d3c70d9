//! Engine metrics exported in Prometheus text format

use crate::games::types::{CashOutTrigger, RoundEvent};
use crate::errors::RejectReason;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct EngineMetrics {
    registry: Registry,
    rounds_started: IntCounter,
    rounds_voided: IntCounter,
    bets_placed: IntCounter,
    rejections: IntCounterVec,
    cash_outs: IntCounterVec,
    payout_units: IntCounter,
    reconciliation_flags: IntCounter,
    crash_points: Histogram,
}

impl EngineMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("crashpoint".to_string()), None)?;

        let rounds_started = IntCounter::new("rounds_started_total", "Rounds that entered the running phase")?;
        let rounds_voided = IntCounter::new("rounds_voided_total", "Rounds voided by a fairness failure")?;
        let bets_placed = IntCounter::new("bets_placed_total", "Bets admitted")?;
        let rejections = IntCounterVec::new(
            Opts::new("rejections_total", "Rejected bet and cash-out commands"),
            &["reason"],
        )?;
        let cash_outs = IntCounterVec::new(Opts::new("cash_outs_total", "Accepted cash-outs"), &["trigger"])?;
        let payout_units = IntCounter::new("payout_units_total", "Base units paid to winners")?;
        let reconciliation_flags = IntCounter::new(
            "reconciliation_flags_total",
            "Settlement records held for manual reconciliation",
        )?;
        let crash_points = Histogram::with_opts(
            HistogramOpts::new("crash_point", "Crash multiplier per round")
                .buckets(vec![1.0, 1.01, 1.5, 2.0, 3.0, 5.0, 10.0, 100.0, 1000.0]),
        )?;

        registry.register(Box::new(rounds_started.clone()))?;
        registry.register(Box::new(rounds_voided.clone()))?;
        registry.register(Box::new(bets_placed.clone()))?;
        registry.register(Box::new(rejections.clone()))?;
        registry.register(Box::new(cash_outs.clone()))?;
        registry.register(Box::new(payout_units.clone()))?;
        registry.register(Box::new(reconciliation_flags.clone()))?;
        registry.register(Box::new(crash_points.clone()))?;

        Ok(Self {
            registry,
            rounds_started,
            rounds_voided,
            bets_placed,
            rejections,
            cash_outs,
            payout_units,
            reconciliation_flags,
            crash_points,
        })
    }

    pub fn record_rejection(&self, reason: RejectReason) {
        self.rejections.with_label_values(&[reason.code()]).inc();
    }

    pub fn record_payouts(&self, total_payout: u128, flagged: usize) {
        self.payout_units.inc_by(u64::try_from(total_payout).unwrap_or(u64::MAX));
        self.reconciliation_flags.inc_by(flagged as u64);
    }

    /// Count everything observable from the event stream
    pub fn observe(&self, event: &RoundEvent) {
        match event {
            RoundEvent::RunStarted { .. } => self.rounds_started.inc(),
            RoundEvent::BetPlaced { .. } => self.bets_placed.inc(),
            RoundEvent::CashedOut { trigger, .. } => {
                let label = match trigger {
                    CashOutTrigger::Manual => "manual",
                    CashOutTrigger::Auto => "auto",
                };
                self.cash_outs.with_label_values(&[label]).inc();
            }
            RoundEvent::Crashed { crash_point, .. } => self.crash_points.observe(crash_point.as_f64()),
            RoundEvent::Voided { .. } => self.rounds_voided.inc(),
            RoundEvent::RoundOpened { .. } | RoundEvent::Settled { .. } => {}
        }
    }

    pub fn bets_placed(&self) -> u64 {
        self.bets_placed.get()
    }

    pub fn rounds_started(&self) -> u64 {
        self.rounds_started.get()
    }

    /// Prometheus text exposition
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::types::{BetId, Multiplier};

    #[test]
    fn test_observe_and_render() {
        let metrics = EngineMetrics::new().unwrap();
        metrics.observe(&RoundEvent::BetPlaced {
            bet_id: BetId::new(1, 0),
            player_id: "alice".to_string(),
            amount: 10,
            auto_cashout: None,
        });
        metrics.observe(&RoundEvent::CashedOut {
            bet_id: BetId::new(1, 0),
            player_id: "alice".to_string(),
            multiplier: Multiplier::from_hundredths(200),
            trigger: CashOutTrigger::Auto,
            at: 0,
        });
        metrics.record_rejection(RejectReason::TooLate);
        metrics.record_payouts(20, 1);

        assert_eq!(metrics.bets_placed(), 1);
        let text = metrics.render();
        assert!(text.contains("crashpoint_bets_placed_total 1"));
        assert!(text.contains("crashpoint_cash_outs_total{trigger=\"auto\"} 1"));
        assert!(text.contains("crashpoint_rejections_total{reason=\"TOO_LATE\"} 1"));
        assert!(text.contains("crashpoint_payout_units_total 20"));
    }
}
