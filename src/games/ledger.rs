use crate::{
    errors::RejectReason,
    games::types::{Amount, Bet, BetId, BetStatus, Multiplier, PlayerId, RefundRecord, RoundId},
};

/// Wager limits and admission policy for a round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BettingRules {
    pub min_bet: Amount,
    pub max_bet: Amount,
    pub allow_multiple_bets_per_player: bool,
}

impl Default for BettingRules {
    fn default() -> Self {
        Self {
            min_bet: 100_000_000,
            max_bet: 10_000_000_000,
            allow_multiple_bets_per_player: false,
        }
    }
}

/// Record of every bet admitted into one round.
///
/// Bets are stored in admission order; a bet's sequence number is its index.
#[derive(Debug, Clone)]
pub struct BetLedger {
    round_id: RoundId,
    rules: BettingRules,
    bets: Vec<Bet>,
}

impl BetLedger {
    pub fn new(round_id: RoundId, rules: BettingRules) -> Self {
        Self {
            round_id,
            rules,
            bets: Vec::new(),
        }
    }

    pub fn round_id(&self) -> RoundId {
        self.round_id
    }

    pub fn rules(&self) -> &BettingRules {
        &self.rules
    }

    /// Validate and record a new Pending bet. Round phase is checked by the caller.
    pub fn admit(
        &mut self,
        player_id: PlayerId,
        amount: Amount,
        auto_cashout: Option<Multiplier>,
        placed_at: u64,
    ) -> Result<&Bet, RejectReason> {
        if amount < self.rules.min_bet || amount > self.rules.max_bet {
            return Err(RejectReason::AmountOutOfBounds);
        }
        if matches!(auto_cashout, Some(target) if target < Multiplier::ONE) {
            return Err(RejectReason::InvalidMultiplier);
        }
        if !self.rules.allow_multiple_bets_per_player && self.has_open_bet(&player_id) {
            return Err(RejectReason::DuplicateBet);
        }

        let sequence = u32::try_from(self.bets.len()).map_err(|_| RejectReason::RoundClosed)?;
        self.bets.push(Bet {
            id: BetId::new(self.round_id, sequence),
            player_id,
            amount,
            auto_cashout,
            placed_at,
            status: BetStatus::Pending,
            realized_multiplier: None,
            resolved_at: None,
        });

        Ok(&self.bets[sequence as usize])
    }

    pub fn get(&self, bet_id: &BetId) -> Option<&Bet> {
        if bet_id.round_id != self.round_id {
            return None;
        }
        self.bets.get(bet_id.sequence as usize)
    }

    pub fn bets(&self) -> &[Bet] {
        &self.bets
    }

    pub fn len(&self) -> usize {
        self.bets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }

    pub fn count_with_status(&self, status: BetStatus) -> usize {
        self.bets.iter().filter(|bet| bet.status == status).count()
    }

    fn has_open_bet(&self, player_id: &str) -> bool {
        self.bets.iter().any(|bet| {
            bet.player_id == player_id && matches!(bet.status, BetStatus::Pending | BetStatus::Active)
        })
    }

    /// Players holding Pending or Active bets, in admission order, without repeats
    pub fn open_players(&self) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = Vec::new();
        for bet in &self.bets {
            if matches!(bet.status, BetStatus::Pending | BetStatus::Active)
                && !players.iter().any(|p| p == &bet.player_id)
            {
                players.push(bet.player_id.clone());
            }
        }
        players
    }

    fn transition(&mut self, bet_id: &BetId, next: BetStatus) -> Option<&mut Bet> {
        if bet_id.round_id != self.round_id {
            return None;
        }
        let bet = self.bets.get_mut(bet_id.sequence as usize)?;
        if !bet.status.can_transition_to(next) {
            return None;
        }
        bet.status = next;
        Some(bet)
    }

    /// Promote every Pending bet to Active; returns how many were promoted
    pub fn activate_pending(&mut self) -> usize {
        let mut promoted = 0;
        for bet in self.bets.iter_mut().filter(|bet| bet.status == BetStatus::Pending) {
            bet.status = BetStatus::Active;
            promoted += 1;
        }
        promoted
    }

    /// Void every Pending bet and produce one refund per bet
    pub fn void_pending(&mut self, at: u64) -> Vec<RefundRecord> {
        self.bets
            .iter_mut()
            .filter(|bet| bet.status == BetStatus::Pending)
            .map(|bet| {
                bet.status = BetStatus::Voided;
                bet.resolved_at = Some(at);
                RefundRecord {
                    bet_id: bet.id,
                    player_id: bet.player_id.clone(),
                    amount: bet.amount,
                }
            })
            .collect()
    }

    /// Record a cash-out. `None` if the bet is unknown or no longer Active.
    pub fn cash_out(&mut self, bet_id: &BetId, multiplier: Multiplier, at: u64) -> Option<&Bet> {
        let bet = self.transition(bet_id, BetStatus::CashedOut)?;
        bet.realized_multiplier = Some(multiplier);
        bet.resolved_at = Some(at);
        Some(bet)
    }

    /// Mark every still-Active bet as lost at the crash point
    pub fn crash_active(&mut self, crash_point: Multiplier, at: u64) -> usize {
        let mut crashed = 0;
        for bet in self.bets.iter_mut().filter(|bet| bet.status == BetStatus::Active) {
            bet.status = BetStatus::Crashed;
            bet.realized_multiplier = Some(crash_point);
            bet.resolved_at = Some(at);
            crashed += 1;
        }
        crashed
    }

    /// Active bets whose auto-cashout target is strictly below `limit`,
    /// ordered by (target, sequence).
    pub fn auto_cashouts_below(&self, limit: Multiplier) -> Vec<(BetId, Multiplier)> {
        let mut due: Vec<(BetId, Multiplier)> = self
            .bets
            .iter()
            .filter(|bet| bet.status == BetStatus::Active)
            .filter_map(|bet| bet.auto_cashout.map(|target| (bet.id, target)))
            .filter(|(_, target)| *target < limit)
            .collect();
        due.sort_by_key(|(id, target)| (*target, id.sequence));
        due
    }
}
