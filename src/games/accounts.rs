//! Collaborator interfaces for identity and value transfer
//!
//! The engine never moves funds itself. It resolves accounts to player ids
//! and collects the wager before admitting a bet, and hands finalized
//! records to a [`FundsTransfer`] implementation once a round is settled or
//! voided.

use crate::{
    errors::TransferError,
    games::types::{Amount, BetId, PlayerId, RefundRecord, SettlementRecord},
};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tracing::debug;

/// Maps an external account reference to a player id
#[async_trait]
pub trait AccountResolver: Send + Sync {
    async fn resolve(&self, account: &str) -> Result<PlayerId, TransferError>;
}

/// Moves wagers in and delivers finalized payouts and refunds.
///
/// Payouts and refunds must be idempotent per bet: repeating a transfer for
/// the same bet returns `AlreadyProcessed` and moves nothing.
#[async_trait]
pub trait FundsTransfer: Send + Sync {
    /// Take the wager before the bet is submitted to the round
    async fn debit_wager(&self, player_id: &str, amount: Amount) -> Result<(), TransferError>;

    /// Give back a wager whose bet the round refused
    async fn return_wager(&self, player_id: &str, amount: Amount) -> Result<(), TransferError>;

    async fn pay_out(&self, record: &SettlementRecord) -> Result<(), TransferError>;

    async fn refund(&self, record: &RefundRecord) -> Result<(), TransferError>;
}

/// In-memory balances, used by the standalone binary and in tests
pub struct InMemoryLedger {
    balances: DashMap<PlayerId, Amount>,
    processed: DashSet<BetId>,
    /// Accept unknown accounts, creating them with `starting_balance`
    open_registration: bool,
    starting_balance: Amount,
}

impl InMemoryLedger {
    pub fn new(open_registration: bool) -> Self {
        Self {
            balances: DashMap::new(),
            processed: DashSet::new(),
            open_registration,
            starting_balance: 0,
        }
    }

    /// Balance granted to accounts created by open registration
    pub fn with_starting_balance(mut self, amount: Amount) -> Self {
        self.starting_balance = amount;
        self
    }

    pub fn register(&self, player_id: impl Into<PlayerId>, balance: Amount) {
        self.balances.insert(player_id.into(), balance);
    }

    pub fn balance(&self, player_id: &str) -> Option<Amount> {
        self.balances.get(player_id).map(|entry| *entry.value())
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    fn account(
        &self,
        player_id: &str,
    ) -> Result<dashmap::mapref::one::RefMut<'_, PlayerId, Amount>, TransferError> {
        match self.balances.get_mut(player_id) {
            Some(balance) => Ok(balance),
            None if self.open_registration => Ok(self
                .balances
                .entry(player_id.to_string())
                .or_insert(self.starting_balance)),
            None => Err(TransferError::UnknownAccount(player_id.to_string())),
        }
    }

    fn credit(&self, bet_id: BetId, player_id: &str, amount: Amount) -> Result<(), TransferError> {
        if self.processed.contains(&bet_id) {
            return Err(TransferError::AlreadyProcessed(bet_id));
        }

        let mut balance = self.account(player_id)?;
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::BalanceOverflow(player_id.to_string()))?;

        // Marking under the balance guard keeps concurrent duplicates out
        if !self.processed.insert(bet_id) {
            return Err(TransferError::AlreadyProcessed(bet_id));
        }
        *balance = updated;

        debug!("Credited {} units to {} for bet {}", amount, player_id, bet_id);
        Ok(())
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl AccountResolver for InMemoryLedger {
    async fn resolve(&self, account: &str) -> Result<PlayerId, TransferError> {
        let account = account.trim();
        if account.is_empty() {
            return Err(TransferError::UnknownAccount(account.to_string()));
        }
        if self.balances.contains_key(account) {
            return Ok(account.to_string());
        }
        if self.open_registration {
            self.balances
                .entry(account.to_string())
                .or_insert(self.starting_balance);
            return Ok(account.to_string());
        }
        Err(TransferError::UnknownAccount(account.to_string()))
    }
}

#[async_trait]
impl FundsTransfer for InMemoryLedger {
    async fn debit_wager(&self, player_id: &str, amount: Amount) -> Result<(), TransferError> {
        let mut balance = self.account(player_id)?;
        *balance = balance
            .checked_sub(amount)
            .ok_or_else(|| TransferError::InsufficientFunds(player_id.to_string()))?;
        debug!("Debited {} units from {}", amount, player_id);
        Ok(())
    }

    async fn return_wager(&self, player_id: &str, amount: Amount) -> Result<(), TransferError> {
        let mut balance = self.account(player_id)?;
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::BalanceOverflow(player_id.to_string()))?;
        Ok(())
    }

    async fn pay_out(&self, record: &SettlementRecord) -> Result<(), TransferError> {
        self.credit(record.bet_id, &record.player_id, record.payout)
    }

    async fn refund(&self, record: &RefundRecord) -> Result<(), TransferError> {
        self.credit(record.bet_id, &record.player_id, record.amount)
    }
}
