pub mod accounts;
pub mod clock;
pub mod engine;
pub mod fairness;
pub mod history;
pub mod ledger;
pub mod scheduler;
pub mod settlement;
pub mod types;

pub use accounts::{AccountResolver, FundsTransfer, InMemoryLedger};
pub use clock::MultiplierClock;
pub use engine::{RoundEngine, RoundSettings};
pub use fairness::{CrashDistribution, SeedGenerator};
pub use history::RoundHistory;
pub use ledger::{BetLedger, BettingRules};
pub use scheduler::{Collaborators, EngineHandle, RoundScheduler};
pub use settlement::SettlementProcessor;
pub use types::*;
