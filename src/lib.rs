//! crashpoint - authoritative crash-round wagering engine
//!
//! Runs back-to-back rounds with a provably-fair crash point, admits bets
//! during a fixed betting window, resolves cash-outs against a rising
//! multiplier and settles every bet exactly once.

pub mod api;
pub mod config;
pub mod errors;
pub mod games;
pub mod metrics;

pub use config::{ConfigLoader, CrashConfig};
pub use errors::{CrashError, CrashResult, RejectReason};
pub use games::{EngineHandle, RoundScheduler};
pub use metrics::EngineMetrics;
