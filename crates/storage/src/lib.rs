pub mod db;
pub mod ledger;
pub mod repositories;

pub use ledger::{LedgerStats, SignalLedger, TierStats, TransitionOutcome};
