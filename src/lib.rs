// Fraud Triage Engine - Core Library
// Exposes all modules for use in the CLI, API server, and tests

pub mod coordinator;
pub mod error;
pub mod evaluator;
pub mod flagged;
pub mod ledger;
pub mod model;
pub mod source;
pub mod store;

// Re-export commonly used types
pub use coordinator::{TriageCoordinator, CSV_HEADER};
pub use error::{Result, TriageError};
pub use evaluator::{flag_transactions, is_flagged, EvaluatorHandle};
pub use flagged::{FlaggedStore, FLAGGED_KEY};
pub use ledger::{ReviewLedger, LEDGER_KEY};
pub use model::{
    Decision, LedgerEntry, ThresholdConfig, Transaction, TransactionFilter, TransactionStatus,
};
pub use source::{load_data, TriageData};
pub use store::{KvStore, SqliteStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
