// Error taxonomy for the triage engine

use thiserror::Error;

/// Errors surfaced by the triage core.
///
/// Source-fetch failures are NOT represented here: they are recovered
/// locally with fallback defaults (see `source::load_data`). Malformed
/// records are not errors either - lenient deserialization turns them
/// into fields that never flag.
#[derive(Error, Debug)]
pub enum TriageError {
    /// The evaluation worker failed or is unreachable. Callers should
    /// treat the flagged snapshot as stale; there is no automatic retry.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// The key-value backend rejected a read or write. In-memory state
    /// remains authoritative for the session but will not survive a
    /// reload.
    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// A persisted snapshot could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Disposition target is not in the current working set.
    #[error("unknown transaction id: {0}")]
    UnknownTransaction(i64),

    /// CSV export formatting failed.
    #[error("csv export error: {0}")]
    Csv(#[from] csv::Error),

    /// CSV export buffer write failed.
    #[error("csv export i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer produced non-UTF-8 output.
    #[error("csv export produced invalid utf-8")]
    CsvUtf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, TriageError>;
