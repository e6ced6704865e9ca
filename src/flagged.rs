// Flagged Store - single-slot snapshot of the latest evaluation run

use crate::error::Result;
use crate::model::Transaction;
use crate::store::KvStore;

/// Persistence key for the flagged-result snapshot.
pub const FLAGGED_KEY: &str = "flagged_transactions";

/// Holds the most recent flagged result set, replaced wholesale on each
/// evaluation run. A single-slot cache, not a log: no history is kept.
#[derive(Debug, Default)]
pub struct FlaggedStore {
    current: Vec<Transaction>,
}

impl FlaggedStore {
    pub fn new() -> Self {
        FlaggedStore::default()
    }

    /// Rehydrate from persistence. An absent key means no evaluation has
    /// run yet: empty snapshot.
    pub fn load(store: &dyn KvStore) -> Result<Self> {
        let current = match store.get(FLAGGED_KEY)? {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };

        log::debug!("loaded {} flagged transactions from persistence", current.len());

        Ok(FlaggedStore { current })
    }

    /// Overwrite the snapshot and persist it synchronously.
    ///
    /// The in-memory slot is updated before the write, so on a
    /// persistence failure it stays authoritative for the session while
    /// the error propagates to the caller.
    pub fn replace(&mut self, flagged: Vec<Transaction>, store: &mut dyn KvStore) -> Result<()> {
        self.current = flagged;

        let json = serde_json::to_string(&self.current)?;
        store.set(FLAGGED_KEY, &json)?;

        log::debug!("persisted {} flagged transactions", self.current.len());

        Ok(())
    }

    /// The last replaced value; empty if no run has completed yet.
    pub fn current(&self) -> &[Transaction] {
        &self.current
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use chrono::NaiveDate;

    fn tx(id: i64, amount: f64) -> Transaction {
        Transaction {
            id,
            amount: Some(amount),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            kind: "purchase".to_string(),
            fraud_score: Some(0.9),
            status: Default::default(),
        }
    }

    #[test]
    fn test_current_is_empty_before_first_replace() {
        let flagged = FlaggedStore::new();

        assert!(flagged.current().is_empty());
    }

    #[test]
    fn test_replace_then_current_round_trip() {
        let mut store = SqliteStore::in_memory().unwrap();
        let mut flagged = FlaggedStore::new();

        let batch = vec![tx(1, 2000.0), tx(2, 3000.0)];
        flagged.replace(batch.clone(), &mut store).unwrap();

        assert_eq!(flagged.current(), batch.as_slice());
    }

    #[test]
    fn test_replace_with_empty_sequence() {
        let mut store = SqliteStore::in_memory().unwrap();
        let mut flagged = FlaggedStore::new();

        flagged.replace(vec![tx(1, 2000.0)], &mut store).unwrap();
        flagged.replace(Vec::new(), &mut store).unwrap();

        assert!(flagged.current().is_empty());

        // The empty overwrite is what persistence sees too
        let reloaded = FlaggedStore::load(&store).unwrap();
        assert!(reloaded.current().is_empty());
    }

    #[test]
    fn test_replace_overwrites_never_merges() {
        let mut store = SqliteStore::in_memory().unwrap();
        let mut flagged = FlaggedStore::new();

        flagged.replace(vec![tx(1, 2000.0), tx(2, 3000.0)], &mut store).unwrap();
        flagged.replace(vec![tx(3, 4000.0)], &mut store).unwrap();

        let ids: Vec<i64> = flagged.current().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_load_rehydrates_last_replace() {
        let mut store = SqliteStore::in_memory().unwrap();

        let mut flagged = FlaggedStore::new();
        flagged.replace(vec![tx(7, 9000.0)], &mut store).unwrap();

        let reloaded = FlaggedStore::load(&store).unwrap();
        assert_eq!(reloaded.current(), flagged.current());
    }
}
