// Review Ledger - durable log of reviewer dispositions

use crate::error::Result;
use crate::model::{LedgerEntry, TransactionStatus};
use crate::store::KvStore;

/// Persistence key for the serialized ledger.
pub const LEDGER_KEY: &str = "review_ledger";

/// Append/update log of transactions that have received a human
/// disposition, keyed by transaction id.
///
/// Ordering is insertion order of FIRST appearance: a later disposition
/// for the same id replaces the entry in place, it does not move it.
/// At most one entry exists per id.
#[derive(Debug, Default)]
pub struct ReviewLedger {
    entries: Vec<LedgerEntry>,
}

impl ReviewLedger {
    pub fn new() -> Self {
        ReviewLedger::default()
    }

    /// Rehydrate from persistence; absent key means an empty ledger.
    pub fn load(store: &dyn KvStore) -> Result<Self> {
        let entries = match store.get(LEDGER_KEY)? {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };

        log::debug!("loaded {} ledger entries from persistence", entries.len());

        Ok(ReviewLedger { entries })
    }

    /// Insert or replace the entry for `entry.id()`, then persist.
    ///
    /// Transitions are unconditional overwrites: resolved can become
    /// escalated and vice versa, with no forbidden transition and no
    /// history beyond the latest snapshot.
    pub fn upsert(&mut self, entry: LedgerEntry, store: &mut dyn KvStore) -> Result<()> {
        match self.entries.iter_mut().find(|e| e.id() == entry.id()) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }

        let json = serde_json::to_string(&self.entries)?;
        store.set(LEDGER_KEY, &json)?;

        Ok(())
    }

    /// One display page, 1-based. Out-of-range pages (and zero page or
    /// page size) return an empty slice, never an error.
    pub fn page(&self, page: usize, page_size: usize) -> &[LedgerEntry] {
        if page == 0 || page_size == 0 {
            return &[];
        }

        // Checked: page numbers come straight from user input, and an
        // overflowing offset is just another out-of-range page.
        let start = match (page - 1).checked_mul(page_size) {
            Some(start) if start < self.entries.len() => start,
            _ => return &[],
        };

        let end = (start + page_size).min(self.entries.len());
        &self.entries[start..end]
    }

    pub fn count_by_status(&self, status: TransactionStatus) -> usize {
        self.entries.iter().filter(|e| e.status() == status).count()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
