// Triage Coordinator - orchestrates evaluation, dispositions, and export
//
// Single writer by construction: every mutating method takes &mut self,
// so all state changes are serialized by whoever owns the coordinator.
// The evaluation worker never writes shared state, it only returns a
// value over its reply channel.

use crate::error::{Result, TriageError};
use crate::evaluator::EvaluatorHandle;
use crate::flagged::FlaggedStore;
use crate::ledger::ReviewLedger;
use crate::model::{
    Decision, LedgerEntry, ThresholdConfig, Transaction, TransactionFilter, TransactionStatus,
};
use crate::source::TriageData;
use crate::store::KvStore;

/// CSV export header, matching the reports page download.
pub const CSV_HEADER: [&str; 5] = ["ID", "Amount", "Date", "Type", "Fraud Score"];

/// Owns the flagged snapshot, the review ledger, and the in-memory
/// working set; routes evaluation requests to the worker and applies
/// reviewer dispositions.
pub struct TriageCoordinator<S: KvStore> {
    store: S,
    evaluator: EvaluatorHandle,
    transactions: Vec<Transaction>,
    thresholds: ThresholdConfig,
    flagged: FlaggedStore,
    ledger: ReviewLedger,
}

impl<S: KvStore> TriageCoordinator<S> {
    /// Construct with an injected persistence backend and worker handle.
    /// Call `init` afterwards to rehydrate persisted state.
    pub fn new(store: S, evaluator: EvaluatorHandle) -> Self {
        TriageCoordinator {
            store,
            evaluator,
            transactions: Vec::new(),
            thresholds: ThresholdConfig::default(),
            flagged: FlaggedStore::new(),
            ledger: ReviewLedger::new(),
        }
    }

    /// Load the persisted flagged snapshot and ledger. The in-memory
    /// copies are disposable caches; persistence is the system of record
    /// across reloads.
    pub fn init(&mut self) -> Result<()> {
        self.flagged = FlaggedStore::load(&self.store)?;
        self.ledger = ReviewLedger::load(&self.store)?;

        log::info!(
            "triage state loaded: {} flagged, {} ledger entries",
            self.flagged.len(),
            self.ledger.len()
        );

        Ok(())
    }

    /// Replace the working set and thresholds from a data-source read.
    pub fn load_data(&mut self, data: TriageData) {
        log::info!(
            "working set: {} transactions, thresholds amount > {} / score > {}",
            data.transactions.len(),
            data.thresholds.amount,
            data.thresholds.fraud_score
        );

        self.transactions = data.transactions;
        self.thresholds = data.thresholds;
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Run one evaluation over the working set (or a filtered subset),
    /// replacing the flagged snapshot with the result.
    ///
    /// On worker or persistence failure the last-known-good snapshot is
    /// retained and the error is returned; the caller decides whether to
    /// retry (e.g. the user resubmits a filter).
    pub async fn evaluate(
        &mut self,
        filter: Option<&TransactionFilter>,
    ) -> Result<&[Transaction]> {
        let working: Vec<Transaction> = match filter {
            Some(f) => self
                .transactions
                .iter()
                .filter(|tx| f.matches(tx))
                .cloned()
                .collect(),
            None => self.transactions.clone(),
        };

        let flagged = self.evaluator.evaluate(working, self.thresholds).await?;

        log::info!("evaluation run flagged {} transactions", flagged.len());
        self.flagged.replace(flagged, &mut self.store)?;

        Ok(self.flagged.current())
    }

    /// Record a reviewer disposition: mutate the in-memory transaction's
    /// status, then upsert its snapshot into the ledger.
    ///
    /// Idempotent for a repeated decision; re-entrant transitions
    /// (resolved to escalated and back) are unconditional overwrites.
    pub fn dispose_transaction(&mut self, id: i64, decision: Decision) -> Result<LedgerEntry> {
        let tx = self
            .transactions
            .iter_mut()
            .find(|tx| tx.id == id)
            .ok_or(TriageError::UnknownTransaction(id))?;

        tx.status = decision.as_status();

        let entry = LedgerEntry::new(tx.clone());
        self.ledger.upsert(entry.clone(), &mut self.store)?;

        log::info!("transaction {} disposed as {:?}", id, decision);

        Ok(entry)
    }

    /// Pure CSV formatting of a row set: fixed header, one line per
    /// transaction, fields quoted where needed. Malformed (absent)
    /// amounts and scores export as empty fields. No mutation, no I/O
    /// beyond the returned string.
    pub fn export_csv(rows: &[Transaction]) -> Result<String> {
        let mut buf = Vec::new();

        {
            let mut writer = csv::Writer::from_writer(&mut buf);
            writer.write_record(CSV_HEADER)?;

            for tx in rows {
                writer.write_record([
                    tx.id.to_string(),
                    tx.amount.map(|a| a.to_string()).unwrap_or_default(),
                    tx.date.to_string(),
                    tx.kind.clone(),
                    tx.fraud_score.map(|s| s.to_string()).unwrap_or_default(),
                ])?;
            }

            writer.flush()?;
        }

        Ok(String::from_utf8(buf)?)
    }

    /// CSV of the current flagged snapshot.
    pub fn export_flagged_csv(&self) -> Result<String> {
        Self::export_csv(self.flagged.current())
    }

    // ========================================================================
    // QUERIES (presentation layer reads)
    // ========================================================================

    pub fn flagged(&self) -> &[Transaction] {
        self.flagged.current()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn thresholds(&self) -> ThresholdConfig {
        self.thresholds
    }

    pub fn ledger_page(&self, page: usize, page_size: usize) -> &[LedgerEntry] {
        self.ledger.page(page, page_size)
    }

    pub fn ledger_len(&self) -> usize {
        self.ledger.len()
    }

    pub fn count_by_status(&self, status: TransactionStatus) -> usize {
        self.ledger.count_by_status(status)
    }

    pub fn total_transactions(&self) -> usize {
        self.transactions.len()
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

    fn tx(id: i64, amount: f64, fraud_score: f64, kind: &str) -> Transaction {
        Transaction {
            id,
            amount: Some(amount),
            date: NaiveDate::from_ymd_opt(2025, 5, 20).unwrap(),
            kind: kind.to_string(),
            fraud_score: Some(fraud_score),
            status: Default::default(),
        }
    }

    fn coordinator_with(
        transactions: Vec<Transaction>,
    ) -> TriageCoordinator<SqliteStore> {
        let store = SqliteStore::in_memory().unwrap();
        let (handle, _join) = EvaluatorHandle::spawn(16);

        let mut coordinator = TriageCoordinator::new(store, handle);
        coordinator.init().unwrap();
        coordinator.load_data(TriageData {
            transactions,
            thresholds: ThresholdConfig::default(),
        });

        coordinator
    }

    #[tokio::test]
    async fn test_evaluate_replaces_flagged_snapshot() {
        let mut coordinator = coordinator_with(vec![
            tx(1, 1500.0, 0.5, "transfer"),
            tx(2, 200.0, 0.9, "purchase"),
            tx(3, 200.0, 0.5, "purchase"),
        ]);

        let flagged = coordinator.evaluate(None).await.unwrap();
        let ids: Vec<i64> = flagged.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2]);

        // Re-running with the same inputs yields an identical snapshot
        let again: Vec<i64> = coordinator
            .evaluate(None)
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(again, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_filtered_evaluate_uses_subset() {
        let mut coordinator = coordinator_with(vec![
            tx(1, 1500.0, 0.5, "transfer"),
            tx(2, 200.0, 0.9, "purchase"),
        ]);

        let filter = TransactionFilter {
            date: None,
            kind: Some("purchase".to_string()),
        };

        let flagged = coordinator.evaluate(Some(&filter)).await.unwrap();
        let ids: Vec<i64> = flagged.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let mut coordinator = coordinator_with(vec![tx(1, 1500.0, 0.5, "transfer")]);

        coordinator.dispose_transaction(1, Decision::Resolved).unwrap();
        coordinator.dispose_transaction(1, Decision::Resolved).unwrap();

        assert_eq!(coordinator.ledger_len(), 1);
        assert_eq!(coordinator.count_by_status(TransactionStatus::Resolved), 1);

        let page = coordinator.ledger_page(1, 10);
        assert_eq!(page[0].id(), 1);
        assert_eq!(page[0].status(), TransactionStatus::Resolved);
    }

    #[tokio::test]
    async fn test_dispose_overwrites_prior_decision() {
        let mut coordinator = coordinator_with(vec![tx(1, 1500.0, 0.5, "transfer")]);

        coordinator.dispose_transaction(1, Decision::Resolved).unwrap();
        coordinator.dispose_transaction(1, Decision::Escalated).unwrap();

        assert_eq!(coordinator.count_by_status(TransactionStatus::Resolved), 0);
        assert_eq!(coordinator.count_by_status(TransactionStatus::Escalated), 1);
    }

    #[tokio::test]
    async fn test_dispose_unknown_id_errors() {
        let mut coordinator = coordinator_with(vec![tx(1, 1500.0, 0.5, "transfer")]);

        let result = coordinator.dispose_transaction(42, Decision::Resolved);
        assert!(matches!(result, Err(TriageError::UnknownTransaction(42))));
        assert_eq!(coordinator.ledger_len(), 0);
    }

    #[tokio::test]
    async fn test_evaluator_failure_keeps_last_known_good() {
        let store = SqliteStore::in_memory().unwrap();
        let (handle, join) = EvaluatorHandle::spawn(4);

        let mut coordinator = TriageCoordinator::new(store, handle);
        coordinator.init().unwrap();
        coordinator.load_data(TriageData {
            transactions: vec![tx(1, 1500.0, 0.5, "transfer")],
            thresholds: ThresholdConfig::default(),
        });

        coordinator.evaluate(None).await.unwrap();
        assert_eq!(coordinator.flagged().len(), 1);

        // Kill the worker; the snapshot must stay as-is
        join.abort();
        let _ = join.await;

        let result = coordinator.evaluate(None).await;
        assert!(matches!(result, Err(TriageError::Evaluation(_))));
        assert_eq!(coordinator.flagged().len(), 1);
    }

    #[test]
    fn test_export_csv_header_and_rows() {
        let rows = vec![tx(1, 1500.0, 0.5, "transfer"), tx(2, 200.5, 0.9, "purchase")];

        let csv = TriageCoordinator::<SqliteStore>::export_csv(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "ID,Amount,Date,Type,Fraud Score");
        assert_eq!(lines[1], "1,1500,2025-05-20,transfer,0.5");
        assert_eq!(lines[2], "2,200.5,2025-05-20,purchase,0.9");
    }

    #[test]
    fn test_export_csv_quotes_embedded_commas() {
        let rows = vec![tx(1, 1500.0, 0.5, "wire, international")];

        let csv = TriageCoordinator::<SqliteStore>::export_csv(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[1], "1,1500,2025-05-20,\"wire, international\",0.5");
    }

    #[test]
    fn test_export_csv_malformed_fields_are_empty() {
        let mut broken = tx(1, 0.0, 0.0, "purchase");
        broken.amount = None;
        broken.fraud_score = None;

        let csv = TriageCoordinator::<SqliteStore>::export_csv(&[broken]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[1], "1,,2025-05-20,purchase,");
    }
}
