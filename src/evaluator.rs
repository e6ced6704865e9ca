// Threshold Evaluator - pure flagging predicate + background worker
//
// The predicate itself is a pure function over (transaction, thresholds).
// The worker wraps it in a spawned task fed by a bounded FIFO channel so
// arbitrarily large batches never block the coordinating context.

use crate::error::{Result, TriageError};
use crate::model::{ThresholdConfig, Transaction};
use tokio::sync::{mpsc, oneshot};

// ============================================================================
// PURE EVALUATION
// ============================================================================

/// Flagging predicate: strictly above EITHER threshold.
///
/// A transaction exactly at a threshold is not flagged. Malformed fields
/// (`None`) never flag - fail-open per record, the batch is unaffected.
pub fn is_flagged(tx: &Transaction, thresholds: &ThresholdConfig) -> bool {
    let over_amount = matches!(tx.amount, Some(a) if a > thresholds.amount);
    let over_score = matches!(tx.fraud_score, Some(s) if s > thresholds.fraud_score);

    over_amount || over_score
}

/// Produce the flagged subsequence of `transactions`, original relative
/// order preserved. Deterministic for identical inputs; the whole batch is
/// evaluated before anything is returned.
pub fn flag_transactions(
    transactions: &[Transaction],
    thresholds: &ThresholdConfig,
) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|tx| is_flagged(tx, thresholds))
        .cloned()
        .collect()
}

// ============================================================================
// EVALUATION WORKER
// ============================================================================

/// One evaluation request: a batch plus the thresholds to apply, with a
/// dedicated reply channel.
struct EvalRequest {
    transactions: Vec<Transaction>,
    thresholds: ThresholdConfig,
    reply: oneshot::Sender<Vec<Transaction>>,
}

/// Handle to the single evaluation worker task.
///
/// Requests queue FIFO in the bounded channel and are answered in the
/// order they were sent; there is no cancellation of an in-flight
/// evaluation and no timeout. A request that is never answered leaves the
/// caller's state unchanged.
#[derive(Clone)]
pub struct EvaluatorHandle {
    tx: mpsc::Sender<EvalRequest>,
}

impl EvaluatorHandle {
    /// Spawn the worker task. Returns the handle plus the join handle,
    /// which resolves to the number of batches processed once every
    /// sender is dropped.
    pub fn spawn(buffer: usize) -> (Self, tokio::task::JoinHandle<usize>) {
        let (tx, mut rx) = mpsc::channel::<EvalRequest>(buffer);

        let handle = tokio::spawn(async move {
            let mut processed = 0usize;

            while let Some(request) = rx.recv().await {
                let flagged = flag_transactions(&request.transactions, &request.thresholds);
                processed += 1;

                // Receiver may have been dropped; nothing to do about it.
                let _ = request.reply.send(flagged);
            }

            processed
        });

        (Self { tx }, handle)
    }

    /// Submit a batch and await the flagged subsequence.
    ///
    /// A closed channel in either direction means the worker is gone;
    /// surfaced as a stale-data condition, never retried here.
    pub async fn evaluate(
        &self,
        transactions: Vec<Transaction>,
        thresholds: ThresholdConfig,
    ) -> Result<Vec<Transaction>> {
        let (reply_tx, reply_rx) = oneshot::channel();

        let request = EvalRequest {
            transactions,
            thresholds,
            reply: reply_tx,
        };

        self.tx
            .send(request)
            .await
            .map_err(|_| TriageError::Evaluation("worker channel closed".to_string()))?;

        reply_rx
            .await
            .map_err(|_| TriageError::Evaluation("worker dropped the request".to_string()))
    }

    /// Check whether the worker is still accepting requests.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// TESTS
// ============================================================================
