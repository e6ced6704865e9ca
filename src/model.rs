// Core data model: transactions, thresholds, dispositions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// TRANSACTION
// ============================================================================

/// Review status of a transaction.
///
/// `Unset` is the initial state on ingestion. Both terminal states stay
/// mutable by further reviewer action (resolved can become escalated and
/// vice versa).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Unset,
    Resolved,
    Escalated,
}

/// A single financial transaction as supplied by the data source.
///
/// Identity is `id`; every other field is an immutable input except
/// `status`, which only changes via reviewer disposition. `amount` and
/// `fraud_score` deserialize leniently: non-numeric input becomes `None`,
/// which never satisfies the flagging predicate (fail-open per record,
/// never per batch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,

    pub date: NaiveDate,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(rename = "fraudScore", default, deserialize_with = "lenient_f64")]
    pub fraud_score: Option<f64>,

    #[serde(default)]
    pub status: TransactionStatus,
}

/// Accept a JSON number or a numeric string; anything else parses to None.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;

    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }))
}

// ============================================================================
// THRESHOLDS
// ============================================================================

/// Flagging thresholds for one evaluation run.
///
/// A transaction is flagged when it strictly exceeds EITHER threshold;
/// a value exactly at a threshold is not flagged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub amount: f64,

    #[serde(rename = "fraudScore")]
    pub fraud_score: f64,
}

impl Default for ThresholdConfig {
    /// Fallback thresholds used when the upstream data source is
    /// unavailable.
    fn default() -> Self {
        ThresholdConfig {
            amount: 1000.0,
            fraud_score: 0.8,
        }
    }
}

// ============================================================================
// DISPOSITION
// ============================================================================

/// A reviewer's judgment on a flagged transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Resolved,
    Escalated,
}

impl Decision {
    pub fn as_status(self) -> TransactionStatus {
        match self {
            Decision::Resolved => TransactionStatus::Resolved,
            Decision::Escalated => TransactionStatus::Escalated,
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "resolved" => Ok(Decision::Resolved),
            "escalated" => Ok(Decision::Escalated),
            other => Err(format!("invalid decision: {other} (expected resolved|escalated)")),
        }
    }
}

/// Transaction snapshot taken at the moment of disposition.
///
/// At most one entry exists per transaction id; a later disposition
/// replaces the snapshot in place. There is no transition history beyond
/// the latest snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub transaction: Transaction,
    pub disposed_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(transaction: Transaction) -> Self {
        LedgerEntry {
            transaction,
            disposed_at: Utc::now(),
        }
    }

    pub fn id(&self) -> i64 {
        self.transaction.id
    }

    pub fn status(&self) -> TransactionStatus {
        self.transaction.status
    }
}

// ============================================================================
// FILTERS
// ============================================================================

/// Optional working-set filter for an evaluation run (exact date match
/// and/or transaction type).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub date: Option<NaiveDate>,

    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        if let Some(date) = self.date {
            if tx.date != date {
                return false;
            }
        }

        if let Some(kind) = &self.kind {
            if !kind.eq_ignore_ascii_case("all") && !tx.kind.eq_ignore_ascii_case(kind) {
                return false;
            }
        }

        true
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_amount_accepts_numeric_string() {
        let tx: Transaction = serde_json::from_str(
            r#"{"id":1,"amount":"1500.50","date":"2025-01-15","type":"transfer","fraudScore":0.3}"#,
        )
        .unwrap();

        assert_eq!(tx.amount, Some(1500.50));
        assert_eq!(tx.fraud_score, Some(0.3));
    }

    #[test]
    fn test_lenient_amount_rejects_garbage() {
        let tx: Transaction = serde_json::from_str(
            r#"{"id":2,"amount":"N/A","date":"2025-01-15","type":"purchase","fraudScore":true}"#,
        )
        .unwrap();

        assert_eq!(tx.amount, None);
        assert_eq!(tx.fraud_score, None);
    }

    #[test]
    fn test_status_defaults_to_unset() {
        let tx: Transaction = serde_json::from_str(
            r#"{"id":3,"amount":10,"date":"2025-01-15","type":"purchase","fraudScore":0.1}"#,
        )
        .unwrap();

        assert_eq!(tx.status, TransactionStatus::Unset);
    }

    #[test]
    fn test_default_thresholds() {
        let thresholds = ThresholdConfig::default();

        assert_eq!(thresholds.amount, 1000.0);
        assert_eq!(thresholds.fraud_score, 0.8);
    }

    #[test]
    fn test_decision_parsing() {
        assert_eq!("resolved".parse::<Decision>().unwrap(), Decision::Resolved);
        assert_eq!("ESCALATED".parse::<Decision>().unwrap(), Decision::Escalated);
        assert!("closed".parse::<Decision>().is_err());
    }

    #[test]
    fn test_filter_matches_type_and_date() {
        let tx: Transaction = serde_json::from_str(
            r#"{"id":4,"amount":50,"date":"2025-02-01","type":"transfer","fraudScore":0.2}"#,
        )
        .unwrap();

        let all = TransactionFilter::default();
        assert!(all.matches(&tx));

        let by_type = TransactionFilter {
            date: None,
            kind: Some("transfer".to_string()),
        };
        assert!(by_type.matches(&tx));

        let wrong_date = TransactionFilter {
            date: Some(NaiveDate::from_ymd_opt(2025, 2, 2).unwrap()),
            kind: None,
        };
        assert!(!wrong_date.matches(&tx));

        let any_type = TransactionFilter {
            date: None,
            kind: Some("all".to_string()),
        };
        assert!(any_type.matches(&tx));
    }
}
