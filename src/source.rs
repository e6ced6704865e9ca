// Data source - one read with a hardcoded fallback
//
// Upstream supplies a single JSON document with the transactions and the
// thresholds for the run. Any failure (missing file, bad JSON) falls back
// to an empty set with default thresholds; it is never surfaced as a hard
// failure to the caller.

use crate::model::{ThresholdConfig, Transaction};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Payload supplied by the upstream data source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriageData {
    #[serde(default)]
    pub transactions: Vec<Transaction>,

    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

/// Read the data source, falling back to
/// `{transactions: [], thresholds: {amount: 1000, fraudScore: 0.8}}`
/// when the read or parse fails.
pub fn load_data<P: AsRef<Path>>(path: P) -> TriageData {
    let path = path.as_ref();

    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            log::warn!("data source unavailable ({}): {} - using fallback", path.display(), e);
            return TriageData::default();
        }
    };

    match serde_json::from_str(&json) {
        Ok(data) => data,
        Err(e) => {
            log::warn!("data source unreadable ({}): {} - using fallback", path.display(), e);
            TriageData::default()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
