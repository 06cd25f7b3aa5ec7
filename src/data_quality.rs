// ✅ Validation Reporter - structural-integrity stats per structuring run
// Each run appends one ValidationStats record to the monitoring history

use crate::history::{append_history, load_history};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How many failures are kept as representative samples
pub const MAX_ERROR_SAMPLES: usize = 5;

/// File name of the validation history inside the monitoring directory
pub const VALIDATION_STATS_FILE: &str = "validation_stats.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSample {
    /// Normalized name of the rejected company
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationStats {
    pub timestamp: DateTime<Utc>,
    pub total_processed: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    #[serde(default)]
    pub error_samples: Vec<ErrorSample>,
}

impl ValidationStats {
    /// Stats for a run that considered nothing
    pub fn empty() -> Self {
        ValidationTracker::new().finish()
    }

    pub fn valid_ratio(&self) -> f64 {
        if self.total_processed == 0 {
            return 1.0;
        }
        self.valid_records as f64 / self.total_processed as f64
    }

    pub fn summary(&self) -> String {
        format!(
            "Valid: {}, Invalid: {}, Total: {} ({:.1}% valid)",
            self.valid_records,
            self.invalid_records,
            self.total_processed,
            self.valid_ratio() * 100.0
        )
    }
}

/// Counts accepted and rejected records during one run
#[derive(Debug, Default)]
pub struct ValidationTracker {
    valid: usize,
    invalid: usize,
    samples: Vec<ErrorSample>,
}

impl ValidationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_valid(&mut self) {
        self.valid += 1;
    }

    pub fn record_invalid(&mut self, name: &str, error: &str) {
        self.invalid += 1;
        if self.samples.len() < MAX_ERROR_SAMPLES {
            self.samples.push(ErrorSample {
                name: name.to_string(),
                error: error.to_string(),
            });
        }
    }

    pub fn finish(self) -> ValidationStats {
        ValidationStats {
            timestamp: Utc::now(),
            total_processed: self.valid + self.invalid,
            valid_records: self.valid,
            invalid_records: self.invalid,
            error_samples: self.samples,
        }
    }
}

/// Append stats to the history file (created if missing, reset if malformed)
pub fn append_validation_stats(path: &Path, stats: &ValidationStats) -> Result<usize> {
    append_history(path, stats)
}

pub fn load_validation_history(path: &Path) -> Vec<ValidationStats> {
    load_history(path)
}
