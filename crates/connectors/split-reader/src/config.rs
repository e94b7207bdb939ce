use serde::Deserialize;

use crate::error::{Result, SplitReaderError};

/// Knobs recognized by a [`SplitReader`](crate::SplitReader).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SplitReaderConfig {
    /// Upper bound on single-record reads per split in one fetch.
    #[serde(default = "default_records_per_split_per_fetch")]
    pub records_per_split_per_fetch: usize,
    /// Emit a split's finished marker in a later batch than its last records.
    #[serde(default)]
    pub separated_finished_record: bool,
    /// Reads may block until a record arrives or the reader is woken up.
    #[serde(default)]
    pub blocking_fetch: bool,
}

fn default_records_per_split_per_fetch() -> usize {
    2
}

impl Default for SplitReaderConfig {
    fn default() -> Self {
        Self {
            records_per_split_per_fetch: default_records_per_split_per_fetch(),
            separated_finished_record: false,
            blocking_fetch: false,
        }
    }
}

impl SplitReaderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.records_per_split_per_fetch == 0 {
            return Err(SplitReaderError::InvalidConfig(
                "records_per_split_per_fetch must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
