//! Block: one immutable timestamped sample
//!
//! A block carries an opaque `datapoint` string and a `type` tag telling the
//! consumer how to decode it. Composite payloads join their fields with
//! [`BLOCK_DATA_SEPARATOR`].
//!
//! Serialized form (one element of a chain file):
//!
//! ```text
//! {"datapoint":"200","normalized-time":1760692503000000000,"type":"latency","timestamp":"2026|October|17|9|15|3"}
//! ```

use crate::storage::error::ChainResult;
use chrono::{Datelike, Local, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// Separator for the fields of a composite datapoint
pub const BLOCK_DATA_SEPARATOR: &str = "|";

/// File extension of chain files
pub const FILE_EXTENSION: &str = ".json";

/// Last normalized time handed out in this process
static LAST_NORMALIZED_TIME: AtomicI64 = AtomicI64::new(0);

/// A single sample in a chain
///
/// Fields are private: a block is never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    /// Payload, possibly several fields joined by `|`
    datapoint: String,
    /// Nanoseconds since the Unix epoch at creation
    #[serde(rename = "normalized-time")]
    normalized_time: i64,
    /// Decoding hint for consumers
    #[serde(rename = "type")]
    block_type: String,
    /// Human-readable `year|month|day|hour|minute|second`
    timestamp: String,
}

impl Block {
    /// Create a block stamped with the current time
    pub fn new(block_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            datapoint: value.into(),
            normalized_time: next_normalized_time(),
            block_type: block_type.into(),
            timestamp: display_timestamp(),
        }
    }

    /// Create a block whose datapoint is `fields` joined by the separator
    pub fn composite<I, S>(block_type: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = fields
            .into_iter()
            .map(|f| f.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(BLOCK_DATA_SEPARATOR);
        Self::new(block_type, joined)
    }

    /// Serialize to a canonical JSON object
    pub fn encode(&self) -> ChainResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Get the type tag
    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    /// Get the raw (possibly composite) datapoint
    pub fn datapoint(&self) -> &str {
        &self.datapoint
    }

    /// Split a composite datapoint into its fields
    pub fn fields(&self) -> Vec<&str> {
        self.datapoint.split(BLOCK_DATA_SEPARATOR).collect()
    }

    /// Get the creation time in nanoseconds since the epoch
    pub fn normalized_time(&self) -> i64 {
        self.normalized_time
    }

    /// Get the human-readable timestamp
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// Wall clock nanoseconds, strictly increasing within the process
fn next_normalized_time() -> i64 {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    let mut last = LAST_NORMALIZED_TIME.load(Ordering::Relaxed);
    loop {
        let next = now.max(last.saturating_add(1));
        match LAST_NORMALIZED_TIME.compare_exchange_weak(
            last,
            next,
            Ordering::AcqRel,
            Ordering::Relaxed,
        ) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Local time as `year|month|day|hour|minute|second`, month spelled out
fn display_timestamp() -> String {
    let now = Local::now();
    [
        now.year().to_string(),
        now.format("%B").to_string(),
        now.day().to_string(),
        now.hour().to_string(),
        now.minute().to_string(),
        now.second().to_string(),
    ]
    .join(BLOCK_DATA_SEPARATOR)
}
