use chrono::{DateTime, Utc};
use serde::Serialize;

pub mod labels;

pub use labels::{LabelBuilder, LabelSet};

/// A single log line ready to be handed to a downstream sink.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub labels: LabelSet,
    pub timestamp: DateTime<Utc>,
    pub line: String,
}

impl Entry {
    pub fn new(labels: LabelSet, timestamp: DateTime<Utc>, line: impl Into<String>) -> Self {
        Self {
            labels,
            timestamp,
            line: line.into(),
        }
    }

    /// Size of the line plus every label name and value, in bytes.
    pub fn size_of(&self) -> usize {
        self.line.len()
            + self
                .labels
                .iter()
                .map(|(name, value)| name.len() + value.len())
                .sum::<usize>()
    }
}
