use std::{
    num::NonZeroUsize,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::LogSink;
use crate::{Entry, internal_events::BlackholeEntriesCollected};

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BlackholeConfig {
    /// Log the running totals every this many entries.
    #[serde(default)]
    pub print_amount: Option<NonZeroUsize>,
}

impl BlackholeConfig {
    pub fn build(&self) -> BlackholeSink {
        BlackholeSink::new(self.print_amount)
    }
}

/// Discards every entry, keeping only counts.
#[derive(Debug, Default)]
pub struct BlackholeSink {
    total_entries: AtomicUsize,
    total_raw_bytes: AtomicUsize,
    print_amount: Option<NonZeroUsize>,
}

impl BlackholeSink {
    pub fn new(print_amount: Option<NonZeroUsize>) -> Self {
        Self {
            total_entries: AtomicUsize::new(0),
            total_raw_bytes: AtomicUsize::new(0),
            print_amount,
        }
    }

    pub fn total_entries(&self) -> usize {
        self.total_entries.load(Ordering::Relaxed)
    }

    pub fn total_raw_bytes(&self) -> usize {
        self.total_raw_bytes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LogSink for BlackholeSink {
    async fn send(&self, entry: Entry) {
        let raw_bytes = entry.size_of();
        let total_entries = self.total_entries.fetch_add(1, Ordering::Relaxed) + 1;
        let total_raw_bytes =
            self.total_raw_bytes.fetch_add(raw_bytes, Ordering::Relaxed) + raw_bytes;

        trace!(raw_bytes_counter = raw_bytes, entries_counter = 1);

        if let Some(print_amount) = self.print_amount {
            if total_entries % print_amount.get() == 0 {
                emit!(BlackholeEntriesCollected {
                    total_entries,
                    total_raw_bytes,
                });
            }
        }
    }
}

impl Drop for BlackholeSink {
    fn drop(&mut self) {
        emit!(BlackholeEntriesCollected {
            total_entries: self.total_entries(),
            total_raw_bytes: self.total_raw_bytes(),
        });
    }
}
