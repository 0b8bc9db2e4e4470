use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{Entry, internal_events::ChannelSinkClosed};

pub mod blackhole;
pub mod console;

pub use blackhole::{BlackholeConfig, BlackholeSink};
pub use console::{ConsoleSink, ConsoleSinkConfig};

/// Accepts decoded log entries, one at a time.
///
/// Sends are fire-and-forget; buffering, retries and backpressure are the
/// sink's own business.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn send(&self, entry: Entry);
}

/// Forwards entries into a bounded channel, waiting for capacity.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<Entry>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Entry>) -> Self {
        Self { tx }
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<Entry>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl LogSink for ChannelSink {
    async fn send(&self, entry: Entry) {
        if self.tx.send(entry).await.is_err() {
            emit!(ChannelSinkClosed { count: 1 });
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    Console(ConsoleSinkConfig),
    Blackhole(BlackholeConfig),
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Console(ConsoleSinkConfig::default())
    }
}

impl SinkConfig {
    pub fn build(&self) -> Arc<dyn LogSink> {
        match self {
            SinkConfig::Console(config) => Arc::new(config.build()),
            SinkConfig::Blackhole(config) => Arc::new(config.build()),
        }
    }

    pub const fn sink_type(&self) -> &'static str {
        match self {
            SinkConfig::Console(_) => "console",
            SinkConfig::Blackhole(_) => "blackhole",
        }
    }
}
