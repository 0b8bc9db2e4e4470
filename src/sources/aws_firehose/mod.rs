//! Receives deliveries from an AWS Firehose HTTP endpoint destination.
//!
//! Each request carries a batch of base64 records. Records are either raw
//! data put directly onto the delivery stream, or gzipped CloudWatch Logs
//! subscription envelopes carrying many log events. Every record or log event
//! becomes one [`Entry`](crate::Entry) handed to the configured sink.

use std::{net::SocketAddr, sync::Arc};

use futures::{FutureExt, future::BoxFuture};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use warp::Filter;

use crate::{
    internal_events::{AwsFirehoseServerStarted, AwsFirehoseServerStopped},
    metrics::FirehoseMetrics,
    relabel::{RelabelConfig, RelabelError, RelabelRules, Relabeler},
    sinks::LogSink,
};

pub mod errors;
mod filters;
mod handlers;
pub mod labels;
pub mod models;
pub mod record;

pub use handlers::{REQUEST_ID_HEADER, SOURCE_ARN_HEADER, TENANT_HEADER};

use super::Source;

pub const DEFAULT_PATH: &str = "/awsfirehose/api/v1/push";

fn default_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_paths() -> Vec<String> {
    vec![DEFAULT_PATH.to_owned()]
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AwsFirehoseConfig {
    /// The socket address to listen for deliveries on.
    #[serde(default = "default_address")]
    pub address: SocketAddr,

    /// The URL paths deliveries are accepted on.
    #[serde(default = "default_paths")]
    pub paths: Vec<String>,

    /// Stamp entries with the time carried by the delivery instead of the
    /// time they were received.
    ///
    /// CloudWatch Logs entries use the log event's timestamp; direct-put
    /// entries use the batch timestamp.
    #[serde(default)]
    pub use_incoming_timestamp: bool,

    /// Relabeling rules applied to every entry before internal labels are
    /// dropped.
    #[serde(default)]
    pub relabel_rules: Vec<RelabelConfig>,
}

impl Default for AwsFirehoseConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            paths: default_paths(),
            use_incoming_timestamp: false,
            relabel_rules: Vec::new(),
        }
    }
}

#[derive(Debug, Snafu)]
pub enum BuildError {
    #[snafu(display("At least one ingestion path must be configured."))]
    NoPaths,
    #[snafu(display("Ingestion path {:?} must start with '/'.", path))]
    InvalidPath { path: String },
    #[snafu(display("Invalid relabel rules: {}", source))]
    Relabel { source: RelabelError },
    #[snafu(display("Could not bind to {}: {}", address, source))]
    Bind {
        address: SocketAddr,
        source: warp::Error,
    },
}

/// What a source needs from the process hosting it.
pub struct SourceContext {
    pub out: Arc<dyn LogSink>,
    pub metrics: FirehoseMetrics,
    /// Resolves when the source should stop accepting requests.
    pub shutdown: BoxFuture<'static, ()>,
}

impl AwsFirehoseConfig {
    pub const NAME: &'static str = "aws_firehose";

    /// Checks paths and compiles the relabel rules; `None` when there are no
    /// rules.
    pub fn relabeler(&self) -> Result<Option<RelabelRules>, BuildError> {
        if self.paths.is_empty() {
            return NoPathsSnafu.fail();
        }
        if let Some(path) = self.paths.iter().find(|path| !path.starts_with('/')) {
            return InvalidPathSnafu { path: path.clone() }.fail();
        }

        let rules = RelabelRules::new(self.relabel_rules.iter().cloned()).context(RelabelSnafu)?;
        Ok((!rules.is_empty()).then_some(rules))
    }

    /// Binds the listener and returns the bound address along with the
    /// server future. Must be called from within a Tokio runtime.
    pub fn build(&self, cx: SourceContext) -> Result<(SocketAddr, Source), BuildError> {
        let relabeler = self
            .relabeler()?
            .map(|rules| Arc::new(rules) as Arc<dyn Relabeler>);

        let context = handlers::Context {
            out: cx.out,
            relabeler,
            metrics: cx.metrics,
            use_incoming_timestamp: self.use_incoming_timestamp,
        };
        let routes = filters::firehose(&self.paths, context).with(warp::trace::request());

        let (address, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(self.address, cx.shutdown)
            .context(BindSnafu {
                address: self.address,
            })?;

        emit!(AwsFirehoseServerStarted {
            address,
            paths: &self.paths,
        });

        Ok((
            address,
            server
                .map(move |()| {
                    emit!(AwsFirehoseServerStopped { address });
                })
                .boxed(),
        ))
    }
}
