//! Internal counters for the Firehose receiver.
//!
//! Counters are registered once against an explicit [`Recorder`] and handed
//! to the request handlers, so tests can observe them through their own
//! recorder without touching process-global state.

use std::{fmt, net::SocketAddr};

use ::metrics::{Counter, Key, Label, Level, Metadata, NoopRecorder, Recorder, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use snafu::{ResultExt, Snafu};

use crate::sources::aws_firehose::{errors::FailureStage, record::RecordOrigin};

pub const REQUEST_ERRORS_TOTAL: &str = "aws_firehose_request_errors_total";
pub const RECORDS_RECEIVED_TOTAL: &str = "aws_firehose_records_received_total";
pub const ENTRIES_FORWARDED_TOTAL: &str = "aws_firehose_entries_forwarded_total";

#[derive(Debug, Snafu)]
pub enum MetricsError {
    #[snafu(display("Failed to start Prometheus exporter on {}: {}", address, source))]
    Exporter {
        address: SocketAddr,
        source: BuildError,
    },
}

/// Handles to every counter the receiver exposes.
#[derive(Clone)]
pub struct FirehoseMetrics {
    errors_pre_read: Counter,
    errors_read_or_format: Counter,
    errors_decode: Counter,
    errors_handle_cw: Counter,
    received_direct_put: Counter,
    received_cloudwatch_logs: Counter,
    received_unknown: Counter,
    entries_forwarded: Counter,
}

impl fmt::Debug for FirehoseMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirehoseMetrics").finish_non_exhaustive()
    }
}

fn counter(
    recorder: &dyn Recorder,
    name: &'static str,
    label: Option<(&'static str, &'static str)>,
) -> Counter {
    let labels = label
        .map(|(key, value)| vec![Label::new(key, value)])
        .unwrap_or_default();
    let key = Key::from_parts(name, labels);
    let metadata = Metadata::new(module_path!(), Level::INFO, Some(module_path!()));
    recorder.register_counter(&key, &metadata)
}

impl FirehoseMetrics {
    /// Describes and registers every counter, so all series exist at zero
    /// before the first request arrives.
    pub fn register(recorder: &dyn Recorder) -> Self {
        recorder.describe_counter(
            REQUEST_ERRORS_TOTAL.into(),
            Some(Unit::Count),
            "Requests rejected, by the stage that failed.".into(),
        );
        recorder.describe_counter(
            RECORDS_RECEIVED_TOTAL.into(),
            Some(Unit::Count),
            "Firehose records decoded, by detected origin.".into(),
        );
        recorder.describe_counter(
            ENTRIES_FORWARDED_TOTAL.into(),
            Some(Unit::Count),
            "Log entries handed to the sink.".into(),
        );

        let error = |stage: FailureStage| {
            counter(recorder, REQUEST_ERRORS_TOTAL, Some(("reason", stage.as_str())))
        };
        let received = |origin: RecordOrigin| {
            counter(recorder, RECORDS_RECEIVED_TOTAL, Some(("type", origin.as_str())))
        };

        Self {
            errors_pre_read: error(FailureStage::PreRead),
            errors_read_or_format: error(FailureStage::ReadOrFormat),
            errors_decode: error(FailureStage::Decode),
            errors_handle_cw: error(FailureStage::HandleCloudwatch),
            received_direct_put: received(RecordOrigin::DirectPut),
            received_cloudwatch_logs: received(RecordOrigin::CloudwatchLogs),
            received_unknown: received(RecordOrigin::Unknown),
            entries_forwarded: counter(recorder, ENTRIES_FORWARDED_TOTAL, None),
        }
    }

    pub fn noop() -> Self {
        Self::register(&NoopRecorder)
    }

    pub fn error(&self, stage: FailureStage) {
        match stage {
            FailureStage::PreRead => &self.errors_pre_read,
            FailureStage::ReadOrFormat => &self.errors_read_or_format,
            FailureStage::Decode => &self.errors_decode,
            FailureStage::HandleCloudwatch => &self.errors_handle_cw,
        }
        .increment(1);
    }

    pub fn record_received(&self, origin: RecordOrigin) {
        match origin {
            RecordOrigin::DirectPut => &self.received_direct_put,
            RecordOrigin::CloudwatchLogs => &self.received_cloudwatch_logs,
            RecordOrigin::Unknown => &self.received_unknown,
        }
        .increment(1);
    }

    pub fn entries_forwarded(&self, count: usize) {
        if count > 0 {
            self.entries_forwarded.increment(count as u64);
        }
    }
}

/// Builds the counters against a Prometheus exporter when an address is
/// configured, otherwise against a no-op recorder.
///
/// Must be called from within a Tokio runtime; the exporter's HTTP listener is
/// spawned onto it.
pub fn init(address: Option<SocketAddr>) -> Result<FirehoseMetrics, MetricsError> {
    let Some(address) = address else {
        return Ok(FirehoseMetrics::noop());
    };

    let (recorder, exporter) = PrometheusBuilder::new()
        .with_http_listener(address)
        .build()
        .context(ExporterSnafu { address })?;

    tokio::spawn(async move {
        if let Err(error) = exporter.await {
            error!(message = "Prometheus exporter stopped.", error = ?error);
        }
    });
    info!(message = "Serving internal metrics.", %address);

    Ok(FirehoseMetrics::register(&recorder))
}


#[cfg(test)]
mod tests {
    use super::{test_util::*, *};

    #[test]
    fn registers_every_series_at_zero() {
        let (_metrics, snapshotter) = debugging();

        for reason in ["pre_read", "read_or_format", "decode", "handle_cw"] {
            assert_eq!(
                counter_value(&snapshotter, REQUEST_ERRORS_TOTAL, Some(("reason", reason))),
                0
            );
        }
        let names: Vec<_> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, ..)| key.key().name().to_owned())
            .collect();
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn counts_by_label() {
        let (metrics, snapshotter) = debugging();

        metrics.error(FailureStage::Decode);
        metrics.error(FailureStage::Decode);
        metrics.record_received(RecordOrigin::CloudwatchLogs);
        metrics.entries_forwarded(3);
        metrics.entries_forwarded(0);

        assert_eq!(
            counter_value(&snapshotter, REQUEST_ERRORS_TOTAL, Some(("reason", "decode"))),
            2
        );
        assert_eq!(
            counter_value(&snapshotter, REQUEST_ERRORS_TOTAL, Some(("reason", "pre_read"))),
            0
        );
        assert_eq!(
            counter_value(
                &snapshotter,
                RECORDS_RECEIVED_TOTAL,
                Some(("type", "cloudwatch-logs"))
            ),
            1
        );
        assert_eq!(
            counter_value(&snapshotter, RECORDS_RECEIVED_TOTAL, Some(("type", "direct-put"))),
            0
        );
        assert_eq!(counter_value(&snapshotter, ENTRIES_FORWARDED_TOTAL, None), 3);
    }

    #[tokio::test]
    async fn init_without_address_is_noop() {
        let metrics = init(None).unwrap();
        metrics.entries_forwarded(1);
    }
}
