use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use snafu::ResultExt;
use warp::{
    http::{HeaderMap, StatusCode},
    reject,
    reply::Response,
};

use super::{
    errors::{
        CloudwatchParseSnafu, DecodeSnafu, DecompressSnafu, ParseSnafu, RequestError,
        UnknownOriginSnafu, UnsupportedEncodingSnafu,
    },
    labels::{OriginFields, build_common, extend_for_origin},
    models::{CloudwatchLogsRecord, FirehoseRequest, FirehoseResponse, MessageType},
    record::{RecordOrigin, decode_gzip, decode_record},
};
use crate::{
    Entry,
    event::labels::{LabelBuilder, finalize},
    internal_events::{
        AwsFirehoseControlMessageSkipped, AwsFirehoseEntriesForwarded, AwsFirehoseRecordReceived,
        AwsFirehoseRequestError, AwsFirehoseRequestReceived,
    },
    metrics::FirehoseMetrics,
    relabel::Relabeler,
    sinks::LogSink,
};

pub const REQUEST_ID_HEADER: &str = "x-amz-firehose-request-id";
pub const SOURCE_ARN_HEADER: &str = "x-amz-firehose-source-arn";
pub const TENANT_HEADER: &str = "x-scope-orgid";

#[derive(Clone)]
pub(super) struct Context {
    pub(super) out: Arc<dyn LogSink>,
    pub(super) relabeler: Option<Arc<dyn Relabeler>>,
    pub(super) metrics: FirehoseMetrics,
    pub(super) use_incoming_timestamp: bool,
}

/// The request headers the handler cares about. Values that are not UTF-8
/// are treated as absent.
#[derive(Debug, Default)]
pub(super) struct RequestHeaders {
    pub(super) request_id: Option<String>,
    pub(super) source_arn: Option<String>,
    pub(super) tenant: Option<String>,
    pub(super) content_encoding: Option<String>,
}

impl RequestHeaders {
    pub(super) fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|value| std::str::from_utf8(value.as_bytes()).ok())
                .map(str::to_owned)
        };

        Self {
            request_id: get(REQUEST_ID_HEADER),
            source_arn: get(SOURCE_ARN_HEADER),
            tenant: get(TENANT_HEADER),
            content_encoding: get(warp::http::header::CONTENT_ENCODING.as_str()),
        }
    }
}

/// Handles one Firehose delivery. Always replies; failures become a 400
/// with an `errorMessage`.
pub(super) async fn firehose(
    headers: HeaderMap,
    body: Bytes,
    context: Context,
) -> Result<Response, reject::Rejection> {
    let headers = RequestHeaders::from_headers(&headers);
    emit!(AwsFirehoseRequestReceived {
        request_id: headers.request_id.as_deref(),
        source_arn: headers.source_arn.as_deref(),
    });

    let mut batch = Batch {
        context: &context,
        forwarded: 0,
    };
    let result = batch.handle(&headers, body).await;
    let forwarded = batch.forwarded;

    match result {
        Ok(request_id) => {
            emit!(AwsFirehoseEntriesForwarded {
                request_id: &request_id,
                count: forwarded,
            });
            Ok(FirehoseResponse::success(request_id).into_reply(StatusCode::OK))
        }
        Err(error) => {
            emit!(AwsFirehoseEntriesForwarded {
                request_id: error.request_id(),
                count: forwarded,
            });
            emit!(AwsFirehoseRequestError {
                error: &error,
                metrics: &context.metrics,
            });
            Ok(FirehoseResponse::error(error.request_id(), error.to_string())
                .into_reply(error.status()))
        }
    }
}

struct Batch<'a> {
    context: &'a Context,
    forwarded: usize,
}

impl Batch<'_> {
    /// Processes records in order and stops at the first one that fails.
    /// Returns the request id to echo.
    async fn handle(
        &mut self,
        headers: &RequestHeaders,
        body: Bytes,
    ) -> Result<String, RequestError> {
        let header_request_id = headers.request_id.clone().unwrap_or_default();

        let body = decode_body(headers.content_encoding.as_deref(), body, &header_request_id)?;
        let request: FirehoseRequest = serde_json::from_slice(&body).context(ParseSnafu {
            request_id: header_request_id,
        })?;
        let request_id = request.request_id;

        let common = build_common(
            headers.request_id.as_deref(),
            headers.source_arn.as_deref(),
            headers.tenant.as_deref(),
        );

        for (index, record) in request.records.iter().enumerate() {
            let (data, origin) = decode_record(&record.data).context(DecodeSnafu {
                index,
                request_id: request_id.as_str(),
            })?;
            emit!(AwsFirehoseRecordReceived {
                index,
                origin,
                byte_size: data.len(),
                metrics: &self.context.metrics,
            });

            match origin {
                RecordOrigin::DirectPut => {
                    let labels = extend_for_origin(common.clone(), OriginFields::DirectPut);
                    let timestamp = self.timestamp(request.timestamp);
                    let line = String::from_utf8_lossy(&data);
                    self.forward(&labels, timestamp, line.into_owned()).await;
                }
                RecordOrigin::CloudwatchLogs => {
                    let record = CloudwatchLogsRecord::parse(&data).context(CloudwatchParseSnafu {
                        index,
                        request_id: request_id.as_str(),
                    })?;
                    self.forward_cloudwatch(&common, &record).await;
                }
                RecordOrigin::Unknown => {
                    return UnknownOriginSnafu {
                        index,
                        request_id: request_id.as_str(),
                    }
                    .fail();
                }
            }
        }

        Ok(request_id)
    }

    async fn forward_cloudwatch(&mut self, common: &LabelBuilder, record: &CloudwatchLogsRecord) {
        if record.message_type == MessageType::ControlMessage {
            emit!(AwsFirehoseControlMessageSkipped {
                owner: &record.owner,
                log_group: &record.log_group,
            });
        }

        let labels = extend_for_origin(common.clone(), OriginFields::CloudwatchLogs(record));
        let labels = finalize(&labels, self.context.relabeler.as_deref());
        for event in record.events_to_emit() {
            let timestamp = self.timestamp(event.timestamp);
            self.send(Entry::new(labels.clone(), timestamp, event.message.as_str()))
                .await;
        }
    }

    async fn forward(&mut self, labels: &LabelBuilder, timestamp: DateTime<Utc>, line: String) {
        let labels = finalize(labels, self.context.relabeler.as_deref());
        self.send(Entry::new(labels, timestamp, line)).await;
    }

    async fn send(&mut self, entry: Entry) {
        self.context.out.send(entry).await;
        self.forwarded += 1;
        self.context.metrics.entries_forwarded(1);
    }

    /// Ingestion time, unless incoming timestamps are enabled.
    fn timestamp(&self, incoming_millis: i64) -> DateTime<Utc> {
        if self.context.use_incoming_timestamp {
            DateTime::from_timestamp_millis(incoming_millis).unwrap_or_else(Utc::now)
        } else {
            Utc::now()
        }
    }
}

fn decode_body(
    encoding: Option<&str>,
    body: Bytes,
    request_id: &str,
) -> Result<Bytes, RequestError> {
    match encoding.map(str::trim) {
        None | Some("") => Ok(body),
        Some(encoding) if encoding.eq_ignore_ascii_case("identity") => Ok(body),
        Some(encoding) if encoding.eq_ignore_ascii_case("gzip") => {
            decode_gzip(&body).context(DecompressSnafu { request_id })
        }
        Some(encoding) => UnsupportedEncodingSnafu {
            encoding,
            request_id,
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use warp::http::HeaderValue;

    use super::*;
    use crate::{
        metrics::{
            ENTRIES_FORWARDED_TOTAL,
            test_util::{counter_value, debugging},
        },
        sinks::ChannelSink,
        sources::aws_firehose::{
            errors::FailureStage,
            models::EncodedFirehoseRecord,
            record::test_util::{encode_direct, gzip},
        },
    };

    #[test]
    fn reads_known_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Amz-Firehose-Request-Id", HeaderValue::from_static("req"));
        headers.insert("X-Scope-OrgID", HeaderValue::from_static("tenant"));
        headers.insert(
            SOURCE_ARN_HEADER,
            HeaderValue::from_bytes(b"arn\xff").unwrap(),
        );

        let headers = RequestHeaders::from_headers(&headers);
        assert_eq!(headers.request_id.as_deref(), Some("req"));
        assert_eq!(headers.tenant.as_deref(), Some("tenant"));
        assert_eq!(headers.source_arn, None);
        assert_eq!(headers.content_encoding, None);
    }

    #[test]
    fn decodes_body_by_content_encoding() {
        let body = Bytes::from_static(b"{}");
        assert_eq!(decode_body(None, body.clone(), "").unwrap(), body);
        assert_eq!(decode_body(Some("identity"), body.clone(), "").unwrap(), body);
        assert_eq!(
            decode_body(Some("GZIP"), Bytes::from(gzip(b"{}")), "").unwrap(),
            body
        );

        let error = decode_body(Some("gzip"), body.clone(), "req").unwrap_err();
        assert!(matches!(error, RequestError::Decompress { .. }));
        assert_eq!(error.request_id(), "req");

        let error = decode_body(Some("br"), body, "").unwrap_err();
        assert!(matches!(error, RequestError::UnsupportedEncoding { .. }));
        assert_eq!(error.stage(), FailureStage::PreRead);
    }

    #[tokio::test]
    async fn counts_entries_sent_before_request_is_dropped() {
        let (sink, mut rx) = ChannelSink::with_capacity(1);
        let (metrics, snapshotter) = debugging();
        let context = Context {
            out: Arc::new(sink),
            relabeler: None,
            metrics,
            use_incoming_timestamp: false,
        };
        let request = FirehoseRequest {
            request_id: "req".to_owned(),
            timestamp: 0,
            records: ["one", "two", "three"]
                .into_iter()
                .map(|line| EncodedFirehoseRecord {
                    data: encode_direct(line.as_bytes()),
                })
                .collect(),
        };
        let body = Bytes::from(serde_json::to_vec(&request).unwrap());

        // The second entry waits for channel capacity that never frees up.
        let handled = firehose(HeaderMap::new(), body, context);
        assert!(
            tokio::time::timeout(Duration::from_millis(100), handled)
                .await
                .is_err()
        );

        assert_eq!(counter_value(&snapshotter, ENTRIES_FORWARDED_TOTAL, None), 1);
        assert_eq!(rx.recv().await.unwrap().line, "one");
    }
}
