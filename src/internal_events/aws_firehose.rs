use std::net::SocketAddr;

use super::InternalEvent;
use crate::{
    metrics::FirehoseMetrics,
    sources::aws_firehose::{errors::RequestError, record::RecordOrigin},
};

#[derive(Debug)]
pub struct AwsFirehoseRequestReceived<'a> {
    pub request_id: Option<&'a str>,
    pub source_arn: Option<&'a str>,
}

impl InternalEvent for AwsFirehoseRequestReceived<'_> {
    fn emit_logs(&self) {
        debug!(
            message = "Handling AWS Firehose request.",
            request_id = %self.request_id.unwrap_or_default(),
            source_arn = %self.source_arn.unwrap_or_default(),
        );
    }
}

#[derive(Debug)]
pub struct AwsFirehoseRequestError<'a> {
    pub error: &'a RequestError,
    pub metrics: &'a FirehoseMetrics,
}

impl InternalEvent for AwsFirehoseRequestError<'_> {
    fn emit_logs(&self) {
        error!(
            message = "Error occurred while handling request.",
            error = %self.error,
            stage = self.error.stage().as_str(),
            error_code = self.error.status().as_u16(),
            request_id = %self.error.request_id(),
            origin = self.error.origin().map(|origin| origin.as_str()),
            decode_stage = self.error.decode_stage(),
        );
    }

    fn emit_metrics(&self) {
        self.metrics.error(self.error.stage());
    }
}

#[derive(Debug)]
pub struct AwsFirehoseRecordReceived<'a> {
    pub index: usize,
    pub origin: RecordOrigin,
    pub byte_size: usize,
    pub metrics: &'a FirehoseMetrics,
}

impl InternalEvent for AwsFirehoseRecordReceived<'_> {
    fn emit_logs(&self) {
        trace!(
            message = "Record decoded.",
            index = self.index,
            origin = %self.origin,
            byte_size = self.byte_size,
        );
    }

    fn emit_metrics(&self) {
        self.metrics.record_received(self.origin);
    }
}

#[derive(Debug)]
pub struct AwsFirehoseControlMessageSkipped<'a> {
    pub owner: &'a str,
    pub log_group: &'a str,
}

impl InternalEvent for AwsFirehoseControlMessageSkipped<'_> {
    fn emit_logs(&self) {
        debug!(
            message = "Skipping CloudWatch Logs control message.",
            owner = %self.owner,
            log_group = %self.log_group,
        );
    }
}

#[derive(Debug)]
pub struct AwsFirehoseEntriesForwarded<'a> {
    pub request_id: &'a str,
    pub count: usize,
}

impl InternalEvent for AwsFirehoseEntriesForwarded<'_> {
    fn emit_logs(&self) {
        debug!(
            message = "Request handled.",
            request_id = %self.request_id,
            entries = self.count,
        );
    }
}

#[derive(Debug)]
pub struct AwsFirehoseServerStarted<'a> {
    pub address: SocketAddr,
    pub paths: &'a [String],
}

impl InternalEvent for AwsFirehoseServerStarted<'_> {
    fn emit_logs(&self) {
        info!(
            message = "Listening for AWS Firehose deliveries.",
            address = %self.address,
            paths = ?self.paths,
        );
    }
}

#[derive(Debug)]
pub struct AwsFirehoseServerStopped {
    pub address: SocketAddr,
}

impl InternalEvent for AwsFirehoseServerStopped {
    fn emit_logs(&self) {
        info!(message = "AWS Firehose server stopped.", address = %self.address);
    }
}
