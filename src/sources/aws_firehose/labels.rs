//! Label names the Firehose source attaches before relabeling.

use super::models::CloudwatchLogsRecord;
use crate::event::labels::{LabelBuilder, RESERVED_LABEL_TENANT_ID};

pub const LABEL_REQUEST_ID: &str = "__aws_firehose_request_id";
pub const LABEL_SOURCE_ARN: &str = "__aws_firehose_source_arn";
pub const LABEL_OWNER: &str = "__aws_owner";
pub const LABEL_LOG_GROUP: &str = "__aws_cw_log_group";
pub const LABEL_LOG_STREAM: &str = "__aws_cw_log_stream";
pub const LABEL_MATCHED_FILTERS: &str = "__aws_cw_matched_filters";
pub const LABEL_MESSAGE_TYPE: &str = "__aws_cw_msg_type";

/// Labels shared by every entry of one request.
pub fn build_common(
    request_id: Option<&str>,
    source_arn: Option<&str>,
    tenant: Option<&str>,
) -> LabelBuilder {
    let mut builder = LabelBuilder::new();
    builder
        .set(LABEL_REQUEST_ID, request_id.unwrap_or_default())
        .set(LABEL_SOURCE_ARN, source_arn.unwrap_or_default());
    if let Some(tenant) = tenant.filter(|tenant| !tenant.is_empty()) {
        builder.set(RESERVED_LABEL_TENANT_ID, tenant);
    }
    builder
}

/// The origin specific fields of a decoded record.
#[derive(Clone, Copy, Debug)]
pub enum OriginFields<'a> {
    DirectPut,
    CloudwatchLogs(&'a CloudwatchLogsRecord),
}

pub fn extend_for_origin(mut builder: LabelBuilder, fields: OriginFields<'_>) -> LabelBuilder {
    match fields {
        OriginFields::DirectPut => {}
        OriginFields::CloudwatchLogs(record) => {
            builder
                .set(LABEL_OWNER, record.owner.as_str())
                .set(LABEL_LOG_GROUP, record.log_group.as_str())
                .set(LABEL_LOG_STREAM, record.log_stream.as_str())
                .set(LABEL_MATCHED_FILTERS, record.subscription_filters.join(","))
                .set(LABEL_MESSAGE_TYPE, record.message_type.as_str());
        }
    }
    builder
}
