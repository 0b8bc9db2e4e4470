use chrono::Utc;
use serde::{Deserialize, Serialize};
use warp::{
    http::StatusCode,
    reply::{Reply, Response},
};

/// Represents an AWS Firehose HTTP endpoint delivery.
///
/// <https://docs.aws.amazon.com/firehose/latest/dev/httpdeliveryrequestresponse.html>
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirehoseRequest {
    pub request_id: String,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
    pub records: Vec<EncodedFirehoseRecord>,
}

/// A single record; `data` is base64 encoded.
#[derive(Debug, Deserialize, Serialize)]
pub struct EncodedFirehoseRecord {
    pub data: String,
}

/// Body returned to Firehose for every request.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FirehoseResponse {
    pub request_id: String,
    /// Seconds since the epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl FirehoseResponse {
    pub fn success(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            timestamp: Utc::now().timestamp(),
            error_message: None,
        }
    }

    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            timestamp: Utc::now().timestamp(),
            error_message: Some(message.into()),
        }
    }

    pub fn into_reply(self, status: StatusCode) -> Response {
        warp::reply::with_status(warp::reply::json(&self), status).into_response()
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    DataMessage,
    /// Sent by CloudWatch Logs to check the destination is reachable.
    ControlMessage,
}

impl MessageType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MessageType::DataMessage => "DATA_MESSAGE",
            MessageType::ControlMessage => "CONTROL_MESSAGE",
        }
    }
}

/// A CloudWatch Logs subscription filter envelope.
///
/// <https://docs.aws.amazon.com/AmazonCloudWatch/latest/logs/SubscriptionFilters.html>
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloudwatchLogsRecord {
    /// AWS account id of the originating log data.
    pub owner: String,
    pub log_group: String,
    pub log_stream: String,
    /// Names of the subscription filters that matched.
    pub subscription_filters: Vec<String>,
    pub message_type: MessageType,
    pub log_events: Vec<CloudwatchLogEvent>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CloudwatchLogEvent {
    pub id: String,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
    pub message: String,
}

impl CloudwatchLogsRecord {
    pub fn parse(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    pub fn events_to_emit(&self) -> &[CloudwatchLogEvent] {
        match self.message_type {
            MessageType::DataMessage => &self.log_events,
            MessageType::ControlMessage => &[],
        }
    }
}
