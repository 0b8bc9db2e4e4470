use std::fmt;

use snafu::Snafu;
use warp::http::StatusCode;

use super::record::{RecordDecodeError, RecordOrigin};

/// The point in request handling where processing was abandoned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureStage {
    /// Reading or decompressing the body.
    PreRead,
    /// Decoding the batch envelope.
    ReadOrFormat,
    /// Decoding a single record.
    Decode,
    /// Parsing a CloudWatch Logs envelope.
    HandleCloudwatch,
}

impl FailureStage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FailureStage::PreRead => "pre_read",
            FailureStage::ReadOrFormat => "read_or_format",
            FailureStage::Decode => "decode",
            FailureStage::HandleCloudwatch => "handle_cw",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RequestError {
    #[snafu(display("Unsupported content encoding: {}", encoding))]
    UnsupportedEncoding {
        encoding: String,
        request_id: String,
    },
    #[snafu(display("Could not decompress request body: {}", source))]
    Decompress {
        source: std::io::Error,
        request_id: String,
    },
    #[snafu(display("Could not parse incoming request: {}", source))]
    Parse {
        source: serde_json::Error,
        request_id: String,
    },
    #[snafu(display("Could not decode record {}: {}", index, source))]
    Decode {
        index: usize,
        source: RecordDecodeError,
        request_id: String,
    },
    #[snafu(display("Could not parse CloudWatch Logs record {}: {}", index, source))]
    CloudwatchParse {
        index: usize,
        source: serde_json::Error,
        request_id: String,
    },
    #[snafu(display("Could not determine origin of record {}", index))]
    UnknownOrigin { index: usize, request_id: String },
}

impl RequestError {
    pub const fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    pub const fn stage(&self) -> FailureStage {
        match self {
            RequestError::UnsupportedEncoding { .. } | RequestError::Decompress { .. } => {
                FailureStage::PreRead
            }
            RequestError::Parse { .. } => FailureStage::ReadOrFormat,
            RequestError::Decode { .. } | RequestError::UnknownOrigin { .. } => {
                FailureStage::Decode
            }
            RequestError::CloudwatchParse { .. } => FailureStage::HandleCloudwatch,
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            RequestError::UnsupportedEncoding { request_id, .. }
            | RequestError::Decompress { request_id, .. }
            | RequestError::Parse { request_id, .. }
            | RequestError::Decode { request_id, .. }
            | RequestError::CloudwatchParse { request_id, .. }
            | RequestError::UnknownOrigin { request_id, .. } => request_id,
        }
    }

    /// Which record decoding step failed, for record decode errors.
    pub const fn decode_stage(&self) -> Option<&'static str> {
        match self {
            RequestError::Decode { source, .. } => Some(source.stage()),
            _ => None,
        }
    }

    /// The origin of the record that failed, if a record was involved.
    pub const fn origin(&self) -> Option<RecordOrigin> {
        match self {
            RequestError::Decode { source, .. } => Some(source.origin()),
            RequestError::CloudwatchParse { .. } => Some(RecordOrigin::CloudwatchLogs),
            RequestError::UnknownOrigin { .. } => Some(RecordOrigin::Unknown),
            RequestError::UnsupportedEncoding { .. }
            | RequestError::Decompress { .. }
            | RequestError::Parse { .. } => None,
        }
    }
}
