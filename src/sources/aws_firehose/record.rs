use std::{fmt, io::Read};

use base64::prelude::{BASE64_STANDARD, Engine as _};
use bytes::Bytes;
use flate2::read::MultiGzDecoder;
use snafu::{ResultExt, Snafu};

/// The two gzip ID bytes followed by the DEFLATE compression method.
pub const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

/// Where a Firehose record came from, as far as its bytes tell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordOrigin {
    /// Data written straight to the delivery stream.
    DirectPut,
    /// A gzipped CloudWatch Logs subscription envelope.
    CloudwatchLogs,
    Unknown,
}

impl RecordOrigin {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RecordOrigin::DirectPut => "direct-put",
            RecordOrigin::CloudwatchLogs => "cloudwatch-logs",
            RecordOrigin::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RecordOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Snafu)]
pub enum RecordDecodeError {
    #[snafu(display("Could not base64 decode record data: {}", source))]
    Base64 { source: base64::DecodeError },
    #[snafu(display("Could not decompress gzipped record data: {}", source))]
    Gzip { source: std::io::Error },
}

impl RecordDecodeError {
    /// The origin the record was classified as before decoding failed.
    pub const fn origin(&self) -> RecordOrigin {
        match self {
            RecordDecodeError::Base64 { .. } => RecordOrigin::Unknown,
            RecordDecodeError::Gzip { .. } => RecordOrigin::CloudwatchLogs,
        }
    }

    pub const fn stage(&self) -> &'static str {
        match self {
            RecordDecodeError::Base64 { .. } => "base64",
            RecordDecodeError::Gzip { .. } => "gzip",
        }
    }
}

/// Decodes the base64 `data` of one Firehose record.
///
/// CloudWatch Logs subscriptions always deliver gzipped envelopes, so a gzip
/// header marks the record as CloudWatch Logs and is decompressed. Anything
/// else is returned as-is.
pub fn decode_record(data: &str) -> Result<(Bytes, RecordOrigin), RecordDecodeError> {
    let buf = BASE64_STANDARD
        .decode(data.as_bytes())
        .context(Base64Snafu)?;

    if !buf.starts_with(&GZIP_MAGIC) {
        return Ok((Bytes::from(buf), RecordOrigin::DirectPut));
    }

    let decoded = decode_gzip(&buf).context(GzipSnafu)?;
    Ok((decoded, RecordOrigin::CloudwatchLogs))
}

pub(super) fn decode_gzip(data: &[u8]) -> std::io::Result<Bytes> {
    let mut decoded = Vec::new();

    let mut gz = MultiGzDecoder::new(data);
    gz.read_to_end(&mut decoded)?;

    Ok(Bytes::from(decoded))
}



#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::{test_util::*, *};

    proptest! {
        #[test]
        fn gzipped_bytes_round_trip_as_cloudwatch_logs(data in any::<Vec<u8>>()) {
            let (bytes, origin) = decode_record(&encode_gzipped(&data)).unwrap();
            prop_assert_eq!(origin, RecordOrigin::CloudwatchLogs);
            prop_assert_eq!(&bytes[..], &data[..]);
        }

        #[test]
        fn other_bytes_pass_through_as_direct_put(
            data in any::<Vec<u8>>().prop_filter("starts with the gzip magic", |data| {
                !data.starts_with(&GZIP_MAGIC)
            })
        ) {
            let (bytes, origin) = decode_record(&encode_direct(&data)).unwrap();
            prop_assert_eq!(origin, RecordOrigin::DirectPut);
            prop_assert_eq!(&bytes[..], &data[..]);
        }
    }
}
