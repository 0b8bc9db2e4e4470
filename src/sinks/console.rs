use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{
    io::{self, AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use super::LogSink;
use crate::{
    Entry,
    event::labels::format_labels,
    internal_events::{ConsoleEntryEncodeError, ConsoleEntryWriteError},
};

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Stdout,
    Stderr,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// `<timestamp> {labels} <line>`
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConsoleSinkConfig {
    #[serde(default)]
    pub target: Target,
    #[serde(default)]
    pub encoding: Encoding,
}

impl ConsoleSinkConfig {
    pub fn build(&self) -> ConsoleSink {
        let output: Box<dyn AsyncWrite + Send + Unpin> = match self.target {
            Target::Stdout => Box::new(io::stdout()),
            Target::Stderr => Box::new(io::stderr()),
        };
        ConsoleSink::new(output, self.encoding)
    }
}

/// Writes each entry as a single line.
pub struct ConsoleSink {
    output: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    encoding: Encoding,
}

impl ConsoleSink {
    pub fn new(output: Box<dyn AsyncWrite + Send + Unpin>, encoding: Encoding) -> Self {
        Self {
            output: Mutex::new(output),
            encoding,
        }
    }
}

pub(crate) fn encode_entry(entry: &Entry, encoding: Encoding) -> Result<String, serde_json::Error> {
    match encoding {
        Encoding::Json => serde_json::to_string(entry),
        Encoding::Text => Ok(format!(
            "{} {} {}",
            entry.timestamp.to_rfc3339(),
            format_labels(&entry.labels),
            entry.line
        )),
    }
}

#[async_trait]
impl LogSink for ConsoleSink {
    async fn send(&self, entry: Entry) {
        let mut buf = match encode_entry(&entry, self.encoding) {
            Ok(buf) => buf,
            Err(error) => {
                emit!(ConsoleEntryEncodeError { error });
                return;
            }
        };
        buf.push('\n');

        let mut output = self.output.lock().await;
        let result = async {
            output.write_all(buf.as_bytes()).await?;
            output.flush().await
        }
        .await;
        if let Err(error) = result {
            emit!(ConsoleEntryWriteError { error });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        pin::Pin,
        sync::{Arc, Mutex as StdMutex},
        task::{Context, Poll},
    };

    use chrono::{TimeZone, Utc};
    use similar_asserts::assert_eq;

    use super::*;
    use crate::event::LabelBuilder;

    fn entry() -> Entry {
        let mut labels = LabelBuilder::new();
        labels.set("log_group", "/aws/lambda/fn").set("__tenant_id__", "a");
        Entry::new(
            labels.into_labels(),
            Utc.with_ymd_and_hms(2020, 9, 14, 18, 29, 29).unwrap(),
            "hello world",
        )
    }

    #[test]
    fn encodes_text() {
        assert_eq!(
            encode_entry(&entry(), Encoding::Text).unwrap(),
            r#"2020-09-14T18:29:29+00:00 {__tenant_id__="a", log_group="/aws/lambda/fn"} hello world"#
        );
    }

    #[test]
    fn encodes_json() {
        assert_eq!(
            encode_entry(&entry(), Encoding::Json).unwrap(),
            r#"{"labels":{"__tenant_id__":"a","log_group":"/aws/lambda/fn"},"timestamp":"2020-09-14T18:29:29Z","line":"hello world"}"#
        );
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<StdMutex<Vec<u8>>>);

    impl AsyncWrite for SharedBuf {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn writes_one_line_per_entry() {
        let buf = SharedBuf::default();
        let sink = ConsoleSink::new(Box::new(buf.clone()), Encoding::Json);

        sink.send(entry()).await;
        sink.send(entry()).await;

        let written = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(written.ends_with('\n'));
    }
}
