use std::{io::Write, sync::Arc};

use base64::prelude::{BASE64_STANDARD, Engine as _};
use flate2::{Compression, write::GzEncoder};
use futures::FutureExt;
use similar_asserts::assert_eq;
use tokio::sync::oneshot;

use firehose_receiver::{
    config,
    event::LabelSet,
    metrics::FirehoseMetrics,
    sinks::ChannelSink,
    sources::aws_firehose::{
        REQUEST_ID_HEADER, SOURCE_ARN_HEADER, SourceContext, TENANT_HEADER,
        models::{EncodedFirehoseRecord, FirehoseRequest, FirehoseResponse},
    },
};

const CONFIG: &str = r#"
[source]
address = "${FIREHOSE_TEST_ADDRESS:-127.0.0.1:0}"
paths = ["/awsfirehose/api/v1/push"]

[[source.relabel_rules]]
action = "labelmap"
regex = "__aws_cw_(.*)"

[[source.relabel_rules]]
source_labels = ["__aws_owner"]
target_label = "owner"
regex = "(.+)"
replacement = "acct-$${1}"

[sink]
type = "blackhole"
"#;

const CLOUDWATCH_RECORD: &str = r#"{
    "messageType": "DATA_MESSAGE",
    "owner": "111111111111",
    "logGroup": "/app/api",
    "logStream": "i-0abc",
    "subscriptionFilters": ["all", "errors"],
    "logEvents": [
        {"id": "1", "timestamp": 1600110569039, "message": "first"},
        {"id": "2", "timestamp": 1600110569040, "message": "second"}
    ]
}"#;

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn labels(pairs: &[(&str, &str)]) -> LabelSet {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

#[tokio::test]
async fn receives_deliveries_with_file_config() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    let config = config::load_from_path(file.path()).unwrap();
    assert_eq!(config.sink.sink_type(), "blackhole");
    assert_eq!(config.source.relabel_rules[1].replacement, "acct-${1}");

    let (sink, mut rx) = ChannelSink::with_capacity(16);
    let (trigger, tripwire) = oneshot::channel::<()>();
    let (address, server) = config
        .source
        .build(SourceContext {
            out: Arc::new(sink),
            metrics: FirehoseMetrics::noop(),
            shutdown: tripwire.map(|_| ()).boxed(),
        })
        .unwrap();
    let server = tokio::spawn(server);

    let request = FirehoseRequest {
        request_id: "body-request-id".to_owned(),
        timestamp: 1600110760000,
        records: vec![
            EncodedFirehoseRecord {
                data: BASE64_STANDARD.encode("plain line"),
            },
            EncodedFirehoseRecord {
                data: BASE64_STANDARD.encode(gzip(CLOUDWATCH_RECORD.as_bytes())),
            },
        ],
    };

    let response = reqwest::Client::new()
        .post(format!("http://{}/awsfirehose/api/v1/push", address))
        .header(REQUEST_ID_HEADER, "header-request-id")
        .header(SOURCE_ARN_HEADER, "arn:aws:firehose:us-east-1:111111111111:deliverystream/test")
        .header(TENANT_HEADER, "team-a")
        .json(&request)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    let body: FirehoseResponse = response.json().await.unwrap();
    assert_eq!(body.request_id, "body-request-id");
    assert_eq!(body.error_message, None);

    let mut entries = Vec::new();
    while let Ok(entry) = rx.try_recv() {
        entries.push(entry);
    }
    assert_eq!(entries.len(), 3);

    assert_eq!(entries[0].line, "plain line");
    assert_eq!(entries[0].labels, labels(&[("__tenant_id__", "team-a")]));

    let cloudwatch = labels(&[
        ("__tenant_id__", "team-a"),
        ("log_group", "/app/api"),
        ("log_stream", "i-0abc"),
        ("matched_filters", "all,errors"),
        ("msg_type", "DATA_MESSAGE"),
        ("owner", "acct-111111111111"),
    ]);
    assert_eq!(entries[1].line, "first");
    assert_eq!(entries[1].labels, cloudwatch);
    assert_eq!(entries[2].line, "second");
    assert_eq!(entries[2].labels, cloudwatch);

    trigger.send(()).unwrap();
    server.await.unwrap();
}

#[test]
fn rejects_invalid_config_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(b"source:\n  paths: []\n").unwrap();

    let error = config::load_from_path(file.path()).unwrap_err();
    assert!(error.to_string().contains("ingestion path"), "{error}");
}
