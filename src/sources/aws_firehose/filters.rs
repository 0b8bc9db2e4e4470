use std::sync::Arc;

use bytes::Bytes;
use warp::{
    Filter,
    filters::BoxedFilter,
    http::HeaderMap,
    path::FullPath,
    reject::{self, Rejection},
    reply::Response,
};

use super::handlers::{self, Context};

/// Handles every Firehose delivery POSTed to one of `paths`.
pub(super) fn firehose(paths: &[String], context: Context) -> BoxedFilter<(Response,)> {
    warp::post()
        .and(ingestion_path(paths))
        .and(warp::header::headers_cloned())
        .and(warp::body::bytes())
        .and_then(move |headers: HeaderMap, body: Bytes| {
            handlers::firehose(headers, body, context.clone())
        })
        .boxed()
}

/// Matches the full request path against the configured ingestion paths,
/// ignoring a trailing slash.
fn ingestion_path(
    paths: &[String],
) -> impl Filter<Extract = (), Error = Rejection> + Clone + use<> {
    let paths: Arc<[String]> = paths.iter().map(|path| normalize(path).to_owned()).collect();

    warp::path::full()
        .and_then(move |full: FullPath| {
            let paths = Arc::clone(&paths);
            async move {
                if paths.iter().any(|path| path == normalize(full.as_str())) {
                    Ok(())
                } else {
                    Err(reject::not_found())
                }
            }
        })
        .untuple_one()
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_trailing_slashes() {
        assert_eq!(normalize("/awsfirehose/api/v1/push/"), "/awsfirehose/api/v1/push");
        assert_eq!(normalize("/awsfirehose/api/v1/push"), "/awsfirehose/api/v1/push");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize(""), "/");
    }

    #[tokio::test]
    async fn matches_configured_paths_only() {
        let filter = ingestion_path(&["/a".to_owned(), "/b/c/".to_owned()]);

        assert!(warp::test::request().path("/a").matches(&filter).await);
        assert!(warp::test::request().path("/b/c").matches(&filter).await);
        assert!(warp::test::request().path("/b/c/").matches(&filter).await);
        assert!(!warp::test::request().path("/b").matches(&filter).await);
        assert!(!warp::test::request().path("/a/extra").matches(&filter).await);
    }
}
