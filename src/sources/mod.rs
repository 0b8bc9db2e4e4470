use futures::future::BoxFuture;

pub mod aws_firehose;

/// A running source; resolves once the source has shut down.
pub type Source = BoxFuture<'static, ()>;
