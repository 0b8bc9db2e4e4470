#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]

//! Receives AWS Firehose HTTP endpoint deliveries, decodes direct-put and
//! CloudWatch Logs subscription records, labels them and hands each log line
//! to a downstream [`sinks::LogSink`].

#[macro_use]
extern crate tracing;

#[macro_use]
pub mod internal_events;

pub mod app;
pub mod cli;
pub mod config;
pub mod event;
pub mod metrics;
pub mod relabel;
pub mod signal;
pub mod sinks;
pub mod sources;
pub mod trace;

pub use event::Entry;

pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, Error>;

pub fn get_version() -> String {
    let pkg_version = env!("CARGO_PKG_VERSION");
    let target = std::env::consts::ARCH;
    format!("{} ({})", pkg_version, target)
}
