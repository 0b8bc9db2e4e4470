use tracing::dispatcher::{Dispatch, set_global_default};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Installs the global subscriber. `levels` is an `EnvFilter` directive
/// string such as `info` or `firehose_receiver=debug,warp=info`.
///
/// Logs go to stderr so they never mix with entries a console sink writes to
/// stdout. Calling this more than once is harmless; later calls are ignored.
pub fn init(color: bool, json: bool, levels: &str) {
    let filter = EnvFilter::try_new(levels).unwrap_or_else(|error| {
        eprintln!("Invalid log level directive {:?}: {}", levels, error);
        EnvFilter::new("info")
    });

    let dispatch = if json {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
            .finish();
        Dispatch::new(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_ansi(color)
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        Dispatch::new(subscriber)
    };

    let _ = set_global_default(dispatch);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        init(false, false, "firehose_receiver=debug");
        init(false, true, "not a [valid directive");
        info!(message = "Still logging.");
    }
}
