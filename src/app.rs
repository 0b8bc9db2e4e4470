use futures::{FutureExt, StreamExt};
use tokio::{
    runtime::{self, Runtime},
    sync::oneshot,
};

use crate::{
    cli::{LogFormat, Opts, SubCommand, handle_config_error},
    config::{self, Config},
    internal_events::{ReceiverQuit, ReceiverStarted, ReceiverStopped},
    metrics, signal,
    signal::SignalTo,
    sources::aws_firehose::SourceContext,
    trace,
};

pub struct Application {
    pub config: Config,
    pub runtime: Runtime,
}

impl Application {
    pub fn prepare() -> Result<Self, exitcode::ExitCode> {
        let opts = Opts::get_matches();
        Self::prepare_from_opts(opts)
    }

    pub fn prepare_from_opts(opts: Opts) -> Result<Self, exitcode::ExitCode> {
        let level = std::env::var("FIREHOSE_RECEIVER_LOG").unwrap_or_else(|_| {
            match opts.log_level() {
                "off" => "off".to_owned(),
                level => [
                    format!("firehose_receiver={}", level),
                    "warp=warn".to_owned(),
                ]
                .join(","),
            }
        });

        let root_opts = opts.root;
        let color = root_opts.color.use_color();
        let json = root_opts.log_format == LogFormat::Json;

        trace::init(color, json, &level);

        let config = match &root_opts.config {
            Some(path) => {
                info!(message = "Loading config.", path = ?path);
                config::load_from_path(path).map_err(handle_config_error)?
            }
            None => {
                info!("No config file given; using defaults.");
                Config::default()
            }
        };

        if let Some(SubCommand::Validate) = opts.sub_command {
            // Validation happens while loading.
            println!("Validated");
            return Err(exitcode::OK);
        }

        info!(message = "Log level is enabled.", level = ?level);

        let runtime = runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("firehose-receiver-worker")
            .build()
            .map_err(|error| {
                error!(message = "Unable to create async runtime.", %error);
                exitcode::OSERR
            })?;

        Ok(Application { config, runtime })
    }

    pub fn run(self) -> exitcode::ExitCode {
        let Application { config, runtime } = self;

        runtime.block_on(async move {
            let metrics = match metrics::init(config.metrics.address) {
                Ok(metrics) => metrics,
                Err(error) => {
                    error!(message = "Unable to start metrics exporter.", %error);
                    return exitcode::UNAVAILABLE;
                }
            };

            let mut signals = match signal::signals() {
                Ok(signals) => signals.boxed(),
                Err(error) => {
                    error!(message = "Unable to listen for signals.", %error);
                    return exitcode::OSERR;
                }
            };

            let (trigger, tripwire) = oneshot::channel::<()>();
            let cx = SourceContext {
                out: config.sink.build(),
                metrics,
                shutdown: tripwire.map(|_| ()).boxed(),
            };
            let mut server = match config.source.build(cx) {
                Ok((_address, server)) => server,
                Err(error) => {
                    error!(message = "Unable to start source.", %error);
                    return exitcode::UNAVAILABLE;
                }
            };

            emit!(ReceiverStarted);

            let signal = tokio::select! {
                Some(signal) = signals.next() => signal,
                () = &mut server => {
                    error!(message = "Server exited unexpectedly.");
                    return exitcode::SOFTWARE;
                }
            };

            match signal {
                SignalTo::Shutdown => {
                    emit!(ReceiverStopped);
                    let _ = trigger.send(());
                    tokio::select! {
                        () = &mut server => (),
                        _ = signals.next() => {
                            // Dropping the server future aborts in-flight requests.
                            emit!(ReceiverQuit);
                        }
                    }
                }
                SignalTo::Quit => emit!(ReceiverQuit),
            }

            exitcode::OK
        })
    }
}
