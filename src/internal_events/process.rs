use super::InternalEvent;

#[derive(Debug)]
pub struct ReceiverStarted;

impl InternalEvent for ReceiverStarted {
    fn emit_logs(&self) {
        info!(
            message = "Firehose receiver has started.",
            version = %crate::get_version(),
        );
    }
}

#[derive(Debug)]
pub struct ReceiverStopped;

impl InternalEvent for ReceiverStopped {
    fn emit_logs(&self) {
        info!(message = "Firehose receiver has stopped; finishing in-flight requests.");
    }
}

#[derive(Debug)]
pub struct ReceiverQuit;

impl InternalEvent for ReceiverQuit {
    fn emit_logs(&self) {
        info!(message = "Firehose receiver has quit.");
    }
}

#[derive(Debug)]
pub struct ReceiverConfigLoadFailed<'a> {
    pub error: &'a crate::config::ConfigError,
}

impl InternalEvent for ReceiverConfigLoadFailed<'_> {
    fn emit_logs(&self) {
        error!(message = "Configuration error.", error = %self.error);
    }
}
