use super::InternalEvent;

#[derive(Debug)]
pub struct ConsoleEntryWriteError {
    pub error: std::io::Error,
}

impl InternalEvent for ConsoleEntryWriteError {
    fn emit_logs(&self) {
        error!(
            message = "Failed writing entry to console.",
            error = %self.error,
            error_kind = ?self.error.kind(),
        );
    }
}

#[derive(Debug)]
pub struct ConsoleEntryEncodeError {
    pub error: serde_json::Error,
}

impl InternalEvent for ConsoleEntryEncodeError {
    fn emit_logs(&self) {
        error!(message = "Failed encoding entry.", error = %self.error);
    }
}
