use super::InternalEvent;

#[derive(Debug)]
pub struct ChannelSinkClosed {
    pub count: usize,
}

impl InternalEvent for ChannelSinkClosed {
    fn emit_logs(&self) {
        error!(
            message = "Failed to forward entry, downstream is closed.",
            count = self.count,
        );
    }
}
