use super::InternalEvent;

#[derive(Debug)]
pub struct BlackholeEntriesCollected {
    pub total_entries: usize,
    pub total_raw_bytes: usize,
}

impl InternalEvent for BlackholeEntriesCollected {
    fn emit_logs(&self) {
        info!(
            message = "Total entries collected.",
            entries = self.total_entries,
            raw_bytes_collected = self.total_raw_bytes,
        );
    }
}
