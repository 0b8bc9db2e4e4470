mod aws_firehose;
mod blackhole;
mod channel;
mod console;
mod process;

pub use self::aws_firehose::*;
pub use self::blackhole::*;
pub use self::channel::*;
pub use self::console::*;
pub use self::process::*;

pub trait InternalEvent {
    fn emit_logs(&self) {}
    fn emit_metrics(&self) {}
}

pub fn emit(event: impl InternalEvent) {
    event.emit_logs();
    event.emit_metrics();
}

#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::internal_events::emit($event)
    };
}
