use crate::domains::logger::DomainLogger;
use std::sync::Arc;

/// Forwards domain log lines to the `tracing` subscriber installed by the binary.
struct TracingBridge;

impl DomainLogger for TracingBridge {
    fn info(&self, msg: &str) {
        tracing::info!(target: "transit::domain", "{}", msg);
    }

    fn warn(&self, msg: &str) {
        tracing::warn!(target: "transit::domain", "{}", msg);
    }

    fn error(&self, msg: &str) {
        tracing::error!(target: "transit::domain", "{}", msg);
    }
}

/// Console logger; also the fallback when the file logger cannot be set up.
pub fn init_console_logger() -> Arc<dyn DomainLogger> {
    Arc::new(TracingBridge)
}
