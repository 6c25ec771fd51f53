use crate::domains::logger::{DomainLogger, DynLogger, FileLogger};
use std::sync::Arc;

/// Sets up `fast_log` writing to `path` and returns a logger that writes there.
/// `fast_log` claims the global `log` backend, so this succeeds at most once per process.
pub fn init_file_logger(path: &str) -> Result<DynLogger, String> {
    FileLogger::init(path).map_err(|e| format!("Failed to initialize fast_log: {}", e))?;
    Ok(Arc::new(FileLogger))
}

/// Sends every line to both loggers.
pub struct FanoutLogger {
    primary: DynLogger,
    secondary: DynLogger,
}

impl FanoutLogger {
    pub fn new(primary: DynLogger, secondary: DynLogger) -> Self {
        Self { primary, secondary }
    }
}

impl DomainLogger for FanoutLogger {
    fn info(&self, msg: &str) {
        self.primary.info(msg);
        self.secondary.info(msg);
    }

    fn warn(&self, msg: &str) {
        self.primary.warn(msg);
        self.secondary.warn(msg);
    }

    fn error(&self, msg: &str) {
        self.primary.error(msg);
        self.secondary.error(msg);
    }
}

/// File plus console when the file logger comes up, console alone otherwise.
pub fn init_combined_logger(path: &str) -> DynLogger {
    let console = super::init_console_logger();
    match init_file_logger(path) {
        Ok(file) => Arc::new(FanoutLogger::new(file, console)),
        Err(e) => {
            console.warn(&format!("{}; logging to console only", e));
            console
        }
    }
}
