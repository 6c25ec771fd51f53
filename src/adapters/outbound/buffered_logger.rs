use crate::domains::logger::{DomainLogger, DynLogger};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

#[derive(Clone, Copy)]
enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn forward(self, target: &dyn DomainLogger, msg: &str) {
        match self {
            Level::Info => target.info(msg),
            Level::Warn => target.warn(msg),
            Level::Error => target.error(msg),
        }
    }
}

/// Queues lines for a background task so callers on the tick path never block on I/O.
/// Lines are dropped when the queue is full.
pub struct BufferedLogger {
    sender: mpsc::Sender<(Level, String)>,
    dropped: AtomicU64,
}

impl BufferedLogger {
    fn push(&self, level: Level, msg: &str) {
        if let Err(TrySendError::Full(_)) = self.sender.try_send((level, msg.to_string())) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl DomainLogger for BufferedLogger {
    fn info(&self, msg: &str) {
        self.push(Level::Info, msg);
    }

    fn warn(&self, msg: &str) {
        self.push(Level::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.push(Level::Error, msg);
    }
}

/// Wraps `bridge` in a [`BufferedLogger`] of `capacity` lines. Must run inside a tokio runtime.
pub fn init_buffered_logger(bridge: DynLogger, capacity: usize) -> Arc<BufferedLogger> {
    let (sender, mut receiver) = mpsc::channel::<(Level, String)>(capacity.max(1));
    tokio::spawn(async move {
        while let Some((level, msg)) = receiver.recv().await {
            level.forward(bridge.as_ref(), &msg);
        }
    });
    Arc::new(BufferedLogger {
        sender,
        dropped: AtomicU64::new(0),
    })
}
