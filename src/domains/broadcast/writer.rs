use crate::common::{DomainError, GeoPoint};
use crate::domains::logger::DynLogger;
use crate::domains::tracking::{EntityId, FleetStore};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

struct PositionWrite {
    id: EntityId,
    position: GeoPoint,
}

/// Best-effort write-behind of smoothed positions. The tick only enqueues; a background task
/// drains the queue into the store and logs failures without retrying.
#[derive(Clone)]
pub struct PositionWriter {
    sender: mpsc::Sender<PositionWrite>,
    logger: DynLogger,
}

impl PositionWriter {
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<dyn FleetStore>, capacity: usize, logger: DynLogger) -> Self {
        let (sender, mut receiver) = mpsc::channel::<PositionWrite>(capacity.max(1));

        let task_logger = Arc::clone(&logger);
        tokio::spawn(async move {
            while let Some(write) = receiver.recv().await {
                if let Err(e) = store.update_position(write.id, write.position).await {
                    let failure = match e {
                        failure @ DomainError::PersistenceWriteFailed { .. } => failure,
                        other => DomainError::PersistenceWriteFailed {
                            id: write.id,
                            reason: other.to_string(),
                        },
                    };
                    task_logger.warn(&failure.to_string());
                }
            }
        });

        Self { sender, logger }
    }

    /// Queues a write; returns false when it was dropped.
    pub fn enqueue(&self, id: EntityId, position: GeoPoint) -> bool {
        match self.sender.try_send(PositionWrite { id, position }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.logger
                    .warn(&format!("Position write queue full, dropping update for entity {}", id));
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}
