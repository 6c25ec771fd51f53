use super::snapshot::SnapshotMessage;
use crate::common::DomainError;
use crate::domains::logger::DynLogger;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use uuid::Uuid;

pub type SubscriberId = Uuid;

/// Per-tick delivery counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryStats {
    pub delivered: usize,
    pub dropped: usize,
    pub disconnected: usize,
}

struct SubscriberSlot {
    sender: mpsc::Sender<SnapshotMessage>,
    /// Consecutive batches dropped on a full queue.
    lagged: u32,
}

enum Delivery {
    Delivered,
    Dropped,
    Disconnected(Option<DomainError>),
}

/// Attached subscriber queues. Every send is `try_send`; a full queue loses the batch,
/// and a subscriber that keeps lagging is cut off.
pub struct SubscriberSet {
    slots: Mutex<HashMap<SubscriberId, SubscriberSlot>>,
    max_lagged: u32,
    logger: DynLogger,
}

impl SubscriberSet {
    pub fn new(max_lagged: u32, logger: DynLogger) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            max_lagged: max_lagged.max(1),
            logger,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriberId, SubscriberSlot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, id: SubscriberId, sender: mpsc::Sender<SnapshotMessage>) {
        self.lock().insert(id, SubscriberSlot { sender, lagged: 0 });
    }

    pub fn remove(&self, id: SubscriberId) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Offers `message` to every subscriber without waiting on any of them.
    pub fn publish(&self, message: &SnapshotMessage) -> DeliveryStats {
        let mut stats = DeliveryStats::default();
        let mut failures = Vec::new();
        {
            let mut slots = self.lock();
            slots.retain(|id, slot| match self.offer(id, slot, message) {
                Delivery::Delivered => {
                    stats.delivered += 1;
                    true
                }
                Delivery::Dropped => {
                    stats.dropped += 1;
                    true
                }
                Delivery::Disconnected(failure) => {
                    stats.disconnected += 1;
                    failures.extend(failure);
                    false
                }
            });
        }
        for failure in failures {
            self.logger.warn(&failure.to_string());
        }
        stats
    }

    /// Offers `message` to one subscriber. Returns false once that subscriber is gone.
    pub fn send_to(&self, id: SubscriberId, message: SnapshotMessage) -> bool {
        let outcome = {
            let mut slots = self.lock();
            let Some(slot) = slots.get_mut(&id) else {
                return false;
            };
            let outcome = self.offer(&id, slot, &message);
            if matches!(outcome, Delivery::Disconnected(_)) {
                slots.remove(&id);
            }
            outcome
        };
        match outcome {
            Delivery::Disconnected(failure) => {
                if let Some(failure) = failure {
                    self.logger.warn(&failure.to_string());
                }
                false
            }
            _ => true,
        }
    }

    fn offer(&self, id: &SubscriberId, slot: &mut SubscriberSlot, message: &SnapshotMessage) -> Delivery {
        match slot.sender.try_send(message.clone()) {
            Ok(()) => {
                slot.lagged = 0;
                Delivery::Delivered
            }
            Err(TrySendError::Full(_)) => {
                slot.lagged += 1;
                if slot.lagged >= self.max_lagged {
                    Delivery::Disconnected(Some(DomainError::SubscriberDeliveryFailed {
                        subscriber: id.to_string(),
                        reason: format!("queue full for {} consecutive batches", slot.lagged),
                    }))
                } else {
                    Delivery::Dropped
                }
            }
            Err(TrySendError::Closed(_)) => Delivery::Disconnected(None),
        }
    }
}

/// A live subscriber. Dropping it (or calling [`Subscription::detach`]) stops its resnapshot
/// timer and releases its queue at once.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<SnapshotMessage>,
    resnapshot: Option<JoinHandle<()>>,
    subscribers: Arc<SubscriberSet>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriberId,
        receiver: mpsc::Receiver<SnapshotMessage>,
        resnapshot: JoinHandle<()>,
        subscribers: Arc<SubscriberSet>,
    ) -> Self {
        Self {
            id,
            receiver,
            resnapshot: Some(resnapshot),
            subscribers,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next batch; `None` once the hub has disconnected this subscriber.
    pub async fn recv(&mut self) -> Option<SnapshotMessage> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<SnapshotMessage> {
        self.receiver.try_recv().ok()
    }

    pub fn is_attached(&self) -> bool {
        self.subscribers.contains(self.id)
    }

    pub fn detach(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.resnapshot.take() {
            task.abort();
        }
        self.subscribers.remove(self.id);
        self.receiver.close();
    }
}
